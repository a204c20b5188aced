use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::grid::TilePlacement;

/// A point in one of the planar frames (world mm, survey units or pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Position { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    /// Both extents strictly positive and finite.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }
}

impl std::fmt::Display for LatLon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lat: {:.7}\nLon: {:.7}", self.lat, self.lon)
    }
}

/// Integer tile-grid address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridIndex {
    pub x: i64,
    pub y: i64,
}

impl GridIndex {
    pub fn new(x: i64, y: i64) -> Self {
        GridIndex { x, y }
    }
}

/// One parsed `Surface` element of a survey document. All lengths in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SurfaceRecord {
    pub name: String,
    #[serde(default)]
    pub file: Option<String>,
    pub x: i64,
    pub y: i64,
    pub dimension_x: i64,
    pub dimension_y: i64,
    /// Tile-grid address used for anchor-relative geo resolution.
    #[serde(default)]
    pub tile_x: Option<i64>,
    #[serde(default)]
    pub tile_y: Option<i64>,
}

/// One entry of the bay configuration. Field names follow the survey export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BayRecord {
    pub bay: String,
    pub coord_x1: f64,
    pub coord_y1: f64,
    pub coord_x2: f64,
    pub coord_y2: f64,
    /// Intrinsic rotation of the footprint, degrees. Defaults to 0.
    #[serde(default)]
    pub rotationoffset: Option<f64>,
    /// Extrinsic placement rotation, degrees. Defaults to 0.
    #[serde(default)]
    pub bayrotation: Option<f64>,
    /// Placement offset, mm. Each defaults to 0.
    #[serde(default)]
    pub offset_x: Option<f64>,
    #[serde(default)]
    pub offset_y: Option<f64>,
}

/// A tile owned by an anchor, as written in the scene file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileRecord {
    pub placement: TilePlacement,
    #[serde(default)]
    pub label: Option<String>,
    /// Opaque fields handed through to the rendering collaborator untouched.
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnchorRecord {
    pub id: String,
    pub origin: Position,
    /// Grid cell that sits at the anchor origin for grid-placed tiles.
    #[serde(default)]
    pub grid_center: GridIndex,
    #[serde(default)]
    pub tiles: Vec<TileRecord>,
}
