//! Read model handed to the rendering and debug-overlay collaborators.
//!
//! Views are plain data: a collaborator draws them however it likes and never
//! writes back. Positions and sizes are world millimeters.

use serde::Serialize;

use crate::models::{LatLon, Position, Size};
use crate::survey::{Footprint, RenderTransform};
use crate::tile::TileId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorView {
    pub id: String,
    pub origin: Position,
    /// Extent of the anchor's debug outline.
    pub debug_box: Size,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileView {
    pub anchor_id: String,
    pub index: usize,
    pub local_offset: Position,
    pub global_position: Position,
    pub size: Size,
    pub label: Option<String>,
    pub source_data: serde_json::Value,
}

impl TileView {
    /// Caption drawn at the tile center: label plus global position.
    pub fn caption(&self) -> Option<String> {
        self.label.as_ref().map(|label| {
            format!(
                "{}\n({}, {})",
                label, self.global_position.x, self.global_position.y
            )
        })
    }

    pub fn center(&self) -> Position {
        Position::new(
            self.global_position.x + self.size.width / 2.0,
            self.global_position.y + self.size.height / 2.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GeoTileFill {
    /// Image still resolving; the placeholder occupies the slot meanwhile.
    Pending { color: u32 },
    Image { path: String, rotation_deg: f64 },
    Placeholder { color: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoTileView {
    pub id: TileId,
    pub label: String,
    pub world_position: Position,
    pub size: Size,
    pub file: Option<String>,
    pub fill: GeoTileFill,
}

impl std::fmt::Display for GeoTileView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Label: {}", self.label)?;
        writeln!(
            f,
            "Position: ({}, {})",
            self.world_position.x, self.world_position.y
        )?;
        writeln!(f, "Size: {} x {}", self.size.width, self.size.height)?;
        write!(f, "File: {}", self.file.as_deref().unwrap_or("none"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BayView {
    pub id: String,
    pub transform: RenderTransform,
    /// Persisted footprint as last re-derived from the live transform.
    pub footprint: Footprint,
    pub placement_offset: Position,
    pub extrinsic_rotation: f64,
    pub intrinsic_rotation_offset: f64,
    pub corners: [Position; 4],
}

impl std::fmt::Display for BayView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = &self.transform;
        writeln!(f, "Label: {}", self.id)?;
        writeln!(
            f,
            "Position: ({:.2}, {:.2})",
            t.rect_origin.x, t.rect_origin.y
        )?;
        writeln!(f, "Size: {} x {}", t.rect_size.width, t.rect_size.height)?;
        writeln!(f, "Rotation: {:.2}°", self.extrinsic_rotation)?;
        writeln!(f, "Container Rotation: {}°", t.frame_rotation_deg)?;
        writeln!(
            f,
            "TWMS Offset Position: ({}, {})",
            self.placement_offset.x, self.placement_offset.y
        )?;
        write!(
            f,
            "Container Position: ({:.0}, {:.0})",
            t.frame_position.x, t.frame_position.y
        )
    }
}

/// Debug-overlay text for a click inside an entity.
pub fn click_report(entity: &dyn std::fmt::Display, local: Position, geo: Option<LatLon>) -> String {
    let mut out = format!(
        "{}\n\nClick Local: ({}, {})",
        entity,
        local.x.round(),
        local.y.round()
    );
    if let Some(geo) = geo {
        out.push_str(&format!(
            "\nGPS:\n  Lat: {:.7}\n  Lon: {:.7}",
            geo.lat, geo.lon
        ));
    }
    out
}

/// Drawing collaborator. `Scene::render` calls `clear` once and then every
/// draw method for one complete snapshot, anchors before their tiles.
pub trait RenderSurface {
    fn clear(&mut self) {}
    fn draw_anchor(&mut self, anchor: &AnchorView);
    fn draw_tile(&mut self, tile: &TileView);
    fn draw_geo_tile(&mut self, tile: &GeoTileView);
    fn draw_bay(&mut self, bay: &BayView);
}
