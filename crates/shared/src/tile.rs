use serde::{Deserialize, Serialize};

use crate::calc::rotate;
use crate::error::{Result, SceneError};
use crate::geo::GeoProjector;
use crate::models::{GridIndex, LatLon, Position, Size, SurfaceRecord};
use crate::render::{GeoTileFill, GeoTileView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u64);

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A resolved tile image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub path: String,
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetState {
    /// Waiting on the load identified by `ticket`.
    Pending { ticket: u64 },
    Ready(ImageInfo),
    /// No image, or the image failed to load.
    Placeholder,
}

/// One image load the host should perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub tile: TileId,
    pub ticket: u64,
    pub path: String,
}

/// Image-backed survey tile, placed at an absolute world position.
#[derive(Debug, Clone)]
pub struct GeoTile {
    id: TileId,
    world_position: Position,
    size: Size,
    source_image: Option<String>,
    label: String,
    grid_index: Option<GridIndex>,
    asset: AssetState,
}

impl GeoTile {
    /// Build from a survey surface. `ticket` is consumed only when the record
    /// names an image file.
    pub fn from_record(id: TileId, rec: &SurfaceRecord, ticket: u64) -> Result<Self> {
        let size = Size::new(rec.dimension_x as f64, rec.dimension_y as f64);
        if !size.is_valid() {
            return Err(SceneError::DegenerateGeometry {
                entity: rec.name.clone(),
                width: size.width,
                height: size.height,
            });
        }
        let grid_index = match (rec.tile_x, rec.tile_y) {
            (Some(x), Some(y)) => Some(GridIndex::new(x, y)),
            (None, None) => None,
            _ => {
                return Err(SceneError::Configuration(format!(
                    "surface {} has only one of tileX/tileY",
                    rec.name
                )))
            }
        };
        let source_image = rec.file.clone().filter(|f| !f.is_empty());
        let asset = if source_image.is_some() {
            AssetState::Pending { ticket }
        } else {
            AssetState::Placeholder
        };

        Ok(GeoTile {
            id,
            world_position: Position::new(rec.x as f64, rec.y as f64),
            size,
            source_image,
            label: rec.name.clone(),
            grid_index,
            asset,
        })
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn world_position(&self) -> Position {
        self.world_position
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn grid_index(&self) -> Option<GridIndex> {
        self.grid_index
    }

    pub fn source_image(&self) -> Option<&str> {
        self.source_image.as_deref()
    }

    pub fn asset(&self) -> &AssetState {
        &self.asset
    }

    pub fn asset_request(&self, root: &str) -> Option<AssetRequest> {
        match (&self.asset, &self.source_image) {
            (AssetState::Pending { ticket }, Some(file)) => Some(AssetRequest {
                tile: self.id,
                ticket: *ticket,
                path: asset_path(root, file),
            }),
            _ => None,
        }
    }

    /// Apply a finished load. Returns false when `ticket` is stale.
    pub fn complete_asset(
        &mut self,
        ticket: u64,
        result: std::result::Result<ImageInfo, String>,
    ) -> bool {
        if self.asset != (AssetState::Pending { ticket }) {
            return false;
        }
        self.asset = match result {
            Ok(info) => AssetState::Ready(info),
            Err(reason) => {
                let err = SceneError::AssetResolution {
                    path: self.source_image.clone().unwrap_or_default(),
                    reason,
                };
                tracing::warn!(tile = %self.id, label = %self.label, "{err}; using placeholder");
                AssetState::Placeholder
            }
        };
        true
    }

    /// Hit test against the drawn footprint. A loaded image is drawn rotated
    /// about the slot corner; placeholders fill the unrotated slot.
    pub fn contains_world(&self, world: Position, projector: &GeoProjector) -> bool {
        let offset = world - self.world_position;
        let local = match self.asset {
            AssetState::Ready(_) => rotate(offset, -projector.config().sprite_rotation_deg),
            _ => offset,
        };
        (0.0..=self.size.width).contains(&local.x) && (0.0..=self.size.height).contains(&local.y)
    }

    /// World position of an image-local pixel: pixels scale to millimeters and
    /// follow the image's rotation inside the slot.
    pub fn pixel_to_world(&self, px: f64, py: f64, projector: &GeoProjector) -> Position {
        let mm = Position::new(px * projector.mm_per_pixel(), py * projector.mm_per_pixel());
        self.world_position + rotate(mm, projector.config().sprite_rotation_deg)
    }

    /// Inverse of [`pixel_to_world`](Self::pixel_to_world).
    pub fn world_to_pixel(&self, world: Position, projector: &GeoProjector) -> Position {
        let mm = rotate(
            world - self.world_position,
            -projector.config().sprite_rotation_deg,
        );
        Position::new(mm.x / projector.mm_per_pixel(), mm.y / projector.mm_per_pixel())
    }

    /// Geographic position of an image-local pixel. Grid-addressed tiles go
    /// through the anchor grid; others through their world position.
    pub fn resolve(&self, px: f64, py: f64, projector: &GeoProjector) -> LatLon {
        match self.grid_index {
            Some(index) => projector.project(index.x, index.y, px, py),
            None => projector.world_to_geo(self.pixel_to_world(px, py, projector)),
        }
    }

    pub fn view(&self, sprite_rotation_deg: f64) -> GeoTileView {
        let color = placeholder_color(&self.label);
        let fill = match &self.asset {
            AssetState::Pending { .. } => GeoTileFill::Pending { color },
            AssetState::Ready(info) => GeoTileFill::Image {
                path: info.path.clone(),
                rotation_deg: sprite_rotation_deg,
            },
            AssetState::Placeholder => GeoTileFill::Placeholder { color },
        };
        GeoTileView {
            id: self.id,
            label: self.label.clone(),
            world_position: self.world_position,
            size: self.size,
            file: self.source_image.clone(),
            fill,
        }
    }
}

/// Image path under `root`, with Windows separators normalized.
pub fn asset_path(root: &str, file: &str) -> String {
    format!("{}{}", root, file).replace('\\', "/")
}

/// Stable 24-bit RGB color for a placeholder, derived from its label.
pub fn placeholder_color(label: &str) -> u32 {
    // FNV-1a
    let mut hash: u32 = 0x811c_9dc5;
    for byte in label.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash & 0x00ff_ffff
}
