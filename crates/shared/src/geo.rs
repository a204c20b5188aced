//! Anchor-referenced conversion between tile-grid pixels, millimeter offsets
//! and geographic coordinates.
//!
//! The earth is treated as locally flat (equirectangular), which holds for
//! facility-scale spans only. Pixel and world axes share the same orientation
//! (x right, y down); `rotation_deg` rotates that frame counter-clockwise onto
//! east/north.

use serde::{Deserialize, Serialize};

use crate::calc::{rotate_sc, unrotate_sc};
use crate::error::{Result, SceneError};
use crate::models::{GridIndex, LatLon, Position};

pub const METERS_PER_DEG_LAT: f64 = 111_320.0;

const MM_PER_M: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectorConfig {
    /// Known geographic position of the anchor pixel.
    pub anchor_geo: LatLon,
    /// Tile that contains the anchor pixel.
    pub anchor_grid_index: GridIndex,
    /// Pixel inside the anchor tile whose position is `anchor_geo`.
    pub anchor_pixel_offset: Position,
    pub tile_size_mm: f64,
    pub tile_size_px: f64,
    pub rotation_deg: f64,
    /// World (mm) position of the anchor pixel. Resolves world points that
    /// carry no grid address.
    pub anchor_world: Position,
    /// Rotation applied to a tile image inside its slot, degrees.
    pub sprite_rotation_deg: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        ProjectorConfig {
            anchor_geo: LatLon::new(31.1484138, -87.9835681),
            anchor_grid_index: GridIndex::new(4, 5),
            anchor_pixel_offset: Position::new(1104.0, 1309.0),
            tile_size_mm: 611_500.0,
            tile_size_px: 2048.0,
            rotation_deg: 270.0,
            // Puts world origin at the survey origin (31.1513758, -88.0051681).
            anchor_world: Position::new(329_729.84, 2_057_789.97),
            sprite_rotation_deg: 90.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeoProjector {
    config: ProjectorConfig,
    mm_per_pixel: f64,
    meters_per_deg_lon: f64,
    sin: f64,
    cos: f64,
}

impl GeoProjector {
    pub fn new(config: ProjectorConfig) -> Result<Self> {
        if !(config.tile_size_mm.is_finite() && config.tile_size_mm > 0.0) {
            return Err(SceneError::Configuration(format!(
                "tile_size_mm must be positive, got {}",
                config.tile_size_mm
            )));
        }
        if !(config.tile_size_px.is_finite() && config.tile_size_px > 0.0) {
            return Err(SceneError::Configuration(format!(
                "tile_size_px must be positive, got {}",
                config.tile_size_px
            )));
        }
        let LatLon { lat, lon } = config.anchor_geo;
        if !(lat.is_finite() && lon.is_finite()) || lat.abs() >= 90.0 {
            return Err(SceneError::Configuration(format!(
                "anchor_geo out of range: ({lat}, {lon})"
            )));
        }
        if !config.rotation_deg.is_finite() || !config.sprite_rotation_deg.is_finite() {
            return Err(SceneError::Configuration(
                "rotation angles must be finite".to_string(),
            ));
        }
        if !config.anchor_pixel_offset.is_finite() || !config.anchor_world.is_finite() {
            return Err(SceneError::Configuration(
                "anchor offsets must be finite".to_string(),
            ));
        }

        let (sin, cos) = config.rotation_deg.to_radians().sin_cos();
        Ok(GeoProjector {
            mm_per_pixel: config.tile_size_mm / config.tile_size_px,
            meters_per_deg_lon: METERS_PER_DEG_LAT * lat.to_radians().cos(),
            sin,
            cos,
            config,
        })
    }

    pub fn config(&self) -> &ProjectorConfig {
        &self.config
    }

    pub fn mm_per_pixel(&self) -> f64 {
        self.mm_per_pixel
    }

    pub fn meters_per_deg_lon(&self) -> f64 {
        self.meters_per_deg_lon
    }

    /// Geographic position of pixel `(px, py)` inside tile `(tile_x, tile_y)`.
    /// Pixel offsets outside the tile are fine; the mapping is linear.
    pub fn project(&self, tile_x: i64, tile_y: i64, px: f64, py: f64) -> LatLon {
        let delta_tile_x = tile_x as f64 - self.config.anchor_grid_index.x as f64;
        let delta_tile_y = tile_y as f64 - self.config.anchor_grid_index.y as f64;

        let global_px = delta_tile_x * self.config.tile_size_px
            + (px - self.config.anchor_pixel_offset.x);
        let global_py = delta_tile_y * self.config.tile_size_px
            + (py - self.config.anchor_pixel_offset.y);

        self.offset_mm_to_geo(Position::new(
            global_px * self.mm_per_pixel,
            global_py * self.mm_per_pixel,
        ))
    }

    /// Inverse of [`project`](Self::project). The returned in-tile offset lies
    /// in `[0, tile_size_px)`.
    pub fn unproject(&self, geo: LatLon) -> (GridIndex, Position) {
        let offset = self.geo_to_offset_mm(geo);
        let size = self.config.tile_size_px;
        let gx = offset.x / self.mm_per_pixel + self.config.anchor_pixel_offset.x;
        let gy = offset.y / self.mm_per_pixel + self.config.anchor_pixel_offset.y;

        let tx = (gx / size).floor();
        let ty = (gy / size).floor();
        let index = GridIndex::new(
            self.config.anchor_grid_index.x + tx as i64,
            self.config.anchor_grid_index.y + ty as i64,
        );
        (index, Position::new(gx - tx * size, gy - ty * size))
    }

    /// Geographic position of a millimeter offset from the anchor pixel.
    pub fn offset_mm_to_geo(&self, offset: Position) -> LatLon {
        let meters = rotate_sc(offset, self.sin, self.cos);
        let x_m = meters.x / MM_PER_M;
        let y_m = meters.y / MM_PER_M;

        LatLon {
            lat: self.config.anchor_geo.lat + y_m / METERS_PER_DEG_LAT,
            lon: self.config.anchor_geo.lon + x_m / self.meters_per_deg_lon,
        }
    }

    /// Millimeter offset from the anchor pixel of a geographic position.
    pub fn geo_to_offset_mm(&self, geo: LatLon) -> Position {
        let x_m = (geo.lon - self.config.anchor_geo.lon) * self.meters_per_deg_lon;
        let y_m = (geo.lat - self.config.anchor_geo.lat) * METERS_PER_DEG_LAT;
        unrotate_sc(
            Position::new(x_m * MM_PER_M, y_m * MM_PER_M),
            self.sin,
            self.cos,
        )
    }

    /// Geographic position of a world-space point (mm).
    pub fn world_to_geo(&self, world: Position) -> LatLon {
        self.offset_mm_to_geo(world - self.config.anchor_world)
    }

    pub fn geo_to_world(&self, geo: LatLon) -> Position {
        self.config.anchor_world + self.geo_to_offset_mm(geo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_config(rotation_deg: f64) -> ProjectorConfig {
        ProjectorConfig {
            anchor_geo: LatLon::new(31.1484138, -87.9835681),
            anchor_grid_index: GridIndex::new(4, 5),
            anchor_pixel_offset: Position::new(1104.0, 1309.0),
            tile_size_mm: 611_500.0,
            tile_size_px: 2048.0,
            rotation_deg,
            anchor_world: Position::ORIGIN,
            sprite_rotation_deg: 90.0,
        }
    }

    fn projector(rotation_deg: f64) -> GeoProjector {
        GeoProjector::new(flat_config(rotation_deg)).unwrap()
    }

    #[test]
    fn test_anchor_pixel_projects_to_anchor_geo_exactly() {
        let p = projector(0.0);
        let geo = p.project(4, 5, 1104.0, 1309.0);
        assert_eq!(geo, LatLon::new(31.1484138, -87.9835681));
    }

    #[test]
    fn test_rejects_zero_tile_size_px() {
        let mut cfg = flat_config(0.0);
        cfg.tile_size_px = 0.0;
        assert!(matches!(
            GeoProjector::new(cfg),
            Err(SceneError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_negative_tile_size_mm() {
        let mut cfg = flat_config(0.0);
        cfg.tile_size_mm = -1.0;
        assert!(matches!(
            GeoProjector::new(cfg),
            Err(SceneError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_polar_anchor() {
        let mut cfg = flat_config(0.0);
        cfg.anchor_geo = LatLon::new(90.0, 0.0);
        assert!(GeoProjector::new(cfg).is_err());
    }

    #[test]
    fn test_rotation_zero_moves_east_along_x() {
        let p = projector(0.0);
        let geo = p.project(4, 5, 1104.0 + 100.0, 1309.0);
        let expected_m = 100.0 * p.mm_per_pixel() / 1000.0;
        assert!((geo.lon - (-87.9835681 + expected_m / p.meters_per_deg_lon())).abs() < 1e-12);
        assert!((geo.lat - 31.1484138).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_90_moves_north_along_x() {
        let p = projector(90.0);
        let geo = p.project(4, 5, 1104.0 + 100.0, 1309.0);
        let expected_m = 100.0 * p.mm_per_pixel() / 1000.0;
        assert!((geo.lat - (31.1484138 + expected_m / METERS_PER_DEG_LAT)).abs() < 1e-12);
        assert!((geo.lon - (-87.9835681)).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_180_moves_west_along_x() {
        let p = projector(180.0);
        let geo = p.project(4, 5, 1104.0 + 100.0, 1309.0);
        assert!(geo.lon < -87.9835681);
        assert!((geo.lat - 31.1484138).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_270_one_tile_right_moves_south() {
        // One full tile to the right is 611.5 m; at 270 degrees that is due south.
        let p = projector(270.0);
        let geo = p.project(5, 5, 1104.0, 1309.0);
        let expected_lat = 31.1484138 - 611.5 / METERS_PER_DEG_LAT;
        assert!((geo.lat - expected_lat).abs() < 1e-10);
        assert!((geo.lon - (-87.9835681)).abs() < 1e-10);
    }

    #[test]
    fn test_unproject_inverts_project() {
        let p = projector(270.0);
        for &(tx, ty, px, py) in &[
            (4_i64, 5_i64, 1104.0, 1309.0),
            (3, 7, 12.5, 2000.25),
            (6, 2, 1024.0, 0.5),
        ] {
            let geo = p.project(tx, ty, px, py);
            let (index, pixel) = p.unproject(geo);
            assert_eq!(index, GridIndex::new(tx, ty));
            assert!((pixel.x - px).abs() < 1e-6, "px {} vs {}", pixel.x, px);
            assert!((pixel.y - py).abs() < 1e-6, "py {} vs {}", pixel.y, py);
        }
    }

    #[test]
    fn test_default_world_origin_is_survey_origin() {
        let p = GeoProjector::new(ProjectorConfig::default()).unwrap();
        let geo = p.world_to_geo(Position::ORIGIN);
        assert!((geo.lat - 31.1513758).abs() < 1e-6, "lat {}", geo.lat);
        assert!((geo.lon - (-88.0051681)).abs() < 1e-5, "lon {}", geo.lon);
    }

    #[test]
    fn test_rejects_non_finite_anchor_world() {
        let mut cfg = flat_config(0.0);
        cfg.anchor_world = Position::new(f64::NAN, 0.0);
        assert!(matches!(
            GeoProjector::new(cfg),
            Err(SceneError::Configuration(_))
        ));
    }

    #[test]
    fn test_project_extreme_tile_index_does_not_overflow() {
        let p = projector(270.0);
        let geo = p.project(i64::MIN, i64::MAX, 0.0, 0.0);
        assert!(geo.lat.is_finite());
        assert!(geo.lon.is_finite());
    }

    #[test]
    fn test_world_and_grid_paths_agree() {
        let mut cfg = flat_config(270.0);
        cfg.anchor_world = Position::new(50_000.0, -20_000.0);
        let p = GeoProjector::new(cfg).unwrap();

        // 300 px right and 40 px down of the anchor pixel, in both frames.
        let via_grid = p.project(4, 5, 1104.0 + 300.0, 1309.0 + 40.0);
        let offset = Position::new(300.0 * p.mm_per_pixel(), 40.0 * p.mm_per_pixel());
        let via_world = p.world_to_geo(Position::new(50_000.0, -20_000.0) + offset);
        assert!((via_grid.lat - via_world.lat).abs() < 1e-12);
        assert!((via_grid.lon - via_world.lon).abs() < 1e-12);

        let back = p.geo_to_world(via_world);
        assert!((back.x - (50_000.0 + offset.x)).abs() < 1e-3);
        assert!((back.y - (-20_000.0 + offset.y)).abs() < 1e-3);
    }
}
