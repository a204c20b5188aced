use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::geo::{GeoProjector, ProjectorConfig};
use crate::grid::{ZoomConfig, ZoomRescaler};

pub const DEFAULT_TILE_ASSET_ROOT: &str = "/tiles/stitched/";

/// Scene-wide settings, fixed for the life of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
    pub projector: ProjectorConfig,
    pub zoom: ZoomConfig,
    /// Prefix prepended to every survey image path.
    pub tile_asset_root: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        SceneConfig {
            projector: ProjectorConfig::default(),
            zoom: ZoomConfig::default(),
            tile_asset_root: DEFAULT_TILE_ASSET_ROOT.to_string(),
        }
    }
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(json)
            .map_err(|e| SceneError::Configuration(format!("failed to parse scene config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        GeoProjector::new(self.projector.clone())?;
        ZoomRescaler::new(self.zoom.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Position;

    #[test]
    fn test_empty_object_uses_defaults() {
        let cfg = SceneConfig::from_json("{}").unwrap();
        assert_eq!(cfg, SceneConfig::default());
        assert_eq!(cfg.zoom.base_chunk_size_mm, 261_659.0);
        assert_eq!(cfg.zoom.base_zoom_level, 17);
        assert_eq!(cfg.projector.tile_size_px, 2048.0);
    }

    #[test]
    fn test_partial_override() {
        let cfg = SceneConfig::from_json(
            r#"{"projector":{"rotation_deg":0,"anchor_world":{"x":1,"y":2}},"zoom":{"initial_zoom_level":17}}"#,
        )
        .unwrap();
        assert_eq!(cfg.projector.rotation_deg, 0.0);
        assert_eq!(cfg.projector.tile_size_mm, 611_500.0);
        assert_eq!(cfg.projector.anchor_world, Position::new(1.0, 2.0));
        assert_eq!(cfg.zoom.initial_zoom_level, 17);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = SceneConfig::from_json(r#"{"chunkSize": 5}"#).unwrap_err();
        assert!(matches!(err, SceneError::Configuration(_)));
    }

    #[test]
    fn test_invalid_tile_size_rejected() {
        let err = SceneConfig::from_json(r#"{"projector":{"tile_size_px":0}}"#).unwrap_err();
        assert!(err.to_string().contains("tile_size_px"));
    }
}
