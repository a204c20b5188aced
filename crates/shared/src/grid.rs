//! Tile-grid addressing and chunk sizing.
//!
//! A chunk is the edge length (mm) of one anchor tile. It halves with every
//! zoom level above `base_zoom_level` and doubles with every level below.
//! Grid-addressed tiles store integer indices only; their millimeter offsets
//! are recomputed from those indices on every rebuild.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::models::{GridIndex, Position};

pub const DEFAULT_BASE_CHUNK_SIZE_MM: f64 = 261_659.0;
pub const DEFAULT_BASE_ZOOM_LEVEL: i32 = 17;
pub const DEFAULT_ZOOM_LEVEL: i32 = 19;

// Keeps 2^(base - level) well inside the normal f64 range.
const MAX_ZOOM_SPAN: u32 = 64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ZoomConfig {
    pub base_chunk_size_mm: f64,
    pub base_zoom_level: i32,
    pub initial_zoom_level: i32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        ZoomConfig {
            base_chunk_size_mm: DEFAULT_BASE_CHUNK_SIZE_MM,
            base_zoom_level: DEFAULT_BASE_ZOOM_LEVEL,
            initial_zoom_level: DEFAULT_ZOOM_LEVEL,
        }
    }
}

/// Chunk edge length for `level`.
pub fn chunk_size_for(base_chunk_size_mm: f64, base_zoom_level: i32, level: i32) -> f64 {
    base_chunk_size_mm * 2f64.powi(base_zoom_level - level)
}

#[derive(Debug, Clone)]
pub struct ZoomRescaler {
    config: ZoomConfig,
    level: i32,
    chunk_size: f64,
}

impl ZoomRescaler {
    pub fn new(config: ZoomConfig) -> Result<Self> {
        if !(config.base_chunk_size_mm.is_finite() && config.base_chunk_size_mm > 0.0) {
            return Err(SceneError::Configuration(format!(
                "base_chunk_size_mm must be positive, got {}",
                config.base_chunk_size_mm
            )));
        }
        let mut rescaler = ZoomRescaler {
            level: config.base_zoom_level,
            chunk_size: config.base_chunk_size_mm,
            config,
        };
        rescaler.set_zoom_level(rescaler.config.initial_zoom_level)?;
        Ok(rescaler)
    }

    pub fn level(&self) -> i32 {
        self.level
    }

    pub fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    pub fn config(&self) -> &ZoomConfig {
        &self.config
    }

    /// Switch to `level` and return the new chunk size. The caller owns the
    /// rebuild of everything derived from the chunk size.
    pub fn set_zoom_level(&mut self, level: i32) -> Result<f64> {
        if level.abs_diff(self.config.base_zoom_level) > MAX_ZOOM_SPAN {
            return Err(SceneError::Configuration(format!(
                "zoom level {level} is too far from base level {}",
                self.config.base_zoom_level
            )));
        }
        self.level = level;
        self.chunk_size = chunk_size_for(
            self.config.base_chunk_size_mm,
            self.config.base_zoom_level,
            level,
        );
        Ok(self.chunk_size)
    }
}

/// How a tile is addressed inside its anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TilePlacement {
    /// Fixed millimeter offset from the anchor origin; unaffected by zoom.
    Offset(Position),
    /// Grid cell, scaled by the current chunk size.
    Grid(GridIndex),
}

impl TilePlacement {
    /// Offset from the anchor origin (mm). Grid cells are measured from
    /// `center`, which sits at the origin.
    pub fn local_offset(&self, chunk_size: f64, center: GridIndex) -> Position {
        match self {
            TilePlacement::Offset(p) => *p,
            TilePlacement::Grid(cell) => Position::new(
                (cell.x as f64 - center.x as f64) * chunk_size,
                (cell.y as f64 - center.y as f64) * chunk_size,
            ),
        }
    }
}
