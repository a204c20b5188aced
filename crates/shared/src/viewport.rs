use serde::{Deserialize, Serialize};

use crate::models::Position;

pub const MIN_SCALE: f64 = 0.0001;
pub const MAX_SCALE: f64 = 5.0;

/// Per-notch wheel factors: scrolling down zooms out.
pub const ZOOM_OUT_FACTOR: f64 = 0.9;
pub const ZOOM_IN_FACTOR: f64 = 1.1;

/// Screen placement of world space: `screen = world * scale + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Position,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            pan: Position::ORIGIN,
            scale: 0.002,
        }
    }
}

impl Viewport {
    pub fn new(pan: Position, scale: f64) -> Self {
        Viewport {
            pan,
            scale: scale.clamp(MIN_SCALE, MAX_SCALE),
        }
    }

    /// Center world `origin` in a `width` x `height` screen.
    pub fn centered(width: f64, height: f64, scale: f64) -> Self {
        Viewport::new(Position::new(width / 2.0, height / 2.0), scale)
    }

    pub fn screen_to_world(&self, screen: Position) -> Position {
        Position::new(
            (screen.x - self.pan.x) / self.scale,
            (screen.y - self.pan.y) / self.scale,
        )
    }

    pub fn world_to_screen(&self, world: Position) -> Position {
        Position::new(
            world.x * self.scale + self.pan.x,
            world.y * self.scale + self.pan.y,
        )
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan = self.pan + Position::new(dx, dy);
    }

    /// Rescale by `factor`, keeping the world point under `cursor` fixed.
    pub fn zoom_at(&mut self, cursor: Position, factor: f64) {
        let world = self.screen_to_world(cursor);
        self.scale = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        self.pan = Position::new(
            cursor.x - world.x * self.scale,
            cursor.y - world.y * self.scale,
        );
    }

    /// Apply one wheel event with vertical delta `delta_y`.
    pub fn wheel(&mut self, cursor: Position, delta_y: f64) {
        let factor = if delta_y > 0.0 {
            ZOOM_OUT_FACTOR
        } else {
            ZOOM_IN_FACTOR
        };
        self.zoom_at(cursor, factor);
    }
}
