//! Survey (TWMS) footprint placement.
//!
//! Survey axes are rotated 90° and mirrored against render space. A footprint
//! is drawn as an unrotated rectangle at `corner1` inside a frame; the frame is
//! rotated by `AXIS_CORRECTION_DEG + extrinsic` and translated by the
//! axis-swapped placement offset `(offset.y, -offset.x)`.

use serde::{Deserialize, Serialize};

use crate::calc::{normalize_degrees, rotate, rotate_sc, unrotate_sc};
use crate::models::{Position, Size};

/// Fixed remap between survey and render axes.
pub const AXIS_CORRECTION_DEG: f64 = 270.0;

/// Two opposite corners in survey units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Footprint {
    pub corner1: Position,
    pub corner2: Position,
}

impl Footprint {
    pub fn new(corner1: Position, corner2: Position) -> Self {
        Footprint { corner1, corner2 }
    }

    pub fn width(&self) -> f64 {
        (self.corner2.x - self.corner1.x).abs()
    }

    pub fn height(&self) -> f64 {
        (self.corner2.y - self.corner1.y).abs()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }
}

/// Live placement of a footprint in render/world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderTransform {
    pub frame_position: Position,
    pub frame_rotation_deg: f64,
    /// Rectangle origin inside the frame (the footprint's `corner1`).
    pub rect_origin: Position,
    pub rect_size: Size,
    /// Carried for display; the axis correction already accounts for it.
    pub intrinsic_rotation_deg: f64,
}

impl RenderTransform {
    /// World position of a point given in rectangle-local coordinates.
    pub fn local_to_world(&self, local: Position) -> Position {
        self.frame_position + rotate(self.rect_origin + local, self.frame_rotation_deg)
    }

    /// Rectangle-local coordinates of a world point.
    pub fn world_to_local(&self, world: Position) -> Position {
        let (sin, cos) = self.frame_rotation_deg.to_radians().sin_cos();
        unrotate_sc(world - self.frame_position, sin, cos) - self.rect_origin
    }

    /// Rectangle corners in world space, clockwise from the origin corner.
    pub fn corners(&self) -> [Position; 4] {
        let (sin, cos) = self.frame_rotation_deg.to_radians().sin_cos();
        let Size { width, height } = self.rect_size;
        [
            Position::new(0.0, 0.0),
            Position::new(width, 0.0),
            Position::new(width, height),
            Position::new(0.0, height),
        ]
        .map(|p| self.frame_position + rotate_sc(self.rect_origin + p, sin, cos))
    }

    pub fn contains_world(&self, world: Position) -> bool {
        let local = self.world_to_local(world);
        (0.0..=self.rect_size.width).contains(&local.x)
            && (0.0..=self.rect_size.height).contains(&local.y)
    }
}

/// Render-space translation for a survey placement offset.
pub fn frame_position(offset: Position) -> Position {
    Position::new(offset.y, -offset.x)
}

/// Forward placement of a footprint.
pub fn place(
    footprint: &Footprint,
    intrinsic_rotation_offset: f64,
    extrinsic_rotation: f64,
    placement_offset: Position,
) -> RenderTransform {
    RenderTransform {
        frame_position: frame_position(placement_offset),
        frame_rotation_deg: normalize_degrees(AXIS_CORRECTION_DEG + extrinsic_rotation),
        rect_origin: footprint.corner1,
        rect_size: footprint.size(),
        intrinsic_rotation_deg: intrinsic_rotation_offset,
    }
}

/// Accumulate a render-space drag into a survey placement offset. Exactly
/// inverts the axis remap of [`frame_position`].
pub fn drag_offset(offset: Position, dx: f64, dy: f64) -> Position {
    Position::new(offset.x - dy, offset.y + dx)
}

/// Re-derive a footprint record from a live transform.
///
/// `corner1` becomes the frame position and `corner2` is projected along the
/// frame rotation using the extents of `previous`, the record as it stood
/// before the edit. This is not the inverse of [`place`] once the frame is
/// rotated, and the error compounds across edits; stored bay configurations
/// depend on this exact derivation.
pub fn record_from_transform(transform: &RenderTransform, previous: &Footprint) -> Footprint {
    let (sin, cos) = transform.frame_rotation_deg.to_radians().sin_cos();
    let corner1 = transform.frame_position;
    let corner2 = Position::new(
        corner1.x + previous.width() * cos,
        corner1.y + previous.height() * sin,
    );
    Footprint { corner1, corner2 }
}

/// Relative rotation steps offered on a bay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotateCommand {
    Left,
    Right,
    Step,
    Reset,
}

impl RotateCommand {
    /// Absolute extrinsic rotation after applying the command to `current`.
    pub fn apply(self, current: f64) -> f64 {
        match self {
            RotateCommand::Left => current - 1.0,
            RotateCommand::Right => current + 1.0,
            RotateCommand::Step => current + 15.0,
            RotateCommand::Reset => 0.0,
        }
    }
}
