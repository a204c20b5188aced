use crate::error::{Result, SceneError};
use crate::models::{BayRecord, Position};
use crate::render::BayView;
use crate::survey::{self, Footprint, RenderTransform, RotateCommand};

/// A movable equipment footprint placed from survey data.
///
/// `source` is the footprint the bay was built from and drives the live
/// transform. `record` is the persisted geometry, re-derived from the live
/// transform and its own previous extents after every drag or rotate.
#[derive(Debug, Clone)]
pub struct Bay {
    id: String,
    source: Footprint,
    record: Footprint,
    intrinsic_rotation_offset: f64,
    extrinsic_rotation: f64,
    placement_offset: Position,
    transform: RenderTransform,
}

impl Bay {
    pub fn from_record(rec: &BayRecord) -> Result<Self> {
        let source = Footprint::new(
            Position::new(rec.coord_x1, rec.coord_y1),
            Position::new(rec.coord_x2, rec.coord_y2),
        );
        let size = source.size();
        if !size.is_valid() {
            return Err(SceneError::DegenerateGeometry {
                entity: rec.bay.clone(),
                width: size.width,
                height: size.height,
            });
        }

        let intrinsic = rec.rotationoffset.unwrap_or(0.0);
        let extrinsic = rec.bayrotation.unwrap_or(0.0);
        let offset = Position::new(rec.offset_x.unwrap_or(0.0), rec.offset_y.unwrap_or(0.0));
        if !(intrinsic.is_finite() && extrinsic.is_finite() && offset.is_finite()) {
            return Err(SceneError::Configuration(format!(
                "bay {} has non-finite rotation or offset",
                rec.bay
            )));
        }

        Ok(Bay {
            id: rec.bay.clone(),
            source,
            record: source,
            intrinsic_rotation_offset: intrinsic,
            extrinsic_rotation: extrinsic,
            placement_offset: offset,
            transform: survey::place(&source, intrinsic, extrinsic, offset),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn transform(&self) -> &RenderTransform {
        &self.transform
    }

    pub fn footprint(&self) -> &Footprint {
        &self.record
    }

    pub fn placement_offset(&self) -> Position {
        self.placement_offset
    }

    pub fn extrinsic_rotation(&self) -> f64 {
        self.extrinsic_rotation
    }

    pub fn intrinsic_rotation_offset(&self) -> f64 {
        self.intrinsic_rotation_offset
    }

    fn replace(&mut self) {
        self.transform = survey::place(
            &self.source,
            self.intrinsic_rotation_offset,
            self.extrinsic_rotation,
            self.placement_offset,
        );
        self.record = survey::record_from_transform(&self.transform, &self.record);
    }

    /// Move by a render-space delta.
    pub fn drag(&mut self, dx: f64, dy: f64) {
        self.placement_offset = survey::drag_offset(self.placement_offset, dx, dy);
        self.replace();
    }

    /// Set the extrinsic rotation to an absolute angle in degrees.
    pub fn rotate_to(&mut self, degrees: f64) {
        self.extrinsic_rotation = degrees;
        self.replace();
    }

    pub fn rotate(&mut self, command: RotateCommand) {
        self.rotate_to(command.apply(self.extrinsic_rotation));
    }

    /// Current configuration record, in the same shape it was loaded from.
    pub fn to_record(&self) -> BayRecord {
        BayRecord {
            bay: self.id.clone(),
            coord_x1: self.record.corner1.x,
            coord_y1: self.record.corner1.y,
            coord_x2: self.record.corner2.x,
            coord_y2: self.record.corner2.y,
            rotationoffset: Some(self.intrinsic_rotation_offset),
            bayrotation: Some(self.extrinsic_rotation),
            offset_x: Some(self.placement_offset.x),
            offset_y: Some(self.placement_offset.y),
        }
    }

    pub fn view(&self) -> BayView {
        BayView {
            id: self.id.clone(),
            transform: self.transform,
            footprint: self.record,
            placement_offset: self.placement_offset,
            extrinsic_rotation: self.extrinsic_rotation,
            intrinsic_rotation_offset: self.intrinsic_rotation_offset,
            corners: self.transform.corners(),
        }
    }
}
