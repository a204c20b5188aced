use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, Layout, PlacedTile};
use crate::bay::Bay;
use crate::config::SceneConfig;
use crate::error::{EntityKind, Result, SceneError};
use crate::geo::GeoProjector;
use crate::grid::ZoomRescaler;
use crate::models::{AnchorRecord, BayRecord, LatLon, Position, SurfaceRecord};
use crate::render::{click_report, RenderSurface};
use crate::survey::RotateCommand;
use crate::tile::{AssetRequest, GeoTile, ImageInfo, TileId};
use crate::viewport::Viewport;

/// Handle to one addressable entity, passed explicitly by the input
/// collaborator to whatever command it dispatches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EntityRef {
    AnchorTile { anchor: String, index: usize },
    GeoTile { id: TileId },
    Bay { id: String },
}

/// Outcome of a pointer click.
#[derive(Debug, Clone, PartialEq)]
pub struct Click {
    pub world: Position,
    pub entity: Option<EntityRef>,
    pub geo: LatLon,
}

/// Owner of every anchor, survey tile and bay, plus the derived tile layout.
///
/// The layout is rebuilt whole after every mutation that can move a tile and
/// swapped in as a new `Arc`, so a reader holding an older layout keeps a
/// complete, consistent snapshot.
#[derive(Debug)]
pub struct Scene {
    config: SceneConfig,
    projector: GeoProjector,
    zoom: ZoomRescaler,
    anchors: Vec<Anchor>,
    layout: Arc<Layout>,
    geo_tiles: Vec<GeoTile>,
    bays: Vec<Bay>,
    next_tile_id: u64,
    next_ticket: u64,
}

impl Scene {
    pub fn new(config: SceneConfig) -> Result<Self> {
        let projector = GeoProjector::new(config.projector.clone())?;
        let zoom = ZoomRescaler::new(config.zoom.clone())?;
        let layout = Arc::new(Layout::build(&[], zoom.level(), zoom.chunk_size()));
        Ok(Scene {
            config,
            projector,
            zoom,
            anchors: Vec::new(),
            layout,
            geo_tiles: Vec::new(),
            bays: Vec::new(),
            next_tile_id: 1,
            next_ticket: 1,
        })
    }

    /// Build a scene from parsed input records. Any invalid record fails the
    /// whole build.
    pub fn from_inputs(
        config: SceneConfig,
        anchors: &[AnchorRecord],
        surfaces: &[SurfaceRecord],
        bays: &[BayRecord],
    ) -> Result<Self> {
        let mut scene = Scene::new(config)?;
        for rec in anchors {
            scene.insert_anchor(Anchor::from_record(rec))?;
        }
        for rec in surfaces {
            scene.add_geo_tile(rec)?;
        }
        for rec in bays {
            scene.add_bay(rec)?;
        }
        scene.rebuild();
        tracing::info!(
            anchors = scene.anchors.len(),
            surfaces = scene.geo_tiles.len(),
            bays = scene.bays.len(),
            zoom = scene.zoom.level(),
            "Scene built"
        );
        Ok(scene)
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn projector(&self) -> &GeoProjector {
        &self.projector
    }

    pub fn zoom_level(&self) -> i32 {
        self.zoom.level()
    }

    pub fn chunk_size(&self) -> f64 {
        self.zoom.chunk_size()
    }

    /// Current derived tile layout.
    pub fn layout(&self) -> Arc<Layout> {
        Arc::clone(&self.layout)
    }

    fn rebuild(&mut self) {
        self.layout = Arc::new(Layout::build(
            &self.anchors,
            self.zoom.level(),
            self.zoom.chunk_size(),
        ));
        tracing::debug!(
            anchors = self.anchors.len(),
            chunk_size = self.zoom.chunk_size(),
            "Rebuilt tile layout"
        );
    }

    // Anchors

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn anchor(&self, id: &str) -> Result<&Anchor> {
        self.anchors
            .iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::Anchor, id))
    }

    fn anchor_mut(&mut self, id: &str) -> Result<&mut Anchor> {
        self.anchors
            .iter_mut()
            .find(|a| a.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::Anchor, id))
    }

    fn insert_anchor(&mut self, anchor: Anchor) -> Result<()> {
        if self.anchors.iter().any(|a| a.id() == anchor.id()) {
            return Err(SceneError::Configuration(format!(
                "duplicate anchor id {}",
                anchor.id()
            )));
        }
        self.anchors.push(anchor);
        Ok(())
    }

    pub fn add_anchor(&mut self, id: &str, origin: Position) -> Result<()> {
        self.insert_anchor(Anchor::new(id, origin))?;
        self.rebuild();
        Ok(())
    }

    /// Append a tile to an anchor; returns its index within the anchor.
    pub fn add_tile_to_anchor(&mut self, anchor_id: &str, tile: PlacedTile) -> Result<usize> {
        let index = self.anchor_mut(anchor_id)?.add_tile(tile);
        self.rebuild();
        Ok(index)
    }

    pub fn set_anchor_origin(&mut self, anchor_id: &str, origin: Position) -> Result<()> {
        if !origin.is_finite() {
            return Err(SceneError::Configuration(format!(
                "anchor {anchor_id} origin must be finite"
            )));
        }
        self.anchor_mut(anchor_id)?.set_origin(origin);
        self.rebuild();
        Ok(())
    }

    /// Change the zoom level and rebuild every anchor's tiles at the new
    /// chunk size. Returns the chunk size.
    pub fn set_zoom_level(&mut self, level: i32) -> Result<f64> {
        let chunk = self.zoom.set_zoom_level(level)?;
        tracing::debug!(level, chunk_size = chunk, "Zoom level changed");
        self.rebuild();
        Ok(chunk)
    }

    // Survey tiles

    pub fn geo_tiles(&self) -> &[GeoTile] {
        &self.geo_tiles
    }

    pub fn geo_tile(&self, id: TileId) -> Result<&GeoTile> {
        self.geo_tiles
            .iter()
            .find(|t| t.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::GeoTile, id.to_string()))
    }

    pub fn add_geo_tile(&mut self, rec: &SurfaceRecord) -> Result<TileId> {
        let id = TileId(self.next_tile_id);
        let tile = GeoTile::from_record(id, rec, self.next_ticket)?;
        self.next_tile_id += 1;
        self.next_ticket += 1;
        self.geo_tiles.push(tile);
        Ok(id)
    }

    pub fn remove_geo_tile(&mut self, id: TileId) -> Result<()> {
        let pos = self
            .geo_tiles
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::GeoTile, id.to_string()))?;
        self.geo_tiles.remove(pos);
        Ok(())
    }

    /// Image loads still outstanding, one per pending tile.
    pub fn pending_asset_requests(&self) -> Vec<AssetRequest> {
        self.geo_tiles
            .iter()
            .filter_map(|t| t.asset_request(&self.config.tile_asset_root))
            .collect()
    }

    /// Apply a finished image load. A completion for a tile that no longer
    /// exists, or for a superseded ticket, is dropped and returns false.
    pub fn complete_asset(
        &mut self,
        tile: TileId,
        ticket: u64,
        result: std::result::Result<ImageInfo, String>,
    ) -> bool {
        match self.geo_tiles.iter_mut().find(|t| t.id() == tile) {
            Some(t) => {
                let applied = t.complete_asset(ticket, result);
                if !applied {
                    tracing::debug!(%tile, ticket, "Ignoring stale asset completion");
                }
                applied
            }
            None => {
                tracing::debug!(%tile, ticket, "Asset completed for removed tile");
                false
            }
        }
    }

    // Bays

    pub fn bays(&self) -> &[Bay] {
        &self.bays
    }

    pub fn bay(&self, id: &str) -> Result<&Bay> {
        self.bays
            .iter()
            .find(|b| b.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::Bay, id))
    }

    fn bay_mut(&mut self, id: &str) -> Result<&mut Bay> {
        self.bays
            .iter_mut()
            .find(|b| b.id() == id)
            .ok_or_else(|| SceneError::unknown(EntityKind::Bay, id))
    }

    pub fn add_bay(&mut self, rec: &BayRecord) -> Result<()> {
        if self.bays.iter().any(|b| b.id() == rec.bay) {
            return Err(SceneError::Configuration(format!(
                "duplicate bay id {}",
                rec.bay
            )));
        }
        self.bays.push(Bay::from_record(rec)?);
        Ok(())
    }

    pub fn drag_bay(&mut self, id: &str, dx: f64, dy: f64) -> Result<&Bay> {
        let bay = self.bay_mut(id)?;
        bay.drag(dx, dy);
        Ok(bay)
    }

    pub fn rotate_bay(&mut self, id: &str, command: RotateCommand) -> Result<&Bay> {
        let bay = self.bay_mut(id)?;
        bay.rotate(command);
        Ok(bay)
    }

    pub fn rotate_bay_to(&mut self, id: &str, degrees: f64) -> Result<&Bay> {
        let bay = self.bay_mut(id)?;
        bay.rotate_to(degrees);
        Ok(bay)
    }

    /// Bay configuration as it stands after all edits.
    pub fn bay_records(&self) -> Vec<BayRecord> {
        self.bays.iter().map(Bay::to_record).collect()
    }

    // Geographic queries

    pub fn project(&self, tile_x: i64, tile_y: i64, px: f64, py: f64) -> LatLon {
        self.projector.project(tile_x, tile_y, px, py)
    }

    pub fn resolve_world(&self, world: Position) -> LatLon {
        self.projector.world_to_geo(world)
    }

    /// Geographic position of a point local to `entity`: image pixels for
    /// survey tiles, millimeters for anchor tiles and bays.
    pub fn resolve(&self, entity: &EntityRef, x: f64, y: f64) -> Result<LatLon> {
        match entity {
            EntityRef::GeoTile { id } => Ok(self.geo_tile(*id)?.resolve(x, y, &self.projector)),
            EntityRef::Bay { id } => {
                let world = self.bay(id)?.transform().local_to_world(Position::new(x, y));
                Ok(self.resolve_world(world))
            }
            EntityRef::AnchorTile { anchor, index } => {
                let tile = self.layout.tile(anchor, *index).ok_or_else(|| {
                    match self.anchor(anchor) {
                        Ok(_) => SceneError::unknown(EntityKind::Tile, format!("{anchor}#{index}")),
                        Err(e) => e,
                    }
                })?;
                Ok(self.resolve_world(tile.global_position + Position::new(x, y)))
            }
        }
    }

    /// Topmost entity under a world point: bays, then survey tiles, then
    /// anchor tiles, later entries above earlier ones.
    pub fn pick(&self, world: Position) -> Option<EntityRef> {
        if let Some(bay) = self
            .bays
            .iter()
            .rev()
            .find(|b| b.transform().contains_world(world))
        {
            return Some(EntityRef::Bay {
                id: bay.id().to_string(),
            });
        }
        if let Some(tile) = self
            .geo_tiles
            .iter()
            .rev()
            .find(|t| t.contains_world(world, &self.projector))
        {
            return Some(EntityRef::GeoTile { id: tile.id() });
        }
        self.layout
            .anchors
            .iter()
            .rev()
            .flat_map(|a| a.tiles.iter().rev())
            .find(|t| {
                let local = world - t.global_position;
                (0.0..=t.size.width).contains(&local.x) && (0.0..=t.size.height).contains(&local.y)
            })
            .map(|t| EntityRef::AnchorTile {
                anchor: t.anchor_id.clone(),
                index: t.index,
            })
    }

    pub fn click(&self, viewport: &Viewport, screen: Position) -> Click {
        let world = viewport.screen_to_world(screen);
        Click {
            world,
            entity: self.pick(world),
            geo: self.resolve_world(world),
        }
    }

    /// Debug-overlay text for a click on a bay or survey tile.
    pub fn describe(&self, click: &Click) -> Option<String> {
        match click.entity.as_ref()? {
            EntityRef::Bay { id } => {
                let bay = self.bay(id).ok()?;
                let local = bay.transform().world_to_local(click.world);
                Some(click_report(&bay.view(), local, Some(click.geo)))
            }
            EntityRef::GeoTile { id } => {
                let tile = self.geo_tile(*id).ok()?;
                let view = tile.view(self.config.projector.sprite_rotation_deg);
                let local = tile.world_to_pixel(click.world, &self.projector);
                Some(click_report(&view, local, Some(click.geo)))
            }
            EntityRef::AnchorTile { .. } => None,
        }
    }

    /// Hand one complete snapshot to a drawing collaborator.
    pub fn render<S: RenderSurface>(&self, surface: &mut S) {
        let layout = self.layout();
        let sprite_rotation = self.config.projector.sprite_rotation_deg;
        surface.clear();
        for anchor in &layout.anchors {
            surface.draw_anchor(&anchor.anchor);
            for tile in &anchor.tiles {
                surface.draw_tile(tile);
            }
        }
        for tile in &self.geo_tiles {
            surface.draw_geo_tile(&tile.view(sprite_rotation));
        }
        for bay in &self.bays {
            surface.draw_bay(&bay.view());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::TilePlacement;
    use crate::models::GridIndex;
    use crate::render::{AnchorView, BayView, GeoTileFill, GeoTileView, TileView};
    use crate::tile::AssetState;

    fn offset(x: f64, y: f64, label: &str) -> PlacedTile {
        PlacedTile::new(
            TilePlacement::Offset(Position::new(x, y)),
            Some(label.to_string()),
            serde_json::Value::Null,
        )
    }

    fn world_config() -> SceneConfig {
        let mut config = SceneConfig::default();
        config.projector.anchor_world = Position::ORIGIN;
        config.projector.rotation_deg = 0.0;
        config
    }

    fn bay_record(id: &str) -> BayRecord {
        BayRecord {
            bay: id.to_string(),
            coord_x1: 0.0,
            coord_y1: 0.0,
            coord_x2: 2400.0,
            coord_y2: 1200.0,
            rotationoffset: None,
            bayrotation: None,
            offset_x: None,
            offset_y: None,
        }
    }

    fn surface(name: &str, file: Option<&str>) -> SurfaceRecord {
        SurfaceRecord {
            name: name.to_string(),
            file: file.map(str::to_string),
            x: 0,
            y: 0,
            dimension_x: 1000,
            dimension_y: 1000,
            tile_x: None,
            tile_y: None,
        }
    }

    fn scene_with_bay_a() -> Scene {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        scene.add_anchor("Bay-A", Position::new(1000.0, 1000.0)).unwrap();
        scene.add_tile_to_anchor("Bay-A", offset(0.0, 0.0, "T-01")).unwrap();
        scene.add_tile_to_anchor("Bay-A", offset(500.0, 500.0, "T-02")).unwrap();
        scene
    }

    #[test]
    fn test_end_to_end_anchor_tiles_across_zoom() {
        let mut scene = scene_with_bay_a();
        assert_eq!(scene.zoom_level(), 19);
        let layout = scene.layout();
        let t1 = layout.tile("Bay-A", 0).unwrap();
        let t2 = layout.tile("Bay-A", 1).unwrap();
        assert_eq!(t1.global_position, Position::new(1000.0, 1000.0));
        assert_eq!(t2.global_position, Position::new(1500.0, 1500.0));
        assert_eq!(t1.size.width, 261_659.0 / 4.0);

        assert_eq!(scene.set_zoom_level(17).unwrap(), 261_659.0);
        let layout = scene.layout();
        let t1 = layout.tile("Bay-A", 0).unwrap();
        let t2 = layout.tile("Bay-A", 1).unwrap();
        assert_eq!(t1.local_offset, Position::new(0.0, 0.0));
        assert_eq!(t2.local_offset, Position::new(500.0, 500.0));
        assert_eq!(t2.global_position, Position::new(1500.0, 1500.0));
        assert_eq!(t1.size.width, 261_659.0);
    }

    #[test]
    fn test_unknown_anchor_is_reported() {
        let mut scene = scene_with_bay_a();
        let err = scene
            .add_tile_to_anchor("Bay-Z", offset(0.0, 0.0, "T"))
            .unwrap_err();
        assert_eq!(
            err,
            SceneError::UnknownReference {
                kind: EntityKind::Anchor,
                id: "Bay-Z".to_string()
            }
        );
        assert!(scene.set_anchor_origin("Bay-Z", Position::ORIGIN).is_err());
    }

    #[test]
    fn test_duplicate_anchor_rejected() {
        let mut scene = scene_with_bay_a();
        assert!(scene.add_anchor("Bay-A", Position::ORIGIN).is_err());
        assert_eq!(scene.anchors().len(), 1);
    }

    #[test]
    fn test_origin_change_does_not_touch_other_anchors() {
        let mut scene = scene_with_bay_a();
        scene.add_anchor("Bay-B", Position::new(-5000.0, 0.0)).unwrap();
        scene.add_tile_to_anchor("Bay-B", offset(10.0, 20.0, "U-01")).unwrap();

        let before = scene.layout();
        scene.set_anchor_origin("Bay-B", Position::new(9000.0, 9000.0)).unwrap();
        let after = scene.layout();

        assert_eq!(before.anchor("Bay-A"), after.anchor("Bay-A"));
        assert_eq!(
            after.tile("Bay-B", 0).unwrap().global_position,
            Position::new(9010.0, 9020.0)
        );
    }

    #[test]
    fn test_old_snapshot_survives_rebuild() {
        let mut scene = scene_with_bay_a();
        let old = scene.layout();
        scene.set_anchor_origin("Bay-A", Position::ORIGIN).unwrap();
        assert_eq!(
            old.tile("Bay-A", 1).unwrap().global_position,
            Position::new(1500.0, 1500.0)
        );
        assert_eq!(
            scene.layout().tile("Bay-A", 1).unwrap().global_position,
            Position::new(500.0, 500.0)
        );
    }

    #[test]
    fn test_grid_tiles_follow_zoom_without_drift() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        scene.add_anchor("G", Position::ORIGIN).unwrap();
        scene
            .add_tile_to_anchor(
                "G",
                PlacedTile::new(
                    TilePlacement::Grid(GridIndex::new(3, 1)),
                    None,
                    serde_json::Value::Null,
                ),
            )
            .unwrap();
        let start = scene.layout().tile("G", 0).unwrap().global_position;
        for level in [18, 22, 5, 17, 19] {
            scene.set_zoom_level(level).unwrap();
        }
        assert_eq!(scene.layout().tile("G", 0).unwrap().global_position, start);
        assert_eq!(start, Position::new(3.0 * 65_414.75, 65_414.75));
    }

    #[test]
    fn test_bay_edits_by_id() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        scene.add_bay(&bay_record("B-1")).unwrap();
        scene.drag_bay("B-1", 10.0, 20.0).unwrap();
        let bay = scene.rotate_bay("B-1", RotateCommand::Step).unwrap();
        assert_eq!(bay.extrinsic_rotation(), 15.0);
        assert_eq!(bay.placement_offset(), Position::new(-20.0, 10.0));

        let records = scene.bay_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].bayrotation, Some(15.0));
        assert_eq!(records[0].coord_x1, 10.0);
        assert_eq!(records[0].coord_y1, 20.0);

        assert!(matches!(
            scene.drag_bay("nope", 1.0, 1.0),
            Err(SceneError::UnknownReference { kind: EntityKind::Bay, .. })
        ));
    }

    #[test]
    fn test_degenerate_bay_fails_input_build() {
        let mut rec = bay_record("B-0");
        rec.coord_x2 = 0.0;
        rec.coord_y2 = 0.0;
        let err = Scene::from_inputs(SceneConfig::default(), &[], &[], &[rec]).unwrap_err();
        assert!(matches!(err, SceneError::DegenerateGeometry { .. }));
    }

    #[test]
    fn test_asset_lifecycle() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let a = scene.add_geo_tile(&surface("S-1", Some("z19\\1.png"))).unwrap();
        let b = scene.add_geo_tile(&surface("S-2", Some("2.png"))).unwrap();
        scene.add_geo_tile(&surface("S-3", None)).unwrap();

        let requests = scene.pending_asset_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, "/tiles/stitched/z19/1.png");

        let info = ImageInfo {
            path: requests[0].path.clone(),
            bytes: 10,
        };
        assert!(scene.complete_asset(a, requests[0].ticket, Ok(info)));
        assert!(matches!(scene.geo_tile(a).unwrap().asset(), AssetState::Ready(_)));

        scene.remove_geo_tile(b).unwrap();
        assert!(!scene.complete_asset(b, requests[1].ticket, Err("late".to_string())));
        assert!(scene.pending_asset_requests().is_empty());
    }

    #[test]
    fn test_failed_asset_becomes_placeholder() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let id = scene.add_geo_tile(&surface("S-1", Some("1.png"))).unwrap();
        let req = scene.pending_asset_requests().remove(0);
        assert!(scene.complete_asset(id, req.ticket, Err("404".to_string())));
        assert_eq!(scene.geo_tile(id).unwrap().asset(), &AssetState::Placeholder);
    }

    #[test]
    fn test_resolve_anchor_tile_and_bay() {
        let mut scene = Scene::new(world_config()).unwrap();
        scene.add_anchor("A", Position::new(1000.0, 0.0)).unwrap();
        scene.add_tile_to_anchor("A", offset(0.0, 0.0, "T")).unwrap();

        let via_tile = scene
            .resolve(
                &EntityRef::AnchorTile {
                    anchor: "A".to_string(),
                    index: 0,
                },
                500.0,
                0.0,
            )
            .unwrap();
        let direct = scene.resolve_world(Position::new(1500.0, 0.0));
        assert_eq!(via_tile, direct);
        assert!(via_tile.lon > scene.config().projector.anchor_geo.lon);

        scene.add_bay(&bay_record("B")).unwrap();
        let bay_geo = scene
            .resolve(&EntityRef::Bay { id: "B".to_string() }, 0.0, 0.0)
            .unwrap();
        assert_eq!(bay_geo, scene.config().projector.anchor_geo);
    }

    #[test]
    fn test_resolve_unknown_tile_index() {
        let scene = scene_with_bay_a();
        let err = scene
            .resolve(
                &EntityRef::AnchorTile {
                    anchor: "Bay-A".to_string(),
                    index: 9,
                },
                0.0,
                0.0,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SceneError::UnknownReference { kind: EntityKind::Tile, .. }
        ));
    }

    #[test]
    fn test_pick_prefers_bays() {
        let mut scene = Scene::new(world_config()).unwrap();
        scene.add_geo_tile(&surface("S-1", None)).unwrap();
        // Bay at 270° spans world x in [0, 1200], y in [-2400, 0].
        scene.add_bay(&bay_record("B")).unwrap();

        assert_eq!(
            scene.pick(Position::new(100.0, -100.0)),
            Some(EntityRef::Bay { id: "B".to_string() })
        );
        assert_eq!(
            scene.pick(Position::new(100.0, 100.0)),
            Some(EntityRef::GeoTile { id: TileId(1) })
        );
        assert_eq!(scene.pick(Position::new(-50.0, 5000.0)), None);
    }

    #[test]
    fn test_click_through_viewport() {
        let mut scene = Scene::new(world_config()).unwrap();
        scene.add_geo_tile(&surface("S-1", None)).unwrap();
        let viewport = Viewport::new(Position::new(100.0, 100.0), 0.5);
        let click = scene.click(&viewport, Position::new(150.0, 150.0));
        assert_eq!(click.world, Position::new(100.0, 100.0));
        assert_eq!(click.entity, Some(EntityRef::GeoTile { id: TileId(1) }));
        assert_eq!(click.geo, scene.resolve_world(click.world));
    }

    #[test]
    fn test_default_config_resolves_world_points() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        scene.add_bay(&bay_record("B")).unwrap();

        let bay_geo = scene
            .resolve(&EntityRef::Bay { id: "B".to_string() }, 0.0, 0.0)
            .unwrap();
        assert!((bay_geo.lat - 31.1513758).abs() < 1e-6);
        assert!((bay_geo.lon - (-88.0051681)).abs() < 1e-5);

        let viewport = Viewport::new(Position::ORIGIN, 1.0);
        let click = scene.click(&viewport, Position::new(100.0, -100.0));
        assert_eq!(click.entity, Some(EntityRef::Bay { id: "B".to_string() }));
        assert!(scene.describe(&click).unwrap().contains("GPS:\n  Lat: 31.15"));
    }

    #[test]
    fn test_click_on_rotated_survey_image() {
        let mut scene = Scene::new(SceneConfig::default()).unwrap();
        let mut rec = surface("S-1", Some("1.png"));
        rec.dimension_x = 611_500;
        rec.dimension_y = 611_500;
        let id = scene.add_geo_tile(&rec).unwrap();
        let req = scene.pending_asset_requests().remove(0);
        let info = ImageInfo {
            path: req.path.clone(),
            bytes: 8,
        };
        assert!(scene.complete_asset(id, req.ticket, Ok(info)));

        // The image is drawn at 90°, so its pixel (100, 100) lies at negative world x.
        let world = scene.geo_tile(id).unwrap().pixel_to_world(100.0, 100.0, scene.projector());
        assert!(world.x < 0.0 && world.y > 0.0);
        assert_eq!(scene.pick(world), Some(EntityRef::GeoTile { id }));
        assert_eq!(scene.pick(Position::new(100.0, 100.0)), None);

        let click = scene.click(&Viewport::new(Position::ORIGIN, 1.0), world);
        let text = scene.describe(&click).unwrap();
        assert!(text.contains("Click Local: (100, 100)"), "{text}");
        let geo = scene.resolve(&EntityRef::GeoTile { id }, 100.0, 100.0).unwrap();
        assert!((geo.lat - click.geo.lat).abs() < 1e-12);
        assert!((geo.lon - click.geo.lon).abs() < 1e-12);
    }

    #[test]
    fn test_describe_click_on_bay() {
        let mut scene = Scene::new(world_config()).unwrap();
        scene.add_bay(&bay_record("B")).unwrap();
        let viewport = Viewport::new(Position::ORIGIN, 1.0);
        let click = scene.click(&viewport, Position::new(100.0, -100.0));
        let text = scene.describe(&click).unwrap();
        assert!(text.starts_with("Label: B\n"));
        assert!(text.contains("Click Local: (100, 100)"));
        assert!(text.contains("GPS:\n  Lat: "));

        let miss = scene.click(&viewport, Position::new(-500.0, 500.0));
        assert_eq!(scene.describe(&miss), None);
    }

    #[derive(Default)]
    struct Recorder {
        cleared: usize,
        anchors: Vec<AnchorView>,
        tiles: Vec<TileView>,
        geo: Vec<GeoTileView>,
        bays: Vec<BayView>,
    }

    impl RenderSurface for Recorder {
        fn clear(&mut self) {
            self.cleared += 1;
        }
        fn draw_anchor(&mut self, anchor: &AnchorView) {
            self.anchors.push(anchor.clone());
        }
        fn draw_tile(&mut self, tile: &TileView) {
            self.tiles.push(tile.clone());
        }
        fn draw_geo_tile(&mut self, tile: &GeoTileView) {
            self.geo.push(tile.clone());
        }
        fn draw_bay(&mut self, bay: &BayView) {
            self.bays.push(bay.clone());
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let mut scene = scene_with_bay_a();
        scene.add_geo_tile(&surface("S-1", Some("1.png"))).unwrap();
        scene.add_bay(&bay_record("B")).unwrap();

        let mut first = Recorder::default();
        let mut second = Recorder::default();
        scene.render(&mut first);
        scene.render(&mut second);

        assert_eq!(first.cleared, 1);
        assert_eq!(first.anchors.len(), 1);
        assert_eq!(first.tiles.len(), 2);
        assert_eq!(first.bays.len(), 1);
        assert_eq!(first.tiles, second.tiles);
        assert_eq!(first.geo, second.geo);
        assert!(matches!(first.geo[0].fill, GeoTileFill::Pending { .. }));
    }
}
