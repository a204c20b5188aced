use std::sync::Arc;

use async_graphql::{Context, Enum, InputObject, Json, Object, SimpleObject, ID};
use baymap_shared::{
    anchor::{AnchorLayout, PlacedTile},
    grid::TilePlacement,
    models::{BayRecord, GridIndex, LatLon, Position},
    render::{BayView, GeoTileFill, GeoTileView, TileView},
    survey::RotateCommand,
    tile::TileId,
    viewport::Viewport,
    Click, EntityRef, Scene,
};
use tokio::sync::RwLock;

pub type SharedScene = Arc<RwLock<Scene>>;

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlEntityKind {
    AnchorTile,
    GeoTile,
    Bay,
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlRotateCommand {
    Left,
    Right,
    Step,
    Reset,
}

impl From<GqlRotateCommand> for RotateCommand {
    fn from(c: GqlRotateCommand) -> Self {
        match c {
            GqlRotateCommand::Left => RotateCommand::Left,
            GqlRotateCommand::Right => RotateCommand::Right,
            GqlRotateCommand::Step => RotateCommand::Step,
            GqlRotateCommand::Reset => RotateCommand::Reset,
        }
    }
}

#[derive(Enum, Copy, Clone, Eq, PartialEq)]
pub enum GqlAssetState {
    Pending,
    Ready,
    Placeholder,
}

// GraphQL output types

#[derive(SimpleObject, Clone)]
pub struct GqlPosition {
    pub x: f64,
    pub y: f64,
}

impl From<Position> for GqlPosition {
    fn from(p: Position) -> Self {
        GqlPosition { x: p.x, y: p.y }
    }
}

#[derive(SimpleObject)]
pub struct GqlLatLon {
    pub lat: f64,
    pub lon: f64,
}

impl From<LatLon> for GqlLatLon {
    fn from(g: LatLon) -> Self {
        GqlLatLon {
            lat: g.lat,
            lon: g.lon,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlSceneSummary {
    pub zoom_level: i32,
    pub chunk_size: f64,
    pub anchor_count: u32,
    pub geo_tile_count: u32,
    pub bay_count: u32,
}

impl From<&Scene> for GqlSceneSummary {
    fn from(s: &Scene) -> Self {
        GqlSceneSummary {
            zoom_level: s.zoom_level(),
            chunk_size: s.chunk_size(),
            anchor_count: s.anchors().len() as u32,
            geo_tile_count: s.geo_tiles().len() as u32,
            bay_count: s.bays().len() as u32,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlTile {
    pub anchor_id: String,
    pub index: u32,
    pub local_offset: GqlPosition,
    pub global_position: GqlPosition,
    pub size: f64,
    pub label: Option<String>,
    pub caption: Option<String>,
    pub source_data: Json<serde_json::Value>,
}

impl From<&TileView> for GqlTile {
    fn from(t: &TileView) -> Self {
        GqlTile {
            anchor_id: t.anchor_id.clone(),
            index: t.index as u32,
            local_offset: t.local_offset.into(),
            global_position: t.global_position.into(),
            size: t.size.width,
            label: t.label.clone(),
            caption: t.caption(),
            source_data: Json(t.source_data.clone()),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlAnchor {
    pub id: String,
    pub origin: GqlPosition,
    pub debug_box_size: f64,
    pub tiles: Vec<GqlTile>,
}

impl From<&AnchorLayout> for GqlAnchor {
    fn from(a: &AnchorLayout) -> Self {
        GqlAnchor {
            id: a.anchor.id.clone(),
            origin: a.anchor.origin.into(),
            debug_box_size: a.anchor.debug_box.width,
            tiles: a.tiles.iter().map(GqlTile::from).collect(),
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlGeoTile {
    pub id: ID,
    pub label: String,
    pub world_position: GqlPosition,
    pub width: f64,
    pub height: f64,
    pub file: Option<String>,
    pub state: GqlAssetState,
    pub image_path: Option<String>,
    pub image_rotation: Option<f64>,
    pub placeholder_color: Option<u32>,
    pub info: String,
}

impl From<GeoTileView> for GqlGeoTile {
    fn from(v: GeoTileView) -> Self {
        let info = v.to_string();
        let (state, image_path, image_rotation, placeholder_color) = match v.fill {
            GeoTileFill::Pending { color } => (GqlAssetState::Pending, None, None, Some(color)),
            GeoTileFill::Image { path, rotation_deg } => {
                (GqlAssetState::Ready, Some(path), Some(rotation_deg), None)
            }
            GeoTileFill::Placeholder { color } => {
                (GqlAssetState::Placeholder, None, None, Some(color))
            }
        };
        GqlGeoTile {
            id: ID(v.id.to_string()),
            label: v.label,
            world_position: v.world_position.into(),
            width: v.size.width,
            height: v.size.height,
            file: v.file,
            state,
            image_path,
            image_rotation,
            placeholder_color,
            info,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBay {
    pub id: String,
    pub frame_position: GqlPosition,
    pub frame_rotation: f64,
    pub extrinsic_rotation: f64,
    pub intrinsic_rotation_offset: f64,
    pub placement_offset: GqlPosition,
    pub width: f64,
    pub height: f64,
    pub corners: Vec<GqlPosition>,
    pub info: String,
}

impl From<BayView> for GqlBay {
    fn from(v: BayView) -> Self {
        GqlBay {
            info: v.to_string(),
            frame_position: v.transform.frame_position.into(),
            frame_rotation: v.transform.frame_rotation_deg,
            extrinsic_rotation: v.extrinsic_rotation,
            intrinsic_rotation_offset: v.intrinsic_rotation_offset,
            placement_offset: v.placement_offset.into(),
            width: v.transform.rect_size.width,
            height: v.transform.rect_size.height,
            corners: v.corners.iter().copied().map(GqlPosition::from).collect(),
            id: v.id,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlBayRecord {
    pub bay: String,
    pub coord_x1: f64,
    pub coord_y1: f64,
    pub coord_x2: f64,
    pub coord_y2: f64,
    pub rotationoffset: Option<f64>,
    pub bayrotation: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

impl From<BayRecord> for GqlBayRecord {
    fn from(r: BayRecord) -> Self {
        GqlBayRecord {
            bay: r.bay,
            coord_x1: r.coord_x1,
            coord_y1: r.coord_y1,
            coord_x2: r.coord_x2,
            coord_y2: r.coord_y2,
            rotationoffset: r.rotationoffset,
            bayrotation: r.bayrotation,
            offset_x: r.offset_x,
            offset_y: r.offset_y,
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlEntity {
    pub kind: GqlEntityKind,
    pub id: String,
    pub index: Option<u32>,
}

impl From<EntityRef> for GqlEntity {
    fn from(e: EntityRef) -> Self {
        match e {
            EntityRef::AnchorTile { anchor, index } => GqlEntity {
                kind: GqlEntityKind::AnchorTile,
                id: anchor,
                index: Some(index as u32),
            },
            EntityRef::GeoTile { id } => GqlEntity {
                kind: GqlEntityKind::GeoTile,
                id: id.to_string(),
                index: None,
            },
            EntityRef::Bay { id } => GqlEntity {
                kind: GqlEntityKind::Bay,
                id,
                index: None,
            },
        }
    }
}

#[derive(SimpleObject)]
pub struct GqlClick {
    pub world: GqlPosition,
    pub entity: Option<GqlEntity>,
    pub geo: GqlLatLon,
    pub report: Option<String>,
}

impl GqlClick {
    fn new(click: Click, report: Option<String>) -> Self {
        GqlClick {
            world: click.world.into(),
            entity: click.entity.map(GqlEntity::from),
            geo: click.geo.into(),
            report,
        }
    }
}

// Input types

#[derive(InputObject)]
pub struct PositionInput {
    pub x: f64,
    pub y: f64,
}

impl From<PositionInput> for Position {
    fn from(p: PositionInput) -> Self {
        Position::new(p.x, p.y)
    }
}

#[derive(InputObject)]
pub struct GridInput {
    pub x: i64,
    pub y: i64,
}

#[derive(InputObject)]
pub struct AddTileInput {
    pub anchor_id: String,
    /// Fixed millimeter offset from the anchor origin.
    pub offset: Option<PositionInput>,
    /// Grid cell, scaled by the current chunk size.
    pub grid: Option<GridInput>,
    pub label: Option<String>,
    pub data: Option<Json<serde_json::Value>>,
}

#[derive(InputObject)]
pub struct EntityInput {
    pub kind: GqlEntityKind,
    /// Anchor id, survey tile id or bay id depending on `kind`.
    pub id: String,
    /// Tile index within the anchor; anchor tiles only.
    pub index: Option<u32>,
}

impl TryFrom<EntityInput> for EntityRef {
    type Error = async_graphql::Error;

    fn try_from(e: EntityInput) -> Result<Self, Self::Error> {
        match e.kind {
            GqlEntityKind::AnchorTile => {
                let index = e.index.ok_or_else(|| {
                    async_graphql::Error::new("anchor tile reference needs an index")
                })?;
                Ok(EntityRef::AnchorTile {
                    anchor: e.id,
                    index: index as usize,
                })
            }
            GqlEntityKind::GeoTile => Ok(EntityRef::GeoTile {
                id: parse_tile_id(&e.id)?,
            }),
            GqlEntityKind::Bay => Ok(EntityRef::Bay { id: e.id }),
        }
    }
}

#[derive(InputObject)]
pub struct ViewportInput {
    pub pan: PositionInput,
    pub scale: f64,
}

fn parse_tile_id(id: &str) -> async_graphql::Result<TileId> {
    id.parse::<u64>()
        .map(TileId)
        .map_err(|_| async_graphql::Error::new(format!("Invalid geo tile id: {}", id)))
}

// Query root

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn scene(&self, ctx: &Context<'_>) -> async_graphql::Result<GqlSceneSummary> {
        let scene = ctx.data::<SharedScene>()?.read().await;
        Ok(GqlSceneSummary::from(&*scene))
    }

    async fn anchors(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlAnchor>> {
        let layout = ctx.data::<SharedScene>()?.read().await.layout();
        Ok(layout.anchors.iter().map(GqlAnchor::from).collect())
    }

    async fn tiles(
        &self,
        ctx: &Context<'_>,
        anchor_id: Option<String>,
    ) -> async_graphql::Result<Vec<GqlTile>> {
        let layout = ctx.data::<SharedScene>()?.read().await.layout();
        Ok(layout
            .tiles()
            .filter(|t| anchor_id.as_ref().map_or(true, |id| &t.anchor_id == id))
            .map(GqlTile::from)
            .collect())
    }

    async fn geo_tiles(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlGeoTile>> {
        let scene = ctx.data::<SharedScene>()?.read().await;
        let rotation = scene.config().projector.sprite_rotation_deg;
        Ok(scene
            .geo_tiles()
            .iter()
            .map(|t| GqlGeoTile::from(t.view(rotation)))
            .collect())
    }

    async fn bays(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlBay>> {
        let scene = ctx.data::<SharedScene>()?.read().await;
        Ok(scene.bays().iter().map(|b| GqlBay::from(b.view())).collect())
    }

    async fn bay_records(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<GqlBayRecord>> {
        let scene = ctx.data::<SharedScene>()?.read().await;
        Ok(scene
            .bay_records()
            .into_iter()
            .map(GqlBayRecord::from)
            .collect())
    }

    async fn project(
        &self,
        ctx: &Context<'_>,
        tile_x: i64,
        tile_y: i64,
        px: f64,
        py: f64,
    ) -> async_graphql::Result<GqlLatLon> {
        let scene = ctx.data::<SharedScene>()?.read().await;
        Ok(scene.project(tile_x, tile_y, px, py).into())
    }

    async fn resolve(
        &self,
        ctx: &Context<'_>,
        entity: EntityInput,
        x: f64,
        y: f64,
    ) -> async_graphql::Result<GqlLatLon> {
        let entity = EntityRef::try_from(entity)?;
        let scene = ctx.data::<SharedScene>()?.read().await;
        Ok(scene.resolve(&entity, x, y)?.into())
    }

    async fn resolve_screen(
        &self,
        ctx: &Context<'_>,
        viewport: ViewportInput,
        x: f64,
        y: f64,
    ) -> async_graphql::Result<GqlClick> {
        let viewport = Viewport::new(viewport.pan.into(), viewport.scale);
        let scene = ctx.data::<SharedScene>()?.read().await;
        let click = scene.click(&viewport, Position::new(x, y));
        let report = scene.describe(&click);
        Ok(GqlClick::new(click, report))
    }
}

// Mutation root

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn add_anchor(
        &self,
        ctx: &Context<'_>,
        id: String,
        origin: PositionInput,
    ) -> async_graphql::Result<GqlAnchor> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        scene.add_anchor(&id, origin.into())?;
        anchor_of(&scene, &id)
    }

    async fn add_tile(
        &self,
        ctx: &Context<'_>,
        input: AddTileInput,
    ) -> async_graphql::Result<GqlTile> {
        let placement = match (input.offset, input.grid) {
            (Some(offset), None) => TilePlacement::Offset(offset.into()),
            (None, Some(grid)) => TilePlacement::Grid(GridIndex::new(grid.x, grid.y)),
            _ => {
                return Err(async_graphql::Error::new(
                    "Exactly one of offset or grid is required",
                ))
            }
        };
        let data = input.data.map(|d| d.0).unwrap_or_default();

        let mut scene = ctx.data::<SharedScene>()?.write().await;
        let index = scene.add_tile_to_anchor(
            &input.anchor_id,
            PlacedTile::new(placement, input.label, data),
        )?;
        let layout = scene.layout();
        let tile = layout
            .tile(&input.anchor_id, index)
            .ok_or_else(|| async_graphql::Error::new("Tile missing from layout"))?;
        Ok(GqlTile::from(tile))
    }

    async fn set_anchor_origin(
        &self,
        ctx: &Context<'_>,
        id: String,
        origin: PositionInput,
    ) -> async_graphql::Result<GqlAnchor> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        scene.set_anchor_origin(&id, origin.into())?;
        anchor_of(&scene, &id)
    }

    async fn set_zoom_level(
        &self,
        ctx: &Context<'_>,
        level: i32,
    ) -> async_graphql::Result<GqlSceneSummary> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        scene.set_zoom_level(level)?;
        Ok(GqlSceneSummary::from(&*scene))
    }

    async fn drag_bay(
        &self,
        ctx: &Context<'_>,
        id: String,
        dx: f64,
        dy: f64,
    ) -> async_graphql::Result<GqlBay> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        Ok(scene.drag_bay(&id, dx, dy)?.view().into())
    }

    async fn rotate_bay(
        &self,
        ctx: &Context<'_>,
        id: String,
        command: GqlRotateCommand,
    ) -> async_graphql::Result<GqlBay> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        Ok(scene.rotate_bay(&id, command.into())?.view().into())
    }

    async fn rotate_bay_to(
        &self,
        ctx: &Context<'_>,
        id: String,
        degrees: f64,
    ) -> async_graphql::Result<GqlBay> {
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        Ok(scene.rotate_bay_to(&id, degrees)?.view().into())
    }

    async fn remove_geo_tile(&self, ctx: &Context<'_>, id: ID) -> async_graphql::Result<bool> {
        let id = parse_tile_id(&id)?;
        let mut scene = ctx.data::<SharedScene>()?.write().await;
        scene.remove_geo_tile(id)?;
        Ok(true)
    }
}

fn anchor_of(scene: &Scene, id: &str) -> async_graphql::Result<GqlAnchor> {
    let layout = scene.layout();
    layout
        .anchor(id)
        .map(GqlAnchor::from)
        .ok_or_else(|| async_graphql::Error::new(format!("Unknown anchor: {}", id)))
}

pub type Schema = async_graphql::Schema<QueryRoot, MutationRoot, async_graphql::EmptySubscription>;

pub fn build_schema(scene: SharedScene) -> Schema {
    async_graphql::Schema::build(QueryRoot, MutationRoot, async_graphql::EmptySubscription)
        .data(scene)
        .finish()
}
