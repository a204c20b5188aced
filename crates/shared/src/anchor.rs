use crate::grid::TilePlacement;
use crate::models::{AnchorRecord, GridIndex, Position, Size, TileRecord};
use crate::render::{AnchorView, TileView};

/// A tile owned by an anchor. Only the source data is stored; world
/// placement is derived on every rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedTile {
    pub placement: TilePlacement,
    pub label: Option<String>,
    pub source_data: serde_json::Value,
}

impl PlacedTile {
    pub fn new(placement: TilePlacement, label: Option<String>, source_data: serde_json::Value) -> Self {
        PlacedTile {
            placement,
            label,
            source_data,
        }
    }
}

impl From<&TileRecord> for PlacedTile {
    fn from(rec: &TileRecord) -> Self {
        PlacedTile::new(rec.placement.clone(), rec.label.clone(), rec.data.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    id: String,
    origin_world: Position,
    grid_center: GridIndex,
    tiles: Vec<PlacedTile>,
}

impl Anchor {
    pub fn new(id: impl Into<String>, origin_world: Position) -> Self {
        Anchor {
            id: id.into(),
            origin_world,
            grid_center: GridIndex::default(),
            tiles: Vec::new(),
        }
    }

    pub fn from_record(rec: &AnchorRecord) -> Self {
        Anchor {
            id: rec.id.clone(),
            origin_world: rec.origin,
            grid_center: rec.grid_center,
            tiles: rec.tiles.iter().map(PlacedTile::from).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn origin(&self) -> Position {
        self.origin_world
    }

    pub fn grid_center(&self) -> GridIndex {
        self.grid_center
    }

    pub fn tiles(&self) -> &[PlacedTile] {
        &self.tiles
    }

    /// Append a tile; returns its index within the anchor.
    pub fn add_tile(&mut self, tile: PlacedTile) -> usize {
        self.tiles.push(tile);
        self.tiles.len() - 1
    }

    /// Replace the origin. Every previously derived position is stale after
    /// this; rebuild from the stored tiles.
    pub fn set_origin(&mut self, origin: Position) {
        self.origin_world = origin;
    }

    pub fn global_position(&self, tile: &PlacedTile, chunk_size: f64) -> Position {
        self.origin_world + tile.placement.local_offset(chunk_size, self.grid_center)
    }

    /// Derive the full placement of this anchor's tiles for `chunk_size`.
    pub fn layout(&self, chunk_size: f64) -> AnchorLayout {
        let tiles = self
            .tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| {
                let local_offset = tile.placement.local_offset(chunk_size, self.grid_center);
                TileView {
                    anchor_id: self.id.clone(),
                    index,
                    local_offset,
                    global_position: self.origin_world + local_offset,
                    size: Size::new(chunk_size, chunk_size),
                    label: tile.label.clone(),
                    source_data: tile.source_data.clone(),
                }
            })
            .collect();

        AnchorLayout {
            anchor: AnchorView {
                id: self.id.clone(),
                origin: self.origin_world,
                debug_box: Size::new(chunk_size * 2.0, chunk_size * 2.0),
            },
            tiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorLayout {
    pub anchor: AnchorView,
    pub tiles: Vec<TileView>,
}

/// Derived placement of every anchor tile at one zoom level. Always built
/// whole from the anchors' stored tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub zoom_level: i32,
    pub chunk_size: f64,
    pub anchors: Vec<AnchorLayout>,
}

impl Layout {
    pub fn build(anchors: &[Anchor], zoom_level: i32, chunk_size: f64) -> Self {
        Layout {
            zoom_level,
            chunk_size,
            anchors: anchors.iter().map(|a| a.layout(chunk_size)).collect(),
        }
    }

    pub fn anchor(&self, id: &str) -> Option<&AnchorLayout> {
        self.anchors.iter().find(|a| a.anchor.id == id)
    }

    pub fn tile(&self, anchor_id: &str, index: usize) -> Option<&TileView> {
        self.anchor(anchor_id).and_then(|a| a.tiles.get(index))
    }

    pub fn tiles(&self) -> impl Iterator<Item = &TileView> {
        self.anchors.iter().flat_map(|a| a.tiles.iter())
    }
}
