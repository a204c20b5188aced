use thiserror::Error;

/// Kind of entity an id refers to, for `UnknownReference` reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Anchor,
    Tile,
    GeoTile,
    Bay,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Anchor => write!(f, "anchor"),
            EntityKind::Tile => write!(f, "tile"),
            EntityKind::GeoTile => write!(f, "geo tile"),
            EntityKind::Bay => write!(f, "bay"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("unknown {kind}: {id}")]
    UnknownReference { kind: EntityKind, id: String },

    #[error("degenerate geometry for {entity}: {width} x {height}")]
    DegenerateGeometry {
        entity: String,
        width: f64,
        height: f64,
    },

    #[error("failed to resolve asset {path}: {reason}")]
    AssetResolution { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl SceneError {
    pub fn unknown(kind: EntityKind, id: impl Into<String>) -> Self {
        SceneError::UnknownReference {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SceneError>;
