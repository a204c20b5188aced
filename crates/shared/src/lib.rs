pub mod anchor;
pub mod bay;
pub mod calc;
pub mod config;
pub mod error;
pub mod geo;
pub mod grid;
pub mod models;
pub mod render;
pub mod scene;
pub mod survey;
pub mod tile;
pub mod viewport;

pub use error::{Result, SceneError};
pub use scene::{Click, EntityRef, Scene};
