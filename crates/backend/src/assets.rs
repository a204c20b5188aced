use std::path::{Component, Path, PathBuf};

use baymap_shared::config::SceneConfig;
use baymap_shared::models::{AnchorRecord, BayRecord, SurfaceRecord};
use baymap_shared::tile::{AssetRequest, ImageInfo};
use baymap_shared::{Scene, SceneError};
use serde::Deserialize;
use tokio::io::AsyncReadExt;

/// Contents of `scene.json`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SceneFile {
    config: SceneConfig,
    anchors: Vec<AnchorRecord>,
}

pub struct SceneInputs {
    pub config: SceneConfig,
    pub anchors: Vec<AnchorRecord>,
    pub surfaces: Vec<SurfaceRecord>,
    pub bays: Vec<BayRecord>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&data).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

impl SceneInputs {
    pub fn load(assets_dir: &Path) -> Result<Self, String> {
        let scene: SceneFile = read_json(&assets_dir.join("scene.json"))?;
        let surfaces: Vec<SurfaceRecord> = read_json(&assets_dir.join("surfaces.json"))?;
        let bays: Vec<BayRecord> = read_json(&assets_dir.join("bays.json"))?;

        tracing::info!(
            anchors = scene.anchors.len(),
            surfaces = surfaces.len(),
            bays = bays.len(),
            "Loaded scene inputs"
        );

        Ok(SceneInputs {
            config: scene.config,
            anchors: scene.anchors,
            surfaces,
            bays,
        })
    }

    pub fn build(self) -> Result<Scene, SceneError> {
        Scene::from_inputs(self.config, &self.anchors, &self.surfaces, &self.bays)
    }
}

/// Location on disk of a tile image URL path. The leading `/tiles/` segment
/// maps onto `tiles_dir`; parent-directory segments are refused.
pub fn tile_file(tiles_dir: &Path, url_path: &str) -> Result<PathBuf, String> {
    let relative = url_path.trim_start_matches('/');
    let relative = relative.strip_prefix("tiles/").unwrap_or(relative);
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(format!("refusing tile path {url_path}"));
    }
    Ok(tiles_dir.join(relative))
}

const HEADER_LEN: u64 = 12;

/// Image format named by a file's leading bytes.
fn image_format(header: &[u8]) -> Option<&'static str> {
    match header {
        [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n', ..] => Some("png"),
        [0xff, 0xd8, 0xff, ..] => Some("jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("webp"),
        _ => None,
    }
}

/// Check that a requested tile image exists under `tiles_dir` and starts
/// with a known image header.
pub async fn resolve_image(tiles_dir: &Path, request: &AssetRequest) -> Result<ImageInfo, String> {
    let file = tile_file(tiles_dir, &request.path)?;
    let meta = tokio::fs::metadata(&file)
        .await
        .map_err(|e| format!("{}: {}", file.display(), e))?;
    if !meta.is_file() {
        return Err(format!("{} is not a file", file.display()));
    }

    let mut header = Vec::with_capacity(HEADER_LEN as usize);
    tokio::fs::File::open(&file)
        .await
        .map_err(|e| format!("{}: {}", file.display(), e))?
        .take(HEADER_LEN)
        .read_to_end(&mut header)
        .await
        .map_err(|e| format!("{}: {}", file.display(), e))?;
    let format = image_format(&header)
        .ok_or_else(|| format!("{} is not a recognized image", file.display()))?;
    tracing::debug!(path = %request.path, format, "Resolved tile image");

    Ok(ImageInfo {
        path: request.path.clone(),
        bytes: meta.len(),
    })
}
