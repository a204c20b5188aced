mod assets;
mod graphql;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::http::HeaderValue;
use axum::{extract::State, response::Html, routing::get, Router};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing_subscriber::EnvFilter;

use graphql::{Schema, SharedScene};

async fn graphql_handler(State(schema): State<Schema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

/// Build a cache-controlled static file router.
fn cached_static_router(dir: &Path, cache_header: &'static str) -> Router {
    let layer = SetResponseHeaderLayer::overriding(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(cache_header),
    );
    Router::new()
        .fallback_service(ServeDir::new(dir))
        .layer(layer)
}

const CACHE_1DAY: &str = "public, max-age=86400, must-revalidate";

/// Build the full application router.
fn build_app(schema: Schema, tiles_dir: &Path) -> Router {
    Router::new()
        .route("/", get(graphiql))
        .route("/graphql", get(graphiql).post(graphql_handler))
        .with_state(schema)
        .nest("/tiles", cached_static_router(tiles_dir, CACHE_1DAY))
        .layer(CorsLayer::permissive())
}

/// Resolve every outstanding tile image in the background. Each task applies
/// its own completion; completions for tiles removed in the meantime are
/// dropped by the scene.
async fn spawn_asset_loads(scene: SharedScene, tiles_dir: PathBuf) -> Vec<JoinHandle<()>> {
    let requests = scene.read().await.pending_asset_requests();
    tracing::info!(count = requests.len(), "Resolving tile images");
    requests
        .into_iter()
        .map(|request| {
            let scene = Arc::clone(&scene);
            let tiles_dir = tiles_dir.clone();
            tokio::spawn(async move {
                let result = assets::resolve_image(&tiles_dir, &request).await;
                scene
                    .write()
                    .await
                    .complete_asset(request.tile, request.ticket, result);
            })
        })
        .collect()
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let assets_dir = PathBuf::from(env_or("ASSETS_DIR", "assets"));
    let tiles_dir = PathBuf::from(env_or("TILES_DIR", "tiles"));

    let scene = match assets::SceneInputs::load(&assets_dir) {
        Ok(inputs) => match inputs.build() {
            Ok(scene) => scene,
            Err(e) => {
                tracing::error!("Invalid scene inputs: {e}");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    let scene: SharedScene = Arc::new(RwLock::new(scene));

    spawn_asset_loads(Arc::clone(&scene), tiles_dir.clone()).await;

    let schema = graphql::build_schema(scene);
    let app = build_app(schema, &tiles_dir);

    let port = env_or("PORT", "3000");
    let addr = format!("0.0.0.0:{}", port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Server running at http://localhost:{}", port);
    tracing::info!("GraphiQL playground at http://localhost:{}/graphql", port);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
