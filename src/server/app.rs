use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health, page_blocks, pages};
use crate::blocks::Blocks;
use crate::config::AppConfig;
use crate::services::{BlockEditor, PageLoader};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub blocks: Arc<Blocks>,
    pub editor: BlockEditor,
    pub loader: PageLoader,
}

pub fn build_state(db: DatabaseConnection, config: &AppConfig) -> Result<AppState> {
    let blocks = Blocks::from_config(&db, config)?;
    Ok(with_blocks(db, config, Arc::new(blocks)))
}

/// State around an already assembled block capability
pub fn with_blocks(db: DatabaseConnection, config: &AppConfig, blocks: Arc<Blocks>) -> AppState {
    AppState {
        editor: BlockEditor::new(db.clone(), blocks.clone(), config),
        loader: PageLoader::new(db.clone(), blocks.clone(), config),
        config: Arc::new(config.clone()),
        blocks,
        db,
    }
}

pub async fn create_app(state: AppState, cors_origin: Option<&str>) -> Result<Router> {
    let cors = match cors_origin {
        Some(origin) if origin != "*" => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .with_context(|| format!("Invalid CORS origin '{}'", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/admin/page-blocks", admin_routes())
        .route("/", get(pages::show_home))
        .route("/*path", get(pages::show_page))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(page_blocks::index).post(page_blocks::store))
        .route("/sort", post(page_blocks::sort))
        .route("/minimize", post(page_blocks::minimize))
        .route(
            "/:id",
            get(page_blocks::edit)
                .post(page_blocks::update)
                .delete(page_blocks::destroy),
        )
        .route("/:id/layout", post(page_blocks::change_layout))
}
