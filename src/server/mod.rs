pub mod app;
pub mod handlers;
pub mod response;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::AppConfig;
use crate::database::{connection::*, migrations::Migrator};
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(config: AppConfig, cors_origin: Option<&str>) -> Result<()> {
    let database_url = get_database_url(Some(&config.database.url));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let state = app::build_state(db, &config)?;
    let app = app::create_app(state, cors_origin).await?;

    log_routes();

    let address = config.server_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("Endpoints:");
    info!("  /health                          - Health check");
    info!("  /admin/page-blocks/:page_id      - Page block editor (JSON)");
    info!("  /admin/page-blocks/sort          - Reorder blocks");
    info!("  /admin/page-blocks/minimize      - Toggle block minimize");
    info!("  /<locale?>/<slug>                - Rendered pages");
}

pub async fn migrate_database(database_url: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_url));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
