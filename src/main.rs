use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use pageblocks::blocks::Blocks;
use pageblocks::config::AppConfig;
use pageblocks::database::{connection, seed_data};
use pageblocks::services::BlockEditor;

#[cfg(feature = "server")]
use pageblocks::server;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    #[clap(short, long, global = true, default_value = "pageblocks.yaml")]
    config: String,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[cfg(feature = "server")]
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long)]
        cors_origin: Option<String>,
    },
    Db {
        #[clap(subcommand)]
        command: DbCommands,
    },
    Blocks {
        #[clap(subcommand)]
        command: BlocksCommands,
    },
}

#[derive(Subcommand, Debug)]
enum DbCommands {
    Init {
        #[clap(short, long)]
        database: Option<String>,
    },
    #[cfg(feature = "server")]
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long)]
        database: Option<String>,
    },
    Seed {
        #[clap(short, long)]
        database: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum BlocksCommands {
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut config = AppConfig::load(Path::new(&args.config))?;

    match args.command {
        #[cfg(feature = "server")]
        Commands::Serve {
            port,
            database,
            cors_origin,
        } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(database) = database {
                config.database.url = database;
            }
            info!("Starting server on port {}", config.server.port);
            server::start_server(config, cors_origin.as_deref()).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Init { database } => {
                let url = connection::get_database_url(Some(
                    database.as_deref().unwrap_or(&config.database.url),
                ));
                info!("Initializing database: {}", url);
                let db = connection::establish_connection(&url).await?;
                connection::setup_database(&db).await?;
            }
            #[cfg(feature = "server")]
            DbCommands::Migrate {
                direction,
                database,
            } => {
                info!("Running database migration: {:?}", direction);
                server::migrate_database(
                    database.as_deref().unwrap_or(&config.database.url),
                    direction,
                )
                .await?;
            }
            DbCommands::Seed { database } => {
                if let Some(database) = database {
                    config.database.url = database;
                }
                let url = connection::get_database_url(Some(&config.database.url));
                let db = connection::establish_connection(&url).await?;
                connection::setup_database(&db).await?;

                let blocks = Arc::new(Blocks::from_config(&db, &config)?);
                let editor = BlockEditor::new(db.clone(), blocks.clone(), &config);
                let page_id =
                    seed_data::create_home_page(&db, &editor, blocks.templates()).await?;
                info!("Seeded home page {}", page_id);
            }
        },
        Commands::Blocks { command } => match command {
            BlocksCommands::List => {
                let blocks = pageblocks::blocks::TemplateResolver::new(Arc::new(
                    config.page_blocks.clone(),
                ));
                for schema in blocks.all() {
                    let fields: Vec<&str> =
                        schema.data_fields().map(|f| f.field.as_str()).collect();
                    println!(
                        "{:<24} {:<10} {:<6} {}",
                        schema.path,
                        schema.block_type.as_deref().unwrap_or("template"),
                        if schema.shared { "shared" } else { "" },
                        fields.join(", ")
                    );
                }
            }
        },
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("handlebars=off,{}", log_level)))
        .without_time()
        .init();
}
