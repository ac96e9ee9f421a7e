#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use pageblocks::blocks::Blocks;
use pageblocks::cache::MemoryCache;
use pageblocks::config::AppConfig;
use pageblocks::database::connection::setup_database;
use pageblocks::database::entities::{pages, PageStatus};
use pageblocks::files::LocalFileStore;
use pageblocks::includes::{IncludeRegistry, RecentPagesInclude, RECENT_PAGES};
use pageblocks::services::{BlockEditor, PageLoader, RenderAssembler, TranslationService};
use pageblocks::views::{HandlebarsViews, ViewRenderer};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, Set};
use tempfile::{NamedTempFile, TempDir};

pub const CONFIG: &str = r#"
environment: local
locales:
  default: en
  available: [en, de, fr]
page_blocks:
  hero:
    name: Hero
    fields:
      title:
        display_name: Title
        type: text
        required: true
        translatable: true
        placeholder: Welcome
      subtitle:
        display_name: Subtitle
        type: text
      media:
        display_name: Media
        type: break
      image:
        display_name: Image
        type: image
  banner:
    name: Banner
    shared: true
    fields:
      text:
        display_name: Text
        type: text
        translatable: true
  gallery:
    fields:
      images:
        display_name: Images
        type: multiple_images
  recent:
    type: include
    fields:
      limit:
        display_name: Limit
        type: number
        placeholder: 3
"#;

pub struct TestContext {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub cache: Arc<MemoryCache>,
    pub blocks: Arc<Blocks>,
    pub editor: BlockEditor,
    pub assembler: RenderAssembler,
    pub loader: PageLoader,
    pub translations: TranslationService,
    pub storage: TempDir,
    _db_file: NamedTempFile,
}

pub async fn setup() -> Result<TestContext> {
    setup_with(CONFIG).await
}

/// Fresh temp-file database, migrated, with the test block configuration
pub async fn setup_with(yaml: &str) -> Result<TestContext> {
    let db_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", db_file.path().display());
    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    let config = AppConfig::from_yaml_str(yaml)?;
    let storage = tempfile::tempdir()?;

    let mut views = HandlebarsViews::new()?;
    views.register("blocks.hero", "<h1>{{blockData.title}}</h1><p>{{blockData.subtitle}}</p>")?;
    views.register("blocks.banner", "<div class=\"banner\">{{{blockData.text}}}</div>")?;
    views.register("layouts.landing", "<main data-layout=\"landing\">{{{body}}}</main>")?;
    let views: Arc<dyn ViewRenderer> = Arc::new(views);

    let mut includes = IncludeRegistry::default();
    includes.register(
        RECENT_PAGES,
        Arc::new(RecentPagesInclude::new(
            db.clone(),
            views.clone(),
            &config.locales.default,
        )),
    );

    let cache = Arc::new(MemoryCache::new());
    let blocks = Arc::new(
        Blocks::new(
            &config,
            views,
            cache.clone(),
            Arc::new(LocalFileStore::new(storage.path())),
        )
        .with_includes(includes),
    );

    Ok(TestContext {
        editor: BlockEditor::new(db.clone(), blocks.clone(), &config),
        assembler: RenderAssembler::new(db.clone(), blocks.clone(), &config),
        loader: PageLoader::new(db.clone(), blocks.clone(), &config),
        translations: TranslationService::new(db.clone()),
        db,
        config,
        cache,
        blocks,
        storage,
        _db_file: db_file,
    })
}

pub async fn create_page(
    db: &DatabaseConnection,
    route_name: &str,
    slug: &str,
    status: &str,
) -> Result<pages::Model> {
    let now = Utc::now();
    let page = pages::ActiveModel {
        title: Set(format!("{} title", route_name)),
        slug: Set(slug.to_string()),
        route_name: Set(route_name.to_string()),
        status: Set(status.to_string()),
        layout: Set(None),
        site: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(page.insert(db).await?)
}

pub async fn active_page(db: &DatabaseConnection, route_name: &str) -> Result<pages::Model> {
    create_page(db, route_name, route_name, PageStatus::ACTIVE).await
}
