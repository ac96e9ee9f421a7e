//! The shared block capability
//!
//! [`Blocks`] bundles everything both the editor and the renderer need:
//! template schemas, views, the markup compiler, the render cache, the
//! file store and the include handlers. Services hold it behind an `Arc`.

pub mod template;
pub mod translations;
pub mod validation;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::cache::{block_cache_ttl, remember, Cache, MemoryCache};
use crate::config::{AppConfig, Environment};
use crate::database::entities::page_blocks;
use crate::errors::{BlockError, BlockResult};
use crate::files::{FileStore, LocalFileStore, UploadedFile};
use crate::includes::{IncludeRegistry, RecentPagesInclude, RECENT_PAGES};
use crate::markup::{MarkupCompiler, ShortcodeCompiler};
use crate::views::{HandlebarsViews, ViewRenderer};

pub use template::{FieldDescriptor, TemplateResolver, TemplateSchema};

/// Request data handed to include handlers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestContext {
    pub locale: String,
    pub path: String,
    #[serde(default)]
    pub query: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(locale: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            path: path.into(),
            query: HashMap::new(),
        }
    }
}

/// A block as seen by the renderer: locale-resolved data plus output HTML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedBlock {
    pub id: i32,
    pub page_id: i32,
    pub updated_at: DateTime<Utc>,
    pub cache_ttl: Option<i32>,
    pub template: Option<String>,
    pub data: Map<String, Value>,
    pub controller: Option<String>,
    pub path: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub html: Option<String>,
}

impl PreparedBlock {
    pub fn from_model(
        block: &page_blocks::Model,
        data: Map<String, Value>,
        template: Option<String>,
    ) -> Self {
        Self {
            id: block.id,
            page_id: block.page_id,
            updated_at: block.updated_at,
            cache_ttl: block.cache_ttl,
            template,
            data,
            controller: block.controller.clone(),
            path: block.path.clone(),
            block_type: block.block_type.clone(),
            html: None,
        }
    }

    /// Render cache key; the data is already resolved for `locale`
    pub fn cache_key(&self, locale: &str) -> String {
        format!(
            "blocks/{}-{}-{}:{}",
            self.id,
            self.page_id,
            self.updated_at.timestamp_millis(),
            locale
        )
    }

    fn is_type(&self, block_type: &str) -> bool {
        self.block_type == block_type
    }
}

pub struct Blocks {
    templates: TemplateResolver,
    views: Arc<dyn ViewRenderer>,
    markup: Arc<dyn MarkupCompiler>,
    cache: Arc<dyn Cache>,
    files: Arc<dyn FileStore>,
    includes: IncludeRegistry,
    environment: Environment,
    default_ttl_minutes: u64,
}

impl Blocks {
    pub fn new(
        config: &AppConfig,
        views: Arc<dyn ViewRenderer>,
        cache: Arc<dyn Cache>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            templates: TemplateResolver::new(Arc::new(config.page_blocks.clone())),
            views,
            markup: Arc::new(ShortcodeCompiler::with_defaults()),
            cache,
            files,
            includes: IncludeRegistry::default(),
            environment: config.environment,
            default_ttl_minutes: config.cache.default_block_ttl_minutes,
        }
    }

    /// Default collaborators: handlebars views (plus the configured views
    /// directory), an in-memory cache, the local file store and the
    /// built-in include handlers.
    pub fn from_config(db: &DatabaseConnection, config: &AppConfig) -> anyhow::Result<Self> {
        let mut views = HandlebarsViews::new()?;
        if let Some(dir) = &config.views.directory {
            views = views.with_directory(std::path::Path::new(dir))?;
        }
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

        Ok(Self::new(
            config,
            views,
            Arc::new(MemoryCache::new()),
            Arc::new(LocalFileStore::new(&config.storage.root)),
        )
        .with_includes(includes))
    }

    pub fn with_includes(mut self, includes: IncludeRegistry) -> Self {
        self.includes = includes;
        self
    }

    pub fn templates(&self) -> &TemplateResolver {
        &self.templates
    }

    pub fn views(&self) -> &Arc<dyn ViewRenderer> {
        &self.views
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn includes(&self) -> &IncludeRegistry {
        &self.includes
    }

    pub fn block_ttl(&self, cache_ttl: Option<i32>) -> Option<Duration> {
        block_cache_ttl(cache_ttl, self.environment, self.default_ttl_minutes)
    }

    /// Prepare every block for output, going through the render cache.
    ///
    /// A block that fails to render keeps `html: None`; it never fails the
    /// page.
    pub async fn prepare_each_block(
        &self,
        ctx: &RequestContext,
        blocks: Vec<PreparedBlock>,
    ) -> Vec<PreparedBlock> {
        let mut prepared = Vec::with_capacity(blocks.len());
        for block in blocks {
            let key = block.cache_key(&ctx.locale);
            let ttl = self.block_ttl(block.cache_ttl);
            let fallback = block.clone();
            let result = remember(self.cache.as_ref(), &key, ttl, || async move {
                Ok::<_, serde_json::Error>(self.prepare_block(ctx, block).await)
            })
            .await;
            match result {
                Ok(block) => prepared.push(block),
                Err(e) => {
                    warn!("Could not cache block {}: {}", key, e);
                    prepared.push(fallback);
                }
            }
        }
        prepared
    }

    async fn prepare_block(&self, ctx: &RequestContext, block: PreparedBlock) -> PreparedBlock {
        if block.is_type(page_blocks::BlockType::INCLUDE) {
            let mut block = self.prepare_template_block(block);
            let Some(controller) = block.controller.clone().filter(|c| !c.trim().is_empty())
            else {
                return block;
            };
            match self.includes.render(&controller, ctx, &block).await {
                Ok(html) => block.html = Some(html),
                Err(e) => warn!("Include '{}' failed for block {}: {:#}", controller, block.id, e),
            }
            return block;
        }

        if block.is_type(page_blocks::BlockType::TEMPLATE) && block.template.is_some() {
            return self.prepare_template_block(block);
        }

        block
    }

    /// Fill every schema field into the block data, compile string values
    /// through the markup compiler and render the block view.
    pub fn prepare_template_block(&self, mut block: PreparedBlock) -> PreparedBlock {
        match self.templates.resolve(&block.path) {
            Ok(schema) => schema.fill_missing(&mut block.data),
            Err(_) => debug!("No schema for block path '{}'", block.path),
        }

        for value in block.data.values_mut() {
            if let Value::String(source) = value {
                *source = self.markup.compile(source);
            }
        }

        if block.is_type(page_blocks::BlockType::TEMPLATE) {
            if let Some(template) = block.template.as_deref() {
                if self.views.exists(template) {
                    match self.views.render(template, &json!({ "blockData": block.data })) {
                        Ok(html) => block.html = Some(html),
                        Err(e) => warn!("Block {} did not render: {:#}", block.id, e),
                    }
                } else {
                    debug!("View '{}' for block {} does not exist", template, block.id);
                }
            }
        }

        block
    }

    /// Initial data for a new block on `path`
    pub fn generate_placeholders(&self, path: &str) -> BlockResult<Map<String, Value>> {
        Ok(self.templates.resolve(path)?.placeholders())
    }

    /// Persist uploads to block-scoped storage, replacing each field value
    /// with the stored path (or list of paths for multi-file fields).
    pub async fn upload_files(
        &self,
        block_id: i32,
        schema: Option<&TemplateSchema>,
        data: &mut Map<String, Value>,
        uploads: &HashMap<String, Vec<UploadedFile>>,
    ) -> BlockResult<()> {
        let folder = format!("blocks/{}", block_id);
        for (field, files) in uploads {
            if files.is_empty() {
                continue;
            }
            let multi = schema
                .and_then(|s| s.field(field))
                .map(FieldDescriptor::is_multi_upload)
                .unwrap_or(files.len() > 1);

            let mut paths = Vec::with_capacity(files.len());
            for file in files {
                let path = self
                    .files
                    .store(&folder, file)
                    .await
                    .map_err(|e| BlockError::Storage(format!("{:#}", e)))?;
                paths.push(Value::String(path));
            }

            let value = if multi {
                Value::Array(paths)
            } else {
                paths.pop().unwrap_or(Value::Null)
            };
            data.insert(field.clone(), value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::HandlebarsViews;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStore(AtomicUsize);

    #[async_trait]
    impl FileStore for CountingStore {
        async fn store(&self, folder: &str, file: &UploadedFile) -> Result<String> {
            let n = self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{}/{}-{}", folder, n, file.file_name))
        }
    }

    const CONFIG: &str = r#"
environment: testing
page_blocks:
  hero:
    fields:
      title:
        display_name: Title
        type: text
      subtitle:
        display_name: Subtitle
        type: text
      image:
        display_name: Image
        type: image
      gallery:
        display_name: Gallery
        type: multiple_images
"#;

    fn blocks() -> Blocks {
        let config = AppConfig::from_yaml_str(CONFIG).unwrap();
        let mut views = HandlebarsViews::new().unwrap();
        views
            .register("blocks.hero", "{{blockData.title}}|{{isnull blockData.subtitle}}")
            .unwrap();
        Blocks::new(
            &config,
            Arc::new(views),
            Arc::new(MemoryCache::new()),
            Arc::new(CountingStore(AtomicUsize::new(0))),
        )
    }

    fn hero(data: Value) -> PreparedBlock {
        PreparedBlock {
            id: 1,
            page_id: 2,
            updated_at: Utc::now(),
            cache_ttl: None,
            template: Some("blocks.hero".to_string()),
            data: data.as_object().cloned().unwrap(),
            controller: None,
            path: "hero".to_string(),
            block_type: "template".to_string(),
            html: None,
        }
    }

    #[test]
    fn test_prepare_template_block_fills_and_renders() {
        let blocks = blocks();
        let prepared = blocks.prepare_template_block(hero(json!({"title": "Hi [year]"})));

        let year = Utc::now().format("%Y").to_string();
        assert_eq!(prepared.data["title"], json!(format!("Hi {}", year)));
        assert_eq!(prepared.data["subtitle"], Value::Null);
        assert_eq!(prepared.data["gallery"], Value::Null);
        assert_eq!(prepared.html, Some(format!("Hi {}|true", year)));
    }

    #[test]
    fn test_missing_view_leaves_html_empty() {
        let blocks = blocks();
        let mut block = hero(json!({}));
        block.template = Some("blocks.absent".to_string());

        let prepared = blocks.prepare_template_block(block);
        assert!(prepared.html.is_none());
        assert!(prepared.data.contains_key("title"));
    }

    #[test]
    fn test_block_ttl_prefers_explicit_value() {
        let blocks = blocks();
        assert_eq!(blocks.block_ttl(Some(10)), Some(Duration::from_secs(600)));
        assert_eq!(blocks.block_ttl(None), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_generate_placeholders() {
        let blocks = blocks();
        let data = blocks.generate_placeholders("hero").unwrap();
        assert_eq!(data.len(), 4);
        assert!(matches!(
            blocks.generate_placeholders("missing"),
            Err(BlockError::ConfigurationMissing(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_files_single_and_multi() {
        let blocks = blocks();
        let schema = blocks.templates().resolve("hero").unwrap();
        let mut uploads = HashMap::new();
        uploads.insert(
            "image".to_string(),
            vec![UploadedFile::new("a.png", Some("image/png"), vec![1])],
        );
        uploads.insert(
            "gallery".to_string(),
            vec![UploadedFile::new("b.png", Some("image/png"), vec![2])],
        );

        let mut data = Map::new();
        blocks
            .upload_files(5, Some(&schema), &mut data, &uploads)
            .await
            .unwrap();

        assert!(data["image"].as_str().unwrap().starts_with("blocks/5/"));
        assert_eq!(data["gallery"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_cache_key_varies_by_locale_and_millisecond() {
        let block = hero(json!({}));
        let mut saved_again = block.clone();
        saved_again.updated_at = block.updated_at + chrono::Duration::milliseconds(1);

        assert!(block.cache_key("en").starts_with("blocks/1-2-"));
        assert_ne!(block.cache_key("en"), block.cache_key("de"));
        assert_ne!(block.cache_key("en"), saved_again.cache_key("en"));
    }

    #[tokio::test]
    async fn test_prepare_each_block_caches_by_key() {
        let blocks = blocks();
        let ctx = RequestContext::new("en", "/");

        let first = blocks
            .prepare_each_block(&ctx, vec![hero(json!({"title": "One"}))])
            .await;
        let mut changed = first[0].clone();
        changed.data.insert("title".to_string(), json!("Two"));
        changed.html = None;

        let second = blocks.prepare_each_block(&ctx, vec![changed]).await;
        assert_eq!(second[0].data["title"], json!("One"));
    }
}
