//! Public page resolution
//!
//! A request path is split into locale and slug, the slug is looked up in
//! the localized route table, and the page body is composed from its
//! rendered blocks inside a layout.

use std::sync::Arc;

use indexmap::IndexMap;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::blocks::{Blocks, RequestContext};
use crate::cache::{minutes, remember};
use crate::config::{AppConfig, LocaleConfig};
use crate::database::entities::pages::{self, Entity as Pages};
use crate::errors::{BlockError, BlockResult};
use crate::services::render_assembler::RenderAssembler;
use crate::services::translation_service::TranslationService;
use crate::views::{DEFAULT_LAYOUT, PAGE_BODY_VIEW};

pub const ROUTE_TABLE_CACHE_KEY: &str = "page/slugs_detailed";
pub const HOME_ROUTE: &str = "home";

/// route name → locale → slug
pub type RouteTable = IndexMap<String, IndexMap<String, String>>;

#[derive(Debug, Clone, Serialize)]
pub struct RenderedPage {
    pub page: pages::Model,
    pub locale: String,
    pub title: String,
    pub layout: String,
    pub html: String,
}

#[derive(Clone)]
pub struct PageLoader {
    db: DatabaseConnection,
    blocks: Arc<Blocks>,
    assembler: RenderAssembler,
    translations: TranslationService,
    locales: LocaleConfig,
    route_table_ttl_minutes: u64,
}

impl PageLoader {
    pub fn new(db: DatabaseConnection, blocks: Arc<Blocks>, config: &AppConfig) -> Self {
        Self {
            assembler: RenderAssembler::new(db.clone(), blocks.clone(), config),
            translations: TranslationService::new(db.clone()),
            db,
            blocks,
            locales: config.locales.clone(),
            route_table_ttl_minutes: config.cache.route_table_ttl_minutes,
        }
    }

    /// Slugs of every page per locale, cached for a few minutes.
    ///
    /// Expiry is the only invalidation; slug edits show up once the
    /// cached table runs out.
    pub async fn route_table(&self) -> BlockResult<RouteTable> {
        let ttl = (self.route_table_ttl_minutes > 0).then(|| minutes(self.route_table_ttl_minutes));
        remember(self.blocks.cache().as_ref(), ROUTE_TABLE_CACHE_KEY, ttl, || {
            self.build_route_table()
        })
        .await
    }

    async fn build_route_table(&self) -> BlockResult<RouteTable> {
        let pages = Pages::find()
            .filter(pages::Column::Site.is_null())
            .order_by_asc(pages::Column::Id)
            .all(&self.db)
            .await?;
        let slugs = self
            .translations
            .translations_for_column(pages::TABLE_NAME, "slug")
            .await?;

        let mut table = RouteTable::new();
        for page in &pages {
            let mut localized = IndexMap::new();
            for locale in self.locales.all() {
                let slug = slugs
                    .iter()
                    .find(|t| t.foreign_key == page.id && t.locale == locale)
                    .map(|t| t.value.clone())
                    .filter(|s| !self.locales.is_default(&locale) && !s.is_empty())
                    .unwrap_or_else(|| page.slug.clone());
                localized.insert(locale, slug);
            }
            table.insert(page.route_name.clone(), localized);
        }
        debug!("Built route table with {} pages", table.len());
        Ok(table)
    }

    /// Split a request path into `(locale, slug)`.
    ///
    /// A leading segment naming a configured locale selects it; the root
    /// path maps to the home alias.
    pub fn resolve_path(&self, path: &str) -> (String, String) {
        let trimmed = path.trim_matches('/');
        let (first, rest) = trimmed.split_once('/').unwrap_or((trimmed, ""));

        let (locale, slug) = if !first.is_empty() && self.locales.contains(first) {
            (first.to_string(), rest.trim_matches('/'))
        } else {
            (self.locales.default.clone(), trimmed)
        };

        let slug = if slug.is_empty() { HOME_ROUTE } else { slug };
        (locale, slug.to_string())
    }

    /// Active page bound to `slug` in `locale`
    pub async fn find_page(&self, locale: &str, slug: &str) -> BlockResult<pages::Model> {
        let table = self.route_table().await?;
        let route_name = if slug == HOME_ROUTE && table.contains_key(HOME_ROUTE) {
            Some(HOME_ROUTE.to_string())
        } else {
            table
                .iter()
                .find(|(_, slugs)| slugs.get(locale).map(String::as_str) == Some(slug))
                .or_else(|| {
                    let default = &self.locales.default;
                    table
                        .iter()
                        .find(|(_, slugs)| slugs.get(default).map(String::as_str) == Some(slug))
                })
                .map(|(route_name, _)| route_name.clone())
        };

        let route_name = route_name.ok_or_else(|| BlockError::RouteNotFound(slug.to_string()))?;
        debug!("Resolved '{}' ({}) to route {}", slug, locale, route_name);

        Pages::find()
            .filter(pages::Column::RouteName.eq(route_name.as_str()))
            .filter(pages::Column::Status.eq(pages::PageStatus::ACTIVE))
            .one(&self.db)
            .await?
            .ok_or_else(|| BlockError::RouteNotFound(slug.to_string()))
    }

    /// Resolve `path` and render the full page
    pub async fn load(&self, path: &str) -> BlockResult<RenderedPage> {
        let (locale, slug) = self.resolve_path(path);
        let page = self.find_page(&locale, &slug).await?;
        let ctx = RequestContext::new(locale.clone(), path);
        self.render(page, &ctx).await
    }

    pub async fn render(&self, page: pages::Model, ctx: &RequestContext) -> BlockResult<RenderedPage> {
        let locale = ctx.locale.clone();
        let blocks = self.assembler.render_page_blocks(&page, ctx).await?;

        let translated_title = if self.locales.is_default(&locale) {
            None
        } else {
            self.translations
                .translate(pages::TABLE_NAME, "title", page.id, &locale)
                .await?
        };
        let title = translated_title
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| page.title.clone());

        let views = self.blocks.views();
        let page_context = json!({
            "id": page.id,
            "title": title,
            "slug": page.slug,
            "route_name": page.route_name,
        });
        let body = views
            .render(
                PAGE_BODY_VIEW,
                &json!({ "page": page_context, "blocks": blocks, "locale": locale }),
            )
            .map_err(|e| BlockError::Render(format!("{:#}", e)))?;

        let layout = page
            .layout
            .clone()
            .filter(|layout| views.exists(layout))
            .unwrap_or_else(|| DEFAULT_LAYOUT.to_string());
        let html = views
            .render(
                &layout,
                &json!({ "page": page_context, "locale": locale, "body": body }),
            )
            .map_err(|e| BlockError::Render(format!("{:#}", e)))?;

        Ok(RenderedPage {
            page,
            locale,
            title,
            layout,
            html,
        })
    }
}
