//! Include block handlers
//!
//! An `include` block names a handler by reference (its `controller`);
//! the handler receives the request context and the prepared block and
//! returns HTML.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde_json::json;

use crate::blocks::{PreparedBlock, RequestContext};
use crate::database::entities::{pages, PageStatus};
use crate::services::page_loader::HOME_ROUTE;
use crate::services::translation_service::TranslationService;
use crate::views::ViewRenderer;

pub const RECENT_PAGES: &str = "pages.recent";

#[async_trait]
pub trait IncludeHandler: Send + Sync {
    async fn render(&self, ctx: &RequestContext, block: &PreparedBlock) -> Result<String>;
}

#[derive(Clone, Default)]
pub struct IncludeRegistry {
    handlers: HashMap<String, Arc<dyn IncludeHandler>>,
}

impl IncludeRegistry {
    pub fn register(&mut self, reference: &str, handler: Arc<dyn IncludeHandler>) {
        self.handlers.insert(reference.to_string(), handler);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.handlers.contains_key(reference)
    }

    pub fn references(&self) -> Vec<String> {
        let mut references: Vec<String> = self.handlers.keys().cloned().collect();
        references.sort();
        references
    }

    pub async fn render(
        &self,
        reference: &str,
        ctx: &RequestContext,
        block: &PreparedBlock,
    ) -> Result<String> {
        let handler = self
            .handlers
            .get(reference)
            .ok_or_else(|| anyhow!("No include handler registered as '{}'", reference))?;
        handler.render(ctx, block).await
    }
}

/// Lists the most recently updated active pages, with titles and slugs
/// in the requested locale
pub struct RecentPagesInclude {
    db: DatabaseConnection,
    translations: TranslationService,
    views: Arc<dyn ViewRenderer>,
    default_locale: String,
}

impl RecentPagesInclude {
    pub const DEFAULT_LIMIT: u64 = 5;

    pub fn new(db: DatabaseConnection, views: Arc<dyn ViewRenderer>, default_locale: &str) -> Self {
        Self {
            translations: TranslationService::new(db.clone()),
            db,
            views,
            default_locale: default_locale.to_string(),
        }
    }

    /// Title and slug for `locale`, falling back to the base record
    async fn localized_title_and_slug(
        &self,
        page: &pages::Model,
        locale: &str,
    ) -> Result<(String, String)> {
        let title = self
            .translations
            .translate(pages::TABLE_NAME, "title", page.id, locale)
            .await?
            .unwrap_or_else(|| page.title.clone());
        let slug = self
            .translations
            .translate(pages::TABLE_NAME, "slug", page.id, locale)
            .await?
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| page.slug.clone());
        Ok((title, slug))
    }
}

#[async_trait]
impl IncludeHandler for RecentPagesInclude {
    async fn render(&self, ctx: &RequestContext, block: &PreparedBlock) -> Result<String> {
        let limit = block
            .data
            .get("limit")
            .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or(Self::DEFAULT_LIMIT);

        let recent = pages::Entity::find()
            .filter(pages::Column::Status.eq(PageStatus::ACTIVE))
            .filter(pages::Column::Site.is_null())
            .order_by_desc(pages::Column::UpdatedAt)
            .limit(limit)
            .all(&self.db)
            .await?;

        let localized = !ctx.locale.is_empty() && ctx.locale != self.default_locale;
        let prefix = if localized {
            format!("/{}", ctx.locale)
        } else {
            String::new()
        };

        let mut links = Vec::with_capacity(recent.len());
        for page in recent {
            let (title, slug) = if localized {
                self.localized_title_and_slug(&page, &ctx.locale).await?
            } else {
                (page.title.clone(), page.slug.clone())
            };
            let url = if page.route_name == HOME_ROUTE {
                format!("{}/", prefix)
            } else {
                format!("{}/{}", prefix, slug)
            };
            links.push(json!({ "title": title, "url": url }));
        }

        self.views
            .render("includes.recent-pages", &json!({ "pages": links, "blockData": block.data }))
    }
}
