use std::sync::Arc;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::blocks::{Blocks, PreparedBlock, RequestContext};
use crate::config::{AppConfig, LocaleConfig};
use crate::database::entities::page_blocks::{self, decode_data, Entity as PageBlocks};
use crate::database::entities::pages;
use crate::errors::{BlockError, BlockResult};
use crate::services::translation_service::TranslationService;

/// Produces the prepared, rendered blocks of a page for one locale
#[derive(Clone)]
pub struct RenderAssembler {
    db: DatabaseConnection,
    blocks: Arc<Blocks>,
    translations: TranslationService,
    locales: LocaleConfig,
}

impl RenderAssembler {
    pub fn new(db: DatabaseConnection, blocks: Arc<Blocks>, config: &AppConfig) -> Self {
        Self {
            translations: TranslationService::new(db.clone()),
            db,
            blocks,
            locales: config.locales.clone(),
        }
    }

    /// Block data for `locale`, falling back to the default-locale data
    /// when no translation row exists.
    pub async fn translated_data(&self, block_id: i32, locale: &str) -> BlockResult<Map<String, Value>> {
        let block = PageBlocks::find_by_id(block_id)
            .one(&self.db)
            .await?
            .ok_or(BlockError::BlockNotFound(block_id))?;
        self.data_for(&block, locale).await
    }

    async fn data_for(&self, block: &page_blocks::Model, locale: &str) -> BlockResult<Map<String, Value>> {
        if !self.locales.is_default(locale) {
            let translated = self
                .translations
                .translate(page_blocks::TABLE_NAME, page_blocks::DATA_COLUMN, block.id, locale)
                .await?;
            if let Some(raw) = translated {
                match decode_data(&raw) {
                    Ok(data) => return Ok(data),
                    Err(e) => warn!(
                        "Ignoring unreadable '{}' translation of block {}: {}",
                        locale, block.id, e
                    ),
                }
            }
        }
        Ok(block.data_map()?)
    }

    /// Visible blocks of `page`, ordered, with locale-resolved data and HTML
    pub async fn render_page_blocks(
        &self,
        page: &pages::Model,
        ctx: &RequestContext,
    ) -> BlockResult<Vec<PreparedBlock>> {
        let models = PageBlocks::find()
            .filter(page_blocks::Column::PageId.eq(page.id))
            .filter(page_blocks::Column::IsHidden.eq(false))
            .order_by_asc(page_blocks::Column::Order)
            .order_by_asc(page_blocks::Column::Id)
            .all(&self.db)
            .await?;

        let mut pending = Vec::with_capacity(models.len());
        for model in &models {
            let data = match self.data_for(model, &ctx.locale).await {
                Ok(data) => data,
                Err(e) => {
                    warn!("Block {} has unreadable data: {}", model.id, e);
                    Map::new()
                }
            };
            pending.push(PreparedBlock::from_model(model, data, self.view_for(model)));
        }

        debug!(
            "Preparing {} blocks of page {} for locale {}",
            pending.len(),
            page.id,
            ctx.locale
        );
        Ok(self.blocks.prepare_each_block(ctx, pending).await)
    }

    /// View rendering a template block: the configured one, or
    /// `blocks.<path>` when the path has no configuration.
    fn view_for(&self, block: &page_blocks::Model) -> Option<String> {
        if !block.is_template() {
            return None;
        }
        match self.blocks.templates().resolve(&block.path) {
            Ok(schema) => Some(schema.template),
            Err(_) => {
                warn!("Block {} uses unconfigured path '{}'", block.id, block.path);
                Some(format!("blocks.{}", block.path))
            }
        }
    }
}
