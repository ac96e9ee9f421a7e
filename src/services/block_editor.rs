use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::blocks::translations::{extract_translations, localize};
use crate::blocks::validation::validate_block;
use crate::blocks::{Blocks, TemplateSchema};
use crate::config::{AppConfig, LocaleConfig};
use crate::database::entities::page_blocks::{self, encode_data, BlockType, Entity as PageBlocks};
use crate::database::entities::pages::{self, Entity as Pages};
use crate::errors::{BlockError, BlockResult};
use crate::files::UploadedFile;
use crate::services::translation_service;

/// Values submitted when editing a block
#[derive(Debug, Clone, Default)]
pub struct BlockUpdate {
    /// Field values, including `<field>_i18n` companion payloads
    pub values: Map<String, Value>,
    /// New uploads per field
    pub uploads: HashMap<String, Vec<UploadedFile>>,
    pub controller: Option<String>,
    pub is_hidden: bool,
    pub is_delete_denied: bool,
    pub cache_ttl: Option<i32>,
}

/// Admin-side block mutations
#[derive(Clone)]
pub struct BlockEditor {
    db: DatabaseConnection,
    blocks: Arc<Blocks>,
    locales: LocaleConfig,
    default_include: String,
}

impl BlockEditor {
    pub fn new(db: DatabaseConnection, blocks: Arc<Blocks>, config: &AppConfig) -> Self {
        Self {
            db,
            blocks,
            locales: config.locales.clone(),
            default_include: config.includes.default_controller.clone(),
        }
    }

    pub async fn find_block(&self, id: i32) -> BlockResult<page_blocks::Model> {
        PageBlocks::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(BlockError::BlockNotFound(id))
    }

    /// A page and all of its blocks in display order
    pub async fn page_with_blocks(
        &self,
        page_id: i32,
    ) -> BlockResult<(pages::Model, Vec<page_blocks::Model>)> {
        let page = Pages::find_by_id(page_id)
            .one(&self.db)
            .await?
            .ok_or(BlockError::PageNotFound(page_id))?;
        let blocks = PageBlocks::find()
            .filter(page_blocks::Column::PageId.eq(page_id))
            .order_by_asc(page_blocks::Column::Order)
            .order_by_asc(page_blocks::Column::Id)
            .all(&self.db)
            .await?;
        Ok((page, blocks))
    }

    /// Split a requested type into `(type, path)`.
    ///
    /// Accepts the literal `include` or `"<type>|<path>"`; a type enforced
    /// by the path's configuration wins over the requested one.
    pub fn resolve_type(&self, type_spec: &str) -> BlockResult<(String, String)> {
        let type_spec = type_spec.trim();
        if type_spec == BlockType::INCLUDE {
            return Ok((BlockType::INCLUDE.to_string(), self.default_include.clone()));
        }

        let (requested, path) = type_spec
            .split_once('|')
            .map(|(t, p)| (t.trim(), p.trim()))
            .filter(|(t, p)| !t.is_empty() && !p.is_empty())
            .ok_or_else(|| BlockError::InvalidBlockType(type_spec.to_string()))?;

        let templates = self.blocks.templates();
        let block_type = templates.enforced_type(path).unwrap_or(requested).to_string();
        if block_type != BlockType::INCLUDE && !templates.is_configured(path) {
            return Err(BlockError::ConfigurationMissing(path.to_string()));
        }
        Ok((block_type, path.to_string()))
    }

    /// Add a block to a page.
    ///
    /// On a shared path with an existing sibling, the new block starts as a
    /// copy of that sibling (data and translations); otherwise its data is
    /// seeded from the template placeholders.
    pub async fn create(&self, page_id: i32, type_spec: &str) -> BlockResult<page_blocks::Model> {
        Pages::find_by_id(page_id)
            .one(&self.db)
            .await?
            .ok_or(BlockError::PageNotFound(page_id))?;

        let (block_type, path) = self.resolve_type(type_spec)?;
        let sibling = if self.blocks.templates().is_shared(&path) {
            PageBlocks::find()
                .filter(page_blocks::Column::Path.eq(path.as_str()))
                .order_by_asc(page_blocks::Column::Id)
                .one(&self.db)
                .await?
        } else {
            None
        };

        let now = Utc::now();
        let mut block = page_blocks::ActiveModel {
            page_id: Set(page_id),
            block_type: Set(block_type.clone()),
            path: Set(path.clone()),
            order: Set(now.timestamp()),
            is_hidden: Set(false),
            is_minimized: Set(false),
            is_delete_denied: Set(false),
            cache_ttl: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        match &sibling {
            Some(sibling) => {
                block.data = Set(sibling.data.clone());
                block.controller = Set(sibling.controller.clone());
                block.is_delete_denied = Set(sibling.is_delete_denied);
                block.cache_ttl = Set(sibling.cache_ttl);
            }
            None if block_type == BlockType::INCLUDE => {
                let data = self.blocks.generate_placeholders(&path).unwrap_or_default();
                let controller = if self.blocks.includes().contains(&path) {
                    path.clone()
                } else {
                    self.default_include.clone()
                };
                block.data = Set(encode_data(&data)?);
                block.controller = Set(Some(controller));
            }
            None => {
                block.data = Set(encode_data(&self.blocks.generate_placeholders(&path)?)?);
                block.controller = Set(None);
            }
        }

        let txn = self.db.begin().await?;
        let block = block.insert(&txn).await?;
        if let Some(sibling) = &sibling {
            translation_service::mirror(
                &txn,
                page_blocks::TABLE_NAME,
                page_blocks::DATA_COLUMN,
                sibling.id,
                block.id,
            )
            .await?;
        }
        touch_page(&txn, page_id).await?;
        txn.commit().await?;

        info!(
            "Created {} block {} ({}) on page {}",
            block.block_type, block.id, block.path, page_id
        );
        Ok(block)
    }

    /// Apply an admin edit to a block, fanning translations out per locale
    /// and replicating to shared siblings.
    pub async fn update(&self, id: i32, update: BlockUpdate) -> BlockResult<page_blocks::Model> {
        let block = self.find_block(id).await?;
        let schema = self.schema_for(&block)?;
        let existing = block.data_map().unwrap_or_else(|e| {
            warn!("Block {} holds unreadable data, starting fresh: {}", id, e);
            Map::new()
        });

        let BlockUpdate {
            values: mut submitted,
            uploads,
            controller,
            is_hidden,
            is_delete_denied,
            cache_ttl,
        } = update;

        let translatable = schema
            .as_ref()
            .map(TemplateSchema::translatable_fields)
            .unwrap_or_default();
        let translations =
            extract_translations(&translatable, &mut submitted, &self.locales.default)?;

        let mut values = Map::new();
        let mut pending_uploads = HashMap::new();
        if let Some(schema) = &schema {
            for field in schema.data_fields() {
                let name = &field.field;
                if field.is_upload() {
                    match uploads.get(name).filter(|files| !files.is_empty()) {
                        Some(files) => {
                            pending_uploads.insert(name.clone(), files.clone());
                        }
                        None => {
                            if let Some(stored) = existing.get(name) {
                                values.insert(name.clone(), stored.clone());
                            }
                        }
                    }
                    continue;
                }
                values.insert(name.clone(), submitted.remove(name).unwrap_or(Value::Null));
            }

            validate_block(schema, &values, &pending_uploads).map_err(BlockError::Validation)?;
        } else {
            values = submitted;
            pending_uploads = uploads;
        }

        self.blocks
            .upload_files(id, schema.as_ref(), &mut values, &pending_uploads)
            .await?;

        let has_translations = !translatable.is_empty();
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let mut updated = None;
        for locale in self.locales.all() {
            let localized = localize(&values, &translations, &locale);
            if self.locales.is_default(&locale) {
                let mut active: page_blocks::ActiveModel = block.clone().into();
                active.data = Set(encode_data(&localized)?);
                if let Some(controller) = controller.clone().filter(|_| block.is_include()) {
                    let controller = controller.trim().to_string();
                    active.controller = Set((!controller.is_empty()).then_some(controller));
                }
                active.is_hidden = Set(is_hidden);
                active.is_delete_denied = Set(is_delete_denied);
                active.cache_ttl = Set(cache_ttl);
                active.updated_at = Set(now);
                updated = Some(active.update(&txn).await?);
                continue;
            }

            let stored = translation_service::translate(
                &txn,
                page_blocks::TABLE_NAME,
                page_blocks::DATA_COLUMN,
                id,
                &locale,
            )
            .await?;
            if has_translations || stored.is_some() {
                translation_service::upsert(
                    &txn,
                    page_blocks::TABLE_NAME,
                    page_blocks::DATA_COLUMN,
                    id,
                    &locale,
                    encode_data(&localized)?,
                )
                .await?;
            }
        }

        let updated = updated.ok_or(BlockError::BlockNotFound(id))?;
        touch_page(&txn, updated.page_id).await?;
        if self.blocks.templates().is_shared(&updated.path) {
            let count = self.propagate_to_siblings(&txn, &updated).await?;
            info!("Replicated block {} to {} shared siblings", id, count);
        }
        txn.commit().await?;

        info!("Updated block {} on page {}", id, updated.page_id);
        Ok(updated)
    }

    /// Copy a shared block's data, controller, delete flag, TTL and
    /// translations to every other block on the same path.
    ///
    /// Runs on `conn` so an update can replicate inside its own
    /// transaction. Concurrent edits are last-write-wins; there is no
    /// version check.
    pub async fn propagate_to_siblings<C: ConnectionTrait>(
        &self,
        conn: &C,
        block: &page_blocks::Model,
    ) -> BlockResult<usize> {
        let siblings = PageBlocks::find()
            .filter(page_blocks::Column::Path.eq(block.path.as_str()))
            .filter(page_blocks::Column::Id.ne(block.id))
            .all(conn)
            .await?;

        let now = Utc::now();
        let count = siblings.len();
        for sibling in siblings {
            let page_id = sibling.page_id;
            let sibling_id = sibling.id;
            let mut active: page_blocks::ActiveModel = sibling.into();
            active.data = Set(block.data.clone());
            active.controller = Set(block.controller.clone());
            active.is_delete_denied = Set(block.is_delete_denied);
            active.cache_ttl = Set(block.cache_ttl);
            active.updated_at = Set(now);
            active.update(conn).await?;

            translation_service::mirror(
                conn,
                page_blocks::TABLE_NAME,
                page_blocks::DATA_COLUMN,
                block.id,
                sibling_id,
            )
            .await?;
            touch_page(conn, page_id).await?;
        }
        Ok(count)
    }

    /// Give each block a 1-based order matching its position in `ids`
    pub async fn reorder(&self, ids: &[i32]) -> BlockResult<()> {
        let now = Utc::now();
        let txn = self.db.begin().await?;
        for (index, id) in ids.iter().enumerate() {
            let block = PageBlocks::find_by_id(*id)
                .one(&txn)
                .await?
                .ok_or(BlockError::BlockNotFound(*id))?;
            let mut active: page_blocks::ActiveModel = block.into();
            active.order = Set(index as i64 + 1);
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        txn.commit().await?;
        Ok(())
    }

    pub async fn set_minimized(&self, id: i32, is_minimized: bool) -> BlockResult<page_blocks::Model> {
        let block = self.find_block(id).await?;
        let mut active: page_blocks::ActiveModel = block.into();
        active.is_minimized = Set(is_minimized);
        Ok(active.update(&self.db).await?)
    }

    /// Delete a block together with its translations.
    ///
    /// Store failures come back as `DeleteFailed` with nothing removed.
    pub async fn delete(&self, id: i32) -> BlockResult<()> {
        let block = self.find_block(id).await?;

        let result = async {
            let txn = self.db.begin().await?;
            translation_service::delete_for_record(&txn, page_blocks::TABLE_NAME, id).await?;
            PageBlocks::delete_by_id(id).exec(&txn).await?;
            touch_page(&txn, block.page_id).await?;
            txn.commit().await?;
            Ok::<(), DbErr>(())
        }
        .await;

        match result {
            Ok(()) => {
                info!("Deleted block {} from page {}", id, block.page_id);
                Ok(())
            }
            Err(e) => {
                warn!("Unable to delete block {}: {}", id, e);
                Err(BlockError::DeleteFailed {
                    id,
                    reason: e.to_string(),
                })
            }
        }
    }

    pub async fn change_layout(&self, page_id: i32, layout: Option<String>) -> BlockResult<pages::Model> {
        let page = Pages::find_by_id(page_id)
            .one(&self.db)
            .await?
            .ok_or(BlockError::PageNotFound(page_id))?;
        let mut active: pages::ActiveModel = page.into();
        active.layout = Set(layout.filter(|l| !l.trim().is_empty()));
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    /// Schema used to edit `block`. Template blocks must be configured;
    /// include blocks only have one when their path is configured.
    fn schema_for(&self, block: &page_blocks::Model) -> BlockResult<Option<TemplateSchema>> {
        let templates = self.blocks.templates();
        if block.is_include() {
            return Ok(templates.resolve(&block.path).ok());
        }
        templates.resolve(&block.path).map(Some)
    }
}

/// Bump the owning page's `updated_at`
async fn touch_page<C: ConnectionTrait>(conn: &C, page_id: i32) -> Result<(), DbErr> {
    if let Some(page) = Pages::find_by_id(page_id).one(conn).await? {
        let mut active: pages::ActiveModel = page.into();
        active.updated_at = Set(Utc::now());
        active.update(conn).await?;
    }
    Ok(())
}
