//! Admin endpoints for editing the blocks of a page

use std::collections::HashMap;

use axum::{
    extract::{Multipart, Path, State},
    response::{Json, Redirect},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::blocks::TemplateSchema;
use crate::config::truthy;
use crate::database::entities::page_blocks::{self, BlockType};
use crate::database::entities::pages;
use crate::files::UploadedFile;
use crate::server::app::AppState;
use crate::server::response::{ApiError, Flash};
use crate::services::BlockUpdate;

#[derive(Serialize, Deserialize)]
pub struct CreateBlockRequest {
    pub page_id: i32,
    #[serde(rename = "type")]
    pub block_type: String,
}

#[derive(Serialize, Deserialize)]
pub struct SortItem {
    pub id: i32,
}

#[derive(Serialize, Deserialize)]
pub struct SortRequest {
    pub order: Vec<SortItem>,
}

#[derive(Serialize, Deserialize)]
pub struct MinimizeRequest {
    pub id: i32,
    pub is_minimized: bool,
}

#[derive(Serialize, Deserialize)]
pub struct LayoutRequest {
    pub layout: Option<String>,
}

#[derive(Serialize)]
pub struct BlockView {
    #[serde(flatten)]
    pub block: page_blocks::Model,
    pub values: Map<String, Value>,
    pub schema: Option<TemplateSchema>,
    pub error: Option<String>,
}

#[derive(Serialize)]
pub struct BlockTypeOption {
    pub value: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct PageBlocksView {
    pub page: pages::Model,
    pub blocks: Vec<BlockView>,
    pub types: Vec<BlockTypeOption>,
    pub includes: Vec<String>,
}

pub async fn index() -> Redirect {
    Redirect::to("/admin/pages")
}

/// Page with its blocks, each carrying its schema or a configuration message
pub async fn edit(
    State(state): State<AppState>,
    Path(page_id): Path<i32>,
) -> Result<Json<PageBlocksView>, ApiError> {
    let (page, models) = state.editor.page_with_blocks(page_id).await?;
    let templates = state.blocks.templates();

    let blocks = models
        .into_iter()
        .map(|block| {
            let values = block.data_map().unwrap_or_else(|e| {
                warn!("Block {} holds unreadable data: {}", block.id, e);
                Map::new()
            });
            let (schema, error) = match templates.resolve(&block.path) {
                Ok(schema) => (Some(schema), None),
                Err(_) if block.is_include() => (None, None),
                Err(err) => (None, Some(err.to_string())),
            };
            BlockView {
                block,
                values,
                schema,
                error,
            }
        })
        .collect();

    let mut types: Vec<BlockTypeOption> = templates
        .all()
        .into_iter()
        .map(|schema| BlockTypeOption {
            value: format!(
                "{}|{}",
                schema.block_type.as_deref().unwrap_or(BlockType::TEMPLATE),
                schema.path
            ),
            name: schema.name,
        })
        .collect();
    types.push(BlockTypeOption {
        value: BlockType::INCLUDE.to_string(),
        name: "Include".to_string(),
    });

    Ok(Json(PageBlocksView {
        page,
        blocks,
        types,
        includes: state.blocks.includes().references(),
    }))
}

pub async fn store(
    State(state): State<AppState>,
    Json(payload): Json<CreateBlockRequest>,
) -> Result<Json<Flash>, ApiError> {
    let block = state
        .editor
        .create(payload.page_id, &payload.block_type)
        .await?;
    Ok(Json(Flash::success("Page block created").with_id(block.id)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<Flash>, ApiError> {
    let update = read_update(multipart).await?;
    let block = state.editor.update(id, update).await?;
    Ok(Json(Flash::success("Page block updated").with_id(block.id)))
}

pub async fn sort(
    State(state): State<AppState>,
    Json(payload): Json<SortRequest>,
) -> Result<Json<Flash>, ApiError> {
    let ids: Vec<i32> = payload.order.iter().map(|item| item.id).collect();
    state.editor.reorder(&ids).await?;
    Ok(Json(Flash::success("Page blocks sorted")))
}

pub async fn minimize(
    State(state): State<AppState>,
    Json(payload): Json<MinimizeRequest>,
) -> Result<Json<Flash>, ApiError> {
    let block = state
        .editor
        .set_minimized(payload.id, payload.is_minimized)
        .await?;
    Ok(Json(Flash::success("Page block updated").with_id(block.id)))
}

pub async fn change_layout(
    State(state): State<AppState>,
    Path(page_id): Path<i32>,
    Json(payload): Json<LayoutRequest>,
) -> Result<Json<Flash>, ApiError> {
    let page = state.editor.change_layout(page_id, payload.layout).await?;
    Ok(Json(Flash::success("Page layout changed").with_id(page.id)))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Flash>, ApiError> {
    state.editor.delete(id).await?;
    Ok(Json(Flash::success("Page block deleted")))
}

/// Split a multipart edit form into field values, uploads and block flags
async fn read_update(mut multipart: Multipart) -> Result<BlockUpdate, ApiError> {
    let mut update = BlockUpdate::default();
    let mut uploads: HashMap<String, Vec<UploadedFile>> = HashMap::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(|n| n.trim_end_matches("[]").to_string()) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            if file_name.is_empty() || bytes.is_empty() {
                continue;
            }
            uploads.entry(name).or_default().push(UploadedFile::new(
                file_name,
                content_type.as_deref(),
                bytes.to_vec(),
            ));
            continue;
        }

        let text = field.text().await?;
        match name.as_str() {
            "controller" => update.controller = Some(text),
            "is_hidden" => update.is_hidden = truthy(&Value::String(text)),
            "is_delete_denied" => update.is_delete_denied = truthy(&Value::String(text)),
            "cache_ttl" => {
                let text = text.trim();
                update.cache_ttl = if text.is_empty() {
                    None
                } else {
                    Some(text.parse().map_err(|_| {
                        ApiError::BadRequest(format!("Invalid cache_ttl '{}'", text))
                    })?)
                };
            }
            _ => {
                update.values.insert(name, Value::String(text));
            }
        }
    }

    update.uploads = uploads;
    Ok(update)
}
