use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const TABLE_NAME: &str = "page_blocks";
pub const DATA_COLUMN: &str = "data";

/// Block type values as stored in `page_blocks.type`
pub struct BlockType;

impl BlockType {
    pub const TEMPLATE: &'static str = "template";
    pub const INCLUDE: &'static str = "include";
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "page_blocks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub page_id: i32,
    #[sea_orm(column_name = "type")]
    #[serde(rename = "type")]
    pub block_type: String,
    pub path: String,
    pub controller: Option<String>,
    pub data: String, // JSON object, default-locale values
    pub order: i64,
    pub is_hidden: bool,
    pub is_minimized: bool,
    pub is_delete_denied: bool,
    pub cache_ttl: Option<i32>, // minutes
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::pages::Entity",
        from = "Column::PageId",
        to = "super::pages::Column::Id",
        on_delete = "Cascade"
    )]
    Pages,
}

impl Related<super::pages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Pages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_include(&self) -> bool {
        self.block_type == BlockType::INCLUDE
    }

    pub fn is_template(&self) -> bool {
        self.block_type == BlockType::TEMPLATE
    }

    /// Decode the stored default-locale data
    pub fn data_map(&self) -> Result<Map<String, Value>, serde_json::Error> {
        decode_data(&self.data)
    }
}

/// Decode block data from its storage representation.
///
/// Empty or `null` payloads (include blocks are created without data)
/// decode to an empty map.
pub fn decode_data(raw: &str) -> Result<Map<String, Value>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        // Older rows may hold the object double-encoded as a JSON string
        Value::String(inner) => decode_data(&inner),
        other => Err(serde::de::Error::custom(format!(
            "block data must be a JSON object, got {}",
            other
        ))),
    }
}

pub fn encode_data(data: &Map<String, Value>) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}
