//! Template resolver: turns a block path into its field schema

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{BlockTemplateConfig, FieldConfig, PageBlocksConfig};
use crate::errors::{BlockError, BlockResult};

pub const BREAK_FIELD_TYPE: &str = "break";

/// One normalized field of a block template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    pub field: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub required: bool,
    pub details: Value,
    pub placeholder: Option<Value>,
    pub translatable: bool,
}

impl FieldDescriptor {
    fn from_config(key: &str, config: &FieldConfig) -> Self {
        Self {
            field: config.field.clone().unwrap_or_else(|| key.to_string()),
            display_name: config.display_name.clone().unwrap_or_else(|| key.to_string()),
            field_type: config.field_type.clone(),
            required: config.required,
            details: config
                .details
                .clone()
                .unwrap_or_else(|| Value::Object(Map::new())),
            placeholder: config.placeholder.clone(),
            translatable: config.translatable,
        }
    }

    /// Layout-only marker in the admin form; carries no data
    pub fn is_break(&self) -> bool {
        self.field_type == BREAK_FIELD_TYPE
    }

    /// Fields whose value is a stored file reference
    pub fn is_upload(&self) -> bool {
        matches!(
            self.field_type.as_str(),
            "image" | "file" | "multiple_images" | "multi-image"
        )
    }

    pub fn is_multi_upload(&self) -> bool {
        matches!(self.field_type.as_str(), "multiple_images" | "multi-image")
    }

    pub fn expects_image(&self) -> bool {
        self.is_upload() && self.field_type != "file"
    }
}

/// Read-only field schema for one block path
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSchema {
    pub path: String,
    pub name: String,
    pub template: String,
    #[serde(rename = "type")]
    pub block_type: Option<String>,
    pub shared: bool,
    pub fields: Vec<FieldDescriptor>,
}

impl TemplateSchema {
    fn from_config(path: &str, config: &BlockTemplateConfig) -> Self {
        Self {
            path: path.to_string(),
            name: config.name.clone().unwrap_or_else(|| path.to_string()),
            template: config
                .template
                .clone()
                .unwrap_or_else(|| format!("blocks.{}", path)),
            block_type: config.block_type.clone(),
            shared: config.shared,
            fields: config
                .fields
                .iter()
                .map(|(key, field)| FieldDescriptor::from_config(key, field))
                .collect(),
        }
    }

    /// Fields that carry data, skipping `break` markers
    pub fn data_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_break())
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.data_fields().find(|f| f.field == name)
    }

    pub fn translatable_fields(&self) -> Vec<&str> {
        self.data_fields()
            .filter(|f| f.translatable)
            .map(|f| f.field.as_str())
            .collect()
    }

    /// Initial data for a new block: each field's placeholder, or ""
    pub fn placeholders(&self) -> Map<String, Value> {
        self.data_fields()
            .map(|f| {
                let value = f
                    .placeholder
                    .clone()
                    .unwrap_or_else(|| Value::String(String::new()));
                (f.field.clone(), value)
            })
            .collect()
    }

    /// Ensure every schema field is present in `data`, defaulting to null
    pub fn fill_missing(&self, data: &mut Map<String, Value>) {
        for field in self.data_fields() {
            data.entry(field.field.clone()).or_insert(Value::Null);
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemplateResolver {
    config: Arc<PageBlocksConfig>,
}

impl TemplateResolver {
    pub fn new(config: Arc<PageBlocksConfig>) -> Self {
        Self { config }
    }

    pub fn resolve(&self, path: &str) -> BlockResult<TemplateSchema> {
        self.config
            .get(path)
            .map(|config| TemplateSchema::from_config(path, config))
            .ok_or_else(|| BlockError::ConfigurationMissing(path.to_string()))
    }

    pub fn is_configured(&self, path: &str) -> bool {
        self.config.get(path).is_some()
    }

    pub fn is_shared(&self, path: &str) -> bool {
        self.config.get(path).map(|c| c.shared).unwrap_or(false)
    }

    /// Block type forced by configuration, if any
    pub fn enforced_type(&self, path: &str) -> Option<&str> {
        self.config.get(path).and_then(|c| c.block_type.as_deref())
    }

    /// Every configured block template, in configuration order
    pub fn all(&self) -> Vec<TemplateSchema> {
        self.config
            .iter()
            .map(|(path, config)| TemplateSchema::from_config(path, config))
            .collect()
    }
}
