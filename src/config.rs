//! ## Structure
//! Application configuration, loaded from a YAML file.
//!
//! ```text
//! AppConfig
//!   ├── environment: Environment (local | development | testing | production)
//!   ├── server: { host, port }
//!   ├── database: { url }
//!   ├── locales: { default, available }
//!   ├── storage: { root }
//!   ├── views: { directory? }
//!   ├── cache: { route_table_ttl_minutes, default_block_ttl_minutes }
//!   ├── includes: { default_controller }
//!   └── page_blocks: PageBlocksConfig
//!       └── <path>: BlockTemplateConfig
//!           ├── name, template, type, shared
//!           └── fields: <key>: FieldConfig
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Development,
    Testing,
    #[default]
    Production,
}

impl Environment {
    /// Local and development runtimes skip the default render cache
    pub fn is_local(&self) -> bool {
        matches!(self, Environment::Local | Environment::Development)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub locales: LocaleConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub views: ViewsConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub includes: IncludesConfig,
    #[serde(default)]
    pub page_blocks: PageBlocksConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:pageblocks.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LocaleConfig {
    pub default: String,
    #[serde(default)]
    pub available: Vec<String>,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            available: vec!["en".to_string()],
        }
    }
}

impl LocaleConfig {
    /// All configured locales, default locale first
    pub fn all(&self) -> Vec<String> {
        let mut locales = vec![self.default.clone()];
        for locale in &self.available {
            if !locales.contains(locale) {
                locales.push(locale.clone());
            }
        }
        locales
    }

    pub fn is_default(&self, locale: &str) -> bool {
        self.default == locale
    }

    pub fn contains(&self, locale: &str) -> bool {
        self.default == locale || self.available.iter().any(|l| l == locale)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StorageConfig {
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "storage/app".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ViewsConfig {
    pub directory: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CacheConfig {
    pub route_table_ttl_minutes: u64,
    pub default_block_ttl_minutes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            route_table_ttl_minutes: 5,
            default_block_ttl_minutes: 1,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IncludesConfig {
    pub default_controller: String,
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self {
            default_controller: "pages.recent".to_string(),
        }
    }
}

/// Static block configuration, keyed by block path
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct PageBlocksConfig(IndexMap<String, BlockTemplateConfig>);

impl PageBlocksConfig {
    pub fn new(blocks: IndexMap<String, BlockTemplateConfig>) -> Self {
        Self(blocks)
    }

    pub fn get(&self, path: &str) -> Option<&BlockTemplateConfig> {
        self.0.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BlockTemplateConfig)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct BlockTemplateConfig {
    pub name: Option<String>,
    pub template: Option<String>,
    /// Enforced block type; overrides whatever the editor asked for
    #[serde(rename = "type")]
    pub block_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub shared: bool,
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct FieldConfig {
    pub field: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub required: bool,
    pub details: Option<Value>,
    pub placeholder: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub translatable: bool,
}

// Flags show up as `true`, `1` or `"1"` in hand-written config
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(truthy(&value))
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|n| n != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.trim(), "" | "0" | "false" | "off" | "no"),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

impl AppConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No configuration at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration {:?}", path))?;
        Self::from_yaml_str(&content)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
