//! Page block error types
//!
//! ```rust
//! use pageblocks::errors::{BlockError, ValidationErrors};
//!
//! let mut errors = ValidationErrors::default();
//! errors.add("title", "The Title field is required.");
//! let err = BlockError::Validation(errors);
//! assert!(err.is_client_error());
//! ```

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Field-level validation messages, in field declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(IndexMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .flat_map(|(_, messages)| messages.iter().cloned())
            .collect();
        write!(f, "{}", messages.join(" "))
    }
}

/// Page block errors
#[derive(Error, Debug)]
pub enum BlockError {
    /// Page not found by ID
    #[error("Page {0} not found")]
    PageNotFound(i32),

    /// Page block not found by ID
    #[error("Page block {0} not found")]
    BlockNotFound(i32),

    /// No active page is bound to the requested path
    #[error("No active page for '{0}'")]
    RouteNotFound(String),

    /// Block path has no entry in the page block configuration
    #[error("Page block template '{0}' is not configured")]
    ConfigurationMissing(String),

    /// Submitted block data failed schema validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Translatable field submitted without its `<field>_i18n` payload
    #[error("Invalid translatable field '{0}'")]
    InvalidTranslatableField(String),

    /// Requested block type could not be parsed
    #[error("Invalid block type '{0}'")]
    InvalidBlockType(String),

    /// Delete failed at the storage layer
    #[error("Unable to delete page block {id}: {reason}")]
    DeleteFailed {
        /// Block identifier
        id: i32,
        /// Reason reported by the store
        reason: String,
    },

    /// Uploaded file could not be persisted
    #[error("Storage error: {0}")]
    Storage(String),

    /// View could not be rendered
    #[error("Render error: {0}")]
    Render(String),

    /// Stored or submitted JSON could not be decoded
    #[error("Invalid block data: {0}")]
    InvalidData(#[from] serde_json::Error),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl BlockError {
    /// Check if this is a not found error (404)
    ///
    /// A block whose template configuration vanished cannot be edited
    /// either, so configuration misses count as not found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BlockError::PageNotFound(_)
                | BlockError::BlockNotFound(_)
                | BlockError::RouteNotFound(_)
                | BlockError::ConfigurationMissing(_)
        )
    }

    /// Check if this is a client error (400-series, excluding not found)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            BlockError::Validation(_)
                | BlockError::InvalidTranslatableField(_)
                | BlockError::InvalidBlockType(_)
        )
    }

    /// Field-level messages for validation failures
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            BlockError::Validation(errors) => Some(errors),
            _ => None,
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            BlockError::PageNotFound(_)
            | BlockError::BlockNotFound(_)
            | BlockError::RouteNotFound(_) => "NOT_FOUND",
            BlockError::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            BlockError::Validation(_) => "VALIDATION_FAILED",
            BlockError::InvalidTranslatableField(_) => "INVALID_TRANSLATABLE_FIELD",
            BlockError::InvalidBlockType(_) => "INVALID_BLOCK_TYPE",
            BlockError::DeleteFailed { .. } => "DELETE_FAILED",
            BlockError::Storage(_) => "STORAGE_ERROR",
            BlockError::Render(_) => "RENDER_ERROR",
            BlockError::InvalidData(_) => "INVALID_DATA",
            BlockError::Database(_) => "DATABASE_ERROR",
        }
    }
}
