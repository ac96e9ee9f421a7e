//! Domain error types for the page block system
//!
//! Every service returns [`BlockError`]; collaborator seams (views, file
//! store, include handlers) return `anyhow::Result` and are converted at
//! the service boundary.
//!
//! # Error Categories
//!
//! - **Not found**: missing page, block or route (404-equivalent)
//! - **Validation**: field-level messages, re-presented to the editor
//! - **Configuration missing**: a block path with no template configuration
//! - **Invalid translatable field**: a translatable field submitted without
//!   its companion `<field>_i18n` payload
//! - **Delete failed**: storage-level delete failure, reported non-fatally
//!
//! # Examples
//!
//! ```rust
//! use pageblocks::errors::BlockError;
//!
//! let err = BlockError::BlockNotFound(7);
//! assert!(err.is_not_found());
//! assert_eq!(err.error_code(), "NOT_FOUND");
//! ```

pub mod block;

pub use block::{BlockError, ValidationErrors};

/// Result type alias for page block operations
pub type BlockResult<T> = Result<T, BlockError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_result_alias() {
        let result: BlockResult<i32> = Err(BlockError::PageNotFound(1));
        assert!(result.is_err());
    }
}
