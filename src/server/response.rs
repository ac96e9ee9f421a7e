//! HTTP mapping of domain errors and the flash-message body

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::{BlockError, ValidationErrors};

/// `{message, alert_type}` body returned by every admin mutation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flash {
    pub message: String,
    pub alert_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            alert_type: "success".to_string(),
            id: None,
            errors: None,
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            alert_type: "danger".to_string(),
            id: None,
            errors: None,
        }
    }

    pub fn with_id(mut self, id: i32) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug)]
pub enum ApiError {
    Block(BlockError),
    BadRequest(String),
}

impl From<BlockError> for ApiError {
    fn from(err: BlockError) -> Self {
        ApiError::Block(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Block(err) => err.into_response(),
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(Flash::danger(message))).into_response()
            }
        }
    }
}

impl IntoResponse for BlockError {
    fn into_response(self) -> Response {
        let status = match &self {
            BlockError::ConfigurationMissing(_) | BlockError::DeleteFailed { .. } => {
                StatusCode::CONFLICT
            }
            err if err.is_not_found() => StatusCode::NOT_FOUND,
            BlockError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            err => {
                error!("Request failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut flash = Flash::danger(self.to_string());
        if let BlockError::Validation(errors) = self {
            flash.message = "The given data was invalid.".to_string();
            flash.errors = Some(errors);
        }
        (status, Json(flash)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let status = |err: BlockError| err.into_response().status();
        assert_eq!(status(BlockError::BlockNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(BlockError::ConfigurationMissing("hero".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status(BlockError::Validation(ValidationErrors::default())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(BlockError::InvalidTranslatableField("title".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(BlockError::Render("boom".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
