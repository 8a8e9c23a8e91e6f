//! Error types and HTTP response conversion

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use modelrest::{error::DocumentStoreError, schema::ValidationError, translate::QueryError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

/// Discriminator of every error body.
pub const ERROR_MESSAGE_TYPE: &str = "ErrorMessage";

/// Error body returned for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: u16,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            kind: ERROR_MESSAGE_TYPE.to_string(),
            code: status.as_u16(),
            message: message.into(),
        }
    }
}

/// Body of write and delete responses: `{"result": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMessage<T> {
    pub result: T,
}

impl<T> ResultMessage<T> {
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

/// Errors raised while handling a request.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Unknown resource '{0}'")]
    UnknownResource(String),

    #[error("No route for '{0}'")]
    RouteNotFound(String),

    #[error("No {resource} record with id '{id}'")]
    RecordNotFound { resource: String, id: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("No {0} match the query")]
    NoMatch(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApiError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownResource(_)
            | Self::RouteNotFound(_)
            | Self::RecordNotFound { .. }
            | Self::NoMatch(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Query(e) if e.is_malformed() => StatusCode::BAD_REQUEST,
            Self::Query(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            debug!(status = status.as_u16(), error = %self, "request rejected");
        }

        (status, Json(ErrorMessage::new(status, self.to_string()))).into_response()
    }
}

impl From<DocumentStoreError> for ApiError {
    fn from(err: DocumentStoreError) -> Self {
        match err {
            DocumentStoreError::Validation(e) => Self::Validation(e),
            DocumentStoreError::Query(e) => Self::Query(e),
            DocumentStoreError::NoMatch(collection) => Self::NoMatch(collection),
            DocumentStoreError::DocumentNotFound(id, collection) => Self::RecordNotFound {
                resource: collection,
                id,
            },
            DocumentStoreError::CollectionNotFound(collection) => Self::NoMatch(collection),
            other => Self::Storage(other.to_string()),
        }
    }
}

/// Errors raised while configuring or running the server.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_kinds_map_to_404() {
        let errors = [
            ApiError::UnknownResource("uzerz".into()),
            ApiError::RouteNotFound("/".into()),
            ApiError::RecordNotFound { resource: "users".into(), id: "1234".into() },
            ApiError::NoMatch("users".into()),
            ApiError::Query(QueryError::UnknownField("xxxx".into())),
        ];

        for err in errors {
            assert_eq!(err.status(), StatusCode::NOT_FOUND, "{err}");
        }
    }

    #[test]
    fn malformed_input_maps_to_400() {
        let control = ApiError::Query(QueryError::InvalidControl {
            param: "page".into(),
            value: "0".into(),
        });

        assert_eq!(control.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Validation(ValidationError::MissingField("name".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::BadRequest("body".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_errors_convert_by_kind() {
        let missing: ApiError =
            DocumentStoreError::DocumentNotFound("42".into(), "users".into()).into();
        assert!(matches!(missing, ApiError::RecordNotFound { ref id, .. } if id == "42"));

        let backend: ApiError = DocumentStoreError::Backend("disk full".into()).into();
        assert_eq!(backend.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let invalid: ApiError =
            DocumentStoreError::Validation(ValidationError::EmptyField("name".into())).into();
        assert!(matches!(invalid, ApiError::Validation(_)));
    }

    #[test]
    fn error_message_serializes_type_key() {
        let body = serde_json::to_value(ErrorMessage::new(StatusCode::NOT_FOUND, "gone")).unwrap();

        assert_eq!(
            body,
            serde_json::json!({ "type": "ErrorMessage", "code": 404, "message": "gone" })
        );
    }
}
