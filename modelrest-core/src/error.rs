//! Error types and result types for document store operations.
//!
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations. Schema
//! validation and query translation keep their own error enums
//! ([`ValidationError`], [`QueryError`]) which convert into [`DocumentStoreError`] with `?`.

use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::{schema::ValidationError, translate::QueryError};

/// Errors raised by stores, repositories and the result pipeline.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// A model could not be converted to or from its stored form.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// (id, collection) of a replacement whose target does not exist.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// A stored value is not a document, or a model is not an object.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The document violates the model schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The query parameters could not be translated into a filter expression.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A query matched no documents in the collection.
    #[error("No documents in collection {0} match the query")]
    NoMatch(String),
    /// Engine-specific failure.
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
