//! Application state for the HTTP server.

use std::sync::Arc;

use modelrest::{
    page::DEFAULT_PAGE_SIZE, registry::ModelRegistry, schema::ModelSchema, store::DynDocumentStore,
};

use crate::error::ApiError;

/// Shared application state passed to all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Models exposed over HTTP, keyed by resource name
    pub registry: ModelRegistry,
    /// Backing store for every resource
    pub store: Arc<DynDocumentStore>,
    /// Page size used when only `page` is given
    pub default_page_size: usize,
}

impl AppState {
    pub fn new(registry: ModelRegistry, store: DynDocumentStore) -> Self {
        Self {
            registry,
            store: Arc::new(store),
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Resolves the schema exposed under `resource`.
    pub fn schema(&self, resource: &str) -> Result<&ModelSchema, ApiError> {
        self.registry
            .resolve(resource)
            .ok_or_else(|| ApiError::UnknownResource(resource.to_string()))
    }
}
