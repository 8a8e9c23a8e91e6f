//! Executes translated list requests and renders their results.

use serde_json::Value;
use tracing::debug;

use crate::{
    collection::{DynCollection, into_document},
    error::{DocumentStoreError, DocumentStoreResult},
    schema::ModelSchema,
    translate::ListRequest,
};

/// Runs a [`ListRequest`] against a collection and serializes the selected window.
#[derive(Debug, Clone, Copy)]
pub struct ResultPipeline<'a> {
    schema: &'a ModelSchema,
}

impl<'a> ResultPipeline<'a> {
    pub fn new(schema: &'a ModelSchema) -> Self {
        Self { schema }
    }

    /// Returns the selected page of matching records as JSON objects.
    ///
    /// Fails with [`DocumentStoreError::NoMatch`] when the filter matches nothing, even
    /// when no filter was given. A page past the last match is an empty result.
    pub async fn run(
        &self,
        collection: &DynCollection<'_>,
        request: &ListRequest,
    ) -> DocumentStoreResult<Vec<Value>> {
        let query = request.to_query();

        debug!(
            collection = collection.name(),
            filter = ?query.filter,
            sort = ?query.sort,
            offset = ?query.offset,
            limit = ?query.limit,
            "running list query"
        );

        let page = collection.query(query).await?;
        debug!(
            collection = collection.name(),
            matched = page.count,
            returned = page.items.len(),
            "query finished"
        );

        if page.count == 0 {
            return Err(DocumentStoreError::NoMatch(collection.name().to_string()));
        }

        page.items
            .into_iter()
            .map(|bson| into_document(bson).map(|doc| self.schema.to_json(&doc)))
            .collect()
    }
}
