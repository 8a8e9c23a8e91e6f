//! Storage backend traits.
//!
//! [`StoreBackend`] is what a storage engine implements; [`DynStoreBackend`] is its
//! object-safe mirror, blanket-implemented for every backend so that the HTTP layer can hold
//! a `Box<dyn DynStoreBackend>`.
//!
//! Documents are BSON documents keyed by an opaque string identifier. Backends keep
//! insertion order: a query without a sort returns documents in the order they were first
//! stored, and sorting breaks ties by that same order.

use async_trait::async_trait;
use bson::Bson;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    page::Page,
    query::{Expr, Query},
};

/// A document storage engine.
///
/// Each call is atomic on its own and there are no multi-call transactions. Concurrent
/// writes to one identifier resolve as last-writer-wins.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts or replaces documents. The collection is created if it does not exist.
    ///
    /// A replaced document keeps its original position in insertion order.
    async fn upsert_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents entirely.
    ///
    /// Fails with [`DocumentNotFound`](crate::error::DocumentStoreError::DocumentNotFound)
    /// if any identifier does not exist.
    async fn update_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Deletes documents by identifier and returns how many were removed.
    ///
    /// Missing identifiers are skipped, so deleting twice is harmless.
    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<u64>;

    /// Removes every document of a collection and returns how many were removed.
    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<u64>;

    /// Retrieves documents by identifier. Missing identifiers are omitted from the result.
    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Queries documents using a structured query.
    ///
    /// The filter is applied first, then the sort, then offset and limit. The page's
    /// `count` is the number of filter matches, taken from the same snapshot as the items.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Page<Bson>>;

    /// Counts the documents matching a filter, or all documents when the filter is `None`.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
}

/// Object-safe counterpart of [`StoreBackend`], implemented for every backend.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn upsert_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<u64>;
    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<u64>;
    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Page<Bson>>;
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn upsert_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::upsert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(String, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn delete_documents(&self, ids: Vec<String>, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn clear_collection(&self, collection: &str) -> DocumentStoreResult<u64> {
        StoreBackend::clear_collection(self, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<String>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Page<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }
}

/// Factory for backends that need asynchronous setup.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
