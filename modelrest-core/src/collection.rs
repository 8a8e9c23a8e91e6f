//! Collection types for document store operations.
//!
//! - [`DynCollection`] - Untyped access to one collection with explicit BSON documents
//! - [`Repository`] - Typed persistence boundary for a [`Model`] type
//!
//! # Example
//!
//! ```ignore
//! use modelrest::prelude::*;
//!
//! let users = store.repository::<User>();
//! let mut user = User::new("Alice");
//! let id = users.save(&mut user).await?;
//!
//! assert_eq!(users.find_by_id(&id).await?.map(|u| u.name), Some("Alice".into()));
//! assert_eq!(users.delete(&id).await?, 1);
//! ```

use bson::{Bson, Document as BsonDocument};
use std::marker::PhantomData;
use tracing::debug;

use crate::{
    backend::DynStoreBackend,
    error::{DocumentStoreError, DocumentStoreResult},
    model::{Model, ModelExt, generate_id},
    page::Page,
    query::{Expr, Query},
    schema::ID_FIELD,
};

/// An untyped collection backed by a dynamically dispatched backend.
#[derive(Debug)]
pub struct DynCollection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynCollection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts or replaces documents.
    pub async fn upsert(&self, documents: Vec<(String, Bson)>) -> DocumentStoreResult<()> {
        self.backend.upsert_documents(documents, &self.name).await
    }

    /// Replaces existing documents; fails if an identifier does not exist.
    pub async fn update(&self, documents: Vec<(String, Bson)>) -> DocumentStoreResult<()> {
        self.backend.update_documents(documents, &self.name).await
    }

    /// Deletes documents by identifier and returns how many were removed.
    pub async fn delete<U>(&self, ids: Vec<U>) -> DocumentStoreResult<u64>
    where
        U: Into<String>,
    {
        self.backend
            .delete_documents(ids.into_iter().map(Into::into).collect(), &self.name)
            .await
    }

    /// Removes every document and returns how many were removed.
    pub async fn clear(&self) -> DocumentStoreResult<u64> {
        self.backend.clear_collection(&self.name).await
    }

    pub async fn get<U>(&self, ids: Vec<U>) -> DocumentStoreResult<Vec<Bson>>
    where
        U: Into<String>,
    {
        self.backend
            .get_documents(ids.into_iter().map(Into::into).collect(), &self.name)
            .await
    }

    /// Fetches a single document by identifier.
    pub async fn find_one(&self, id: &str) -> DocumentStoreResult<Option<BsonDocument>> {
        self.get(vec![id])
            .await?
            .into_iter()
            .next()
            .map(into_document)
            .transpose()
    }

    /// Runs a query and returns the selected window along with the total match count.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<Page<Bson>> {
        self.backend.query_documents(query, &self.name).await
    }

    /// Counts documents matching the filter, or all documents for `None`.
    pub async fn count(&self, filter: Option<Expr>) -> DocumentStoreResult<u64> {
        self.backend.count_documents(filter, &self.name).await
    }
}

/// Typed persistence boundary for one model type.
///
/// The collection name is the model's resource name.
#[derive(Debug)]
pub struct Repository<'a, M: Model> {
    collection: DynCollection<'a>,
    _marker: PhantomData<M>,
}

impl<'a, M: Model> Repository<'a, M> {
    pub(crate) fn new(backend: &'a dyn DynStoreBackend) -> Self {
        Self {
            collection: DynCollection::new(M::collection_name().to_string(), backend),
            _marker: PhantomData,
        }
    }

    /// Returns the untyped view of the underlying collection.
    pub fn collection(&self) -> &DynCollection<'a> {
        &self.collection
    }

    /// Validates and persists a model, assigning an identifier on first save.
    ///
    /// Saving a model that already has an identifier replaces the stored record, or
    /// creates it under that identifier if it does not exist yet.
    pub async fn save(&self, model: &mut M) -> DocumentStoreResult<String> {
        let mut doc = model.to_document()?;

        let id = match model.id() {
            Some(id) => id.to_string(),
            None => {
                let id = generate_id();
                model.set_id(id.clone());
                id
            }
        };

        doc.insert(ID_FIELD, id.clone());
        self.collection
            .upsert(vec![(id.clone(), Bson::Document(doc))])
            .await?;

        debug!(collection = self.collection.name(), %id, "saved model");

        Ok(id)
    }

    /// Deletes one record and returns how many were removed (0 or 1).
    pub async fn delete(&self, id: &str) -> DocumentStoreResult<u64> {
        self.collection.delete(vec![id]).await
    }

    /// Deletes every record of this model and returns how many were removed.
    pub async fn delete_all(&self) -> DocumentStoreResult<u64> {
        self.collection.clear().await
    }

    pub async fn find_by_id(&self, id: &str) -> DocumentStoreResult<Option<M>> {
        self.collection
            .find_one(id)
            .await?
            .map(|doc| M::from_document(&doc))
            .transpose()
    }

    pub async fn find_by_query(&self, query: Query) -> DocumentStoreResult<Vec<M>> {
        self.collection
            .query(query)
            .await?
            .items
            .into_iter()
            .map(|bson| into_document(bson).and_then(|doc| M::from_document(&doc)))
            .collect()
    }

    /// Counts all stored records of this model.
    pub async fn count(&self) -> DocumentStoreResult<u64> {
        self.collection.count(None).await
    }
}

/// Unwraps a stored value that must be a document.
pub fn into_document(bson: Bson) -> DocumentStoreResult<BsonDocument> {
    match bson {
        Bson::Document(doc) => Ok(doc),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "expected a document, found {:?}",
            other.element_type()
        ))),
    }
}
