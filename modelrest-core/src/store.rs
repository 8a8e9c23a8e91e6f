//! Main document store interface.
//!
//! - [`DocumentStore`] - Store bound to a concrete backend type
//! - [`DynDocumentStore`] - Store over a boxed backend, for sharing across request handlers
//!
//! # Example
//!
//! ```ignore
//! use modelrest::prelude::*;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let users = store.repository::<User>();
//!
//! let shared: DynDocumentStore = store.into_dyn();
//! let users = shared.collection("users");
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{DynCollection, Repository},
    model::Model,
};

/// A document store bound to a specific backend implementation.
#[derive(Debug, Clone)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets the repository for a model type.
    ///
    /// The collection name is the model's resource name.
    pub fn repository<M: Model>(&self) -> Repository<'_, M> {
        Repository::new(&self.backend)
    }

    /// Gets an untyped collection by name.
    pub fn collection(&self, name: &str) -> DynCollection<'_> {
        DynCollection::new(name.to_string(), &self.backend)
    }
}

/// A document store over a type-erased backend.
#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    pub fn repository<M: Model>(&self) -> Repository<'_, M> {
        Repository::new(&*self.backend)
    }

    pub fn collection(&self, name: &str) -> DynCollection<'_> {
        DynCollection::new(name.to_string(), &*self.backend)
    }
}

/// Conversion into an owned [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
