//! Main modelrest crate: declarative models stored in a document store and exposed as
//! REST resources.
//!
//! This crate is the primary entry point. It re-exports the core types, the in-memory
//! backend and the `Model` derive macro.
//!
//! # Features
//!
//! - **Declarative models** - `#[derive(Model)]` turns a serde struct into a typed, validated schema
//! - **Repositories** - save, delete, find-by-id, find-by-query, count and delete-all per model
//! - **Query strings** - `QueryTranslator` turns `name=~Ali&sequence=>20&sort_by=sequence` into a filter
//! - **Result pipeline** - sorting, pagination and JSON rendering of matches
//!
//! # Quick Start
//!
//! ```ignore
//! use modelrest::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Model)]
//! #[model(resource = "users", type_name = "User")]
//! pub struct User {
//!     pub id: Option<String>,
//!     #[field(not_empty)]
//!     pub name: String,
//!     pub sequence: Option<i64>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let users = store.repository::<User>();
//!
//!     let mut alice = User { id: None, name: "Alice".into(), sequence: Some(1) };
//!     let id = users.save(&mut alice).await?;
//!
//!     let request = QueryTranslator::new(User::schema()).translate([("name", "~Ali")])?;
//!     let found = users.find_by_query(request.to_query()).await?;
//!     assert_eq!(found[0].id.as_deref(), Some(id.as_str()));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A typed `DocumentStore` converts into a `DynDocumentStore` with `into_dyn`, which is what
//! the HTTP layer holds so that any backend can serve requests.
//!
//! ```ignore
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//! let users = store.collection("users");
//! let records = ResultPipeline::new(User::schema()).run(&users, &request).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as modelrest;

pub mod prelude;

pub use modelrest_core::{
    backend, collection, error, model, page, pipeline, query, registry, schema, store, translate,
    value,
};

pub use modelrest_macros::Model;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use modelrest_memory::{InMemoryStore, InMemoryStoreBuilder};
}
