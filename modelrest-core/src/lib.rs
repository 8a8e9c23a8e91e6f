//! Core of the modelrest project: declarative models exposed as REST resources over a
//! JSON document store.
//!
//! This crate provides:
//!
//! - **Model schemas** ([`schema`]) - Typed field descriptors, validators and the document codec
//! - **Model trait** ([`model`]) - The contract every persisted model implements
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing different storage backends
//! - **Query and filtering API** ([`query`]) - Filter expressions, sorting and the visitor used by backends
//! - **Query translation** ([`translate`]) - Turns query-string parameters into a filter expression
//! - **Result pipeline** ([`pipeline`]) - Counts, sorts, paginates and serializes query results
//! - **Collections and repositories** ([`collection`]) - Untyped and typed access to a collection
//! - **Document store** ([`store`]) - Entry point owning a backend
//! - **Model registry** ([`registry`]) - Resource name to schema lookup built once at startup
//! - **Pagination** ([`page`]) - 1-based page windows
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use modelrest::prelude::*;
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
//! let store = DocumentStore::new(InMemoryStore::new());
//! let mut user = User { id: None, name: "Alice".into(), sequence: Some(1) };
//! let id = store.repository::<User>().save(&mut user).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as modelrest_core;

pub mod backend;
pub mod collection;
pub mod error;
pub mod model;
pub mod page;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod schema;
pub mod store;
pub mod translate;
pub mod value;
