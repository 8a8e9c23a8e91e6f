//! In-memory document storage backend for modelrest.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and suits development,
//! testing and small deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Insertion order** - Unsorted results and sort ties follow the order documents were stored
//! - **Full query support** - Filtering, counting, sorting and pagination
//!
//! # Quick Start
//!
//! ```ignore
//! use modelrest::prelude::*;
//!
//! let backend = InMemoryStore::builder().build().await?;
//! let store = DocumentStore::new(backend);
//!
//! let mut user = User { id: None, name: "Alice".into(), ..Default::default() };
//! store.repository::<User>().save(&mut user).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as modelrest_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
