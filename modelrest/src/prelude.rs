//! Convenient re-exports of commonly used types from modelrest.
//!
//! ```ignore
//! use modelrest::prelude::*;
//! ```

pub use modelrest_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::{DynCollection, Repository},
    error::{DocumentStoreError, DocumentStoreResult},
    model::{Model, ModelExt},
    page::{Page, PaginationParams},
    pipeline::ResultPipeline,
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    registry::{ModelRegistry, ModelRegistryBuilder},
    schema::{FieldDescriptor, FieldKind, ModelSchema, ValidationError},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
    translate::{ListRequest, QueryError, QueryTranslator},
};

pub use modelrest_macros::Model;
pub use modelrest_memory::InMemoryStore;
