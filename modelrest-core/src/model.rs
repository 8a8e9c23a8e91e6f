//! Core traits for models persisted in a document store.
//!
//! A model is a serde-serializable record with an optional string identifier and a static
//! [`ModelSchema`]. Models are usually declared with `#[derive(Model)]` from the `modelrest`
//! crate, which generates the schema from field attributes.

use bson::Document as BsonDocument;
use serde::{Deserialize, Serialize};
use serde_json::{Value, from_value, to_value};
use uuid::Uuid;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    schema::{ID_FIELD, ModelSchema},
};

/// Core trait that all models stored in a document store must implement.
///
/// # Example
///
/// ```ignore
/// use modelrest::prelude::*;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Tag {
///     pub id: Option<String>,
///     pub label: String,
/// }
///
/// impl Model for Tag {
///     fn id(&self) -> Option<&str> {
///         self.id.as_deref()
///     }
///
///     fn set_id(&mut self, id: String) {
///         self.id = Some(id);
///     }
///
///     fn schema() -> &'static ModelSchema {
///         static SCHEMA: std::sync::OnceLock<ModelSchema> = std::sync::OnceLock::new();
///         SCHEMA.get_or_init(|| {
///             ModelSchema::builder("Tag", "tags")
///                 .field(FieldDescriptor::new("label", FieldKind::String).not_empty())
///                 .build()
///         })
///     }
/// }
/// ```
pub trait Model: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns the identifier, or `None` before the first save.
    fn id(&self) -> Option<&str>;

    /// Assigns the identifier. Called once, on first save.
    fn set_id(&mut self, id: String);

    /// Returns the static field schema of this model type.
    fn schema() -> &'static ModelSchema;

    /// Returns the name of the collection this model is stored in.
    fn collection_name() -> &'static str {
        Self::schema().resource()
    }
}

/// Extension trait converting models to and from stored documents.
///
/// This trait is automatically implemented for all types that implement [`Model`].
pub trait ModelExt: Model {
    /// Converts this model to a validated stored document, without the identifier.
    fn to_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a model from a stored document.
    fn from_document(doc: &BsonDocument) -> DocumentStoreResult<Self>;

    /// Converts this model to its response representation, including `id` and `type`.
    fn to_json(&self) -> DocumentStoreResult<Value>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> DocumentStoreResult<BsonDocument> {
        match to_value(self)? {
            Value::Object(body) => Ok(Self::schema().document_from_json(&body)?),
            _ => Err(DocumentStoreError::InvalidDocument(format!(
                "{} does not serialize to an object",
                Self::schema().type_name()
            ))),
        }
    }

    fn from_document(doc: &BsonDocument) -> DocumentStoreResult<Self> {
        Ok(from_value(Self::schema().to_json(doc))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        let mut doc = self.to_document()?;

        if let Some(id) = self.id() {
            doc.insert(ID_FIELD, id);
        }

        Ok(Self::schema().to_json(&doc))
    }
}

/// Generates a fresh opaque identifier.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
