//! Resource name to model schema lookup.
//!
//! The registry is built once at startup and shared read-only afterwards.
//!
//! ```ignore
//! let registry = ModelRegistry::builder()
//!     .register::<User>()
//!     .register::<Group>()
//!     .build();
//!
//! let schema = registry.resolve("users").expect("registered");
//! ```

use std::{collections::HashMap, sync::Arc};

use tracing::warn;

use crate::{model::Model, schema::ModelSchema};

/// Immutable set of exposed model schemas, keyed by resource name.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: Arc<HashMap<String, Arc<ModelSchema>>>,
}

impl ModelRegistry {
    pub fn builder() -> ModelRegistryBuilder {
        ModelRegistryBuilder::default()
    }

    /// Looks up the schema exposed under a resource name.
    pub fn resolve(&self, resource: &str) -> Option<&ModelSchema> {
        self.models.get(resource).map(Arc::as_ref)
    }

    /// Registered resource names, sorted.
    pub fn resources(&self) -> Vec<&str> {
        let mut names = self.models.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ModelRegistryBuilder {
    models: HashMap<String, Arc<ModelSchema>>,
}

impl ModelRegistryBuilder {
    /// Exposes a model type under its resource name.
    pub fn register<M: Model>(self) -> Self {
        self.register_schema(M::schema().clone())
    }

    /// Exposes a schema built at runtime. A later registration of the same resource wins.
    pub fn register_schema(mut self, schema: ModelSchema) -> Self {
        let resource = schema.resource().to_string();

        if self.models.insert(resource.clone(), Arc::new(schema)).is_some() {
            warn!(%resource, "resource registered twice; keeping the latest schema");
        }

        self
    }

    pub fn build(self) -> ModelRegistry {
        ModelRegistry {
            models: Arc::new(self.models),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldKind};

    fn schema(type_name: &str, resource: &str) -> ModelSchema {
        ModelSchema::builder(type_name, resource)
            .field(FieldDescriptor::new("name", FieldKind::String))
            .build()
    }

    #[test]
    fn resolves_registered_resources() {
        let registry = ModelRegistry::builder()
            .register_schema(schema("User", "users"))
            .register_schema(schema("Group", "groups"))
            .build();

        assert_eq!(registry.resolve("users").map(|s| s.type_name()), Some("User"));
        assert_eq!(registry.resources(), vec!["groups", "users"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn unknown_resource_is_none() {
        let registry = ModelRegistry::builder()
            .register_schema(schema("User", "users"))
            .build();

        assert!(registry.resolve("uzerz").is_none());
    }

    #[test]
    fn later_registration_wins() {
        let registry = ModelRegistry::builder()
            .register_schema(schema("User", "users"))
            .register_schema(schema("Member", "users"))
            .build();

        assert_eq!(registry.resolve("users").map(|s| s.type_name()), Some("Member"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn clones_share_the_same_table() {
        let registry = ModelRegistry::builder()
            .register_schema(schema("User", "users"))
            .build();
        let clone = registry.clone();

        assert!(Arc::ptr_eq(&registry.models, &clone.models));
        assert!(ModelRegistry::default().is_empty());
    }
}
