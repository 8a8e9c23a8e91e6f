//! Serves the `users` resource from an in-memory store.
//!
//! ```bash
//! MODELREST_PORT=9000 MODELREST_LOG_LEVEL=debug cargo run --bin modelrest-server
//! ```

use chrono::{DateTime, Utc};
use modelrest::{
    Model,
    backend::StoreBackendBuilder,
    memory::InMemoryStore,
    registry::ModelRegistry,
    store::{DocumentStore, IntoDynDocumentStore},
};
use modelrest_server::{AppState, ServerConfig, telemetry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Model)]
#[model(resource = "users", type_name = "User")]
pub struct User {
    pub id: Option<String>,
    #[field(not_empty)]
    pub name: String,
    #[field(pattern = r"^[^@\s]+@[^@\s]+$")]
    pub email: Option<String>,
    pub description: Option<String>,
    pub password: Option<String>,
    #[field(past)]
    pub birth_date: Option<DateTime<Utc>>,
    pub sequence: Option<i64>,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub roles: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;
    telemetry::init_tracing(&config)?;

    let registry = ModelRegistry::builder().register::<User>().build();
    let store = DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn();

    modelrest_server::serve(&config, AppState::new(registry, store)).await?;

    Ok(())
}
