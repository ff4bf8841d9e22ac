//! # Application Lifecycle
//!
//! [`AppSystem`] wires the sample together: one container configured with storages,
//! the model types, and the fake todo service they share.
//!
//! ```rust,ignore
//! let system = AppSystem::new(AppConfig::default());
//! let counter = system.counter()?;      // built on first access
//! let todos = system.todos(1)?;         // one list per user id
//! system.shutdown()?;                   // disposes everything, children first
//! ```

use crate::counter_model::counter_model;
use crate::dashboard_model::{dashboard_model, summarizer_module};
use crate::todo_model::{todo_model, TodoApi};
use reactive_models::{Container, MemoryStorage, ModelError, ModelInstance, ModelType};
use std::time::Duration;
use tracing::info;

/// Knobs for the sample system.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Backs the default storage. Seed it to start the counter from a stored value.
    pub storage: MemoryStorage,
    /// Delay of every fake network call.
    pub latency: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: MemoryStorage::new(),
            latency: Duration::from_millis(10),
        }
    }
}

pub struct AppSystem {
    pub container: Container,
    pub api: TodoApi,
    pub counter_type: ModelType,
    pub todos_type: ModelType,
    pub dashboard_type: ModelType,
}

impl AppSystem {
    pub fn new(config: AppConfig) -> Self {
        let container = Container::builder()
            .storage("default", config.storage)
            .storage("session", MemoryStorage::new())
            .build();
        let api = TodoApi::new(config.latency);
        let counter_type = counter_model();
        let todos_type = todo_model(api.clone());
        let dashboard_type = dashboard_model(
            counter_type.clone(),
            todos_type.clone(),
            summarizer_module(config.latency),
        );
        info!("Application system created");
        Self {
            container,
            api,
            counter_type,
            todos_type,
            dashboard_type,
        }
    }

    pub fn counter(&self) -> Result<ModelInstance, ModelError> {
        self.container.get_default(&self.counter_type)
    }

    /// Starts loading the user's list. Requires a `LocalSet`.
    pub fn todos(&self, user_id: u32) -> Result<ModelInstance, ModelError> {
        self.container.get(&self.todos_type, &user_id)
    }

    /// Requires a `LocalSet`.
    pub fn dashboard(&self, user_id: u32) -> Result<ModelInstance, ModelError> {
        self.container.get(&self.dashboard_type, &user_id)
    }

    pub fn shutdown(self) -> Result<(), ModelError> {
        info!("Shutting down application system");
        self.container.delete_all(None)
    }
}
