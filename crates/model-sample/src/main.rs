//! # Reactive Models Demo
//!
//! Walks through the sample system:
//! 1. A persisted counter seeded from storage.
//! 2. A todo list loaded from a (fake) remote service, reloaded after writes.
//! 3. A dashboard composing both, with a lazily loaded summarizer module.
//! 4. Backup and restore of the container registry.
//!
//! ```bash
//! RUST_LOG=info cargo run -p model-sample
//! ```

use model_sample::dashboard_model::{headline, Summarizer};
use model_sample::lifecycle::{AppConfig, AppSystem};
use model_sample::model::{Todo, TodoFilter};
use reactive_core::tracing::setup_tracing;
use reactive_models::{MemoryStorage, ModelError, Storage};
use std::rc::Rc;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), String> {
    setup_tracing();

    let local = tokio::task::LocalSet::new();
    local.run_until(run()).await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}

async fn run() -> Result<(), ModelError> {
    let storage = MemoryStorage::new().with("counter/count", 2);
    let system = AppSystem::new(AppConfig {
        storage: storage.clone(),
        ..AppConfig::default()
    });

    // Counter: starts from the stored value, writes back on change.
    let counter = system.counter()?;
    let count = counter.state::<i64>("count")?;
    info!(count = count.get(), "Counter restored from storage");
    counter.call::<(), ()>("increment", ())?;
    info!(
        count = count.get(),
        double = counter.computed::<i64>("double")?.get(),
        stored = %storage.get("counter/count").unwrap_or_default(),
        "Counter incremented"
    );

    // Todo list: loading starts when the instance is initialized.
    system.api.add(1, "Write docs");
    system.api.add(1, "Ship it");
    let todos = system.todos(1)?;
    let resource = todos.resource::<Vec<Todo>>("todos")?;
    info!(status = resource.loadable().label(), "Todo list requested");
    let loaded = resource.promise().await?;
    info!(count = loaded.len(), "Todo list loaded");

    let added = todos.call::<String, Result<Todo, ModelError>>("add", "Celebrate".to_string())??;
    info!(id = added.id, title = %added.title, "Todo added, reloading");
    resource.promise().await?;

    todos.call::<u32, Result<(), ModelError>>("complete", added.id)??;
    resource.promise().await?;
    todos.state::<TodoFilter>("filter")?.set(TodoFilter::Open);
    info!(visible = todos.computed::<Vec<Todo>>("visible")?.get().len(), "Open todos");

    // Dashboard: private child models plus a lazily loaded module.
    let dashboard = system.dashboard(1)?;
    info!(headline = %headline(&dashboard)?, "Dashboard before module load");
    dashboard
        .resource::<Rc<Summarizer>>("summarizer")?
        .promise()
        .await?;
    dashboard.model("todos")?.resource::<Vec<Todo>>("todos")?.promise().await?;
    info!(headline = %headline(&dashboard)?, "Dashboard ready");

    // Backup / restore: instances created after the backup are dropped from the registry.
    let restore = system.container.backup();
    let scratch = system.todos(2)?;
    if restore.restore() {
        info!("Registry restored");
    }
    if !scratch.ptr_eq(&system.todos(2)?) {
        info!("Todo list for user 2 was rebuilt after restore");
    }
    scratch.dispose()?;

    if let Err(e) = system.shutdown() {
        error!(error = %e, "Shutdown reported disposal failures");
        return Err(e);
    }
    Ok(())
}
