use model_sample::dashboard_model::{dashboard_model, headline, Summarizer};
use model_sample::lifecycle::{AppConfig, AppSystem};
use model_sample::model::{Todo, TodoFilter};
use model_sample::todo_model::TodoError;
use reactive_models::{LazyModule, LoadError, MemoryStorage, ModelError, Storage};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

fn system_with(storage: MemoryStorage) -> AppSystem {
    AppSystem::new(AppConfig {
        storage,
        latency: Duration::from_millis(1),
    })
}

#[test]
fn test_counter_restores_and_persists() {
    let storage = MemoryStorage::new().with("counter/count", 2);
    let system = system_with(storage.clone());

    let counter = system.counter().expect("Failed to build counter");
    assert_eq!(counter.state::<i64>("count").unwrap().get(), 2);

    counter.call::<(), ()>("increment", ()).unwrap();
    counter.call::<(), ()>("increment", ()).unwrap();
    counter.call::<(), ()>("decrement", ()).unwrap();

    assert_eq!(counter.computed::<i64>("double").unwrap().get(), 6);
    assert_eq!(storage.get("counter/count"), Some(json!(3)));
    assert!(counter.ptr_eq(&system.counter().unwrap()));

    counter.call::<(), ()>("reset", ()).unwrap();
    assert_eq!(storage.get("counter/count"), Some(json!(0)));
}

/// Full todo flow against the fake service: load, add, complete, filter.
#[tokio::test]
async fn test_todo_list_flow() {
    LocalSet::new()
        .run_until(async {
            let system = system_with(MemoryStorage::new());
            system.api.add(1, "Write docs");
            system.api.add(1, "Ship it");
            system.api.add(2, "Someone else's");

            // Loading starts at init
            let todos = system.todos(1).expect("Failed to build todo list");
            let resource = todos.resource::<Vec<Todo>>("todos").unwrap();
            assert!(resource.is_loading());
            assert_eq!(resource.promise().await.unwrap().len(), 2);
            assert_eq!(todos.value::<u32>("user_id").unwrap(), 1);

            // Adding reloads the list; the visible list keeps the last load meanwhile
            let visible = todos.computed::<Vec<Todo>>("visible").unwrap();
            assert_eq!(visible.get().len(), 2);
            let added = todos
                .call::<String, Result<Todo, ModelError>>("add", "Celebrate".to_string())
                .unwrap()
                .expect("Failed to add todo");
            assert!(resource.is_loading());
            assert_eq!(visible.get().len(), 2);
            assert_eq!(resource.promise().await.unwrap().len(), 3);
            assert_eq!(visible.get().len(), 3);

            // Completing reloads too
            todos
                .call::<u32, Result<(), ModelError>>("complete", added.id)
                .unwrap()
                .expect("Failed to complete todo");
            let loaded = resource.promise().await.unwrap();
            assert!(loaded.iter().any(|todo| todo.id == added.id && todo.done));

            // The visible list follows the filter
            let filter = todos.state::<TodoFilter>("filter").unwrap();
            assert_eq!(visible.get().len(), 3);
            filter.set(TodoFilter::Open);
            assert_eq!(visible.get().len(), 2);
            filter.set(TodoFilter::Done);
            assert_eq!(visible.get(), vec![Todo { done: true, ..added }]);

            assert_eq!(system.api.fetches(), 3);
        })
        .await;
}

#[tokio::test]
async fn test_todo_errors() {
    LocalSet::new()
        .run_until(async {
            let system = system_with(MemoryStorage::new());

            // Unknown todo ids are reported by the method
            let todos = system.todos(7).unwrap();
            let result = todos
                .call::<u32, Result<(), ModelError>>("complete", 99)
                .unwrap();
            assert!(matches!(result, Err(ModelError::Hook(_))));

            // Service failures land in the resource
            let resource = todos.resource::<Vec<Todo>>("todos").unwrap();
            resource.promise().await.unwrap();
            system.api.set_offline(true);
            todos.call::<(), ()>("reload", ()).unwrap();

            let error = resource.promise().await.unwrap_err();
            assert_eq!(error.downcast_ref::<TodoError>(), Some(&TodoError::Unavailable));
            assert!(resource.loadable().is_failed());
            assert_eq!(resource.value(), Some(Vec::new()), "last good value is kept");

            // Keys that are not user ids are rejected by the builder
            let invalid = system.container.get(&system.todos_type, &"not-a-user");
            match invalid {
                Err(ModelError::Hook(error)) => assert!(error.to_string().contains("user id")),
                other => panic!("expected invalid key, got {:?}", other),
            }
        })
        .await;
}

#[tokio::test]
async fn test_dashboard_composes_private_models() {
    LocalSet::new()
        .run_until(async {
            let system = system_with(MemoryStorage::new());
            system.api.add(1, "Write docs");
            let done = system.api.add(1, "Plan");
            system.api.complete(1, done.id).unwrap();

            let dashboard = system.dashboard(1).expect("Failed to build dashboard");
            assert_eq!(headline(&dashboard).unwrap(), "0 todos");

            let private = dashboard.model("todos").unwrap();
            assert!(!private.ptr_eq(&system.todos(1).unwrap()));

            dashboard
                .resource::<Rc<Summarizer>>("summarizer")
                .unwrap()
                .promise()
                .await
                .unwrap();
            private.resource::<Vec<Todo>>("todos").unwrap().promise().await.unwrap();
            assert_eq!(headline(&dashboard).unwrap(), "Todos: 1 open, 1 done");

            // The dashboard's private models go away with it
            let counter = dashboard.model("counter").unwrap();
            system.container.delete(&system.dashboard_type, &1).unwrap();
            assert!(private.is_disposed());
            assert!(counter.is_disposed());
            assert!(!system.counter().unwrap().is_disposed());
        })
        .await;
}

#[tokio::test]
async fn test_dashboard_retries_a_failed_summarizer_load() {
    LocalSet::new()
        .run_until(async {
            let system = system_with(MemoryStorage::new());
            let attempts = Rc::new(Cell::new(0));
            let counter = Rc::clone(&attempts);
            let flaky = LazyModule::from_fn("summarizer", move || {
                counter.set(counter.get() + 1);
                let first = counter.get() == 1;
                async move {
                    if first {
                        return Err(LoadError::msg("bundle unavailable"));
                    }
                    Ok(Summarizer {
                        label: "Retried".to_string(),
                    })
                }
            });
            let ty = dashboard_model(system.counter_type.clone(), system.todos_type.clone(), flaky.clone());

            let dashboard = system.container.get(&ty, &1).unwrap();
            let module = dashboard.resource::<Rc<Summarizer>>("summarizer").unwrap();
            let error = module.promise().await.unwrap_err();
            assert_eq!(error.to_string(), "bundle unavailable");

            module.reload();
            let summarizer = module.promise().await.expect("Reload should fetch the module again");
            assert_eq!(summarizer.label, "Retried");
            assert_eq!(flaky.loads(), 2);
            assert_eq!(attempts.get(), 2);
        })
        .await;
}

#[tokio::test]
async fn test_shutdown_disposes_everything() {
    LocalSet::new()
        .run_until(async {
            let system = system_with(MemoryStorage::new());
            let counter = system.counter().unwrap();
            let todos = system.todos(1).unwrap();
            let dashboard = system.dashboard(1).unwrap();
            let private = dashboard.model("todos").unwrap();

            system.shutdown().expect("Shutdown failed");

            for instance in [&counter, &todos, &dashboard, &private] {
                assert!(instance.is_disposed(), "{} was not disposed", instance.name());
            }
            assert!(counter.call::<(), ()>("increment", ()).is_err());
        })
        .await;
}
