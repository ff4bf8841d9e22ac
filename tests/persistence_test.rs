use reactive_models::{
    loader, Container, Deps, LoadError, Loadable, MemoryStorage, ModelError, ModelType, Props, Storage,
    StorageKey,
};
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;
use tokio::task::LocalSet;

fn counter() -> ModelType {
    ModelType::new("counter", |ctx, _| {
        let count = ctx.persisted_state("count", 0i64)?;
        Ok(Props::new().state("count", &count))
    })
}

#[test]
fn test_storage_keys() {
    assert_eq!(
        StorageKey::parse("count"),
        StorageKey {
            storage: "default".to_string(),
            raw: "count".to_string()
        }
    );
    let session = StorageKey::parse("session:user:name");
    assert_eq!(session.storage, "session");
    assert_eq!(session.raw, "user:name");
    assert_eq!(StorageKey::parse(":count").storage, "default");
    assert_eq!(session.physical("profile"), "profile/user:name");
}

#[test]
fn test_persisted_state_seeds_from_storage_and_writes_back() {
    let storage = MemoryStorage::new().with("counter/count", 2);
    let container = Container::builder().storage("default", storage.clone()).build();

    let instance = container.get_default(&counter()).unwrap();
    let count = instance.state::<i64>("count").unwrap();
    assert_eq!(count.get(), 2);

    count.update(|n| n + 1);
    assert_eq!(storage.get("counter/count"), Some(json!(3)));
}

#[test]
fn test_missing_entries_use_the_initial_value_without_writing() {
    let storage = MemoryStorage::new();
    let container = Container::builder().storage("default", storage.clone()).build();

    let count = container.get_default(&counter()).unwrap().state::<i64>("count").unwrap();
    assert_eq!(count.get(), 0);
    assert!(storage.is_empty());

    count.set(5);
    assert!(storage.has("counter/count"));
}

#[test]
fn test_named_storages() {
    let session = MemoryStorage::new().with("prefs/theme", "dark");
    let container = Container::builder().storage("session", session.clone()).build();
    let prefs = ModelType::new("prefs", |ctx, _| {
        let theme = ctx.persisted_state("session:theme", "light".to_string())?;
        Ok(Props::new().state("theme", &theme))
    });

    let theme = container.get_default(&prefs).unwrap().state::<String>("theme").unwrap();
    assert_eq!(theme.get(), "dark");
    theme.set("solarized".to_string());

    assert_eq!(session.get("prefs/theme"), Some(json!("solarized")));
    assert!(!container.storage("default").unwrap().has("prefs/theme"));
    assert_eq!(container.storages().names(), vec!["default", "session"]);
}

#[test]
fn test_unknown_storage_fails_the_build() {
    let ty = ModelType::new("orphan", |ctx, _| {
        let value = ctx.persisted_state("vault:secret", 0u8)?;
        Ok(Props::new().state("secret", &value))
    });
    let container = Container::new();

    match container.get_default(&ty) {
        Err(ModelError::UnknownStorage(name)) => assert_eq!(name, "vault"),
        other => panic!("expected unknown storage, got {:?}", other),
    }
    assert!(matches!(container.storage("vault"), Err(ModelError::UnknownStorage(_))));
}

#[test]
fn test_undecodable_entries_are_reported() {
    let storage = MemoryStorage::new().with("counter/count", "not a number");
    let container = Container::builder().storage("default", storage).build();

    assert!(matches!(
        container.get_default(&counter()),
        Err(ModelError::StorageDecode { .. })
    ));
}

#[test]
fn test_child_containers_share_storages() {
    let storage = MemoryStorage::new().with("counter/count", 9);
    let container = Container::builder().storage("default", storage).build();
    let used = counter();
    let wrapper = ModelType::new("wrapper", move |ctx, _| {
        let inner = ctx.use_model(&used, &())?;
        Ok(Props::new().model("counter", &inner))
    });

    let inner = container.get_default(&wrapper).unwrap().model("counter").unwrap();
    assert_eq!(inner.state::<i64>("count").unwrap().get(), 9);
}

#[tokio::test]
async fn test_persisted_resource_starts_loaded_and_writes_successes() {
    LocalSet::new()
        .run_until(async {
            let storage = MemoryStorage::new().with("feed/items", json!(["cached"]));
            let container = Container::builder().storage("default", storage.clone()).build();
            let fetches = Rc::new(Cell::new(0));
            let counter = Rc::clone(&fetches);
            let feed = ModelType::new("feed", move |ctx, _| {
                let counter = Rc::clone(&counter);
                let items = ctx.persisted_resource(
                    "items",
                    Deps::new(),
                    loader(move |_| {
                        counter.set(counter.get() + 1);
                        async { Ok::<_, LoadError>(vec!["fresh".to_string()]) }
                    }),
                )?;
                Ok(Props::new().resource("items", &items))
            });

            let items = container
                .get_default(&feed)
                .unwrap()
                .resource::<Vec<String>>("items")
                .unwrap();
            assert_eq!(items.loadable(), Loadable::Succeeded(vec!["cached".to_string()]));
            assert_eq!(fetches.get(), 0);

            items.reload();
            items.promise().await.unwrap();
            assert_eq!(fetches.get(), 1);
            assert_eq!(storage.get("feed/items"), Some(json!(["fresh"])));
        })
        .await;
}
