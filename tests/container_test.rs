use reactive_models::{Container, Lifecycle, ModelError, ModelInstance, ModelType, Props};
use serde_json::json;
use std::cell::{Cell, OnceCell, RefCell};
use std::rc::Rc;

/// A model whose builder counts how often it ran.
fn counted(name: &str) -> (ModelType, Rc<Cell<usize>>) {
    let builds = Rc::new(Cell::new(0));
    let counter = Rc::clone(&builds);
    let ty = ModelType::new(name, move |ctx, key| {
        counter.set(counter.get() + 1);
        let label = ctx.state(key.to_string())?;
        Ok(Props::new().state("label", &label))
    });
    (ty, builds)
}

#[test]
fn test_structurally_equal_keys_resolve_to_one_instance() {
    let (ty, builds) = counted("page");
    let container = Container::new();

    let first = container
        .get(&ty, &json!({"id": 1, "tab": "a"}))
        .expect("Failed to build instance");
    let second = container
        .get(&ty, &json!({"tab": "a", "id": 1}))
        .expect("Failed to resolve instance");
    let other = container.get(&ty, &json!({"id": 2, "tab": "a"})).unwrap();

    assert!(first.ptr_eq(&second));
    assert!(!first.ptr_eq(&other));
    assert_eq!(builds.get(), 2);
    assert_eq!(container.get_all(&ty).len(), 2);
}

#[test]
fn test_model_types_do_not_share_instances() {
    let (a, _) = counted("same-name");
    let (b, _) = counted("same-name");
    let container = Container::new();

    let from_a = container.get_default(&a).unwrap();
    let from_b = container.get_default(&b).unwrap();
    assert!(!from_a.ptr_eq(&from_b));
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
}

#[test]
fn test_instances_become_ready_after_init_hooks() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&order);
    let ty = ModelType::new("hooked", move |ctx, _| {
        let log_init = Rc::clone(&log);
        log.borrow_mut().push(format!("build:{}", ctx.phase().label()));
        ctx.on(Lifecycle::Init, move || {
            log_init.borrow_mut().push("init".to_string());
            Ok(())
        })?;
        Ok(Props::new())
    });

    let instance = Container::new().get_default(&ty).unwrap();
    assert_eq!(*order.borrow(), vec!["build:pre-init", "init"]);
    assert_eq!(instance.phase().label(), "ready");
}

#[test]
fn test_failed_init_hook_unregisters_the_instance() {
    let fail = Rc::new(Cell::new(true));
    let should_fail = Rc::clone(&fail);
    let ty = ModelType::new("flaky", move |ctx, _| {
        let should_fail = should_fail.get();
        ctx.on(Lifecycle::Init, move || {
            if should_fail {
                return Err(ModelError::MissingValue("config".to_string()));
            }
            Ok(())
        })?;
        Ok(Props::new())
    });
    let container = Container::new();

    let result = container.get_default(&ty);
    assert!(matches!(result, Err(ModelError::MissingValue(_))));
    assert!(!container.contains(&ty, &()).unwrap());

    fail.set(false);
    assert!(container.get_default(&ty).is_ok());
}

#[test]
fn test_builder_errors_propagate_and_nothing_is_registered() {
    let ty = ModelType::new("broken", |ctx, _| {
        let count = ctx.persisted_state("nowhere:count", 0u32)?;
        Ok(Props::new().state("count", &count))
    });
    let container = Container::new();

    assert!(matches!(container.get_default(&ty), Err(ModelError::UnknownStorage(_))));
    assert!(container.get_all(&ty).is_empty());
}

#[test]
fn test_self_dependency_is_reported_as_circular() {
    let slot: Rc<OnceCell<ModelType>> = Rc::new(OnceCell::new());
    let this = Rc::clone(&slot);
    let ty = ModelType::new("ouroboros", move |ctx, _| {
        let container = ctx.container().expect("container outlives its builders");
        let ty = this.get().expect("type is registered before use");
        container.get_default(ty)?;
        Ok(Props::new())
    });
    let _ = slot.set(ty.clone());

    let container = Container::new();
    match container.get_default(&ty) {
        Err(ModelError::CircularDependency(path)) => {
            assert_eq!(path, "ouroboros(null) -> ouroboros(null)");
        }
        other => panic!("expected circular dependency, got {:?}", other),
    }
    assert!(!container.contains(&ty, &()).unwrap());
}

#[test]
fn test_cycle_through_used_models_is_reported() {
    let slot_a: Rc<OnceCell<ModelType>> = Rc::new(OnceCell::new());
    let slot_b: Rc<OnceCell<ModelType>> = Rc::new(OnceCell::new());

    let (b_of_a, a_of_b) = (Rc::clone(&slot_b), Rc::clone(&slot_a));
    let a = ModelType::new("a", move |ctx, _| {
        let b = ctx.use_model(b_of_a.get().expect("b registered"), &())?;
        Ok(Props::new().model("b", &b))
    });
    let b = ModelType::new("b", move |ctx, _| {
        let a = ctx.use_model(a_of_b.get().expect("a registered"), &())?;
        Ok(Props::new().model("a", &a))
    });
    let _ = slot_a.set(a.clone());
    let _ = slot_b.set(b);

    match Container::new().get_default(&a) {
        Err(ModelError::CircularDependency(path)) => assert_eq!(path, "a(null) -> b(null) -> a(null)"),
        other => panic!("expected circular dependency, got {:?}", other),
    }
}

#[test]
fn test_models_can_resolve_siblings_from_the_same_container() {
    let (settings, builds) = counted("settings");
    let dependency = settings.clone();
    let page = ModelType::new("page", move |ctx, _| {
        let container = ctx.container().expect("container is alive");
        let settings = container.get_default(&dependency)?;
        Ok(Props::new().model("settings", &settings))
    });

    let container = Container::new();
    let from_page = container.get_default(&page).unwrap().model("settings").unwrap();
    let direct = container.get_default(&settings).unwrap();

    assert!(from_page.ptr_eq(&direct), "shared container hands out one instance");
    assert_eq!(builds.get(), 1);
}

#[test]
fn test_delete_disposes_and_unregisters() {
    let (ty, builds) = counted("doc");
    let container = Container::new();
    let instance = container.get(&ty, &json!({"id": 3})).unwrap();

    assert!(container.delete(&ty, &json!({"id": 3})).unwrap());
    assert!(instance.is_disposed());
    assert!(!container.delete(&ty, &json!({"id": 3})).unwrap());

    let rebuilt = container.get(&ty, &json!({"id": 3})).unwrap();
    assert!(!rebuilt.ptr_eq(&instance));
    assert_eq!(builds.get(), 2);
}

#[test]
fn test_disposed_instances_are_rebuilt_on_next_get() {
    let (ty, builds) = counted("doc");
    let container = Container::new();
    let instance = container.get_default(&ty).unwrap();

    instance.dispose().unwrap();
    let fresh = container.get_default(&ty).unwrap();
    assert!(!fresh.ptr_eq(&instance));
    assert_eq!(builds.get(), 2);
}

#[test]
fn test_delete_all_disposes_everything_and_collects_failures() {
    let failing = ModelType::new("failing", |ctx, key| {
        let key = key.to_string();
        ctx.on(Lifecycle::Dispose, move || Err(ModelError::Disposed(key)))?;
        Ok(Props::new())
    });
    let (healthy, _) = counted("healthy");
    let container = Container::new();

    let first = container.get(&failing, &1).unwrap();
    let second = container.get(&failing, &2).unwrap();
    let fine = container.get_default(&healthy).unwrap();
    container.set_value("answer", 42u32);

    match container.delete_all(None) {
        Err(ModelError::Disposal(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected aggregated failures, got {:?}", other),
    }
    assert!(first.is_disposed() && second.is_disposed() && fine.is_disposed());
    assert!(!container.has_value("answer"));
}

#[test]
fn test_delete_all_for_one_type() {
    let (kept, _) = counted("kept");
    let (dropped, _) = counted("dropped");
    let container = Container::new();
    let keep = container.get_default(&kept).unwrap();
    let gone = container.get_default(&dropped).unwrap();

    container.delete_all(Some(&dropped)).unwrap();
    assert!(gone.is_disposed());
    assert!(!keep.is_disposed());
    assert!(container.get_all(&dropped).is_empty());
}

#[test]
fn test_values() {
    let container = Container::new();
    container.set_value("retries", 3u8);

    assert_eq!(container.value::<u8>("retries").unwrap(), 3);
    assert!(matches!(
        container.value::<String>("retries"),
        Err(ModelError::DependencyType { .. })
    ));
    assert!(matches!(container.value::<u8>("timeout"), Err(ModelError::MissingValue(_))));
}

#[test]
fn test_override_instance_replaces_the_registration() {
    let (ty, builds) = counted("service");
    let container = Container::new();
    let real = container.get_default(&ty).unwrap();

    let fake = ModelInstance::from_props("service", Props::new().value("fake", true));
    let replaced = container.override_instance(&ty, &(), fake.clone()).unwrap();

    assert!(replaced.is_some_and(|previous| previous.ptr_eq(&real)));
    assert!(!real.is_disposed());
    assert!(container.get_default(&ty).unwrap().ptr_eq(&fake));
    assert_eq!(builds.get(), 1);
}

#[test]
fn test_instance_registered_during_its_own_build_wins() {
    let slot: Rc<OnceCell<ModelType>> = Rc::new(OnceCell::new());
    let fake = ModelInstance::from_props("session", Props::new().value("fake", true));
    let disposals = Rc::new(Cell::new(0));
    let inits = Rc::new(Cell::new(0));

    let (this, stand_in) = (Rc::clone(&slot), fake.clone());
    let (disposed, initialized) = (Rc::clone(&disposals), Rc::clone(&inits));
    let ty = ModelType::new("session", move |ctx, _| {
        let container = ctx.container().expect("container is alive");
        let ty = this.get().expect("type is registered before use");
        container.override_instance(ty, &(), stand_in.clone())?;

        let disposed = Rc::clone(&disposed);
        let initialized = Rc::clone(&initialized);
        ctx.on(Lifecycle::Init, move || {
            initialized.set(initialized.get() + 1);
            Ok(())
        })?;
        ctx.on(Lifecycle::Dispose, move || {
            disposed.set(disposed.get() + 1);
            Ok(())
        })?;
        Ok(Props::new().value("fake", false))
    });
    let _ = slot.set(ty.clone());

    let container = Container::new();
    let resolved = container.get_default(&ty).unwrap();

    assert!(resolved.ptr_eq(&fake));
    assert!(resolved.value::<bool>("fake").unwrap());
    assert_eq!(disposals.get(), 1, "the duplicate built alongside is disposed");
    assert_eq!(inits.get(), 0);
    assert!(container.get_default(&ty).unwrap().ptr_eq(&fake));
    assert_eq!(disposals.get(), 1);
}

#[test]
fn test_backup_restores_the_registry() {
    let (ty, _) = counted("doc");
    let container = Container::new();
    let before = container.get(&ty, &1).unwrap();

    let restore = container.backup();
    let after = container.get(&ty, &2).unwrap();
    assert!(container.delete(&ty, &1).unwrap());

    assert!(restore.restore());
    assert!(!container.contains(&ty, &2).unwrap());
    assert!(!after.is_disposed(), "restore does not dispose newer instances");
    assert!(before.is_disposed());
    assert!(!container.get(&ty, &1).unwrap().ptr_eq(&before));
}

#[test]
fn test_superseded_backup_does_not_apply() {
    let (ty, _) = counted("doc");
    let container = Container::new();

    let old = container.backup();
    let instance = container.get_default(&ty).unwrap();
    let newer = container.backup();

    assert!(!old.is_current());
    assert!(!old.restore());
    assert!(container.get_default(&ty).unwrap().ptr_eq(&instance));

    assert!(newer.restore());
}
