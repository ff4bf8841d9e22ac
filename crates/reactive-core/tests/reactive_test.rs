use reactive_core::{Computed, Deps, Effect, ModelError, Reactive, State, Watcher};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// --- State ---

#[test]
fn test_state_notifies_once_per_real_change() {
    let state = State::new(1);
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let _sub = state.subscribe(move |_| counter.set(counter.get() + 1));

    assert!(state.set(2));
    assert!(!state.set(2), "equal write is a no-op");
    assert!(state.update(|n| n + 1));

    assert_eq!(calls.get(), 2);
    assert_eq!(state.get(), 3);
    assert_eq!(state.revision(), 2);
}

#[test]
fn test_state_subscribers_see_the_new_value_before_set_returns() {
    let state = State::new(String::from("a"));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let reader = state.clone();
    let _sub = state.subscribe(move |value| {
        sink.borrow_mut().push((value.clone(), reader.get()));
    });

    state.set("b".to_string());
    assert_eq!(*seen.borrow(), vec![("b".to_string(), "b".to_string())]);
}

#[test]
fn test_state_dispose_keeps_value_and_drops_subscribers() {
    let state = State::new(5);
    let _sub = state.subscribe(|_| panic!("disposed state must not notify"));
    Reactive::dispose(&state);

    assert_eq!(state.subscriber_count(), 0);
    state.set(6);
    assert_eq!(state.get(), 6);
}

// --- Computed ---

#[test]
fn test_computed_converges() {
    let a = State::new(1);
    let b = State::new(2);
    let sum = Computed::new(Deps::new().with("a", &a).with("b", &b), |deps| {
        Ok(deps.get::<i32>("a")? + deps.get::<i32>("b")?)
    })
    .unwrap();

    assert_eq!(sum.get(), 3);
    a.set(2);
    assert_eq!(sum.get(), 4);
}

#[test]
fn test_computed_notifies_only_when_its_value_changes() {
    let n = State::new(2);
    let parity = Computed::new(Deps::new().with("n", &n), |deps| Ok(deps.get::<i32>("n")? % 2)).unwrap();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    let _sub = parity.subscribe(move |value| sink.borrow_mut().push(*value));

    n.set(4);
    n.set(5);
    n.set(7);

    assert_eq!(*changes.borrow(), vec![1]);
    assert_eq!(parity.revision(), 1);
}

#[test]
fn test_computed_chains() {
    let base = State::new(1);
    let double = Computed::new(Deps::new().with("base", &base), |deps| Ok(deps.get::<i32>("base")? * 2)).unwrap();
    let label = Computed::new(Deps::new().with("double", &double), |deps| {
        Ok(format!("x{}", deps.get::<i32>("double")?))
    })
    .unwrap();

    base.set(5);
    assert_eq!(label.get(), "x10");
}

#[test]
fn test_computed_first_run_errors_are_returned() {
    let result = Computed::<i32>::new(Deps::new(), |deps| deps.get::<i32>("missing"));
    assert!(matches!(result, Err(ModelError::UndeclaredDependency(name)) if name == "missing"));

    let text = State::new("x".to_string());
    let result = Computed::<i32>::new(Deps::new().with("text", &text), |deps| deps.get::<i32>("text"));
    assert!(matches!(result, Err(ModelError::DependencyType { .. })));
}

#[test]
fn test_computed_dispose_stops_recomputing() {
    let n = State::new(1);
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let copy = Computed::new(Deps::new().with("n", &n), move |deps| {
        counter.set(counter.get() + 1);
        deps.get::<i32>("n")
    })
    .unwrap();

    copy.dispose();
    n.set(2);

    assert_eq!(runs.get(), 1);
    assert_eq!(copy.get(), 1);
    assert_eq!(n.subscriber_count(), 0);
}

// --- Effect ---

#[test]
fn test_effect_tracks_only_what_the_latest_run_read() {
    let use_a = State::new(true);
    let a = State::new(0);
    let b = State::new(0);
    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);

    let deps = Deps::new().with("use_a", &use_a).with("a", &a).with("b", &b);
    let _effect = Effect::new(deps, move |tracker| {
        counter.set(counter.get() + 1);
        if tracker.get::<bool>("use_a")? {
            tracker.get::<i32>("a")?;
        } else {
            tracker.get::<i32>("b")?;
        }
        Ok(())
    })
    .unwrap();
    assert_eq!(runs.get(), 1);

    b.set(1);
    assert_eq!(runs.get(), 1, "b was not read");
    a.set(1);
    assert_eq!(runs.get(), 2);

    use_a.set(false);
    assert_eq!(runs.get(), 3);
    a.set(2);
    assert_eq!(runs.get(), 3, "a is no longer read");
    b.set(2);
    assert_eq!(runs.get(), 4);
    assert_eq!(a.subscriber_count(), 0);
}

#[test]
fn test_effect_writing_its_own_dependency_reruns_without_nesting() {
    let n = State::new(0);
    let depth = Rc::new(Cell::new(0));
    let max_depth = Rc::new(Cell::new(0));

    let writer = n.clone();
    let (d, m) = (Rc::clone(&depth), Rc::clone(&max_depth));
    let effect = Effect::new(Deps::new().with("n", &n), move |tracker| {
        d.set(d.get() + 1);
        m.set(m.get().max(d.get()));
        let value = tracker.get::<i32>("n")?;
        if value < 3 {
            writer.set(value + 1);
        }
        d.set(d.get() - 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(n.get(), 3);
    assert_eq!(max_depth.get(), 1);
    assert_eq!(effect.runs(), 4);
}

#[test]
fn test_effect_rerun_errors_are_kept() {
    let n = State::new(1);
    let effect = Effect::new(Deps::new().with("n", &n), |tracker| {
        if tracker.get::<i32>("n")? < 0 {
            return Err(ModelError::MissingValue("positive".to_string()));
        }
        Ok(())
    })
    .unwrap();

    n.set(-1);
    assert!(matches!(effect.take_error(), Some(ModelError::MissingValue(_))));
    assert!(effect.take_error().is_none());
}

#[test]
fn test_effect_dispose_ignores_later_changes() {
    let n = State::new(1);
    let effect = Effect::new(Deps::new().with("n", &n), |tracker| {
        tracker.get::<i32>("n")?;
        Ok(())
    })
    .unwrap();

    effect.dispose();
    n.set(2);
    assert_eq!(effect.runs(), 1);
    assert!(effect.is_disposed());
}

#[test]
fn test_effects_outlive_their_handles_until_disposed() {
    let a = State::new(1);
    let runs = Rc::new(Cell::new(0));
    let token = Rc::new(());

    let mut kept = Vec::new();
    for i in 0..10 {
        let (counter, held) = (Rc::clone(&runs), Rc::clone(&token));
        let effect = Effect::new(Deps::new().with("a", &a), move |tracker| {
            let _held = &held;
            tracker.get::<i32>("a")?;
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
        if i % 2 == 0 {
            kept.push(effect.clone());
        }
    }
    assert_eq!(runs.get(), 10);

    a.set(2);
    assert_eq!(runs.get(), 20, "dropped handles do not stop an effect");
    assert_eq!(a.subscriber_count(), 10);

    for effect in &kept {
        effect.dispose();
    }
    a.set(3);
    assert_eq!(runs.get(), 25);
    assert_eq!(a.subscriber_count(), 5);
    assert_eq!(Rc::strong_count(&token), 6, "disposed effects release their function");
}

#[test]
fn test_computed_outlives_its_handle_until_disposed() {
    let n = State::new(1);
    let computes = Rc::new(Cell::new(0));
    let token = Rc::new(());

    let (counter, held) = (Rc::clone(&computes), Rc::clone(&token));
    let doubled = Computed::new(Deps::new().with("n", &n), move |deps| {
        let _held = &held;
        counter.set(counter.get() + 1);
        Ok(deps.get::<i32>("n")? * 2)
    })
    .unwrap();
    let keep = doubled.clone();
    drop(doubled);

    n.set(2);
    assert_eq!(computes.get(), 2);
    assert_eq!(keep.get(), 4);

    keep.dispose();
    n.set(3);
    assert_eq!(computes.get(), 2);
    assert_eq!(n.subscriber_count(), 0);
    assert_eq!(Rc::strong_count(&token), 1);
}

#[test]
fn test_effect_with_callback_receives_results() {
    let n = State::new(2);
    let results = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&results);
    let _effect = Effect::with_callback(
        Deps::new().with("n", &n),
        |tracker| Ok(tracker.get::<i32>("n")? * 10),
        move |value| sink.borrow_mut().push(value),
    )
    .unwrap();

    n.set(3);
    assert_eq!(*results.borrow(), vec![20, 30]);
}

// --- Watcher ---

#[test]
fn test_watcher_reports_changes_with_old_value() {
    let n = State::new(1);
    let changes = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&changes);
    let watcher = Watcher::new(
        Deps::new().with("n", &n),
        |tracker| Ok(tracker.get::<i32>("n")? / 10),
        move |new, old| sink.borrow_mut().push((*new, *old)),
    )
    .unwrap();

    n.set(5);
    n.set(12);
    n.set(25);
    watcher.dispose();
    n.set(40);

    assert_eq!(*changes.borrow(), vec![(1, 0), (2, 1)]);
}

#[test]
fn test_watcher_with_custom_compare() {
    let name = State::new("Alice".to_string());
    let changes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changes);
    let _watcher = Watcher::with_compare(
        Deps::new().with("name", &name),
        |tracker| tracker.get::<String>("name"),
        move |_, _| counter.set(counter.get() + 1),
        |a: &String, b: &String| a.eq_ignore_ascii_case(b),
    )
    .unwrap();

    name.set("ALICE".to_string());
    name.set("Bob".to_string());
    assert_eq!(changes.get(), 1);
}
