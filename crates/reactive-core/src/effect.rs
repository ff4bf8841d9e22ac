//! # Effects & Dependency Tracking
//!
//! An [`Effect`] reruns a function whenever a dependency it **read on its latest run**
//! changes.
//!
//! Every run gets a fresh [`Tracker`]. Reading a dependency through the tracker both
//! returns its current value and subscribes a rerun of the whole effect. Before each
//! rerun, all subscriptions from the previous run are dropped, so a dependency that is
//! no longer read (because of a branch, say) stops triggering the effect.
//!
//! # Re-entrancy
//!
//! A change notification that arrives while the effect is already running (the effect
//! wrote to one of its own dependencies) does not nest: the effect is marked dirty and
//! runs again once the current run returns.
//!
//! # Errors
//!
//! An error from the first run is returned by the constructor. Errors from later runs
//! are triggered by someone else's write, so there is no caller to return them to; they
//! are logged and kept for [`Effect::take_error`].
//!
//! # Lifetime
//!
//! The listeners an effect registers on its dependencies own it. Dropping every
//! `Effect` handle does not stop it: it keeps rerunning until [`Effect::dispose`] is
//! called, which unsubscribes everything and releases the effect function.

use crate::deps::Deps;
use crate::error::ModelError;
use crate::listener::Unsubscribe;
use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, warn};

type RunFn = Rc<dyn Fn(&Tracker) -> Result<(), ModelError>>;

struct EffectInner {
    deps: Deps,
    /// Released on dispose, so values captured by the function can be dropped.
    run: RefCell<Option<RunFn>>,
    subscriptions: RefCell<Vec<Unsubscribe>>,
    running: Cell<bool>,
    dirty: Cell<bool>,
    disposed: Cell<bool>,
    runs: Cell<u64>,
    last_error: RefCell<Option<ModelError>>,
}

/// A self-rerunning computation over named dependencies.
///
/// Cloning an `Effect` creates a new handle to the **same** effect. The effect outlives
/// its handles; only [`Effect::dispose`] stops it.
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
}

impl Effect {
    /// Creates the effect and runs it once, synchronously.
    pub fn new(
        deps: Deps,
        f: impl Fn(&Tracker) -> Result<(), ModelError> + 'static,
    ) -> Result<Self, ModelError> {
        Self::with_callback(deps, f, |()| {})
    }

    /// Like [`Effect::new`], handing every successful result to `callback`.
    pub fn with_callback<R: 'static>(
        deps: Deps,
        f: impl Fn(&Tracker) -> Result<R, ModelError> + 'static,
        callback: impl Fn(R) + 'static,
    ) -> Result<Self, ModelError> {
        let run: RunFn = Rc::new(move |tracker| {
            let result = f(tracker)?;
            callback(result);
            Ok(())
        });
        let inner = Rc::new(EffectInner {
            deps,
            run: RefCell::new(Some(run)),
            subscriptions: RefCell::new(Vec::new()),
            running: Cell::new(false),
            dirty: Cell::new(false),
            disposed: Cell::new(false),
            runs: Cell::new(0),
            last_error: RefCell::new(None),
        });
        if let Err(error) = execute(&inner) {
            dispose(&inner);
            return Err(error);
        }
        Ok(Self { inner })
    }

    /// How many times the effect function has run.
    pub fn runs(&self) -> u64 {
        self.inner.runs.get()
    }

    /// Runs the effect again right away.
    pub fn rerun(&self) -> Result<(), ModelError> {
        execute(&self.inner)
    }

    /// The error of the most recent failed rerun, if any.
    pub fn take_error(&self) -> Option<ModelError> {
        self.inner.last_error.borrow_mut().take()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Unsubscribes from every dependency. Later changes are ignored.
    pub fn dispose(&self) {
        dispose(&self.inner);
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("deps", &self.inner.deps)
            .field("runs", &self.inner.runs.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

fn dispose(inner: &Rc<EffectInner>) {
    inner.disposed.set(true);
    let subscriptions = std::mem::take(&mut *inner.subscriptions.borrow_mut());
    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    // A run in progress holds its own clone of the function.
    inner.run.borrow_mut().take();
}

fn execute(inner: &Rc<EffectInner>) -> Result<(), ModelError> {
    if inner.disposed.get() {
        return Ok(());
    }
    if inner.running.get() {
        inner.dirty.set(true);
        return Ok(());
    }

    inner.running.set(true);
    let result = loop {
        let previous = std::mem::take(&mut *inner.subscriptions.borrow_mut());
        for subscription in previous {
            subscription.unsubscribe();
        }
        inner.dirty.set(false);

        let Some(run) = inner.run.borrow().clone() else {
            break Ok(());
        };
        let tracker = Tracker {
            deps: inner.deps.clone(),
            effect: Rc::clone(inner),
            read: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
        };
        let result = run(&tracker);
        inner.runs.set(inner.runs.get() + 1);
        *inner.subscriptions.borrow_mut() = tracker.subscriptions.into_inner();

        if result.is_err() || !inner.dirty.get() || inner.disposed.get() {
            break result;
        }
        debug!(runs = inner.runs.get(), "Effect dirty after run, running again");
    };
    inner.running.set(false);

    if inner.disposed.get() {
        dispose(inner);
    }
    result
}

fn rerun_from_change(inner: &Rc<EffectInner>) {
    if let Err(error) = execute(inner) {
        warn!(error = %error, "Effect rerun failed");
        *inner.last_error.borrow_mut() = Some(error);
    }
}

/// Per-run dependency accessor handed to effect functions.
pub struct Tracker {
    deps: Deps,
    effect: Rc<EffectInner>,
    read: RefCell<Vec<String>>,
    subscriptions: RefCell<Vec<Unsubscribe>>,
}

impl Tracker {
    /// Reads a dependency and subscribes the running effect to it.
    ///
    /// `T` is the dependency's value type: `T` for `State<T>` / `Computed<T>`,
    /// `Loadable<T>` for `Resource<T>`.
    pub fn get<T: 'static>(&self, name: &str) -> Result<T, ModelError> {
        let dep = self.deps.get(name)?;
        let already_read = self.read.borrow().iter().any(|read| read == name);
        if !already_read {
            self.read.borrow_mut().push(name.to_string());
            let effect = Rc::clone(&self.effect);
            let subscription = dep.subscribe_changes(Rc::new(move || rerun_from_change(&effect)));
            self.subscriptions.borrow_mut().push(subscription);
        }
        Self::downcast(name, dep.current_any())
    }

    /// Reads a dependency without subscribing to it.
    pub fn peek<T: 'static>(&self, name: &str) -> Result<T, ModelError> {
        let dep = self.deps.get(name)?;
        Self::downcast(name, dep.current_any())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains(name)
    }

    /// Names read so far during this run, in first-read order.
    pub fn read_names(&self) -> Vec<String> {
        self.read.borrow().clone()
    }

    fn downcast<T: 'static>(name: &str, value: Box<dyn std::any::Any>) -> Result<T, ModelError> {
        value
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ModelError::DependencyType {
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }
}

/// Calls `on_change(new, old)` only when a derived value actually changes.
///
/// The first run records the baseline without calling `on_change`.
#[derive(Clone, Debug)]
pub struct Watcher {
    effect: Effect,
}

impl Watcher {
    pub fn new<T: Clone + PartialEq + 'static>(
        deps: Deps,
        select: impl Fn(&Tracker) -> Result<T, ModelError> + 'static,
        on_change: impl Fn(&T, &T) + 'static,
    ) -> Result<Self, ModelError> {
        Self::with_compare(deps, select, on_change, |a: &T, b: &T| a == b)
    }

    /// Like [`Watcher::new`] with a custom equality.
    pub fn with_compare<T: Clone + 'static>(
        deps: Deps,
        select: impl Fn(&Tracker) -> Result<T, ModelError> + 'static,
        on_change: impl Fn(&T, &T) + 'static,
        equals: impl Fn(&T, &T) -> bool + 'static,
    ) -> Result<Self, ModelError> {
        let previous: RefCell<Option<T>> = RefCell::new(None);
        let effect = Effect::with_callback(deps, select, move |next: T| {
            let old = previous.replace(Some(next.clone()));
            if let Some(old) = old {
                if !equals(&old, &next) {
                    on_change(&next, &old);
                }
            }
        })?;
        Ok(Self { effect })
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn dispose(&self) {
        self.effect.dispose();
    }
}
