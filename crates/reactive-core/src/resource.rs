//! # Resource Engine
//!
//! A [`Resource<T>`] is an asynchronously loaded reactive value. Its status follows a
//! small state machine:
//!
//! ```text
//! Idle ──load()──▶ Loading ──▶ Succeeded(T)
//!                     ▲    └──▶ Failed(e)
//!                     └──reload()── Succeeded | Failed
//! ```
//!
//! # Version counter
//!
//! Loading is driven by an internal [`Effect`] whose dependencies are the user-supplied
//! ones plus a `version` counter (registered under [`VERSION_DEP`]). Version `0` means
//! "never loaded", so [`Resource::load`] only moves it to `1`, while
//! [`Resource::reload`] always bumps it. "Trigger a reload" is just "bump a number", and
//! a change to any dependency the loader reads reloads the resource too.
//!
//! # Staleness
//!
//! Each effect run starts a new load generation. A load that completes after a newer
//! generation has started is discarded and never writes state. Outcomes are routed
//! through a [`DeferController`]; a controller that has been superseded by a newer one
//! is ignored as well, which keeps paused deliveries from resurrecting old results.
//!
//! # Runtime
//!
//! Loader futures run as local tasks, so loading requires a [`tokio::task::LocalSet`].
//! A resource keeps reacting to its dependencies until [`Resource::dispose`], even when
//! every handle has been dropped.

use crate::defer::{defer, DeferController, Unpause};
use crate::deps::{Deps, Reactive};
use crate::effect::{Effect, Tracker};
use crate::error::{LoadError, ModelError};
use crate::listener::{ListenerGroup, Unsubscribe};
use crate::loadable::Loadable;
use crate::promise::{Promise, Status};
use crate::state::State;
use crate::wait::Wait;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use tracing::debug;

/// The boxed future a loader returns.
pub type LoadFuture<T> = Pin<Box<dyn Future<Output = Result<T, LoadError>>>>;

type LoaderFn<T> = dyn Fn(&Tracker) -> Result<LoadFuture<T>, LoadError>;

/// Dependency name under which the version counter is tracked.
pub const VERSION_DEP: &str = "@version";

/// Adapts an async closure into a loader.
///
/// `f` runs synchronously inside the loading effect, so dependencies read through the
/// tracker are tracked; the future it returns is then awaited on a local task.
///
/// ```rust
/// use reactive_core::resource::loader;
/// use reactive_core::{Deps, LoadError, Resource, State};
///
/// let user = State::new(7u32);
/// let profile = Resource::new(
///     Deps::new().with("user", &user),
///     loader(|tracker| {
///         let user = tracker.get::<u32>("user");
///         async move { Ok::<_, LoadError>(format!("user-{}", user?)) }
///     }),
/// )
/// .unwrap();
/// assert!(profile.loadable().is_idle());
/// ```
pub fn loader<T, F, Fut>(f: F) -> impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static
where
    T: 'static,
    F: Fn(&Tracker) -> Fut + 'static,
    Fut: Future<Output = Result<T, LoadError>> + 'static,
{
    move |tracker: &Tracker| -> Result<LoadFuture<T>, LoadError> { Ok(Box::pin(f(tracker))) }
}

struct ResourceInner<T> {
    loadable: RefCell<Loadable<T>>,
    last_value: RefCell<Option<T>>,
    listeners: ListenerGroup<Loadable<T>>,
    version: State<u64>,
    controller: RefCell<DeferController<T>>,
    controller_seq: Cell<u64>,
    promise: RefCell<Promise<T>>,
    initial: RefCell<Option<T>>,
    generation: Cell<u64>,
    loader: Box<LoaderFn<T>>,
    effect: RefCell<Option<Effect>>,
    disposed: Cell<bool>,
}

impl<T: Clone + PartialEq + 'static> ResourceInner<T> {
    fn run(self: &Rc<Self>, version: u64, tracker: &Tracker) {
        if version == 0 || self.disposed.get() {
            return;
        }
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        let controller = self.current_controller();

        let initial = self.initial.borrow_mut().take();
        if let Some(value) = initial {
            debug!(version, "Resource seeded from initial value");
            controller.resolve(value);
            return;
        }

        debug!(version, generation, "Resource loading");
        self.transition(Loadable::Loading);
        match (self.loader)(tracker) {
            Err(error) => {
                controller.reject(error);
            }
            Ok(future) => {
                let weak = Rc::downgrade(self);
                tokio::task::spawn_local(async move {
                    let outcome = future.await;
                    let Some(inner) = weak.upgrade() else {
                        return;
                    };
                    if inner.disposed.get() || inner.generation.get() != generation {
                        debug!(generation, "Discarding stale load");
                        return;
                    }
                    match outcome {
                        Ok(value) => {
                            controller.resolve(value);
                        }
                        Err(error) => {
                            controller.reject(error);
                        }
                    }
                });
            }
        }
    }

    /// Reuses the live controller while it is undecided, otherwise swaps in a fresh one.
    fn current_controller(self: &Rc<Self>) -> DeferController<T> {
        if self.controller.borrow().is_settled() {
            let (promise, controller) = defer();
            let seq = self.controller_seq.get() + 1;
            self.controller_seq.set(seq);
            self.watch_controller(&controller, seq);
            *self.controller.borrow_mut() = controller;
            *self.promise.borrow_mut() = promise;
        }
        self.controller.borrow().clone()
    }

    fn watch_controller(self: &Rc<Self>, controller: &DeferController<T>, seq: u64) {
        let weak = Rc::downgrade(self);
        let _ = controller.promise().on_settle(move |status| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.disposed.get() || inner.controller_seq.get() != seq {
                return;
            }
            match status {
                Status::Resolved(value) => {
                    *inner.last_value.borrow_mut() = Some(value.clone());
                    inner.transition(Loadable::Succeeded(value.clone()));
                }
                Status::Rejected(error) => inner.transition(Loadable::Failed(error.clone())),
                Status::Pending => {}
            }
        });
    }

    fn transition(&self, next: Loadable<T>) {
        if *self.loadable.borrow() == next {
            return;
        }
        debug!(status = next.label(), "Resource transition");
        *self.loadable.borrow_mut() = next.clone();
        self.listeners.invoke(&next);
    }
}

/// An asynchronously loaded reactive value.
///
/// Cloning a `Resource` creates a new handle to the **same** resource.
pub struct Resource<T> {
    inner: Rc<ResourceInner<T>>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("loadable", &*self.inner.loadable.borrow())
            .field("generation", &self.inner.generation.get())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Resource<T> {
    /// Creates an idle resource. Nothing is loaded until [`Resource::load`].
    pub fn new(
        deps: Deps,
        loader: impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static,
    ) -> Result<Self, ModelError> {
        Self::with_initial(deps, loader, None)
    }

    /// Creates a resource that, when `initial` is present, starts out loaded with it.
    ///
    /// The initial value is consumed by the first run and bypasses the loader; later
    /// reloads call the loader as usual.
    pub fn with_initial(
        deps: Deps,
        loader: impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static,
        initial: Option<T>,
    ) -> Result<Self, ModelError> {
        let version = State::new(u64::from(initial.is_some()));
        let deps = deps.with(VERSION_DEP, &version);
        let (promise, controller) = defer();

        let inner = Rc::new(ResourceInner {
            loadable: RefCell::new(Loadable::Idle),
            last_value: RefCell::new(None),
            listeners: ListenerGroup::new(),
            version,
            controller: RefCell::new(controller.clone()),
            controller_seq: Cell::new(0),
            promise: RefCell::new(promise),
            initial: RefCell::new(initial),
            generation: Cell::new(0),
            loader: Box::new(loader),
            effect: RefCell::new(None),
            disposed: Cell::new(false),
        });
        inner.watch_controller(&controller, 0);

        let owner = Rc::clone(&inner);
        let effect = Effect::new(deps, move |tracker| {
            let version: u64 = tracker.get(VERSION_DEP)?;
            owner.run(version, tracker);
            Ok(())
        })?;
        *inner.effect.borrow_mut() = Some(effect);
        Ok(Self { inner })
    }

    /// Starts the first load. Does nothing once the resource has been loaded or is
    /// loading.
    pub fn load(&self) {
        if self.inner.version.get() == 0 {
            self.inner.version.set(1);
        }
    }

    /// Always starts a new load.
    pub fn reload(&self) {
        self.inner.version.update(|version| version + 1);
    }

    pub fn loadable(&self) -> Loadable<T> {
        self.inner.loadable.borrow().clone()
    }

    /// The last successfully loaded value. Kept while a reload is in flight.
    pub fn value(&self) -> Option<T> {
        self.inner.last_value.borrow().clone()
    }

    pub fn error(&self) -> Option<LoadError> {
        self.inner.loadable.borrow().error().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loadable.borrow().is_loading()
    }

    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// The promise of the current (or next) load.
    pub fn promise(&self) -> Promise<T> {
        self.inner.promise.borrow().clone()
    }

    /// Starts loading if needed and classifies the current promise.
    pub fn read(&self) -> Wait<T> {
        self.load();
        Wait::from_promise(&self.promise())
    }

    /// Holds back delivery of the current load's outcome.
    pub fn pause(&self) -> Unpause<T> {
        let controller = self.inner.controller.borrow().clone();
        controller.pause()
    }

    pub fn subscribe(&self, listener: impl Fn(&Loadable<T>) + 'static) -> Unsubscribe {
        self.inner.listeners.add(listener)
    }

    /// The internal loading effect.
    pub fn effect(&self) -> Option<Effect> {
        self.inner.effect.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Stops loading, drops subscribers, and swaps in a promise that never settles so
    /// late completions cannot resurrect the resource.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        if let Some(effect) = self.inner.effect.borrow().as_ref() {
            effect.dispose();
        }
        self.inner.listeners.clear();
        self.inner.version.dispose();
        *self.inner.promise.borrow_mut() = Promise::never();
    }

    pub fn ptr_eq(&self, other: &Resource<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + 'static> Reactive for Resource<T> {
    fn subscribe_changes(&self, on_change: Rc<dyn Fn()>) -> Unsubscribe {
        self.subscribe(move |_| on_change())
    }

    fn current_any(&self) -> Box<dyn Any> {
        Box::new(self.loadable())
    }

    fn dispose(&self) {
        Resource::dispose(self);
    }
}
