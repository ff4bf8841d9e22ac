//! # Model Context
//!
//! The handle a model builder receives. It creates the instance's reactive primitives,
//! registers lifecycle hooks, and resolves the models and modules the instance uses.
//!
//! Everything created through the context is owned by the instance and released when
//! it is disposed.
//!
//! | Operation | Allowed phases |
//! |-----------|----------------|
//! | `state`, `persisted_state`, `computed`, `resource`, `persisted_resource`, `on` | `PreInit` |
//! | `effect`, `watch`, `use_model`, `use_module`, `use_fn` | any but `Disposed` |

use crate::container::{Container, WeakContainer};
use crate::instance::{InstanceCore, Phase};
use crate::model_type::ModelType;
use crate::module::LazyModule;
use crate::storage::StorageBinding;
use crate::{ModelError, ModelInstance, ModelKey};
use reactive_core::{
    Computed, Deps, Effect, LoadError, LoadFuture, Loadable, Promise, Reactive, Resource, State,
    Tracker, Watcher,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::rc::Rc;

const BUILDING: &[Phase] = &[Phase::PreInit];
const LIVE: &[Phase] = &[Phase::PreInit, Phase::Init, Phase::Ready];

/// Lifecycle events a builder can hook into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// After the builder returned and the instance was registered.
    Init,
    /// During disposal, after the child container and before primitives are released.
    Dispose,
}

/// The builder-facing handle of one model instance.
#[derive(Clone)]
pub struct ModelContext {
    core: Rc<InstanceCore>,
    container: WeakContainer,
}

impl ModelContext {
    pub(crate) fn new(core: Rc<InstanceCore>, container: WeakContainer) -> Self {
        Self { core, container }
    }

    pub fn key(&self) -> &ModelKey {
        &self.core.key
    }

    /// The model type name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn phase(&self) -> Phase {
        self.core.phase.get()
    }

    /// The container that owns this instance, while it is alive.
    pub fn container(&self) -> Option<Container> {
        self.container.upgrade()
    }

    pub fn state<T: Clone + PartialEq + 'static>(&self, initial: T) -> Result<State<T>, ModelError> {
        self.core.check_phase("state", BUILDING)?;
        let state = State::new(initial);
        self.own(&state);
        Ok(state)
    }

    /// A state seeded from storage and written back on every change.
    ///
    /// `key` is a logical storage key (`"count"` or `"session:count"`). When the storage
    /// has no entry, `initial` is used and nothing is written until the first change.
    pub fn persisted_state<T>(&self, key: &str, initial: T) -> Result<State<T>, ModelError>
    where
        T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
    {
        self.core.check_phase("persisted_state", BUILDING)?;
        let binding = StorageBinding::resolve(&self.core.storages, &self.core.name, key)?;
        let seed = binding.read::<T>()?;
        let state = State::new(seed.unwrap_or(initial));
        let _ = state.subscribe(move |value| binding.write(value));
        self.own(&state);
        Ok(state)
    }

    pub fn computed<T: Clone + PartialEq + 'static>(
        &self,
        deps: Deps,
        compute: impl Fn(&Tracker) -> Result<T, ModelError> + 'static,
    ) -> Result<Computed<T>, ModelError> {
        self.core.check_phase("computed", BUILDING)?;
        let computed = Computed::new(deps, compute)?;
        self.own(&computed);
        Ok(computed)
    }

    pub fn resource<T: Clone + PartialEq + 'static>(
        &self,
        deps: Deps,
        loader: impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static,
    ) -> Result<Resource<T>, ModelError> {
        self.core.check_phase("resource", BUILDING)?;
        let resource = Resource::new(deps, loader)?;
        self.own(&resource);
        Ok(resource)
    }

    /// A resource that starts out loaded when storage holds a value for `key`, and
    /// writes every successfully loaded value back.
    pub fn persisted_resource<T>(
        &self,
        key: &str,
        deps: Deps,
        loader: impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static,
    ) -> Result<Resource<T>, ModelError>
    where
        T: Clone + PartialEq + Serialize + DeserializeOwned + 'static,
    {
        self.core.check_phase("persisted_resource", BUILDING)?;
        let binding = StorageBinding::resolve(&self.core.storages, &self.core.name, key)?;
        let seed = binding.read::<T>()?;
        let resource = Resource::with_initial(deps, loader, seed)?;
        let _ = resource.subscribe(move |loadable| {
            if let Loadable::Succeeded(value) = loadable {
                binding.write(value);
            }
        });
        self.own(&resource);
        Ok(resource)
    }

    /// Registers an effect owned by this instance.
    pub fn effect(
        &self,
        deps: Deps,
        f: impl Fn(&Tracker) -> Result<(), ModelError> + 'static,
    ) -> Result<Effect, ModelError> {
        self.core.check_phase("effect", LIVE)?;
        let effect = Effect::new(deps, f)?;
        self.core.effects.borrow_mut().push(effect.clone());
        Ok(effect)
    }

    /// Registers a watcher owned by this instance.
    pub fn watch<T: Clone + PartialEq + 'static>(
        &self,
        deps: Deps,
        select: impl Fn(&Tracker) -> Result<T, ModelError> + 'static,
        on_change: impl Fn(&T, &T) + 'static,
    ) -> Result<Watcher, ModelError> {
        self.core.check_phase("watch", LIVE)?;
        let watcher = Watcher::new(deps, select, on_change)?;
        self.core.effects.borrow_mut().push(watcher.effect().clone());
        Ok(watcher)
    }

    pub fn on(
        &self,
        event: Lifecycle,
        hook: impl FnOnce() -> Result<(), ModelError> + 'static,
    ) -> Result<(), ModelError> {
        self.core.check_phase("on", BUILDING)?;
        match event {
            Lifecycle::Init => self.core.init_hooks.borrow_mut().push(Box::new(hook)),
            Lifecycle::Dispose => self.core.dispose_hooks.borrow_mut().push(Box::new(hook)),
        }
        Ok(())
    }

    /// Resolves a model from this instance's private child container.
    ///
    /// The child container is created on first use and shares this container's
    /// storages. Each parent instance gets its own child instances, and disposing the
    /// parent disposes them.
    pub fn use_model<K: Serialize + ?Sized>(&self, ty: &ModelType, key: &K) -> Result<ModelInstance, ModelError> {
        self.core.check_phase("use_model", LIVE)?;
        let children = self
            .core
            .children
            .borrow_mut()
            .get_or_insert_with(|| Container::child(&self.core.storages, &self.core.building))
            .clone();
        children.get(ty, key)
    }

    /// Starts (or reuses) the module load.
    pub fn use_module<M: 'static>(&self, module: &LazyModule<M>) -> Result<Promise<Rc<M>>, ModelError> {
        self.core.check_phase("use_module", LIVE)?;
        Ok(module.load())
    }

    /// Calls `f` with this context.
    pub fn use_fn<R>(&self, f: impl FnOnce(&ModelContext) -> R) -> Result<R, ModelError> {
        self.core.check_phase("use_fn", LIVE)?;
        Ok(f(self))
    }

    fn own<R: Reactive + Clone + 'static>(&self, reactive: &R) {
        self.core.primitives.borrow_mut().push(Rc::new(reactive.clone()));
    }
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext")
            .field("name", &self.core.name)
            .field("key", &self.core.key)
            .field("phase", &self.core.phase.get())
            .finish()
    }
}
