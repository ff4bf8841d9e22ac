//! # Container
//!
//! The registry that resolves model types to live instances. For each type it keeps at
//! most one live instance per structurally equal key: `get(&counter, &json!({"id": 1}))`
//! from two call sites yields the same instance.
//!
//! Besides models, a container holds plain named values (`set_value` / `value`) and the
//! named storages persisted primitives write to.
//!
//! ## Re-entrancy
//!
//! Builders run without any registry borrow held, so a builder may resolve other models
//! from the same container. A builder that (directly or through other builders)
//! requests the instance it is building fails with
//! [`ModelError::CircularDependency`] instead of recursing.
//!
//! ## Snapshots
//!
//! [`Container::backup`] captures the registry. The returned [`Restore`] only applies
//! if no newer backup was taken in the meantime.

use crate::instance::ModelInstance;
use crate::model_type::{ModelType, ModelTypeId};
use crate::named::{Named, NamedEntry};
use crate::storage::{Storage, Storages};
use crate::{DeepMap, ModelError, ModelKey};
use indexmap::IndexMap;
use serde::Serialize;
use std::any::{type_name, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Slot {
    Model(ModelTypeId),
    Value(String),
}

#[derive(Clone)]
enum RegistryEntry {
    Models(DeepMap<ModelInstance>),
    Value(Rc<dyn Any>),
}

type Registry = IndexMap<Slot, RegistryEntry>;

/// The models currently being built, shared by a container and its descendants.
#[derive(Clone, Default)]
pub(crate) struct BuildStack(Rc<RefCell<Vec<(ModelTypeId, ModelKey, String)>>>);

impl BuildStack {
    fn enter(&self, ty: &ModelType, key: &ModelKey) -> Result<BuildGuard, ModelError> {
        let label = format!("{}({})", ty.name(), key);
        let mut stack = self.0.borrow_mut();
        if stack.iter().any(|(id, building, _)| *id == ty.id() && building == key) {
            let path = stack
                .iter()
                .map(|(_, _, label)| label.as_str())
                .chain(std::iter::once(label.as_str()))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(ModelError::CircularDependency(path));
        }
        stack.push((ty.id(), key.clone(), label));
        Ok(BuildGuard { stack: self.clone() })
    }
}

struct BuildGuard {
    stack: BuildStack,
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        self.stack.0.borrow_mut().pop();
    }
}

struct ContainerInner {
    storages: Storages,
    building: BuildStack,
    registry: RefCell<Registry>,
    backups: Cell<u64>,
}

/// A model registry.
///
/// Cloning creates a new handle to the **same** registry.
#[derive(Clone)]
pub struct Container {
    inner: Rc<ContainerInner>,
}

/// A non-owning container handle, held by model contexts.
#[derive(Clone)]
pub(crate) struct WeakContainer(Weak<ContainerInner>);

impl WeakContainer {
    pub(crate) fn upgrade(&self) -> Option<Container> {
        self.0.upgrade().map(|inner| Container { inner })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    /// A container with only the default in-memory storage.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ContainerBuilder {
        ContainerBuilder {
            storages: Storages::new(),
        }
    }

    pub(crate) fn child(storages: &Storages, building: &BuildStack) -> Self {
        Self::with_parts(storages.clone(), building.clone())
    }

    fn with_parts(storages: Storages, building: BuildStack) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                storages,
                building,
                registry: RefCell::new(IndexMap::new()),
                backups: Cell::new(0),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakContainer {
        WeakContainer(Rc::downgrade(&self.inner))
    }

    pub(crate) fn building(&self) -> &BuildStack {
        &self.inner.building
    }

    pub fn storages(&self) -> &Storages {
        &self.inner.storages
    }

    pub fn storage(&self, name: &str) -> Result<Rc<dyn Storage>, ModelError> {
        self.inner.storages.get(name)
    }

    /// Returns the instance for `(ty, key)`, building it on first access.
    pub fn get<K: Serialize + ?Sized>(&self, ty: &ModelType, key: &K) -> Result<ModelInstance, ModelError> {
        self.get_by_key(ty, ModelKey::new(key)?)
    }

    /// Returns the instance for `ty` under the default (unit) key.
    pub fn get_default(&self, ty: &ModelType) -> Result<ModelInstance, ModelError> {
        self.get_by_key(ty, ModelKey::unit())
    }

    pub fn get_by_key(&self, ty: &ModelType, key: ModelKey) -> Result<ModelInstance, ModelError> {
        if let Some(instance) = self.lookup(ty, &key) {
            return Ok(instance);
        }

        let built = {
            let _guard = self.inner.building.enter(ty, &key)?;
            ModelInstance::build(ty, key.clone(), self)?
        };

        // The builder may have registered this key itself.
        if let Some(existing) = self.lookup(ty, &key) {
            debug!(model = ty.name(), key = %key, "Instance registered during build, keeping it");
            if let Err(error) = built.dispose() {
                warn!(model = ty.name(), error = %error, "Failed to dispose duplicate instance");
            }
            return Ok(existing);
        }

        self.models_mut(ty, |models| {
            models.insert(key.clone(), built.clone());
        });
        if let Err(error) = built.init() {
            self.models_mut(ty, |models| {
                if models.get(&key).is_some_and(|current| current.ptr_eq(&built)) {
                    models.remove(&key);
                }
            });
            if let Err(cleanup) = built.dispose() {
                warn!(model = ty.name(), error = %cleanup, "Failed to dispose instance after init error");
            }
            return Err(error);
        }

        info!(model = ty.name(), key = %key, "Model instance created");
        Ok(built)
    }

    /// Live instances of `ty`, in creation order.
    pub fn get_all(&self, ty: &ModelType) -> Vec<ModelInstance> {
        match self.inner.registry.borrow().get(&Slot::Model(ty.id())) {
            Some(RegistryEntry::Models(models)) => models
                .values()
                .filter(|instance| !instance.is_disposed())
                .cloned()
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains<K: Serialize + ?Sized>(&self, ty: &ModelType, key: &K) -> Result<bool, ModelError> {
        Ok(self.lookup(ty, &ModelKey::new(key)?).is_some())
    }

    /// Unregisters and disposes the instance for `(ty, key)`. Returns whether one was
    /// registered.
    pub fn delete<K: Serialize + ?Sized>(&self, ty: &ModelType, key: &K) -> Result<bool, ModelError> {
        let key = ModelKey::new(key)?;
        let mut removed = None;
        self.models_mut(ty, |models| removed = models.remove(&key));
        let Some(instance) = removed else {
            return Ok(false);
        };
        instance.dispose()?;
        info!(model = ty.name(), key = %key, "Model instance deleted");
        Ok(true)
    }

    /// Unregisters and disposes every instance of `ty`, or everything (values included)
    /// when `ty` is `None`.
    ///
    /// Every disposal runs even when some fail; the failures are returned together.
    pub fn delete_all(&self, ty: Option<&ModelType>) -> Result<(), ModelError> {
        let removed: Vec<RegistryEntry> = match ty {
            Some(ty) => self
                .inner
                .registry
                .borrow_mut()
                .shift_remove(&Slot::Model(ty.id()))
                .into_iter()
                .collect(),
            None => std::mem::take(&mut *self.inner.registry.borrow_mut())
                .into_values()
                .collect(),
        };

        let mut errors = Vec::new();
        let mut disposed = 0usize;
        for entry in removed {
            let RegistryEntry::Models(mut models) = entry else {
                continue;
            };
            for (key, instance) in models.drain() {
                disposed += 1;
                if let Err(error) = instance.dispose() {
                    warn!(model = instance.name(), key = %key, error = %error, "Failed to dispose model instance");
                    errors.push(error);
                }
            }
        }
        info!(disposed, failed = errors.len(), "Deleted model instances");
        ModelError::aggregate(errors)
    }

    /// Registers a plain value under `name`, replacing any previous one.
    pub fn set_value<T: 'static>(&self, name: impl Into<String>, value: T) {
        self.inner
            .registry
            .borrow_mut()
            .insert(Slot::Value(name.into()), RegistryEntry::Value(Rc::new(value)));
    }

    pub(crate) fn set_value_rc(&self, name: &str, value: Rc<dyn Any>) {
        self.inner
            .registry
            .borrow_mut()
            .insert(Slot::Value(name.to_string()), RegistryEntry::Value(value));
    }

    /// Returns the value registered under `name`, as registered.
    pub fn value<T: Clone + 'static>(&self, name: &str) -> Result<T, ModelError> {
        match self.inner.registry.borrow().get(&Slot::Value(name.to_string())) {
            Some(RegistryEntry::Value(value)) => {
                value
                    .downcast_ref::<T>()
                    .cloned()
                    .ok_or_else(|| ModelError::DependencyType {
                        name: name.to_string(),
                        expected: type_name::<T>(),
                    })
            }
            _ => Err(ModelError::MissingValue(name.to_string())),
        }
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.inner
            .registry
            .borrow()
            .contains_key(&Slot::Value(name.to_string()))
    }

    /// Registers `instance` for `(ty, key)` without building anything. Returns the
    /// instance it replaced, which is left undisposed.
    pub fn override_instance<K: Serialize + ?Sized>(
        &self,
        ty: &ModelType,
        key: &K,
        instance: ModelInstance,
    ) -> Result<Option<ModelInstance>, ModelError> {
        let key = ModelKey::new(key)?;
        let mut previous = None;
        self.models_mut(ty, |models| previous = models.insert(key, instance));
        Ok(previous)
    }

    /// A facade restricted to the given names. Entries declared with a value are set
    /// on this container right away.
    pub fn named<N: Into<String>>(&self, entries: impl IntoIterator<Item = (N, NamedEntry)>) -> Named {
        Named::new(self.clone(), entries)
    }

    /// Snapshots the registry. Taking a backup supersedes every earlier one.
    pub fn backup(&self) -> Restore {
        let generation = self.inner.backups.get() + 1;
        self.inner.backups.set(generation);
        debug!(generation, "Container backup taken");
        Restore {
            container: self.clone(),
            generation,
            snapshot: self.inner.registry.borrow().clone(),
        }
    }

    fn lookup(&self, ty: &ModelType, key: &ModelKey) -> Option<ModelInstance> {
        match self.inner.registry.borrow().get(&Slot::Model(ty.id())) {
            Some(RegistryEntry::Models(models)) => models
                .get(key)
                .filter(|instance| !instance.is_disposed())
                .cloned(),
            _ => None,
        }
    }

    fn models_mut(&self, ty: &ModelType, f: impl FnOnce(&mut DeepMap<ModelInstance>)) {
        let mut registry = self.inner.registry.borrow_mut();
        let entry = registry
            .entry(Slot::Model(ty.id()))
            .or_insert_with(|| RegistryEntry::Models(DeepMap::new()));
        if matches!(entry, RegistryEntry::Value(_)) {
            *entry = RegistryEntry::Models(DeepMap::new());
        }
        if let RegistryEntry::Models(models) = entry {
            f(models);
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("storages", &self.inner.storages)
            .field("slots", &self.inner.registry.borrow().keys().collect::<Vec<_>>())
            .field("backups", &self.inner.backups.get())
            .finish()
    }
}

/// Configures a [`Container`].
pub struct ContainerBuilder {
    storages: Storages,
}

impl ContainerBuilder {
    /// Installs a named storage. Naming it `"default"` replaces the in-memory default.
    pub fn storage(self, name: impl Into<String>, storage: impl Storage + 'static) -> Self {
        self.storages.insert(name, Rc::new(storage));
        self
    }

    pub fn build(self) -> Container {
        Container::with_parts(self.storages, BuildStack::default())
    }
}

/// Restores the registry captured by [`Container::backup`].
#[must_use = "a backup does nothing unless restored"]
pub struct Restore {
    container: Container,
    generation: u64,
    snapshot: Registry,
}

impl Restore {
    /// Whether no newer backup has been taken.
    pub fn is_current(&self) -> bool {
        self.container.inner.backups.get() == self.generation
    }

    /// Puts the snapshot back unless a newer backup superseded it. Instances created
    /// after the backup are unregistered but not disposed.
    pub fn restore(self) -> bool {
        if !self.is_current() {
            debug!(generation = self.generation, "Skipping superseded backup");
            return false;
        }
        let previous = self.container.inner.registry.replace(self.snapshot);
        drop(previous);
        info!(generation = self.generation, "Container backup restored");
        true
    }
}

impl fmt::Debug for Restore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restore")
            .field("generation", &self.generation)
            .field("current", &self.is_current())
            .finish()
    }
}
