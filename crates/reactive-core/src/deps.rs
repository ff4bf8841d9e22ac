//! # Reactive Dependencies
//!
//! [`Reactive`] is the object-safe face shared by every reactive value (state, computed,
//! resource). It is also the render-notification contract consumed by UI bindings:
//! subscribe to changes, and read the current value without subscribing.
//!
//! [`Deps`] is the named dependency map handed to effects, computed values and
//! resources.

use crate::error::ModelError;
use crate::listener::Unsubscribe;
use indexmap::IndexMap;
use std::any::Any;
use std::rc::Rc;

/// A value that notifies subscribers when it changes.
pub trait Reactive {
    /// Registers `on_change`, called synchronously after every real change.
    fn subscribe_changes(&self, on_change: Rc<dyn Fn()>) -> Unsubscribe;

    /// The current value, boxed. `State<T>` and `Computed<T>` yield `T`,
    /// `Resource<T>` yields `Loadable<T>`.
    fn current_any(&self) -> Box<dyn Any>;

    /// Releases subscribers (and internal effects, where there are any).
    fn dispose(&self);
}

/// An ordered, named set of reactive dependencies.
#[derive(Clone, Default)]
pub struct Deps {
    entries: IndexMap<String, Rc<dyn Reactive>>,
}

impl Deps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named dependency.
    pub fn with<R: Reactive + Clone + 'static>(mut self, name: impl Into<String>, reactive: &R) -> Self {
        self.entries.insert(name.into(), Rc::new(reactive.clone()));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, reactive: Rc<dyn Reactive>) {
        self.entries.insert(name.into(), reactive);
    }

    pub fn get(&self, name: &str) -> Result<&Rc<dyn Reactive>, ModelError> {
        self.entries
            .get(name)
            .ok_or_else(|| ModelError::UndeclaredDependency(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Deps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}
