//! # Computed
//!
//! A read-only value derived from named dependencies by an internal [`Effect`]. The first
//! computation runs eagerly at construction; afterwards the value is recomputed every
//! time a dependency read on the latest run changes. Subscribers are only notified when
//! the computed value itself changes.
//!
//! Like any effect, a computed value stays subscribed to its dependencies until
//! [`Computed::dispose`], even when every handle has been dropped.

use crate::deps::{Deps, Reactive};
use crate::effect::{Effect, Tracker};
use crate::error::ModelError;
use crate::listener::{ListenerGroup, Unsubscribe};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct ComputedInner<T> {
    /// `None` only until the first run completes.
    value: RefCell<Option<T>>,
    revision: Cell<u64>,
    listeners: ListenerGroup<T>,
    effect: RefCell<Option<Effect>>,
}

impl<T: Clone + PartialEq + 'static> ComputedInner<T> {
    fn store(&self, next: T) {
        if self.value.borrow().as_ref() == Some(&next) {
            return;
        }
        let first = self.value.replace(Some(next.clone())).is_none();
        if !first {
            self.revision.set(self.revision.get() + 1);
            self.listeners.invoke(&next);
        }
    }
}

/// A derived reactive value.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("value", &*self.inner.value.borrow())
            .field("revision", &self.inner.revision.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Computed<T> {
    pub fn new(
        deps: Deps,
        compute: impl Fn(&Tracker) -> Result<T, ModelError> + 'static,
    ) -> Result<Self, ModelError> {
        let inner = Rc::new(ComputedInner {
            value: RefCell::new(None),
            revision: Cell::new(0),
            listeners: ListenerGroup::new(),
            effect: RefCell::new(None),
        });
        let target = Rc::clone(&inner);
        let effect = Effect::with_callback(deps, compute, move |next: T| target.store(next))?;
        *inner.effect.borrow_mut() = Some(effect);
        Ok(Self { inner })
    }

    pub fn get(&self) -> T {
        self.inner
            .value
            .borrow()
            .clone()
            .expect("computed value is populated by the eager first run")
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        self.inner.listeners.add(listener)
    }

    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    /// The internal effect, mostly useful to inspect rerun errors.
    pub fn effect(&self) -> Option<Effect> {
        self.inner.effect.borrow().clone()
    }

    /// Stops recomputing, then drops every subscriber.
    pub fn dispose(&self) {
        if let Some(effect) = self.inner.effect.borrow().as_ref() {
            effect.dispose();
        }
        self.inner.listeners.clear();
    }

    pub fn ptr_eq(&self, other: &Computed<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + 'static> Reactive for Computed<T> {
    fn subscribe_changes(&self, on_change: Rc<dyn Fn()>) -> Unsubscribe {
        self.subscribe(move |_| on_change())
    }

    fn current_any(&self) -> Box<dyn Any> {
        Box::new(self.get())
    }

    fn dispose(&self) {
        Computed::dispose(self);
    }
}
