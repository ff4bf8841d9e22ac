//! # State
//!
//! A mutable reactive cell. Writes that do not change the value (by `PartialEq`) are
//! no-ops; real changes notify every subscriber synchronously, in registration order,
//! before the write returns.

use crate::deps::Reactive;
use crate::listener::{ListenerGroup, Unsubscribe};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

struct StateInner<T> {
    value: RefCell<T>,
    revision: Cell<u64>,
    listeners: ListenerGroup<T>,
}

/// A mutable reactive value.
///
/// Cloning a `State` creates a new handle to the **same** cell.
pub struct State<T> {
    inner: Rc<StateInner<T>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("value", &*self.inner.value.borrow())
            .field("revision", &self.inner.revision.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> State<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(StateInner {
                value: RefCell::new(value),
                revision: Cell::new(0),
                listeners: ListenerGroup::new(),
            }),
        }
    }

    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Reads the value by reference.
    ///
    /// Writing to this state from inside `f` panics.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replaces the value. Returns `false` (and notifies nobody) if it was equal.
    pub fn set(&self, value: T) -> bool {
        if *self.inner.value.borrow() == value {
            return false;
        }
        self.inner.value.replace(value.clone());
        self.inner.revision.set(self.inner.revision.get() + 1);
        self.inner.listeners.invoke(&value);
        true
    }

    /// Derives the next value from the previous one.
    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = {
            let current = self.inner.value.borrow();
            f(&current)
        };
        self.set(next)
    }

    pub fn subscribe(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        self.inner.listeners.add(listener)
    }

    /// Incremented on every real change; lets render layers detect changes without
    /// subscribing.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Drops every subscriber. The value is kept.
    pub fn dispose(&self) {
        self.inner.listeners.clear();
    }

    pub fn ptr_eq(&self, other: &State<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + PartialEq + 'static> Reactive for State<T> {
    fn subscribe_changes(&self, on_change: Rc<dyn Fn()>) -> Unsubscribe {
        self.subscribe(move |_| on_change())
    }

    fn current_any(&self) -> Box<dyn Any> {
        Box::new(self.get())
    }

    fn dispose(&self) {
        State::dispose(self);
    }
}
