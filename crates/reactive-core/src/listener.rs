//! # Listener Group
//!
//! The ordered multicast primitive everything else in this crate is built on.
//!
//! - Listeners run synchronously, in registration order.
//! - Dispatch iterates over a frozen copy of the listener list, so listeners may add or
//!   remove listeners (including themselves) while a dispatch is in progress without
//!   affecting that dispatch.
//! - There is no error isolation: a panicking listener aborts the remaining dispatch.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Listener<A> = Rc<dyn Fn(&A)>;

/// Handle returned by every `subscribe`-style call. Calling [`Unsubscribe::unsubscribe`]
/// removes exactly the listeners that were registered together.
///
/// Dropping the handle does **not** unsubscribe.
pub struct Unsubscribe(Option<Box<dyn FnOnce()>>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Unsubscribe(Some(Box::new(f)))
    }

    /// An inert handle.
    pub fn noop() -> Self {
        Unsubscribe(None)
    }

    /// Combines several handles into one.
    pub fn merge(handles: Vec<Unsubscribe>) -> Self {
        Unsubscribe::new(move || {
            for handle in handles {
                handle.unsubscribe();
            }
        })
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("armed", &self.0.is_some())
            .finish()
    }
}

struct GroupInner<A> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, Listener<A>)>>,
}

/// An ordered list of listeners that can be invoked together.
///
/// Cloning a `ListenerGroup` creates a new handle to the **same** list.
pub struct ListenerGroup<A> {
    inner: Rc<GroupInner<A>>,
}

impl<A> Clone for ListenerGroup<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> Default for ListenerGroup<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: 'static> ListenerGroup<A> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(GroupInner {
                next_id: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Registers a single listener.
    pub fn add(&self, listener: impl Fn(&A) + 'static) -> Unsubscribe {
        self.add_all([Rc::new(listener) as Listener<A>])
    }

    /// Registers several listeners at once. The returned handle removes exactly these.
    pub fn add_all(&self, listeners: impl IntoIterator<Item = Rc<dyn Fn(&A)>>) -> Unsubscribe {
        let mut ids = Vec::new();
        {
            let mut list = self.inner.listeners.borrow_mut();
            for listener in listeners {
                let id = self.inner.next_id.get();
                self.inner.next_id.set(id + 1);
                list.push((id, listener));
                ids.push(id);
            }
        }

        let weak = Rc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .borrow_mut()
                    .retain(|(id, _)| !ids.contains(id));
            }
        })
    }

    /// Calls every current listener with `arg`.
    pub fn invoke(&self, arg: &A) {
        let snapshot: Vec<Listener<A>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(arg);
        }
    }

    pub fn clear(&self) {
        self.inner.listeners.borrow_mut().clear();
    }

    /// Removes every listener, then calls the removed ones with `arg`.
    ///
    /// Listeners registered during this dispatch are kept for the next one.
    pub fn invoke_and_clear(&self, arg: &A) {
        let taken = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        for (_, listener) in taken {
            listener(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
