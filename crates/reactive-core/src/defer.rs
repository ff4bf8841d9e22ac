//! # Deferred Controller
//!
//! A manually settled [`Promise`] with delivery control.
//!
//! `resolve` / `reject` decide the outcome (first call wins). The decided outcome is
//! delivered to the promise right away unless the controller is paused, in which case
//! delivery waits until every [`Unpause`] handle has been used. Pausing never changes the
//! outcome, only when observers get to see it. Tests use this to make races
//! deterministic; the resource engine uses it to hold back stale loads.

use crate::error::LoadError;
use crate::promise::{Promise, Status};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

struct DeferInner<T> {
    promise: Promise<T>,
    decided: RefCell<Status<T>>,
    paused: Cell<usize>,
    delivered: Cell<bool>,
}

/// The controlling half of [`defer`].
pub struct DeferController<T> {
    inner: Rc<DeferInner<T>>,
}

impl<T> Clone for DeferController<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Creates a pending promise together with the controller that settles it.
pub fn defer<T: Clone + 'static>() -> (Promise<T>, DeferController<T>) {
    let promise = Promise::pending();
    let controller = DeferController {
        inner: Rc::new(DeferInner {
            promise: promise.clone(),
            decided: RefCell::new(Status::Pending),
            paused: Cell::new(0),
            delivered: Cell::new(false),
        }),
    };
    (promise, controller)
}

impl<T: Clone + 'static> DeferController<T> {
    /// The decided outcome, which may not have been delivered yet.
    pub fn status(&self) -> Status<T> {
        self.inner.decided.borrow().clone()
    }

    /// Whether an outcome has been decided.
    pub fn is_settled(&self) -> bool {
        !self.inner.decided.borrow().is_pending()
    }

    /// Whether observers of the promise have seen the outcome.
    pub fn is_delivered(&self) -> bool {
        self.inner.delivered.get()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.paused.get() > 0
    }

    pub fn promise(&self) -> Promise<T> {
        self.inner.promise.clone()
    }

    /// Returns `true` if this call decided the outcome.
    pub fn resolve(&self, value: T) -> bool {
        self.decide(Status::Resolved(value))
    }

    /// Returns `true` if this call decided the outcome.
    pub fn reject(&self, error: LoadError) -> bool {
        self.decide(Status::Rejected(error))
    }

    fn decide(&self, outcome: Status<T>) -> bool {
        if self.is_settled() {
            return false;
        }
        *self.inner.decided.borrow_mut() = outcome;
        self.deliver();
        true
    }

    fn deliver(&self) {
        if self.is_paused() || self.is_delivered() || !self.is_settled() {
            return;
        }
        self.inner.delivered.set(true);
        let outcome = self.status();
        self.inner.promise.settle(outcome);
    }

    /// Holds back delivery until the returned handle is used.
    ///
    /// Once the outcome has been delivered, pausing has nothing left to hold back and the
    /// returned handle is inert.
    pub fn pause(&self) -> Unpause<T> {
        if self.is_delivered() {
            return Unpause { controller: None };
        }
        self.inner.paused.set(self.inner.paused.get() + 1);
        Unpause {
            controller: Some(self.clone()),
        }
    }

    pub fn ptr_eq(&self, other: &DeferController<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Releases one [`DeferController::pause`].
#[must_use = "delivery stays paused until `unpause` is called"]
pub struct Unpause<T> {
    controller: Option<DeferController<T>>,
}

impl<T: Clone + 'static> Unpause<T> {
    /// A handle that does nothing when used.
    pub fn inert() -> Self {
        Unpause { controller: None }
    }

    pub fn is_inert(&self) -> bool {
        self.controller.is_none()
    }

    /// Lifts the pause and delivers an already decided outcome if no other pause is held.
    pub fn unpause(mut self) {
        if let Some(controller) = self.controller.take() {
            let paused = controller.inner.paused.get();
            controller.inner.paused.set(paused.saturating_sub(1));
            controller.deliver();
        }
    }
}
