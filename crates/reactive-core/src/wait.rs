//! # Wait Combinators
//!
//! [`wait_all`] and [`wait_any`] classify a group of promises synchronously. The result is
//! a [`Wait`]: either the values are ready, one of them failed, or the caller gets a
//! combined promise to suspend on and retry later. Nothing here ever blocks or yields.
//!
//! The `_with` variants are the push form of the same decision: they invoke one of the
//! [`WaitCallbacks`] now, and when the group is still pending they invoke `on_pending`
//! and re-attach `on_resolve` / `on_reject` to the combined promise.

use crate::error::LoadError;
use crate::listener::Unsubscribe;
use crate::promise::{Promise, Status};
use std::cell::Cell;
use std::rc::Rc;

/// The synchronous answer of a wait combinator.
#[derive(Debug)]
pub enum Wait<T> {
    Ready(T),
    Pending(Promise<T>),
    Failed(LoadError),
}

impl<T: Clone + 'static> Wait<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Wait::Ready(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Wait::Pending(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Wait::Failed(_))
    }

    /// Waits for the outcome, whatever the variant.
    pub async fn resolve(self) -> Result<T, LoadError> {
        match self {
            Wait::Ready(value) => Ok(value),
            Wait::Pending(promise) => promise.await,
            Wait::Failed(error) => Err(error),
        }
    }

    /// Classifies a single promise.
    pub fn from_promise(promise: &Promise<T>) -> Self {
        match promise.status() {
            Status::Resolved(value) => Wait::Ready(value),
            Status::Rejected(error) => Wait::Failed(error),
            Status::Pending => Wait::Pending(promise.clone()),
        }
    }
}

/// Callbacks for the push form of the combinators.
pub struct WaitCallbacks<T> {
    on_resolve: Rc<dyn Fn(T)>,
    on_reject: Rc<dyn Fn(LoadError)>,
    on_pending: Option<Rc<dyn Fn()>>,
}

impl<T> Clone for WaitCallbacks<T> {
    fn clone(&self) -> Self {
        Self {
            on_resolve: Rc::clone(&self.on_resolve),
            on_reject: Rc::clone(&self.on_reject),
            on_pending: self.on_pending.clone(),
        }
    }
}

impl<T: Clone + 'static> WaitCallbacks<T> {
    pub fn new(on_resolve: impl Fn(T) + 'static, on_reject: impl Fn(LoadError) + 'static) -> Self {
        Self {
            on_resolve: Rc::new(on_resolve),
            on_reject: Rc::new(on_reject),
            on_pending: None,
        }
    }

    pub fn on_pending(mut self, on_pending: impl Fn() + 'static) -> Self {
        self.on_pending = Some(Rc::new(on_pending));
        self
    }

    /// Routes `wait` to the matching callback. For a pending wait the returned handle
    /// detaches the late callbacks.
    pub fn dispatch(self, wait: Wait<T>) -> Unsubscribe {
        match wait {
            Wait::Ready(value) => {
                (self.on_resolve)(value);
                Unsubscribe::noop()
            }
            Wait::Failed(error) => {
                (self.on_reject)(error);
                Unsubscribe::noop()
            }
            Wait::Pending(promise) => {
                if let Some(on_pending) = &self.on_pending {
                    on_pending();
                }
                promise.on_settle(move |status| match status {
                    Status::Resolved(value) => (self.on_resolve)(value.clone()),
                    Status::Rejected(error) => (self.on_reject)(error.clone()),
                    Status::Pending => {}
                })
            }
        }
    }
}

/// Classifies an ordered list of promises.
///
/// - any rejected member → [`Wait::Failed`] with the first rejection in list order;
/// - otherwise any pending member → [`Wait::Pending`] with a promise that settles once
///   every member has settled;
/// - otherwise → [`Wait::Ready`] with the values in list order.
pub fn wait_all<T: Clone + 'static>(promises: &[Promise<T>]) -> Wait<Vec<T>> {
    let mut values = Vec::with_capacity(promises.len());
    let mut pending = false;
    for promise in promises {
        match promise.status() {
            Status::Rejected(error) => return Wait::Failed(error),
            Status::Pending => pending = true,
            Status::Resolved(value) => values.push(value),
        }
    }
    if pending {
        Wait::Pending(all(promises))
    } else {
        Wait::Ready(values)
    }
}

/// Push form of [`wait_all`].
pub fn wait_all_with<T: Clone + 'static>(
    promises: &[Promise<T>],
    callbacks: WaitCallbacks<Vec<T>>,
) -> Unsubscribe {
    callbacks.dispatch(wait_all(promises))
}

/// Classifies named promises with a single ordered scan.
///
/// The first resolved entry wins. A rejected entry met before any resolved entry
/// pre-empts with [`Wait::Failed`]. When nothing has settled, the pending promise races
/// the entries and settles with whichever settles first.
pub fn wait_any<K, T>(entries: Vec<(K, Promise<T>)>) -> Wait<(K, T)>
where
    K: Clone + 'static,
    T: Clone + 'static,
{
    for (name, promise) in &entries {
        match promise.status() {
            Status::Resolved(value) => return Wait::Ready((name.clone(), value)),
            Status::Rejected(error) => return Wait::Failed(error),
            Status::Pending => {}
        }
    }
    Wait::Pending(race(entries))
}

/// Push form of [`wait_any`].
pub fn wait_any_with<K, T>(
    entries: Vec<(K, Promise<T>)>,
    callbacks: WaitCallbacks<(K, T)>,
) -> Unsubscribe
where
    K: Clone + 'static,
    T: Clone + 'static,
{
    callbacks.dispatch(wait_any(entries))
}

fn all<T: Clone + 'static>(promises: &[Promise<T>]) -> Promise<Vec<T>> {
    let combined = Promise::pending();
    let members: Rc<Vec<Promise<T>>> = Rc::new(promises.to_vec());
    let remaining = Rc::new(Cell::new(promises.len()));

    for promise in promises {
        let combined = combined.clone();
        let members = Rc::clone(&members);
        let remaining = Rc::clone(&remaining);
        let _ = promise.on_settle(move |status| match status {
            Status::Rejected(error) => {
                combined.settle(Status::Rejected(error.clone()));
            }
            Status::Resolved(_) => {
                remaining.set(remaining.get().saturating_sub(1));
                if remaining.get() == 0 {
                    let mut values = Vec::with_capacity(members.len());
                    for member in members.iter() {
                        if let Status::Resolved(value) = member.status() {
                            values.push(value);
                        }
                    }
                    combined.settle(Status::Resolved(values));
                }
            }
            Status::Pending => {}
        });
    }
    combined
}

fn race<K, T>(entries: Vec<(K, Promise<T>)>) -> Promise<(K, T)>
where
    K: Clone + 'static,
    T: Clone + 'static,
{
    let winner = Promise::pending();
    for (name, promise) in entries {
        let winner = winner.clone();
        let _ = promise.on_settle(move |status| match status {
            Status::Resolved(value) => {
                winner.settle(Status::Resolved((name.clone(), value.clone())));
            }
            Status::Rejected(error) => {
                winner.settle(Status::Rejected(error.clone()));
            }
            Status::Pending => {}
        });
    }
    winner
}
