//! # Promises & Status Classification
//!
//! A [`Promise<T>`] is a shared, cloneable future handle that carries its own
//! classification record. Any holder can ask for its [`Status`] synchronously, which is
//! what lets synchronous call sites "peek" at asynchronous state (see [`crate::wait`])
//! without cooperative yielding.
//!
//! Promises are single-threaded (`Rc` based). Foreign futures are driven as local tasks
//! and therefore need a [`tokio::task::LocalSet`].

use crate::error::LoadError;
use crate::listener::{ListenerGroup, Unsubscribe};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// The synchronous classification of a promise.
#[derive(Clone, Debug, PartialEq)]
pub enum Status<T> {
    Pending,
    Resolved(T),
    Rejected(LoadError),
}

impl<T> Status<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Status::Pending)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Status::Resolved(_))
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Status::Rejected(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Resolved(_) => "resolved",
            Status::Rejected(_) => "rejected",
        }
    }
}

impl<T> From<Result<T, LoadError>> for Status<T> {
    fn from(result: Result<T, LoadError>) -> Self {
        match result {
            Ok(value) => Status::Resolved(value),
            Err(error) => Status::Rejected(error),
        }
    }
}

struct PromiseInner<T> {
    status: RefCell<Status<T>>,
    wakers: RefCell<Vec<Waker>>,
    settled: ListenerGroup<Status<T>>,
}

/// A shared handle to an eventually settled value.
///
/// Cloning a `Promise` creates a new handle to the **same** outcome. Awaiting it yields
/// `Ok(value)` or the rejection.
pub struct Promise<T> {
    inner: Rc<PromiseInner<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}

impl<T: Clone + 'static> Promise<T> {
    pub(crate) fn pending() -> Self {
        Self {
            inner: Rc::new(PromiseInner {
                status: RefCell::new(Status::Pending),
                wakers: RefCell::new(Vec::new()),
                settled: ListenerGroup::new(),
            }),
        }
    }

    /// A promise that never settles.
    pub fn never() -> Self {
        Self::pending()
    }

    /// Seeds an already resolved promise.
    pub fn resolved(value: T) -> Self {
        let promise = Self::pending();
        promise.settle(Status::Resolved(value));
        promise
    }

    /// Seeds an already rejected promise.
    pub fn rejected(error: LoadError) -> Self {
        let promise = Self::pending();
        promise.settle(Status::Rejected(error));
        promise
    }

    /// Tracks a foreign future: the returned promise starts pending and records the
    /// outcome once `future` completes.
    ///
    /// # Panics
    ///
    /// Panics when called outside a [`tokio::task::LocalSet`].
    pub fn from_future<F>(future: F) -> Self
    where
        F: Future<Output = Result<T, LoadError>> + 'static,
    {
        let promise = Self::pending();
        let handle = promise.clone();
        tokio::task::spawn_local(async move {
            let outcome = future.await;
            handle.settle(outcome.into());
        });
        promise
    }

    /// The current classification. Never blocks.
    pub fn status(&self) -> Status<T> {
        self.inner.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.inner.status.borrow().is_pending()
    }

    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Runs `callback` once the promise settles, or right away if it already has.
    pub fn on_settle(&self, callback: impl Fn(&Status<T>) + 'static) -> Unsubscribe {
        let status = self.status();
        if status.is_pending() {
            self.inner.settled.add(callback)
        } else {
            callback(&status);
            Unsubscribe::noop()
        }
    }

    /// Records the outcome. Returns `false` if the promise had already settled.
    pub(crate) fn settle(&self, status: Status<T>) -> bool {
        if status.is_pending() || self.is_settled() {
            return false;
        }
        *self.inner.status.borrow_mut() = status.clone();
        let wakers = std::mem::take(&mut *self.inner.wakers.borrow_mut());
        for waker in wakers {
            waker.wake();
        }
        self.inner.settled.invoke_and_clear(&status);
        true
    }

    pub fn ptr_eq(&self, other: &Promise<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone + 'static> Future for Promise<T> {
    type Output = Result<T, LoadError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &*self.inner.status.borrow() {
            Status::Resolved(value) => Poll::Ready(Ok(value.clone())),
            Status::Rejected(error) => Poll::Ready(Err(error.clone())),
            Status::Pending => {
                let mut wakers = self.inner.wakers.borrow_mut();
                if !wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    wakers.push(cx.waker().clone());
                }
                Poll::Pending
            }
        }
    }
}
