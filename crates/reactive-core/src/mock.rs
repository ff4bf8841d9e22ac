//! # Mock Loaders & Testing Guide
//!
//! [`MockLoader<T>`] is a scripted loader for [`Resource`](crate::Resource) tests. Each
//! call to the loader consumes the next queued expectation, so tests can describe a
//! sequence of loads and their outcomes up front, then [`verify`](MockLoader::verify)
//! that every expectation was used.
//!
//! | Expectation | Loader behaviour |
//! |-------------|------------------|
//! | `return_ok(v)` | resolves with `v` as soon as the load task runs |
//! | `return_err(e)` | rejects with `e` as soon as the load task runs |
//! | `fail_sync(e)` | fails synchronously, before any future is created |
//! | `hold()` | stays pending until the returned controller is settled |
//!
//! `hold()` is the tool for race conditions: start two loads, settle them in the
//! "wrong" order, and check which outcome wins.
//!
//! ## Example
//!
//! ```rust
//! use reactive_core::mock::MockLoader;
//! use reactive_core::{Deps, Loadable, Resource};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let local = tokio::task::LocalSet::new();
//!     local
//!         .run_until(async {
//!             let mock = MockLoader::<u32>::new();
//!             mock.expect_load().return_ok(7);
//!
//!             let resource = Resource::new(Deps::new(), mock.loader()).unwrap();
//!             resource.load();
//!             assert_eq!(resource.promise().await.unwrap(), 7);
//!             assert_eq!(resource.loadable(), Loadable::Succeeded(7));
//!             mock.verify();
//!         })
//!         .await;
//! }
//! ```

use crate::defer::{defer, DeferController};
use crate::effect::Tracker;
use crate::error::LoadError;
use crate::resource::LoadFuture;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

enum Expectation<T> {
    Ok(T),
    Err(LoadError),
    FailSync(LoadError),
    Hold(DeferController<T>),
}

/// A loader with an expectation queue.
pub struct MockLoader<T> {
    expectations: Rc<RefCell<VecDeque<Expectation<T>>>>,
    calls: Rc<Cell<usize>>,
}

impl<T: Clone + 'static> Default for MockLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> MockLoader<T> {
    pub fn new() -> Self {
        Self {
            expectations: Rc::new(RefCell::new(VecDeque::new())),
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Queues the outcome of the next load.
    pub fn expect_load(&self) -> LoadExpectationBuilder<T> {
        LoadExpectationBuilder {
            expectations: Rc::clone(&self.expectations),
        }
    }

    /// The loader function to hand to a resource.
    ///
    /// # Panics
    ///
    /// The loader panics when it is called with no expectation queued.
    pub fn loader(&self) -> impl Fn(&Tracker) -> Result<LoadFuture<T>, LoadError> + 'static {
        let expectations = Rc::clone(&self.expectations);
        let calls = Rc::clone(&self.calls);
        move |_tracker: &Tracker| -> Result<LoadFuture<T>, LoadError> {
            calls.set(calls.get() + 1);
            let expectation = expectations.borrow_mut().pop_front();
            match expectation {
                Some(Expectation::Ok(value)) => Ok(Box::pin(async move { Ok::<T, LoadError>(value) })),
                Some(Expectation::Err(error)) => Ok(Box::pin(async move { Err::<T, LoadError>(error) })),
                Some(Expectation::FailSync(error)) => Err(error),
                Some(Expectation::Hold(controller)) => Ok(Box::pin(controller.promise())),
                None => panic!("Unexpected load: no expectation queued"),
            }
        }
    }

    /// How many times the loader has been called.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let remaining = self.expectations.borrow().len();
        if remaining > 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

/// Builder for load expectations.
pub struct LoadExpectationBuilder<T> {
    expectations: Rc<RefCell<VecDeque<Expectation<T>>>>,
}

impl<T: Clone + 'static> LoadExpectationBuilder<T> {
    /// The load resolves with `value`.
    pub fn return_ok(self, value: T) {
        self.expectations
            .borrow_mut()
            .push_back(Expectation::Ok(value));
    }

    /// The load rejects with `error`.
    pub fn return_err(self, error: LoadError) {
        self.expectations
            .borrow_mut()
            .push_back(Expectation::Err(error));
    }

    /// The loader fails before producing a future.
    pub fn fail_sync(self, error: LoadError) {
        self.expectations
            .borrow_mut()
            .push_back(Expectation::FailSync(error));
    }

    /// The load stays pending until the returned controller is settled.
    pub fn hold(self) -> DeferController<T> {
        let (_, controller) = defer();
        self.expectations
            .borrow_mut()
            .push_back(Expectation::Hold(controller.clone()));
        controller
    }
}
