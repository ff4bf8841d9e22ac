//! # Lazy Modules
//!
//! Late-bound logic a model pulls in asynchronously (a parser, a rules engine, a large
//! lookup table). A [`LazyModule`] loads its source at most once successfully: the
//! first successful load is memoized and every later `load()` returns the same
//! resolved promise. A failed load is not memoized, so the next `load()` retries.

use async_trait::async_trait;
use reactive_core::{LoadError, Promise, Status};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tracing::debug;

/// Produces a module's value.
#[async_trait(?Send)]
pub trait ModuleSource<M> {
    async fn load(&self) -> Result<M, LoadError>;
}

struct FnSource<F>(F);

#[async_trait(?Send)]
impl<M, F, Fut> ModuleSource<M> for FnSource<F>
where
    M: 'static,
    F: Fn() -> Fut + 'static,
    Fut: Future<Output = Result<M, LoadError>> + 'static,
{
    async fn load(&self) -> Result<M, LoadError> {
        (self.0)().await
    }
}

struct LazyModuleInner<M> {
    name: String,
    source: Rc<dyn ModuleSource<M>>,
    promise: RefCell<Option<Promise<Rc<M>>>>,
    loads: Cell<usize>,
}

/// A memoized, asynchronously loaded module.
///
/// Cloning creates a new handle to the **same** module.
pub struct LazyModule<M> {
    inner: Rc<LazyModuleInner<M>>,
}

impl<M> Clone for LazyModule<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M: 'static> LazyModule<M> {
    pub fn new(name: impl Into<String>, source: impl ModuleSource<M> + 'static) -> Self {
        Self {
            inner: Rc::new(LazyModuleInner {
                name: name.into(),
                source: Rc::new(source),
                promise: RefCell::new(None),
                loads: Cell::new(0),
            }),
        }
    }

    /// A module loaded by an async closure.
    pub fn from_fn<F, Fut>(name: impl Into<String>, load: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = Result<M, LoadError>> + 'static,
    {
        Self::new(name, FnSource(load))
    }

    /// Starts loading, or returns the memoized promise.
    ///
    /// Must be called inside a tokio `LocalSet` unless already resolved.
    pub fn load(&self) -> Promise<Rc<M>> {
        if let Some(promise) = self.inner.promise.borrow().as_ref() {
            if !promise.status().is_rejected() {
                return promise.clone();
            }
        }
        self.inner.loads.set(self.inner.loads.get() + 1);
        debug!(module = %self.inner.name, attempt = self.inner.loads.get(), "Loading module");
        let source = Rc::clone(&self.inner.source);
        let promise = Promise::from_future(async move { source.load().await.map(Rc::new) });
        *self.inner.promise.borrow_mut() = Some(promise.clone());
        promise
    }

    /// The module, once loaded.
    pub fn get(&self) -> Option<Rc<M>> {
        match self.inner.promise.borrow().as_ref().map(Promise::status) {
            Some(Status::Resolved(module)) => Some(module),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// How many times the source has been asked to load.
    pub fn loads(&self) -> usize {
        self.inner.loads.get()
    }
}

impl<M> fmt::Debug for LazyModule<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyModule")
            .field("name", &self.inner.name)
            .field("loads", &self.inner.loads.get())
            .finish()
    }
}
