//! # Errors
//!
//! Two error families live here:
//!
//! - [`ModelError`]: usage errors raised synchronously at the call site (bad dependency
//!   lookups, unknown storages, calls made in the wrong lifecycle phase, ...).
//! - [`LoadError`]: failures of asynchronous loaders. These are captured into
//!   [`Loadable::Failed`](crate::Loadable::Failed) and rejected promises instead of being
//!   raised, so they must be cheap to clone and share.

use std::fmt;
use std::rc::Rc;

/// Errors raised by the reactive runtime and the model container.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("dependency `{0}` was not declared")]
    UndeclaredDependency(String),
    #[error("dependency `{name}` does not hold a value of type `{expected}`")]
    DependencyType { name: String, expected: &'static str },
    #[error("named dependency `{0}` has not been assigned")]
    UnassignedDependency(String),
    #[error("no value registered under `{0}`")]
    MissingValue(String),
    #[error("unknown storage `{0}`")]
    UnknownStorage(String),
    #[error("`{operation}` is not allowed in phase `{phase}`")]
    InvalidPhase {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("circular dependency while building `{0}`")]
    CircularDependency(String),
    #[error("model `{0}` has been disposed")]
    Disposed(String),
    #[error("model `{model}` has no prop `{prop}`")]
    MissingProp { model: String, prop: String },
    #[error("prop `{prop}` of model `{model}` is not a {expected}")]
    PropType {
        model: String,
        prop: String,
        expected: &'static str,
    },
    #[error("failed to encode key: {0}")]
    KeyEncoding(#[source] serde_json::Error),
    #[error("failed to decode stored value `{key}`: {source}")]
    StorageDecode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} disposal(s) failed", .0.len())]
    Disposal(Vec<ModelError>),
    #[error("load failed: {0}")]
    Load(#[from] LoadError),
    #[error("hook failed: {0}")]
    Hook(Box<dyn std::error::Error>),
}

impl ModelError {
    /// Wraps any error raised from a user hook.
    pub fn hook(error: impl std::error::Error + 'static) -> Self {
        ModelError::Hook(Box::new(error))
    }

    /// Folds a list of teardown errors into one result.
    ///
    /// A single error is returned as-is; several are wrapped in [`ModelError::Disposal`].
    pub fn aggregate(mut errors: Vec<ModelError>) -> Result<(), ModelError> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ModelError::Disposal(errors)),
        }
    }
}

/// A shareable failure produced by an asynchronous loader.
///
/// Cloning is cheap (reference counted). Two `LoadError`s compare equal only when they
/// are clones of the same failure.
#[derive(Clone)]
pub struct LoadError(Rc<dyn std::error::Error>);

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl LoadError {
    pub fn new(error: impl std::error::Error + 'static) -> Self {
        LoadError(Rc::new(error))
    }

    /// Creates a failure from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        LoadError::new(Message(message.into()))
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn ptr_eq(&self, other: &LoadError) -> bool {
        Rc::as_ptr(&self.0) as *const () == Rc::as_ptr(&other.0) as *const ()
    }
}

impl PartialEq for LoadError {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoadError").field(&self.0).finish()
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<ModelError> for LoadError {
    fn from(error: ModelError) -> Self {
        LoadError::new(error)
    }
}
