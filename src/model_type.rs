use crate::context::ModelContext;
use crate::props::Props;
use crate::{ModelError, ModelKey};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`ModelType`], unique per process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelTypeId(u64);

type BuildFn = dyn Fn(&ModelContext, &ModelKey) -> Result<Props, ModelError>;

struct ModelTypeInner {
    id: ModelTypeId,
    name: String,
    build: Box<BuildFn>,
}

/// A named template for model instances.
///
/// Two `ModelType`s are equal only if one is a clone of the other, even when they share
/// a name and builder.
#[derive(Clone)]
pub struct ModelType {
    inner: Rc<ModelTypeInner>,
}

impl ModelType {
    /// Declares a model. `build` runs once per instance, in the `PreInit` phase.
    pub fn new(
        name: impl Into<String>,
        build: impl Fn(&ModelContext, &ModelKey) -> Result<Props, ModelError> + 'static,
    ) -> Self {
        Self {
            inner: Rc::new(ModelTypeInner {
                id: ModelTypeId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                build: Box::new(build),
            }),
        }
    }

    pub fn id(&self) -> ModelTypeId {
        self.inner.id
    }

    /// Also the prefix of this model's physical storage keys.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn build(&self, ctx: &ModelContext, key: &ModelKey) -> Result<Props, ModelError> {
        (self.inner.build)(ctx, key)
    }
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ModelType {}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelType")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
