//! # Model Instances
//!
//! A [`ModelInstance`] is the read-only view over the [`Props`] a builder returned. It
//! adds nothing but `dispose` and typed accessors; reactive props are handed out as the
//! same handles the builder created, never unwrapped.
//!
//! ## Lifecycle
//!
//! ```text
//! PreInit ──builder returns──▶ Init ──init hooks──▶ Ready ──dispose()──▶ Disposed
//! ```
//!
//! Disposal is a post-order walk of the ownership tree: the instance's private child
//! container goes first, then the dispose hooks run, then every effect and primitive
//! the builder created is released. All steps run even when one fails.

use crate::container::{BuildStack, Container};
use crate::context::ModelContext;
use crate::model_type::ModelType;
use crate::props::{MethodFn, Prop, PropKind, Props, DISPOSE};
use crate::storage::Storages;
use crate::{ModelError, ModelKey};
use reactive_core::{Computed, Effect, Reactive, Resource, State};
use std::any::type_name;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// The lifecycle phase of a model instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    PreInit,
    Init,
    Ready,
    Disposed,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::PreInit => "pre-init",
            Phase::Init => "init",
            Phase::Ready => "ready",
            Phase::Disposed => "disposed",
        }
    }
}

pub(crate) type Hook = Box<dyn FnOnce() -> Result<(), ModelError>>;

/// Bookkeeping shared by an instance and the context that built it.
pub(crate) struct InstanceCore {
    pub(crate) name: String,
    pub(crate) key: ModelKey,
    pub(crate) phase: Cell<Phase>,
    pub(crate) storages: Storages,
    pub(crate) building: BuildStack,
    pub(crate) primitives: RefCell<Vec<Rc<dyn Reactive>>>,
    pub(crate) effects: RefCell<Vec<Effect>>,
    pub(crate) init_hooks: RefCell<Vec<Hook>>,
    pub(crate) dispose_hooks: RefCell<Vec<Hook>>,
    pub(crate) children: RefCell<Option<Container>>,
}

impl InstanceCore {
    pub(crate) fn new(name: &str, key: ModelKey, storages: Storages, building: BuildStack) -> Self {
        Self {
            name: name.to_string(),
            key,
            phase: Cell::new(Phase::PreInit),
            storages,
            building,
            primitives: RefCell::new(Vec::new()),
            effects: RefCell::new(Vec::new()),
            init_hooks: RefCell::new(Vec::new()),
            dispose_hooks: RefCell::new(Vec::new()),
            children: RefCell::new(None),
        }
    }

    pub(crate) fn check_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), ModelError> {
        let phase = self.phase.get();
        if allowed.contains(&phase) {
            Ok(())
        } else {
            Err(ModelError::InvalidPhase {
                operation,
                phase: phase.label(),
            })
        }
    }

    /// Runs the init hooks once and moves to `Ready`.
    fn init(&self) -> Result<(), ModelError> {
        self.phase.set(Phase::Init);
        let hooks = std::mem::take(&mut *self.init_hooks.borrow_mut());
        for hook in hooks {
            hook()?;
        }
        if self.phase.get() == Phase::Init {
            self.phase.set(Phase::Ready);
        }
        Ok(())
    }

    fn dispose(&self) -> Result<(), ModelError> {
        if self.phase.replace(Phase::Disposed) == Phase::Disposed {
            return Ok(());
        }
        debug!(model = %self.name, key = %self.key, "Disposing model instance");
        let mut errors = Vec::new();

        let children = self.children.borrow_mut().take();
        if let Some(children) = children {
            if let Err(error) = children.delete_all(None) {
                errors.push(error);
            }
        }

        let hooks = std::mem::take(&mut *self.dispose_hooks.borrow_mut());
        for hook in hooks {
            if let Err(error) = hook() {
                errors.push(error);
            }
        }

        self.init_hooks.borrow_mut().clear();
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for effect in effects {
            effect.dispose();
        }
        let primitives = std::mem::take(&mut *self.primitives.borrow_mut());
        for primitive in primitives {
            primitive.dispose();
        }

        ModelError::aggregate(errors)
    }
}

/// A live model: its props plus `dispose`.
///
/// Cloning creates a new handle to the **same** instance.
#[derive(Clone)]
pub struct ModelInstance {
    core: Rc<InstanceCore>,
    props: Rc<Props>,
}

impl ModelInstance {
    /// Runs `ty`'s builder in a fresh context. The instance is left in `Init`; the
    /// container finishes initialization once it has registered the instance.
    pub(crate) fn build(ty: &ModelType, key: ModelKey, container: &Container) -> Result<Self, ModelError> {
        let core = Rc::new(InstanceCore::new(
            ty.name(),
            key,
            container.storages().clone(),
            container.building().clone(),
        ));
        let ctx = ModelContext::new(Rc::clone(&core), container.downgrade());
        match ty.build(&ctx, &core.key) {
            Ok(props) => {
                core.phase.set(Phase::Init);
                Ok(Self {
                    core,
                    props: Rc::new(props),
                })
            }
            Err(error) => {
                if let Err(cleanup) = core.dispose() {
                    debug!(error = %cleanup, "Cleanup after failed build also failed");
                }
                Err(error)
            }
        }
    }

    /// Wraps props that were not produced by a builder, for manual registration.
    pub fn from_props(name: impl Into<String>, props: Props) -> Self {
        let name = name.into();
        let core = InstanceCore::new(&name, ModelKey::unit(), Storages::new(), BuildStack::default());
        core.phase.set(Phase::Ready);
        Self {
            core: Rc::new(core),
            props: Rc::new(props),
        }
    }

    pub(crate) fn init(&self) -> Result<(), ModelError> {
        self.core.init()
    }

    /// The model type name.
    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn key(&self) -> &ModelKey {
        &self.core.key
    }

    pub fn phase(&self) -> Phase {
        self.core.phase.get()
    }

    pub fn is_disposed(&self) -> bool {
        self.phase() == Phase::Disposed
    }

    /// Declared prop names in declaration order, followed by `"dispose"`.
    pub fn keys(&self) -> Vec<String> {
        self.props
            .names()
            .map(str::to_string)
            .chain(std::iter::once(DISPOSE.to_string()))
            .collect()
    }

    pub fn kind(&self, name: &str) -> Option<PropKind> {
        if name == DISPOSE {
            return Some(PropKind::Method);
        }
        self.props.get(name).map(Prop::kind)
    }

    pub fn state<T: Clone + PartialEq + 'static>(&self, name: &str) -> Result<State<T>, ModelError> {
        self.typed::<State<T>>(name, PropKind::State)
    }

    pub fn computed<T: Clone + PartialEq + 'static>(&self, name: &str) -> Result<Computed<T>, ModelError> {
        self.typed::<Computed<T>>(name, PropKind::Computed)
    }

    pub fn resource<T: Clone + PartialEq + 'static>(&self, name: &str) -> Result<Resource<T>, ModelError> {
        self.typed::<Resource<T>>(name, PropKind::Resource)
    }

    /// A callable handle bound to this instance. Calls fail once it is disposed.
    pub fn method<A: 'static, R: 'static>(&self, name: &str) -> Result<Method<A, R>, ModelError> {
        let f = self.typed::<MethodFn<A, R>>(name, PropKind::Method)?;
        Ok(Method {
            name: name.to_string(),
            core: Rc::clone(&self.core),
            f,
        })
    }

    /// Shorthand for `method(name)?.call(args)`.
    pub fn call<A: 'static, R: 'static>(&self, name: &str, args: A) -> Result<R, ModelError> {
        self.method::<A, R>(name)?.call(args)
    }

    pub fn value<T: Clone + 'static>(&self, name: &str) -> Result<T, ModelError> {
        self.typed::<T>(name, PropKind::Value)
    }

    pub fn model(&self, name: &str) -> Result<ModelInstance, ModelError> {
        match self.prop(name)? {
            Prop::Model(instance) => Ok(instance.clone()),
            Prop::Typed(..) => Err(self.prop_type(name, "model")),
        }
    }

    /// Idempotent. Errors from the child container and the dispose hooks are collected;
    /// teardown always runs to completion.
    pub fn dispose(&self) -> Result<(), ModelError> {
        self.core.dispose()
    }

    pub fn ptr_eq(&self, other: &ModelInstance) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    fn prop(&self, name: &str) -> Result<&Prop, ModelError> {
        self.props.get(name).ok_or_else(|| ModelError::MissingProp {
            model: self.core.name.clone(),
            prop: name.to_string(),
        })
    }

    fn typed<H: Clone + 'static>(&self, name: &str, kind: PropKind) -> Result<H, ModelError> {
        match self.prop(name)? {
            Prop::Typed(actual, value) if *actual == kind => value
                .downcast_ref::<H>()
                .cloned()
                .ok_or_else(|| self.prop_type(name, type_name::<H>())),
            _ => Err(self.prop_type(name, kind.label())),
        }
    }

    fn prop_type(&self, name: &str, expected: &'static str) -> ModelError {
        ModelError::PropType {
            model: self.core.name.clone(),
            prop: name.to_string(),
            expected,
        }
    }
}

impl fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInstance")
            .field("name", &self.core.name)
            .field("key", &self.core.key)
            .field("phase", &self.core.phase.get())
            .field("props", &self.props)
            .finish()
    }
}

/// A method prop bound to its instance.
pub struct Method<A, R> {
    name: String,
    core: Rc<InstanceCore>,
    f: MethodFn<A, R>,
}

impl<A, R> Clone for Method<A, R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            core: Rc::clone(&self.core),
            f: Rc::clone(&self.f),
        }
    }
}

impl<A, R> Method<A, R> {
    pub fn call(&self, args: A) -> Result<R, ModelError> {
        if self.core.phase.get() == Phase::Disposed {
            return Err(ModelError::Disposed(format!("{}.{}", self.core.name, self.name)));
        }
        Ok((self.f)(args))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<A, R> fmt::Debug for Method<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("model", &self.core.name)
            .field("name", &self.name)
            .finish()
    }
}
