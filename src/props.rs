//! # Props
//!
//! The public face a model builder returns. Props are declared in order; the resulting
//! [`ModelInstance`](crate::ModelInstance) lists them in the same order, followed by the
//! built-in `dispose`.

use crate::instance::ModelInstance;
use indexmap::IndexMap;
use reactive_core::{Computed, Resource, State};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// Name reserved for the built-in disposal member.
pub const DISPOSE: &str = "dispose";

/// What a prop holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropKind {
    State,
    Computed,
    Resource,
    Method,
    Value,
    Model,
}

impl PropKind {
    pub fn label(&self) -> &'static str {
        match self {
            PropKind::State => "state",
            PropKind::Computed => "computed",
            PropKind::Resource => "resource",
            PropKind::Method => "method",
            PropKind::Value => "value",
            PropKind::Model => "model",
        }
    }
}

pub(crate) type MethodFn<A, R> = Rc<dyn Fn(A) -> R>;

#[derive(Clone)]
pub(crate) enum Prop {
    /// Holds the typed handle (`State<T>`, `Computed<T>`, `Resource<T>`, `MethodFn<A, R>`
    /// or the plain value) for downcasting.
    Typed(PropKind, Rc<dyn Any>),
    Model(ModelInstance),
}

impl Prop {
    pub(crate) fn kind(&self) -> PropKind {
        match self {
            Prop::Typed(kind, _) => *kind,
            Prop::Model(_) => PropKind::Model,
        }
    }
}

/// Ordered builder of a model's public members.
#[derive(Clone, Default)]
pub struct Props {
    entries: IndexMap<String, Prop>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exposes a state as-is: consumers read and write it directly.
    pub fn state<T: Clone + PartialEq + 'static>(self, name: impl Into<String>, state: &State<T>) -> Self {
        self.typed(name.into(), PropKind::State, Rc::new(state.clone()))
    }

    pub fn computed<T: Clone + PartialEq + 'static>(
        self,
        name: impl Into<String>,
        computed: &Computed<T>,
    ) -> Self {
        self.typed(name.into(), PropKind::Computed, Rc::new(computed.clone()))
    }

    pub fn resource<T: Clone + PartialEq + 'static>(
        self,
        name: impl Into<String>,
        resource: &Resource<T>,
    ) -> Self {
        self.typed(name.into(), PropKind::Resource, Rc::new(resource.clone()))
    }

    /// A callable member. Several arguments are passed as a tuple.
    pub fn method<A: 'static, R: 'static>(self, name: impl Into<String>, f: impl Fn(A) -> R + 'static) -> Self {
        let f: MethodFn<A, R> = Rc::new(f);
        self.typed(name.into(), PropKind::Method, Rc::new(f))
    }

    /// A plain (non-reactive) value.
    pub fn value<T: 'static>(self, name: impl Into<String>, value: T) -> Self {
        self.typed(name.into(), PropKind::Value, Rc::new(value))
    }

    /// A nested model instance, typically obtained with `use_model`.
    pub fn model(self, name: impl Into<String>, instance: &ModelInstance) -> Self {
        self.insert(name.into(), Prop::Model(instance.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Prop> {
        self.entries.get(name)
    }

    fn typed(self, name: String, kind: PropKind, value: Rc<dyn Any>) -> Self {
        self.insert(name, Prop::Typed(kind, value))
    }

    fn insert(mut self, name: String, prop: Prop) -> Self {
        if name == DISPOSE {
            warn!(kind = prop.kind().label(), "Ignoring prop named `dispose`");
            return self;
        }
        self.entries.insert(name, prop);
        self
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(name, prop)| (name, prop.kind())))
            .finish()
    }
}
