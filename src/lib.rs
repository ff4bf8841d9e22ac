//! # Reactive Models
//!
//! > **Dependency-injected, reactive model objects with a structural-key registry.**
//!
//! A *model type* is a named builder. The [`Container`] turns `(model type, key)` into
//! a live [`ModelInstance`], building it on first access and handing out the same
//! instance for every structurally equal key afterwards. Builders create their state
//! through a [`ModelContext`]: mutable [`State`], derived [`Computed`] values, async
//! [`Resource`]s, effects and watchers, all owned by the instance and released when it
//! is disposed.
//!
//! ## Core Concepts
//!
//! ### Keys are values, not identities
//! Keys are any `serde::Serialize` value. `json!({"id": 1, "tab": "a"})` and
//! `json!({"tab": "a", "id": 1})` address the same instance. See [`ModelKey`].
//!
//! ### Explicit lifecycle
//! `PreInit → Init → Ready → Disposed`. Primitives and hooks can only be declared while
//! the builder runs (`PreInit`); anything else is a usage error
//! ([`ModelError::InvalidPhase`]).
//!
//! ### Ownership tree
//! Models used through [`ModelContext::use_model`] live in a private child container
//! owned by the using instance. Disposal walks that tree children-first.
//!
//! ## Example
//!
//! ```rust
//! use reactive_models::{Container, Deps, ModelType, Props};
//!
//! let counter = ModelType::new("counter", |ctx, _key| {
//!     let count = ctx.persisted_state("count", 0i64)?;
//!     let double = ctx.computed(Deps::new().with("count", &count), |deps| {
//!         Ok(deps.get::<i64>("count")? * 2)
//!     })?;
//!     let increment = count.clone();
//!     Ok(Props::new()
//!         .state("count", &count)
//!         .computed("double", &double)
//!         .method("increment", move |_: ()| {
//!             increment.update(|n| n + 1);
//!         }))
//! });
//!
//! let container = Container::new();
//! let model = container.get_default(&counter).unwrap();
//! model.call::<(), ()>("increment", ()).unwrap();
//!
//! assert_eq!(model.state::<i64>("count").unwrap().get(), 1);
//! assert_eq!(model.computed::<i64>("double").unwrap().get(), 2);
//! assert!(model.ptr_eq(&container.get_default(&counter).unwrap()));
//! ```
//!
//! ## Module Tour
//!
//! - [`container`]: the registry, backups, and configuration through [`ContainerBuilder`].
//! - [`context`]: what builders can do.
//! - [`instance`]: the read-only instance view and its lifecycle.
//! - [`props`]: the builder's return value.
//! - [`storage`]: the persistence contract and the in-memory default.
//! - [`named`]: restricted facades over container values.
//! - [`module`]: lazily loaded, memoized modules.
//!
//! The reactive primitives themselves live in the `reactive-core` crate and are
//! re-exported here.
//!
//! ### Running the Demo
//!
//! ```bash
//! RUST_LOG=info cargo run -p model-sample
//! ```

pub mod container;
pub mod context;
pub mod instance;
pub mod model_type;
pub mod module;
pub mod named;
pub mod props;
pub mod storage;

pub use container::{Container, ContainerBuilder, Restore};
pub use context::{Lifecycle, ModelContext};
pub use instance::{Method, ModelInstance, Phase};
pub use model_type::{ModelType, ModelTypeId};
pub use module::{LazyModule, ModuleSource};
pub use named::{Named, NamedEntry};
pub use props::{PropKind, Props};
pub use storage::{MemoryStorage, Storage, StorageKey, Storages, DEFAULT_STORAGE};

pub use reactive_core::{
    defer, loader, wait_all, wait_all_with, wait_any, wait_any_with, Computed, DeepMap, DeferController,
    Deps, Effect, ListenerGroup, LoadError, LoadFuture, Loadable, ModelError, ModelKey, Promise,
    Reactive, Resource, State, Status, Tracker, Unpause, Unsubscribe, Wait, WaitCallbacks, Watcher,
};
