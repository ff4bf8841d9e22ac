//! # Reactive Core
//!
//! Single-threaded reactive primitives: mutable and derived values that notify
//! subscribers synchronously, effects that track exactly the dependencies they read, and
//! asynchronously loaded resources that can be consumed both by subscription and through
//! future-like promises.
//!
//! ## Layers
//!
//! 1. **Notification** ([`ListenerGroup`]): ordered multicast, the base of everything.
//! 2. **Async plumbing** ([`Promise`], [`defer`], [`wait_all`], [`wait_any`]): promises
//!    that can be classified synchronously, a pausable deferred controller, and
//!    combinators that answer "ready, failed, or pending" without blocking.
//! 3. **Reactive values** ([`State`], [`Computed`], [`Resource`]): all implement
//!    [`Reactive`], the contract effects and render layers build on.
//! 4. **Tracking** ([`Effect`], [`Watcher`], [`Tracker`]): rerun on change of whatever
//!    was read on the latest run.
//!
//! ## Example
//!
//! ```rust
//! use reactive_core::{Computed, Deps, State};
//!
//! let a = State::new(1);
//! let b = State::new(2);
//! let sum = Computed::new(Deps::new().with("a", &a).with("b", &b), |deps| {
//!     Ok(deps.get::<i32>("a")? + deps.get::<i32>("b")?)
//! })
//! .unwrap();
//!
//! assert_eq!(sum.get(), 3);
//! a.set(2);
//! assert_eq!(sum.get(), 4);
//! ```
//!
//! ## Concurrency Model
//!
//! Everything is `Rc` based and `!Send`. Writes notify synchronously before returning.
//! The only suspension points are loader futures, which run as local tasks: code that
//! loads resources must run inside a [`tokio::task::LocalSet`].
//!
//! ## Testing
//!
//! See the [`mock`] module for a scripted loader.

pub mod computed;
pub mod deep_map;
pub mod defer;
pub mod deps;
pub mod effect;
pub mod error;
pub mod listener;
pub mod loadable;
pub mod mock;
pub mod promise;
pub mod resource;
pub mod state;
pub mod tracing;
pub mod wait;

pub use computed::Computed;
pub use deep_map::{DeepMap, ModelKey};
pub use defer::{defer, DeferController, Unpause};
pub use deps::{Deps, Reactive};
pub use effect::{Effect, Tracker, Watcher};
pub use error::{LoadError, ModelError};
pub use listener::{ListenerGroup, Unsubscribe};
pub use loadable::Loadable;
pub use promise::{Promise, Status};
pub use resource::{loader, LoadFuture, Resource, VERSION_DEP};
pub use state::State;
pub use wait::{wait_all, wait_all_with, wait_any, wait_any_with, Wait, WaitCallbacks};
