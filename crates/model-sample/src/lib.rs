//! # Reactive Models Sample Library
//!
//! Sample models built on `reactive-models`, exposed for the demo binary and the
//! integration tests.

pub mod counter_model;
pub mod dashboard_model;
pub mod lifecycle;
pub mod model;
pub mod todo_model;
