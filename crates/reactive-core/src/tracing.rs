//! # Observability & Tracing
//!
//! The runtime logs through the `tracing` crate:
//!
//! - **Container lifecycle** (`info`): instances created, deleted, backups restored.
//! - **Reactive internals** (`debug`): effect reruns, resource load start / transitions,
//!   stale loads discarded.
//! - **Swallowed failures** (`warn`): effect reruns that failed after a foreign write,
//!   failed disposals during bulk teardown.
//!
//! ## Usage
//!
//! ```bash
//! # Lifecycle events only
//! RUST_LOG=info cargo run -p model-sample
//!
//! # Include resource transitions and effect reruns
//! RUST_LOG=debug cargo run -p model-sample
//!
//! # Filter to the reactive core
//! RUST_LOG=reactive_core=debug cargo run -p model-sample
//! ```

/// Installs a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Call once at program start. Tests that want log output can call
/// [`try_setup_tracing`] instead, which tolerates an already installed subscriber.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}

/// Like [`setup_tracing`], returning `false` if a global subscriber was already set.
pub fn try_setup_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .with_test_writer()
        .try_init()
        .is_ok()
}
