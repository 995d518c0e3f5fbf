//! # Dial Service
//!
//! Runs the tasks produced by the domain scheduler on tokio.
//!
//! - `TaskRuntime` executes individual dial, discovery and wait tasks
//! - `DialLoop` owns the scheduler, caps concurrency and applies commands
//!   arriving through a `DialLoopHandle`

// Semantic submodules
mod dial_loop;
mod runtime;

// Re-export public API
pub use dial_loop::{DialLoop, DialLoopHandle};
pub use runtime::TaskRuntime;
