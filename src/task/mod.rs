//! Task execution core -- state record, processor contract, and fetch loop.
//!
//! Split into focused submodules:
//! - [`state`] - The mutable run record with controlled mutation and events
//! - [`processor`] - The polymorphic processor contract and per-run context
//! - [`runner`] - The generic sequential fetch loop and task driver

mod processor;
mod runner;
mod state;

// Re-export the task-facing API at the module root
pub use processor::{TaskContext, TaskProcessor};
pub use runner::{run_fetch_loop, run_task};
pub use state::TaskState;
