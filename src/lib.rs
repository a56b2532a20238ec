//! # batch-export
//!
//! Embeddable batch metadata export engine.
//!
//! Given an ordered list of remote item ids, a [`TaskProcessor`] fetches
//! each item's metadata through the request gateway (retry, backoff,
//! cancellation), accumulates results in a [`TaskState`], and finally maps
//! the accumulated data to downloadable artifacts: one spreadsheet plus
//! optional media descriptors.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Progress observers subscribe to task events, no polling
//! - **One task, one flow** - A task runs as a single sequential async flow;
//!   progress is monotonic and row order is deterministic
//! - **Cancellation is not an error** - A cancelled task is a normal terminal
//!   state whose partial results remain exportable
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use batch_export::adapters::douyin::{DouyinProcessor, ExportCondition, PostFetcher};
//! use batch_export::task::{TaskContext, TaskState, run_task};
//!
//! # async fn example(fetcher: Arc<dyn PostFetcher>) -> Result<(), Box<dyn std::error::Error>> {
//! let processor = DouyinProcessor::new(fetcher);
//! let mut task = TaskState::new(ExportCondition {
//!     post_ids: vec!["7123".into(), "7456".into()],
//!     need_media: true,
//! });
//!
//! // Subscribe to progress events
//! let mut events = task.subscribe();
//! tokio::spawn(async move {
//!     while let Ok(event) = events.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//! });
//!
//! let files = run_task(&processor, &mut task, &TaskContext::default()).await?;
//! println!("{} artifact(s)", files.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Platform adapters
pub mod adapters;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Export packaging (spreadsheet, bundles, delivery)
pub mod export;
/// Request gateway with retry, backoff, and cancellation
pub mod retry;
/// Task execution core (decomposed into focused submodules)
pub mod task;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::{
    Config, DeliveryConfig, ExportConfig, FailurePolicy, RetryConfig, VariantOrder,
};
pub use error::{Error, ExportError, FetchError, Result};
pub use export::{Deliverable, DeliveryClient, SpreadsheetPacker, export_filename};
pub use retry::{GatewayError, IsRetryable, request_with_retry};
pub use task::{TaskContext, TaskProcessor, TaskState, run_fetch_loop, run_task};
pub use types::{Cell, FileInfo, FilePayload, ItemId, TaskEvent, TaskStatus};
