//! The polymorphic processor contract and per-run context.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::Result;
use crate::task::state::TaskState;
use crate::types::FileInfo;

/// Per-run resources handed to a processor
///
/// Carries the retry configuration for the request gateway and the
/// cancellation token owned by the caller. Cancelling the token stops the
/// fetch loop at the next iteration boundary and abandons in-flight retries.
#[derive(Clone, Debug)]
pub struct TaskContext {
    /// Retry behavior for remote fetches
    pub retry: RetryConfig,
    /// Cancellation token for this run
    pub cancel: CancellationToken,
}

impl TaskContext {
    /// Create a context with the given retry configuration and a fresh token
    pub fn new(retry: RetryConfig) -> Self {
        Self {
            retry,
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the cancellation token (e.g. with one shared by a UI)
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

/// A backend-specific export processor
///
/// One implementation per platform. The core never switches on the concrete
/// type: it drives any processor through these two operations.
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    /// Immutable input parameters for one task run
    type Condition: Send + Sync;
    /// Per-item detail fetched from the platform (opaque to the core)
    type Detail: Send + Sync;

    /// Drive the fetch loop over the condition's item ids
    ///
    /// Must call `set_total` exactly once before any fetch, then commit each
    /// result through `set_data`/`set_completed` in input order. Returns `Ok`
    /// on completion *and* on cancellation; an error is returned only when
    /// the processor's failure policy aborts the task.
    async fn execute(
        &self,
        task: &mut TaskState<Self::Condition, Self::Detail>,
        ctx: &TaskContext,
    ) -> Result<()>;

    /// Convert a finished task's accumulated data into output descriptors
    ///
    /// Read-only; never triggers new fetches. Returns the spreadsheet
    /// descriptor first, followed by zero or more media descriptors. Ids
    /// absent from the data (skipped items) are silently excluded.
    fn file_infos(&self, task: &TaskState<Self::Condition, Self::Detail>)
    -> Result<Vec<FileInfo>>;
}
