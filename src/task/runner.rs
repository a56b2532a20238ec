//! Generic sequential fetch loop shared by all processors.
//!
//! One task runs as one sequential async flow: the loop suspends only at the
//! request gateway's network call and commits results in input id order, so
//! progress is monotonic and row order is deterministic. Cancellation is
//! checked at every iteration boundary and inside the gateway.

use std::future::Future;

use crate::config::FailurePolicy;
use crate::error::{Error, FetchError, Result};
use crate::retry::{GatewayError, request_with_retry};
use crate::task::processor::{TaskContext, TaskProcessor};
use crate::task::state::TaskState;
use crate::types::{FileInfo, ItemId};

/// Drive the per-item fetch loop over `ids`, committing results into `task`
///
/// For each id in order: check cancellation, fetch through the request
/// gateway, then commit via `set_data` + `set_completed`. A permanently
/// failed id is handled per `policy`: `Skip` leaves a gap in the data but
/// still advances the completed counter; `Abort` fails the task and returns
/// the error. Cancellation (at a checkpoint or in flight) marks the task
/// `Cancelled` and returns `Ok`.
pub async fn run_fetch_loop<C, D, F, Fut>(
    task: &mut TaskState<C, D>,
    ctx: &TaskContext,
    ids: &[ItemId],
    policy: FailurePolicy,
    mut fetch: F,
) -> Result<()>
where
    F: FnMut(ItemId) -> Fut,
    Fut: Future<Output = std::result::Result<D, FetchError>>,
{
    task.set_total(ids.len())?;
    tracing::info!(total = ids.len(), "fetch loop started");

    for id in ids {
        if ctx.cancel.is_cancelled() {
            tracing::info!(
                completed = task.completed(),
                total = task.total(),
                "task cancelled at iteration boundary"
            );
            task.mark_cancelled()?;
            return Ok(());
        }

        match request_with_retry(&ctx.retry, &ctx.cancel, || fetch(id.clone())).await {
            Ok(detail) => {
                let key = id.clone();
                task.set_data(move |mut data| {
                    data.insert(key, detail);
                    data
                })?;
                task.set_completed(|prev| prev + 1)?;
                tracing::debug!(item = %id, completed = task.completed(), "item committed");
            }
            Err(GatewayError::Cancelled) => {
                tracing::info!(
                    completed = task.completed(),
                    total = task.total(),
                    "task cancelled during fetch"
                );
                task.mark_cancelled()?;
                return Ok(());
            }
            Err(GatewayError::Failed(e)) => match policy {
                FailurePolicy::Skip => {
                    tracing::warn!(item = %id, error = %e, "item fetch failed permanently, skipping");
                    task.notify_skipped(id.clone(), e.to_string());
                    task.set_completed(|prev| prev + 1)?;
                }
                FailurePolicy::Abort => {
                    tracing::error!(item = %id, error = %e, "item fetch failed permanently, aborting task");
                    task.fail()?;
                    return Err(Error::Fetch(e));
                }
            },
        }
    }

    task.complete()?;
    tracing::info!(
        completed = task.completed(),
        entries = task.data().len(),
        "fetch loop finished"
    );
    Ok(())
}

/// Convenience driver: `execute` then `file_infos`
///
/// Returns the output descriptors of the finished run. Valid after
/// cancellation too, in which case the descriptors cover the items committed
/// before the cancellation point.
pub async fn run_task<P>(
    processor: &P,
    task: &mut TaskState<P::Condition, P::Detail>,
    ctx: &TaskContext,
) -> Result<Vec<FileInfo>>
where
    P: TaskProcessor,
{
    processor.execute(task, ctx).await?;
    processor.file_infos(task)
}
