//! Mutable run record for one export task.
//!
//! All mutation goes through `set_total`, `set_data`, and `set_completed`
//! plus the validated lifecycle transitions, so every mutation point emits a
//! [`TaskEvent`] for progress observers and can be made concurrency-safe in
//! one place. Processors must not bypass these primitives.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::{ItemId, TaskEvent, TaskStatus};

/// Buffer size of the per-task event channel. Subscribers falling further
/// behind than this lose the oldest events (tokio broadcast semantics).
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The mutable run record of one export task
///
/// `C` is the processor-specific condition (immutable input parameters),
/// `D` the processor-specific item detail. The core never interprets either.
///
/// A `TaskState` is exclusively owned by its task's execution flow while
/// `execute` runs; once the task reaches a terminal status it is read-only
/// and safe to share. Progress observation happens through the broadcast
/// event channel, not through shared memory.
pub struct TaskState<C, D> {
    condition: C,
    data: HashMap<ItemId, D>,
    total: Option<usize>,
    completed: usize,
    status: TaskStatus,
    event_tx: tokio::sync::broadcast::Sender<TaskEvent>,
}

impl<C, D> TaskState<C, D> {
    /// Create a new task state from its immutable condition
    pub fn new(condition: C) -> Self {
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            condition,
            data: HashMap::new(),
            total: None,
            completed: 0,
            status: TaskStatus::Pending,
            event_tx,
        }
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported; each receives all events emitted
    /// after it subscribed. If there are no subscribers, events are dropped.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TaskEvent> {
        self.event_tx.subscribe()
    }

    /// The task's immutable input parameters
    pub fn condition(&self) -> &C {
        &self.condition
    }

    /// The accumulated results, keyed by item id
    pub fn data(&self) -> &HashMap<ItemId, D> {
        &self.data
    }

    /// Look up one item's fetched detail
    pub fn get(&self, id: &ItemId) -> Option<&D> {
        self.data.get(id)
    }

    /// Number of items this task will process (0 until `set_total` runs)
    pub fn total(&self) -> usize {
        self.total.unwrap_or(0)
    }

    /// Number of items processed so far
    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Current lifecycle status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Set the item count, transitioning `Pending -> Running`
    ///
    /// Must be called exactly once before any fetch. Re-setting the same
    /// value is idempotent; changing the value after data collection has
    /// begun is a usage error.
    pub fn set_total(&mut self, total: usize) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::InvalidState {
                operation: "set_total",
                reason: format!("task already finished ({:?})", self.status),
            });
        }
        if let Some(existing) = self.total {
            if existing != total && (self.completed > 0 || !self.data.is_empty()) {
                return Err(Error::InvalidState {
                    operation: "set_total",
                    reason: format!(
                        "total already set to {existing} and data collection has begun"
                    ),
                });
            }
        }
        self.total = Some(total);
        if self.status == TaskStatus::Pending {
            self.transition(TaskStatus::Running);
        }
        self.emit(TaskEvent::TotalSet { total });
        Ok(())
    }

    /// Apply a pure transform to the results mapping
    ///
    /// The updater receives the previous mapping and returns the next one;
    /// entries may only be added, never removed, and the mapping may not
    /// exceed `total` entries.
    pub fn set_data<F>(&mut self, updater: F) -> Result<()>
    where
        F: FnOnce(HashMap<ItemId, D>) -> HashMap<ItemId, D>,
    {
        self.ensure_running("set_data")?;
        let total = self.require_total("set_data")?;
        let prev_len = self.data.len();
        self.data = updater(std::mem::take(&mut self.data));
        if self.data.len() < prev_len {
            return Err(Error::InvalidState {
                operation: "set_data",
                reason: "entries may not be removed from the results mapping".to_string(),
            });
        }
        if self.data.len() > total {
            return Err(Error::InvalidState {
                operation: "set_data",
                reason: format!(
                    "results mapping holds {} entries but total is {total}",
                    self.data.len()
                ),
            });
        }
        self.emit(TaskEvent::DataCommitted {
            entries: self.data.len(),
        });
        Ok(())
    }

    /// Apply a pure transform to the completed counter
    ///
    /// The counter is monotonically non-decreasing and bounded by `total`.
    pub fn set_completed<F>(&mut self, updater: F) -> Result<()>
    where
        F: FnOnce(usize) -> usize,
    {
        self.ensure_running("set_completed")?;
        let total = self.require_total("set_completed")?;
        let next = updater(self.completed);
        if next < self.completed {
            return Err(Error::InvalidState {
                operation: "set_completed",
                reason: format!("counter may not decrease ({} -> {next})", self.completed),
            });
        }
        if next > total {
            return Err(Error::InvalidState {
                operation: "set_completed",
                reason: format!("counter {next} exceeds total {total}"),
            });
        }
        self.completed = next;
        self.emit(TaskEvent::Progress {
            completed: self.completed,
            total,
        });
        Ok(())
    }

    /// Notify observers that an item was skipped after a permanent failure
    ///
    /// Notification only; the skipped id is simply absent from the results
    /// mapping.
    pub fn notify_skipped(&self, id: ItemId, error: String) {
        self.emit(TaskEvent::ItemSkipped { id, error });
    }

    /// Transition `Running -> Complete` once the fetch loop has finished
    pub fn complete(&mut self) -> Result<()> {
        if self.status != TaskStatus::Running {
            return Err(Error::InvalidState {
                operation: "complete",
                reason: format!("cannot complete a {:?} task", self.status),
            });
        }
        self.transition(TaskStatus::Complete);
        Ok(())
    }

    /// Transition to `Cancelled`
    ///
    /// Valid from `Pending` or `Running`; idempotent when already cancelled.
    /// Cancellation is a normal terminal state, not a failure.
    pub fn mark_cancelled(&mut self) -> Result<()> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Running => {
                self.transition(TaskStatus::Cancelled);
                Ok(())
            }
            TaskStatus::Cancelled => Ok(()),
            other => Err(Error::InvalidState {
                operation: "mark_cancelled",
                reason: format!("cannot cancel a {other:?} task"),
            }),
        }
    }

    /// Transition to `Failed` after a permanent, non-skipped fetch failure
    pub fn fail(&mut self) -> Result<()> {
        match self.status {
            TaskStatus::Pending | TaskStatus::Running => {
                self.transition(TaskStatus::Failed);
                Ok(())
            }
            other => Err(Error::InvalidState {
                operation: "fail",
                reason: format!("cannot fail a {other:?} task"),
            }),
        }
    }

    /// Guard for read-only consumers of a finished task
    ///
    /// File-info generation is valid on `Complete` and `Cancelled` tasks
    /// only; a `Failed` task has already surfaced its error to the caller.
    pub fn ensure_finished(&self, operation: &'static str) -> Result<()> {
        match self.status {
            TaskStatus::Complete | TaskStatus::Cancelled => Ok(()),
            other => Err(Error::InvalidState {
                operation,
                reason: format!("task is {other:?}, expected Complete or Cancelled"),
            }),
        }
    }

    fn ensure_running(&self, operation: &'static str) -> Result<()> {
        if self.status != TaskStatus::Running {
            return Err(Error::InvalidState {
                operation,
                reason: format!("task is {:?}, expected Running", self.status),
            });
        }
        Ok(())
    }

    fn require_total(&self, operation: &'static str) -> Result<usize> {
        self.total.ok_or_else(|| Error::InvalidState {
            operation,
            reason: "total has not been set".to_string(),
        })
    }

    fn transition(&mut self, status: TaskStatus) {
        tracing::debug!(from = ?self.status, to = ?status, "task status transition");
        self.status = status;
        self.emit(TaskEvent::StatusChanged { status });
    }

    fn emit(&self, event: TaskEvent) {
        // No subscribers is fine; the event is dropped
        self.event_tx.send(event).ok();
    }
}
