//! Core types for batch-export

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Unique identifier for a remote item within one export task
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    /// Create a new ItemId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the ItemId, returning the inner String
    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task lifecycle status
///
/// `Cancelled` is a normal terminal state, distinguishable from both success
/// and failure in the task's final status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, total not yet set
    Pending,
    /// Fetch loop in progress
    Running,
    /// All items processed
    Complete,
    /// Cancelled by the owning caller
    Cancelled,
    /// Aborted on a permanent fetch failure
    Failed,
}

impl TaskStatus {
    /// Returns true if the task has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Complete | TaskStatus::Cancelled | TaskStatus::Failed
        )
    }
}

/// Event emitted on every task state mutation
///
/// Consumers subscribe via [`TaskState::subscribe`](crate::task::TaskState::subscribe)
/// to drive progress displays without polling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// The item count was set; the fetch loop is about to start
    TotalSet {
        /// Number of items this task will process
        total: usize,
    },

    /// The results mapping changed
    DataCommitted {
        /// Number of entries now held
        entries: usize,
    },

    /// The completed counter advanced
    Progress {
        /// Items completed so far
        completed: usize,
        /// Total items in this task
        total: usize,
    },

    /// One item was skipped after its fetch failed permanently
    ItemSkipped {
        /// The item that was skipped
        id: ItemId,
        /// The fetch error, rendered for display
        error: String,
    },

    /// The task transitioned to a new lifecycle status
    StatusChanged {
        /// The new status
        status: TaskStatus,
    },
}

/// A self-describing output artifact
///
/// Serializes as `{"filename": ..., "type": ..., "data": ...}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Output filename, unique within one export
    pub filename: String,
    /// The payload variant
    #[serde(flatten)]
    pub payload: FilePayload,
}

/// Payload of a [`FileInfo`], discriminated by representation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FilePayload {
    /// Ready in-memory bytes
    Buffer(Vec<u8>),
    /// A remote URL to be downloaded by the delivery layer
    Url(String),
    /// An ordered set of descriptors to be archived together (never nested)
    Zip(Vec<FileInfo>),
}

impl FileInfo {
    /// Create a descriptor carrying ready bytes
    pub fn buffer(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            payload: FilePayload::Buffer(data),
        }
    }

    /// Create a descriptor pointing at a remote URL
    pub fn url(filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            payload: FilePayload::Url(url.into()),
        }
    }

    /// Create a zip bundle descriptor from an ordered set of entries
    ///
    /// Bundling is flat: an entry must not itself be zip-typed, and entry
    /// filenames must be unique within the bundle. Violations are rejected
    /// here rather than left to a runtime convention at consumption time.
    pub fn zip(filename: impl Into<String>, entries: Vec<FileInfo>) -> Result<Self> {
        let mut seen = std::collections::HashSet::new();
        for entry in &entries {
            if matches!(entry.payload, FilePayload::Zip(_)) {
                return Err(Error::NestedArchive {
                    filename: entry.filename.clone(),
                });
            }
            if !seen.insert(entry.filename.as_str()) {
                return Err(Error::Export(crate::error::ExportError::DuplicateEntry {
                    filename: entry.filename.clone(),
                }));
            }
        }
        Ok(Self {
            filename: filename.into(),
            payload: FilePayload::Zip(entries),
        })
    }

    /// The payload discriminant as a string (for logging and display)
    pub fn kind(&self) -> &'static str {
        match self.payload {
            FilePayload::Buffer(_) => "buffer",
            FilePayload::Url(_) => "url",
            FilePayload::Zip(_) => "zip",
        }
    }
}

/// One spreadsheet cell value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Text content
    Text(String),
    /// Integer content
    Int(i64),
    /// Floating-point content
    Float(f64),
    /// Timestamp content, written as ISO-8601 text
    DateTime(DateTime<Utc>),
    /// Blank cell
    Empty,
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<u64> for Cell {
    fn from(value: u64) -> Self {
        Cell::Int(value as i64)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(value: DateTime<Utc>) -> Self {
        Cell::DateTime(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Cell::Empty,
        }
    }
}
