//! Platform adapters.
//!
//! Each adapter implements [`TaskProcessor`](crate::task::TaskProcessor) for
//! one content platform: it drives the generic fetch loop through an opaque
//! remote-client seam and maps the accumulated details to spreadsheet rows
//! and media descriptors. The core never switches on the concrete adapter.

pub mod douyin;
