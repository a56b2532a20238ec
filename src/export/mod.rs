//! Export packaging -- spreadsheet encoding, media bundling, delivery resolution.
//!
//! Split into focused submodules:
//! - [`spreadsheet`] - Tabular rows to a single-sheet XLSX byte buffer
//! - [`bundle`] - Flat zip archiving of named byte entries
//! - [`delivery`] - Resolving file descriptors into ready-to-deliver bytes

pub mod bundle;
pub mod delivery;
pub mod spreadsheet;

pub use delivery::{Deliverable, DeliveryClient};
pub use spreadsheet::{SpreadsheetPacker, export_filename};
