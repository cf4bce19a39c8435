//! Tabular workbook storage for the indent system.
//!
//! The indent log and the item reference data live in an externally shared
//! workbook: a directory of named worksheets, each persisted as a CSV file.
//! This crate is the only place that touches those files. It exposes:
//!
//! - [`Workbook`]: opens the workbook directory and hands out worksheets
//! - [`Worksheet`]: read a whole sheet, read one column, append rows
//!
//! Appends are all-or-nothing from the caller's perspective: rows are
//! encoded into a single buffer first and written with one call, so a
//! failed submission never leaves a partial batch behind.
//!
//! **No domain concerns**: request validation, identifier allocation and
//! history filtering belong in `indent-core`.

mod sheet;

pub use sheet::{Workbook, Worksheet};

/// Errors produced by workbook storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("workbook directory not found: {0}")]
    WorkbookNotFound(String),
    #[error("worksheet '{0}' not found in workbook")]
    WorksheetNotFound(String),
    #[error("invalid worksheet name '{0}'")]
    InvalidWorksheetName(String),
    #[error("failed to read worksheet '{name}': {source}")]
    SheetRead {
        name: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to encode rows for worksheet '{name}': {source}")]
    SheetEncode {
        name: String,
        #[source]
        source: csv::Error,
    },
    #[error("failed to write worksheet '{name}': {source}")]
    SheetWrite {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
