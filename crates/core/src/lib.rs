//! # Indent Core
//!
//! Core business logic for the material indent system.
//!
//! This crate contains pure domain operations over the shared workbook:
//! - Reference catalog loading and item resolution
//! - The editable line-item draft and its validity checks
//! - Sequential request-number allocation from the log
//! - Submission of validated forms as batched log rows
//! - History loading and filtering
//! - Document rendering and share links for submitted requests
//!
//! **No API concerns**: HTTP servers, DTOs and session routing belong in
//! `api-rest`; terminal interaction belongs in `indent-cli`.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod draft;
mod error;
pub mod history;
pub mod mrn;
pub mod render;
pub mod request;
pub mod session;
pub mod share;
pub mod submit;

pub use catalog::{CatalogService, Permitted, ReferenceCatalog, ReferenceItem};
pub use config::CoreConfig;
pub use draft::{DraftValidity, IndentDraft, LineItem};
pub use error::{IndentError, IndentResult};
pub use history::{HistoryFilter, HistoryRecord, HistoryService};
pub use mrn::{is_error_mrn, next_mrn, MrnAllocator};
pub use request::{IndentLine, IndentRequest};
pub use session::FormSession;
pub use share::{share_link, share_message};
pub use submit::{Submission, SubmissionService};
