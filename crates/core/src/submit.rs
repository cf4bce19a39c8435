//! Turning a validated form into persisted log rows.
//!
//! Submission is the only write path. It re-runs the full submit gate,
//! allocates the request identifier, and appends every line in one batch,
//! so a failure anywhere leaves both the log and the form untouched. Only
//! after the write lands is the form reset.

use crate::catalog::{ReferenceCatalog, DEFAULT_CATEGORY, DEFAULT_SUB_CATEGORY, UNKNOWN_UNIT};
use crate::mrn::{is_error_mrn, MrnAllocator};
use crate::request::{sort_lines, IndentLine, IndentRequest, LOG_HEADER};
use crate::session::FormSession;
use crate::{IndentError, IndentResult};
use chrono::Utc;
use indent_store::Worksheet;
use indent_types::NonEmptyText;
use std::collections::BTreeSet;

/// Outcome of a successful submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub request: IndentRequest,
    pub total_quantity: f64,
}

/// Writes validated forms to the log worksheet.
#[derive(Debug)]
pub struct SubmissionService {
    log_sheet: Worksheet,
    allocator: MrnAllocator,
}

impl SubmissionService {
    pub fn new(log_sheet: Worksheet) -> Self {
        Self {
            allocator: MrnAllocator::new(log_sheet.clone()),
            log_sheet,
        }
    }

    /// Submits the session's draft as a new indent request.
    ///
    /// Steps: re-validate, collect the valid rows with units resolved
    /// definitively from the catalog, allocate the identifier, stamp the
    /// time, sort lines for presentation, append one batch (writing the
    /// header row first when the sheet is empty), then reset the draft
    /// keeping department/requester as defaults.
    ///
    /// # Errors
    ///
    /// Any validation, allocation or store failure aborts before the form
    /// is touched; the caller can fix up and retry.
    pub fn submit(
        &self,
        session: &mut FormSession,
        catalog: &ReferenceCatalog,
    ) -> IndentResult<Submission> {
        let now = Utc::now();
        let today = now.date_naive();

        session.submit_gate(today)?;

        let mut lines = Vec::new();
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut duplicates: BTreeSet<String> = BTreeSet::new();
        for row in session.draft().rows() {
            if !row.is_valid() {
                continue;
            }
            let name = row.item_name.clone().unwrap_or_default();
            if !seen.insert(name.clone()) {
                duplicates.insert(name);
                continue;
            }

            // The catalog is the definitive source for unit and grouping,
            // even if the row was resolved against an older snapshot.
            let (unit, category, sub_category) = match catalog.resolve(&name) {
                Some(item) => (
                    item.unit.clone(),
                    item.category.clone(),
                    item.sub_category.clone(),
                ),
                None => (
                    row.resolved_unit.clone(),
                    row.resolved_category
                        .clone()
                        .unwrap_or_else(|| DEFAULT_CATEGORY.to_owned()),
                    row.resolved_sub_category
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SUB_CATEGORY.to_owned()),
                ),
            };
            let unit = if unit.is_empty() {
                UNKNOWN_UNIT.to_owned()
            } else {
                unit
            };

            lines.push(IndentLine {
                item_name: name,
                quantity: row.quantity,
                unit,
                note: row.note.trim().to_owned(),
                category,
                sub_category,
            });
        }

        if !duplicates.is_empty() {
            return Err(IndentError::DuplicateItems(
                duplicates.into_iter().collect(),
            ));
        }
        if lines.is_empty() {
            return Err(IndentError::NoValidLines);
        }

        let request_id = self.allocator.allocate();
        if is_error_mrn(&request_id) {
            return Err(IndentError::MrnUnavailable(request_id));
        }

        let department = session
            .department()
            .and_then(|d| NonEmptyText::new(d).ok())
            .ok_or(IndentError::MissingDepartment)?;
        let requested_by = session
            .requested_by()
            .and_then(|r| NonEmptyText::new(r).ok())
            .ok_or(IndentError::MissingRequester)?;

        sort_lines(&mut lines);

        let request = IndentRequest {
            request_id,
            created_at: now,
            department,
            required_date: session.required_date(),
            requested_by,
            lines,
        };

        let mut rows = Vec::new();
        if self.log_sheet.is_empty()? {
            rows.push(LOG_HEADER.iter().map(|h| h.to_string()).collect());
        }
        rows.extend(request.to_log_rows());
        self.log_sheet.append_rows(&rows)?;

        tracing::info!(
            request_id = %request.request_id,
            department = %request.department,
            lines = request.lines.len(),
            "indent submitted"
        );

        session.reset_after_submit(today);

        Ok(Submission {
            total_quantity: request.total_quantity(),
            request,
        })
    }
}
