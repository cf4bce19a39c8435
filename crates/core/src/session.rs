//! The form view-model for one editing session.
//!
//! All form state lives in one owned object: the line-item draft plus the
//! header fields (department, required date, requester). Handlers mutate
//! it only through these methods; there is no implicit global state.

use crate::draft::{DraftValidity, IndentDraft};
use crate::{IndentError, IndentResult};
use chrono::NaiveDate;

/// Rows a fresh form starts with.
pub const DEFAULT_ROW_COUNT: usize = 5;

/// Mutable state of one user's indent form.
#[derive(Debug, Clone)]
pub struct FormSession {
    draft: IndentDraft,
    department: Option<String>,
    required_date: NaiveDate,
    requested_by: Option<String>,
}

impl FormSession {
    /// A fresh form: default row count, required date preset to today.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            draft: IndentDraft::with_rows(DEFAULT_ROW_COUNT),
            department: None,
            required_date: today,
            requested_by: None,
        }
    }

    pub fn draft(&self) -> &IndentDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut IndentDraft {
        &mut self.draft
    }

    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    pub fn required_date(&self) -> NaiveDate {
        self.required_date
    }

    pub fn requested_by(&self) -> Option<&str> {
        self.requested_by.as_deref()
    }

    /// Changes the department.
    ///
    /// Items already picked are not guaranteed valid under the new
    /// department's permitted set, so every row is cleared rather than
    /// partially re-validated. Setting the same department again is a
    /// no-op and keeps the rows.
    pub fn set_department(&mut self, department: Option<String>) {
        let department = department
            .map(|d| d.trim().to_owned())
            .filter(|d| !d.is_empty());
        if department == self.department {
            return;
        }
        self.department = department;
        self.draft.reset_items();
    }

    pub fn set_required_date(&mut self, date: NaiveDate) {
        self.required_date = date;
    }

    pub fn set_requested_by(&mut self, name: Option<String>) {
        self.requested_by = name.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty());
    }

    pub fn compute_validity(&self) -> DraftValidity {
        self.draft.compute_validity()
    }

    /// The full submit gate, re-run immediately before a write as well.
    ///
    /// # Errors
    ///
    /// The first failing check wins: no valid line, duplicates, missing
    /// department, missing requester, required date before `today`.
    pub fn submit_gate(&self, today: NaiveDate) -> IndentResult<()> {
        let validity = self.draft.compute_validity();
        if !validity.has_at_least_one_valid_line {
            return Err(IndentError::NoValidLines);
        }
        if validity.has_duplicates {
            return Err(IndentError::DuplicateItems(
                validity.duplicate_names.into_iter().collect(),
            ));
        }
        if self.department.is_none() {
            return Err(IndentError::MissingDepartment);
        }
        if self.requested_by.is_none() {
            return Err(IndentError::MissingRequester);
        }
        if self.required_date < today {
            return Err(IndentError::RequiredDateInPast(self.required_date));
        }
        Ok(())
    }

    /// Resets the form after a successful submission.
    ///
    /// The draft shrinks to one blank row; department and requester stay
    /// as last-used defaults for the next request.
    pub fn reset_after_submit(&mut self, today: NaiveDate) {
        self.draft.clear();
        self.required_date = today;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceCatalog;
    use chrono::NaiveDate;

    fn catalog() -> ReferenceCatalog {
        let rows: Vec<Vec<String>> = vec![vec![
            "Salt".to_owned(),
            "Kg".to_owned(),
            "all".to_owned(),
            "Grocery".to_owned(),
            "Dry".to_owned(),
        ]];
        ReferenceCatalog::from_rows(&rows)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 4).expect("valid date")
    }

    fn session_with_salt() -> FormSession {
        let mut session = FormSession::new(today());
        // Department first: changing it afterwards would clear the rows.
        session.set_department(Some("Kitchen".into()));
        session.set_requested_by(Some("Asha".into()));
        let id = session.draft().rows()[0].id;
        session
            .draft_mut()
            .set_item(id, Some("Salt"), &catalog())
            .expect("set_item should succeed");
        session
    }

    #[test]
    fn test_department_change_clears_all_rows() {
        let mut session = FormSession::new(today());
        session.set_department(Some("Kitchen".into()));

        let id = session.draft().rows()[0].id;
        session
            .draft_mut()
            .set_item(id, Some("Salt"), &catalog())
            .expect("set_item should succeed");
        assert!(session.draft().rows()[0].item_name.is_some());

        session.set_department(Some("Bar".into()));
        for row in session.draft().rows() {
            assert!(row.item_name.is_none());
            assert_eq!(row.resolved_unit, crate::draft::UNIT_PLACEHOLDER);
        }
    }

    #[test]
    fn test_setting_same_department_keeps_rows() {
        let mut session = session_with_salt();
        session.set_department(Some("Kitchen".into()));
        assert!(session.draft().rows()[0].item_name.is_some());
    }

    #[test]
    fn test_submit_gate_passes_for_complete_form() {
        let session = session_with_salt();
        session
            .submit_gate(today())
            .expect("complete form should pass the gate");
    }

    #[test]
    fn test_submit_gate_orders_failures() {
        let mut session = FormSession::new(today());
        assert!(matches!(
            session.submit_gate(today()),
            Err(IndentError::NoValidLines)
        ));

        // Department change after picking the item would wipe the rows,
        // so department goes first here.
        session.set_department(Some("Kitchen".into()));
        let id = session.draft().rows()[0].id;
        session
            .draft_mut()
            .set_item(id, Some("Salt"), &catalog())
            .expect("set_item should succeed");
        assert!(matches!(
            session.submit_gate(today()),
            Err(IndentError::MissingRequester)
        ));

        session.set_requested_by(Some("Asha".into()));
        session.set_required_date(today().pred_opt().expect("valid date"));
        assert!(matches!(
            session.submit_gate(today()),
            Err(IndentError::RequiredDateInPast(_))
        ));
    }

    #[test]
    fn test_submit_gate_reports_duplicates() {
        let mut session = session_with_salt();
        session.draft_mut().add_rows(1);
        let id = session.draft().rows()[1].id;
        session
            .draft_mut()
            .set_item(id, Some("Salt"), &catalog())
            .expect("set_item should succeed");

        match session.submit_gate(today()) {
            Err(IndentError::DuplicateItems(names)) => assert_eq!(names, vec!["Salt".to_string()]),
            other => panic!("expected DuplicateItems, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_after_submit_keeps_defaults() {
        let mut session = session_with_salt();
        session.reset_after_submit(today());

        assert_eq!(session.draft().rows().len(), 1);
        assert!(session.draft().rows()[0].item_name.is_none());
        assert_eq!(session.department(), Some("Kitchen"));
        assert_eq!(session.requested_by(), Some("Asha"));
    }
}
