//! The editable line-item collection behind the indent form.
//!
//! A draft is an ordered list of rows the user is still editing. Rows are
//! addressed by stable ids so edits survive reordering and removal. The
//! resolved unit/category fields are only ever derived from the item name
//! through the reference catalog; nothing else writes them.
//!
//! The collection is never empty while a form is visible: removing the
//! last row or clearing the draft immediately re-seeds one blank row.

use crate::catalog::ReferenceCatalog;
use crate::{IndentError, IndentResult};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Unit shown while a row has no resolvable item.
pub const UNIT_PLACEHOLDER: &str = "-";

/// One editable row of the indent form.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LineItem {
    pub id: Uuid,
    pub item_name: Option<String>,
    pub quantity: f64,
    pub note: String,
    pub resolved_unit: String,
    pub resolved_category: Option<String>,
    pub resolved_sub_category: Option<String>,
}

impl LineItem {
    fn blank() -> Self {
        Self {
            id: Uuid::new_v4(),
            item_name: None,
            quantity: 1.0,
            note: String::new(),
            resolved_unit: UNIT_PLACEHOLDER.to_owned(),
            resolved_category: None,
            resolved_sub_category: None,
        }
    }

    fn reset_item(&mut self) {
        self.item_name = None;
        self.resolved_unit = UNIT_PLACEHOLDER.to_owned();
        self.resolved_category = None;
        self.resolved_sub_category = None;
    }

    /// A row counts towards submission once it names an item, has a
    /// positive quantity and a real unit.
    pub fn is_valid(&self) -> bool {
        self.item_name.is_some() && self.quantity > 0.0 && self.resolved_unit != UNIT_PLACEHOLDER
    }
}

/// The answer to "is this draft submittable right now?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftValidity {
    pub has_duplicates: bool,
    pub duplicate_names: BTreeSet<String>,
    pub has_at_least_one_valid_line: bool,
}

/// Ordered, mutable collection of form rows.
#[derive(Debug, Clone)]
pub struct IndentDraft {
    rows: Vec<LineItem>,
}

impl IndentDraft {
    /// A draft with a single blank row.
    pub fn new() -> Self {
        Self {
            rows: vec![LineItem::blank()],
        }
    }

    /// A draft pre-seeded with `n` blank rows (at least one).
    pub fn with_rows(n: usize) -> Self {
        Self {
            rows: (0..n.max(1)).map(|_| LineItem::blank()).collect(),
        }
    }

    pub fn rows(&self) -> &[LineItem] {
        &self.rows
    }

    /// Appends `n` blank rows.
    pub fn add_rows(&mut self, n: usize) {
        for _ in 0..n {
            self.rows.push(LineItem::blank());
        }
    }

    /// Removes the row with the given id.
    ///
    /// If the draft would end up empty, one blank row is re-appended so a
    /// visible form always has somewhere to type.
    pub fn remove_row(&mut self, id: Uuid) -> IndentResult<()> {
        let before = self.rows.len();
        self.rows.retain(|row| row.id != id);
        if self.rows.len() == before {
            return Err(IndentError::UnknownRow(id));
        }
        if self.rows.is_empty() {
            self.rows.push(LineItem::blank());
        }
        Ok(())
    }

    /// Replaces the whole collection with exactly one blank row.
    pub fn clear(&mut self) {
        self.rows = vec![LineItem::blank()];
    }

    /// Sets a row's item and derives its unit/category from the catalog.
    ///
    /// `None` or an empty name blanks the row's item. A name the catalog
    /// does not know is kept as typed but leaves the placeholders in
    /// place, so the row stays invalid until corrected.
    pub fn set_item(
        &mut self,
        id: Uuid,
        name: Option<&str>,
        catalog: &ReferenceCatalog,
    ) -> IndentResult<()> {
        let row = self.row_mut(id)?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        match name {
            None => row.reset_item(),
            Some(name) => match catalog.resolve(name) {
                Some(item) => {
                    row.item_name = Some(item.name.clone());
                    row.resolved_unit = item.unit.clone();
                    row.resolved_category = Some(item.category.clone());
                    row.resolved_sub_category = Some(item.sub_category.clone());
                }
                None => {
                    row.item_name = Some(name.to_owned());
                    row.resolved_unit = UNIT_PLACEHOLDER.to_owned();
                    row.resolved_category = None;
                    row.resolved_sub_category = None;
                }
            },
        }
        Ok(())
    }

    pub fn set_quantity(&mut self, id: Uuid, quantity: f64) -> IndentResult<()> {
        self.row_mut(id)?.quantity = quantity;
        Ok(())
    }

    pub fn set_note(&mut self, id: Uuid, note: &str) -> IndentResult<()> {
        self.row_mut(id)?.note = note.to_owned();
        Ok(())
    }

    /// Blanks every row's item, resolved fields and note.
    ///
    /// Used when the department changes: the items selected so far are not
    /// guaranteed valid under the new department's permitted set, so all
    /// rows are conservatively cleared rather than partially re-validated.
    /// Quantities are left alone.
    pub fn reset_items(&mut self) {
        for row in &mut self.rows {
            row.reset_item();
            row.note.clear();
        }
    }

    /// Recomputes the draft's submittability.
    ///
    /// Duplicate detection is a frequency count over the named rows,
    /// comparing names case-sensitively (exact match).
    pub fn compute_validity(&self) -> DraftValidity {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for row in &self.rows {
            if let Some(name) = &row.item_name {
                *counts.entry(name.as_str()).or_default() += 1;
            }
        }

        let duplicate_names: BTreeSet<String> = counts
            .iter()
            .filter(|(_, &count)| count > 1)
            .map(|(name, _)| name.to_string())
            .collect();

        DraftValidity {
            has_duplicates: !duplicate_names.is_empty(),
            duplicate_names,
            has_at_least_one_valid_line: self.rows.iter().any(LineItem::is_valid),
        }
    }

    fn row_mut(&mut self, id: Uuid) -> IndentResult<&mut LineItem> {
        self.rows
            .iter_mut()
            .find(|row| row.id == id)
            .ok_or(IndentError::UnknownRow(id))
    }
}

impl Default for IndentDraft {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ReferenceCatalog;

    fn catalog() -> ReferenceCatalog {
        let rows: Vec<Vec<String>> = vec![
            vec!["Salt", "Kg", "all", "Grocery", "Dry"],
            vec!["Oil", "Ltr", "all", "Grocery", "Wet"],
        ]
        .into_iter()
        .map(|row| row.into_iter().map(str::to_owned).collect())
        .collect();
        ReferenceCatalog::from_rows(&rows)
    }

    #[test]
    fn test_draft_never_has_zero_rows() {
        let mut draft = IndentDraft::new();
        assert_eq!(draft.rows().len(), 1);

        draft.add_rows(2);
        assert_eq!(draft.rows().len(), 3);

        let ids: Vec<_> = draft.rows().iter().map(|r| r.id).collect();
        for id in ids {
            draft.remove_row(id).expect("remove should succeed");
            assert!(!draft.rows().is_empty(), "draft must never be empty");
        }
        assert_eq!(draft.rows().len(), 1);

        draft.clear();
        assert_eq!(draft.rows().len(), 1);
    }

    #[test]
    fn test_remove_unknown_row_fails() {
        let mut draft = IndentDraft::new();
        let err = draft
            .remove_row(Uuid::new_v4())
            .expect_err("unknown id should fail");
        assert!(matches!(err, IndentError::UnknownRow(_)));
    }

    #[test]
    fn test_set_item_derives_unit_and_category() {
        let catalog = catalog();
        let mut draft = IndentDraft::new();
        let id = draft.rows()[0].id;

        draft
            .set_item(id, Some("salt"), &catalog)
            .expect("set_item should succeed");

        let row = &draft.rows()[0];
        assert_eq!(row.item_name.as_deref(), Some("Salt"));
        assert_eq!(row.resolved_unit, "Kg");
        assert_eq!(row.resolved_category.as_deref(), Some("Grocery"));
        assert_eq!(row.resolved_sub_category.as_deref(), Some("Dry"));
        assert!(row.is_valid());
    }

    #[test]
    fn test_set_item_unknown_name_keeps_placeholders() {
        let catalog = catalog();
        let mut draft = IndentDraft::new();
        let id = draft.rows()[0].id;

        draft
            .set_item(id, Some("Unobtainium"), &catalog)
            .expect("set_item should succeed");

        let row = &draft.rows()[0];
        assert_eq!(row.item_name.as_deref(), Some("Unobtainium"));
        assert_eq!(row.resolved_unit, UNIT_PLACEHOLDER);
        assert!(!row.is_valid());
    }

    #[test]
    fn test_set_item_none_blanks_the_row() {
        let catalog = catalog();
        let mut draft = IndentDraft::new();
        let id = draft.rows()[0].id;

        draft
            .set_item(id, Some("Salt"), &catalog)
            .expect("set_item should succeed");
        draft
            .set_item(id, None, &catalog)
            .expect("clearing should succeed");

        let row = &draft.rows()[0];
        assert!(row.item_name.is_none());
        assert_eq!(row.resolved_unit, UNIT_PLACEHOLDER);
    }

    #[test]
    fn test_validity_flags_duplicates() {
        let catalog = catalog();
        let mut draft = IndentDraft::with_rows(3);
        let ids: Vec<_> = draft.rows().iter().map(|r| r.id).collect();

        draft
            .set_item(ids[0], Some("Salt"), &catalog)
            .expect("set_item should succeed");
        draft
            .set_item(ids[1], Some("Salt"), &catalog)
            .expect("set_item should succeed");

        let validity = draft.compute_validity();
        assert!(validity.has_duplicates);
        assert!(validity.duplicate_names.contains("Salt"));

        draft
            .set_item(ids[1], Some("Oil"), &catalog)
            .expect("set_item should succeed");
        let validity = draft.compute_validity();
        assert!(!validity.has_duplicates);
        assert!(validity.duplicate_names.is_empty());
    }

    #[test]
    fn test_validity_needs_one_valid_line() {
        let catalog = catalog();
        let mut draft = IndentDraft::new();
        let id = draft.rows()[0].id;

        assert!(!draft.compute_validity().has_at_least_one_valid_line);

        draft
            .set_item(id, Some("Salt"), &catalog)
            .expect("set_item should succeed");
        assert!(draft.compute_validity().has_at_least_one_valid_line);

        draft
            .set_quantity(id, 0.0)
            .expect("set_quantity should succeed");
        assert!(!draft.compute_validity().has_at_least_one_valid_line);
    }

    #[test]
    fn test_reset_items_blanks_every_row_but_keeps_quantities() {
        let catalog = catalog();
        let mut draft = IndentDraft::with_rows(2);
        let ids: Vec<_> = draft.rows().iter().map(|r| r.id).collect();

        draft
            .set_item(ids[0], Some("Salt"), &catalog)
            .expect("set_item should succeed");
        draft
            .set_quantity(ids[0], 4.0)
            .expect("set_quantity should succeed");
        draft
            .set_note(ids[0], "coarse")
            .expect("set_note should succeed");
        draft
            .set_item(ids[1], Some("Oil"), &catalog)
            .expect("set_item should succeed");

        draft.reset_items();

        for row in draft.rows() {
            assert!(row.item_name.is_none());
            assert_eq!(row.resolved_unit, UNIT_PLACEHOLDER);
            assert!(row.resolved_category.is_none());
            assert!(row.note.is_empty());
        }
        assert_eq!(draft.rows()[0].quantity, 4.0);
    }
}
