//! Sequential request-number allocation.
//!
//! Every submitted indent gets a human-readable identifier of the form
//! `MRN-001`, derived by scanning the identifiers already in the log
//! sheet. The scan-then-increment is not serialised against the shared
//! sheet: two submitters reading the log in the same window can derive
//! the same number. That window is accepted as a limitation of a
//! column-scan allocator over an externally editable store.

use chrono::Utc;
use indent_store::Worksheet;

/// Prefix of every well-formed request identifier.
pub const MRN_PREFIX: &str = "MRN-";

const ERROR_PREFIX: &str = "MRN-ERR-";

/// Derives the next identifier from the log's identifier column.
///
/// Scans backwards for the last entry shaped `MRN-<digits>` and increments
/// its number. When no entry matches but non-empty entries exist (legacy
/// or corrupted rows), the count of non-empty entries minus one stands in
/// for the last number, treating the first non-empty row as a header. The
/// result is zero-padded to three digits and simply widens beyond 999.
pub fn next_mrn(column: &[String]) -> String {
    let last_number = column.iter().rev().find_map(parse_mrn_number);

    let n = match last_number {
        Some(n) => n,
        None => {
            let nonempty = column.iter().filter(|v| !v.trim().is_empty()).count() as u64;
            nonempty.saturating_sub(1)
        }
    };

    format!("{MRN_PREFIX}{:03}", n + 1)
}

/// Whether an identifier is the allocation-failure sentinel.
///
/// Sentinel identifiers must never be written to the log; the submission
/// path aborts on them.
pub fn is_error_mrn(mrn: &str) -> bool {
    mrn.starts_with(ERROR_PREFIX)
}

fn parse_mrn_number(value: &String) -> Option<u64> {
    let digits = value.strip_prefix(MRN_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Allocates request identifiers against the log worksheet.
#[derive(Debug)]
pub struct MrnAllocator {
    sheet: Worksheet,
}

impl MrnAllocator {
    pub fn new(sheet: Worksheet) -> Self {
        Self { sheet }
    }

    /// Produces the next identifier, best-effort unique.
    ///
    /// A failed log read yields the time-stamped sentinel
    /// `MRN-ERR-<HHMMSS>` instead of an error; callers detect it with
    /// [`is_error_mrn`] and must abort before writing.
    pub fn allocate(&self) -> String {
        match self.sheet.col_values(0) {
            Ok(column) => next_mrn(&column),
            Err(err) => {
                tracing::error!("failed to read identifier column: {err}");
                format!("{ERROR_PREFIX}{}", Utc::now().format("%H%M%S"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indent_store::Workbook;
    use tempfile::TempDir;

    fn column(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_increments_last_sequential_number() {
        assert_eq!(next_mrn(&column(&["MRN", "MRN-001", "MRN-002"])), "MRN-003");
    }

    #[test]
    fn test_scans_backwards_past_garbage() {
        assert_eq!(
            next_mrn(&column(&["MRN", "", "garbage", "MRN-007"])),
            "MRN-008"
        );
    }

    #[test]
    fn test_empty_and_header_only_columns_start_at_one() {
        assert_eq!(next_mrn(&[]), "MRN-001");
        assert_eq!(next_mrn(&column(&["MRN"])), "MRN-001");
    }

    #[test]
    fn test_falls_back_to_nonempty_count_without_any_match() {
        // Header plus three legacy rows: last number is taken as 3.
        assert_eq!(
            next_mrn(&column(&["MRN", "old-1", "old-2", "old-3"])),
            "MRN-004"
        );
    }

    #[test]
    fn test_number_widens_past_three_digits() {
        assert_eq!(next_mrn(&column(&["MRN-999"])), "MRN-1000");
    }

    #[test]
    fn test_malformed_suffixes_are_not_parsed() {
        // "MRN-7b" is not all digits; backwards scan continues to MRN-002.
        assert_eq!(next_mrn(&column(&["MRN-002", "MRN-7b"])), "MRN-003");
    }

    #[test]
    fn test_allocator_reads_first_column() {
        let temp = TempDir::new().expect("temp dir");
        let book = Workbook::open(temp.path()).expect("open should succeed");
        let sheet = book.worksheet("indent_log").expect("handle should resolve");
        sheet
            .append_rows(&[
                vec!["MRN".into(), "Timestamp".into()],
                vec!["MRN-041".into(), "2026-08-01 10:00:00".into()],
            ])
            .expect("append should succeed");

        let allocator = MrnAllocator::new(sheet);
        assert_eq!(allocator.allocate(), "MRN-042");
    }

    #[test]
    fn test_allocator_returns_sentinel_on_read_failure() {
        let temp = TempDir::new().expect("temp dir");
        let book = Workbook::open(temp.path()).expect("open should succeed");
        // Missing backing file: reads fail, allocation must not.
        let sheet = book.worksheet("indent_log").expect("handle should resolve");

        let allocator = MrnAllocator::new(sheet);
        let mrn = allocator.allocate();
        assert!(is_error_mrn(&mrn), "expected sentinel, got {mrn}");
    }

    #[test]
    fn test_sentinel_detection() {
        assert!(is_error_mrn("MRN-ERR-120501"));
        assert!(!is_error_mrn("MRN-012"));
    }
}
