//! Reading submitted indents back out of the log.
//!
//! The log sheet is externally editable and has changed shape over time
//! (the "Requested By" column is a later addition), so loading is lenient:
//! the header row is authoritative for column mapping, unparseable dates
//! and quantities degrade per field, and a bad row never fails the load.

use crate::cache::TtlCache;
use crate::request::{REQUIRED_DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::IndentResult;
use chrono::{Days, NaiveDate, NaiveDateTime};
use indent_store::Worksheet;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One parsed log row.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct HistoryRecord {
    pub request_id: String,
    pub submitted_at: Option<NaiveDateTime>,
    pub requested_by: String,
    pub department: String,
    pub required_date: Option<NaiveDate>,
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
    pub note: String,
}

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    request_id: usize,
    timestamp: usize,
    requested_by: Option<usize>,
    department: usize,
    required_date: usize,
    item: usize,
    quantity: usize,
    unit: usize,
    note: usize,
}

impl ColumnMap {
    /// Canonical positions per [`LOG_HEADER`].
    fn canonical() -> Self {
        Self {
            request_id: 0,
            timestamp: 1,
            requested_by: Some(2),
            department: 3,
            required_date: 4,
            item: 5,
            quantity: 6,
            unit: 7,
            note: 8,
        }
    }

    /// Maps columns from an actual header row, tolerating reordered or
    /// missing columns. Returns `None` when the row does not look like a
    /// header at all.
    fn from_header(header: &[String]) -> Option<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|cell| cell.trim().eq_ignore_ascii_case(name))
        };

        let request_id = find("MRN")?;
        Some(Self {
            request_id,
            timestamp: find("Timestamp").unwrap_or(1),
            requested_by: find("Requested By"),
            department: find("Department").unwrap_or(3),
            required_date: find("Date Required").unwrap_or(4),
            item: find("Item").unwrap_or(5),
            quantity: find("Qty").unwrap_or(6),
            unit: find("Unit").unwrap_or(7),
            note: find("Note").unwrap_or(8),
        })
    }
}

/// Parses raw log rows into records.
///
/// The first row is used as the column map when it contains an "MRN"
/// header cell; otherwise every row is treated as data in [`LOG_HEADER`]
/// order. Rows without a request id are skipped.
pub fn records_from_rows(rows: &[Vec<String>]) -> Vec<HistoryRecord> {
    let (map, data) = match rows.first().and_then(|first| ColumnMap::from_header(first)) {
        Some(map) => (map, &rows[1..]),
        None => (ColumnMap::canonical(), rows),
    };

    data.iter()
        .filter_map(|row| {
            let request_id = cell(row, map.request_id);
            if request_id.is_empty() {
                return None;
            }
            Some(HistoryRecord {
                request_id,
                submitted_at: parse_timestamp(&cell(row, map.timestamp)),
                requested_by: map.requested_by.map(|i| cell(row, i)).unwrap_or_default(),
                department: cell(row, map.department),
                required_date: parse_required_date(&cell(row, map.required_date)),
                item_name: cell(row, map.item),
                quantity: cell(row, map.quantity).parse().unwrap_or(0.0),
                unit: cell(row, map.unit),
                note: cell(row, map.note),
            })
        })
        .collect()
}

fn cell(row: &[String], index: usize) -> String {
    row.get(index).map(|c| c.trim().to_owned()).unwrap_or_default()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
}

/// Accepts both date shapes seen in the log over its lifetime.
fn parse_required_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, REQUIRED_DATE_FORMAT)
        .ok()
        .or_else(|| NaiveDate::parse_from_str(value, "%Y-%m-%d").ok())
}

/// Conjunction of user filters over history records.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub departments: BTreeSet<String>,
    pub requesters: BTreeSet<String>,
    pub request_id_query: String,
    pub item_query: String,
}

impl HistoryFilter {
    /// The default filter: the trailing `days`-day window ending `today`,
    /// everything else wide open. A filter reset returns here.
    pub fn default_window(today: NaiveDate, days: i64) -> Self {
        let days = days.max(0) as u64;
        Self {
            from: today.checked_sub_days(Days::new(days)).unwrap_or(today),
            to: today,
            departments: BTreeSet::new(),
            requesters: BTreeSet::new(),
            request_id_query: String::new(),
            item_query: String::new(),
        }
    }

    /// Whether a record passes every active filter.
    ///
    /// The date range is inclusive on both ends; records without a
    /// parseable required date never match a range. Department and
    /// requester are exact set membership, the two text queries are
    /// case-insensitive substring matches.
    pub fn matches(&self, record: &HistoryRecord) -> bool {
        let in_range = match record.required_date {
            Some(date) => date >= self.from && date <= self.to,
            None => false,
        };
        if !in_range {
            return false;
        }
        if !self.departments.is_empty() && !self.departments.contains(&record.department) {
            return false;
        }
        if !self.requesters.is_empty() && !self.requesters.contains(&record.requested_by) {
            return false;
        }
        if !self.request_id_query.is_empty()
            && !contains_ignore_case(&record.request_id, &self.request_id_query)
        {
            return false;
        }
        if !self.item_query.is_empty() && !contains_ignore_case(&record.item_name, &self.item_query)
        {
            return false;
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Loads and filters history from the log worksheet, throttled by a TTL
/// cache.
#[derive(Debug)]
pub struct HistoryService {
    sheet: Worksheet,
    window_days: i64,
    cache: Mutex<TtlCache<Arc<Vec<HistoryRecord>>>>,
}

impl HistoryService {
    pub fn new(sheet: Worksheet, max_age: Duration, window_days: i64) -> Self {
        Self {
            sheet,
            window_days,
            cache: Mutex::new(TtlCache::new(max_age)),
        }
    }

    /// The filter a fresh or reset view starts from.
    pub fn default_filter(&self, today: NaiveDate) -> HistoryFilter {
        HistoryFilter::default_window(today, self.window_days)
    }

    /// All parsed records, newest read wins.
    ///
    /// # Errors
    ///
    /// Returns the store error only when no earlier load is cached;
    /// callers surface it and present an empty view.
    pub fn load(&self) -> IndentResult<Arc<Vec<HistoryRecord>>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.get_or_refresh(|| {
            let rows = self.sheet.get_all_values()?;
            let records = records_from_rows(&rows);
            tracing::debug!(records = records.len(), "indent log loaded");
            Ok(Arc::new(records))
        })
    }

    /// Records passing the filter, in log order.
    pub fn filtered(&self, filter: &HistoryFilter) -> IndentResult<Vec<HistoryRecord>> {
        let records = self.load()?;
        Ok(records
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::LOG_HEADER;

    fn log_rows() -> Vec<Vec<String>> {
        let raw: Vec<Vec<&str>> = vec![
            LOG_HEADER.to_vec(),
            vec![
                "MRN-001",
                "2026-08-01 10:00:00",
                "Asha",
                "Kitchen",
                "05-08-2026",
                "Salt",
                "2",
                "Kg",
                "N/A",
            ],
            vec![
                "MRN-002",
                "2026-08-02 11:30:00",
                "Ben",
                "Bar",
                "2026-08-20",
                "Oil",
                "1.5",
                "Ltr",
                "cold pressed",
            ],
            vec![
                "MRN-003",
                "not a time",
                "Asha",
                "Kitchen",
                "garbage",
                "Mop",
                "many",
                "Pc",
                "",
            ],
        ];
        raw.into_iter()
            .map(|row| row.into_iter().map(str::to_owned).collect())
            .collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn test_header_row_is_not_a_record() {
        let records = records_from_rows(&log_rows());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].request_id, "MRN-001");
    }

    #[test]
    fn test_both_date_formats_parse() {
        let records = records_from_rows(&log_rows());
        assert_eq!(records[0].required_date, Some(date(2026, 8, 5)));
        assert_eq!(records[1].required_date, Some(date(2026, 8, 20)));
    }

    #[test]
    fn test_bad_fields_degrade_without_failing_the_load() {
        let records = records_from_rows(&log_rows());
        let bad = &records[2];
        assert!(bad.submitted_at.is_none());
        assert!(bad.required_date.is_none());
        assert_eq!(bad.quantity, 0.0);
        assert_eq!(bad.item_name, "Mop");
    }

    #[test]
    fn test_legacy_sheet_without_requester_column() {
        let raw: Vec<Vec<&str>> = vec![
            vec![
                "MRN",
                "Timestamp",
                "Department",
                "Date Required",
                "Item",
                "Qty",
                "Unit",
                "Note",
            ],
            vec![
                "MRN-001",
                "2026-08-01 10:00:00",
                "Kitchen",
                "05-08-2026",
                "Salt",
                "2",
                "Kg",
                "N/A",
            ],
        ];
        let rows: Vec<Vec<String>> = raw
            .into_iter()
            .map(|row| row.into_iter().map(str::to_owned).collect())
            .collect();

        let records = records_from_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].department, "Kitchen");
        assert_eq!(records[0].requested_by, "");
        assert_eq!(records[0].quantity, 2.0);
    }

    #[test]
    fn test_headerless_rows_use_canonical_order() {
        let rows = log_rows()[1..2].to_vec();
        let records = records_from_rows(&rows);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_name, "Salt");
    }

    #[test]
    fn test_date_range_filter_is_inclusive() {
        let records = records_from_rows(&log_rows());
        let mut filter = HistoryFilter::default_window(date(2026, 8, 5), 0);
        filter.from = date(2026, 8, 5);
        filter.to = date(2026, 8, 5);

        let hits: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(hits.len(), 1, "boundary date must be included");
        assert_eq!(hits[0].request_id, "MRN-001");

        filter.to = date(2026, 8, 20);
        let hits: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(hits.len(), 2, "out-of-range rows stay excluded");
    }

    #[test]
    fn test_department_and_text_filters_conjoin() {
        let records = records_from_rows(&log_rows());
        let mut filter = HistoryFilter::default_window(date(2026, 8, 30), 60);
        filter.departments.insert("Kitchen".to_owned());

        let hits: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(hits.len(), 1);

        filter.item_query = "salt".to_owned();
        let hits: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
        assert_eq!(hits.len(), 1);

        filter.request_id_query = "mrn-002".to_owned();
        let hits: Vec<_> = records.iter().filter(|r| filter.matches(r)).collect();
        assert!(hits.is_empty(), "conjunction must require every filter");
    }

    #[test]
    fn test_default_window_trails_today() {
        let filter = HistoryFilter::default_window(date(2026, 8, 4), 90);
        assert_eq!(filter.to, date(2026, 8, 4));
        assert_eq!(filter.from, date(2026, 5, 6));
        assert!(filter.departments.is_empty());
    }
}
