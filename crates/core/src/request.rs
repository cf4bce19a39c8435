//! Submitted request types and their log encoding.
//!
//! An [`IndentRequest`] is created atomically at submit time from a
//! validated draft and is immutable afterwards. It persists as one log
//! row per line; the header row below is authoritative for column order
//! when reading the log back.

use chrono::{DateTime, NaiveDate, Utc};
use indent_types::NonEmptyText;

/// Column order of the log worksheet.
pub const LOG_HEADER: [&str; 9] = [
    "MRN",
    "Timestamp",
    "Requested By",
    "Department",
    "Date Required",
    "Item",
    "Qty",
    "Unit",
    "Note",
];

/// Wire format of the required date ("DD-MM-YYYY").
pub const REQUIRED_DATE_FORMAT: &str = "%d-%m-%Y";
/// Wire format of the submission timestamp.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Note cell written when a line has no note.
pub const EMPTY_NOTE: &str = "N/A";

/// One submitted line of a request.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct IndentLine {
    pub item_name: String,
    pub quantity: f64,
    pub unit: String,
    pub note: String,
    pub category: String,
    pub sub_category: String,
}

/// One submitted, immutable indent request.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndentRequest {
    pub request_id: String,
    pub created_at: DateTime<Utc>,
    pub department: NonEmptyText,
    pub required_date: NaiveDate,
    pub requested_by: NonEmptyText,
    pub lines: Vec<IndentLine>,
}

impl IndentRequest {
    pub fn total_quantity(&self) -> f64 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Filename of the rendered, downloadable document.
    pub fn document_filename(&self) -> String {
        format!("Indent_{}.html", self.request_id)
    }

    /// Encodes the request as log rows, one per line, in [`LOG_HEADER`]
    /// order.
    pub fn to_log_rows(&self) -> Vec<Vec<String>> {
        let timestamp = self.created_at.format(TIMESTAMP_FORMAT).to_string();
        let required = self.required_date.format(REQUIRED_DATE_FORMAT).to_string();

        self.lines
            .iter()
            .map(|line| {
                vec![
                    self.request_id.clone(),
                    timestamp.clone(),
                    self.requested_by.to_string(),
                    self.department.to_string(),
                    required.clone(),
                    line.item_name.clone(),
                    line.quantity.to_string(),
                    line.unit.clone(),
                    if line.note.trim().is_empty() {
                        EMPTY_NOTE.to_owned()
                    } else {
                        line.note.clone()
                    },
                ]
            })
            .collect()
    }
}

/// Sorts lines by (category, sub-category, item name), ascending and
/// case-insensitive. The order is purely presentational: it gives the
/// document renderer stable groups and downstream readers a predictable
/// layout.
pub fn sort_lines(lines: &mut [IndentLine]) {
    lines.sort_by(|a, b| {
        let ka = (
            a.category.to_lowercase(),
            a.sub_category.to_lowercase(),
            a.item_name.to_lowercase(),
        );
        let kb = (
            b.category.to_lowercase(),
            b.sub_category.to_lowercase(),
            b.item_name.to_lowercase(),
        );
        ka.cmp(&kb)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item: &str, category: &str, sub: &str) -> IndentLine {
        IndentLine {
            item_name: item.to_owned(),
            quantity: 1.0,
            unit: "Kg".to_owned(),
            note: String::new(),
            category: category.to_owned(),
            sub_category: sub.to_owned(),
        }
    }

    fn request() -> IndentRequest {
        IndentRequest {
            request_id: "MRN-007".to_owned(),
            created_at: DateTime::parse_from_rfc3339("2026-08-04T09:30:00Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
            department: NonEmptyText::new("Kitchen").expect("valid department"),
            required_date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            requested_by: NonEmptyText::new("Asha").expect("valid requester"),
            lines: vec![
                IndentLine {
                    note: "coarse".to_owned(),
                    quantity: 2.0,
                    ..line("Salt", "Grocery", "Dry")
                },
                line("Oil", "Grocery", "Wet"),
            ],
        }
    }

    #[test]
    fn test_sort_lines_groups_by_category_then_item() {
        let mut lines = vec![
            line("Salt", "grocery", "Dry"),
            line("Mop", "Cleaning", "General"),
            line("pepper", "Grocery", "Dry"),
        ];
        sort_lines(&mut lines);

        let names: Vec<&str> = lines.iter().map(|l| l.item_name.as_str()).collect();
        assert_eq!(names, vec!["Mop", "pepper", "Salt"]);
    }

    #[test]
    fn test_to_log_rows_encodes_one_row_per_line() {
        let rows = request().to_log_rows();

        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            vec![
                "MRN-007",
                "2026-08-04 09:30:00",
                "Asha",
                "Kitchen",
                "10-08-2026",
                "Salt",
                "2",
                "Kg",
                "coarse",
            ]
        );
        // Blank notes become the explicit placeholder.
        assert_eq!(rows[1][8], EMPTY_NOTE);
    }

    #[test]
    fn test_total_quantity_sums_lines() {
        assert_eq!(request().total_quantity(), 3.0);
    }

    #[test]
    fn test_document_filename_embeds_request_id() {
        assert_eq!(request().document_filename(), "Indent_MRN-007.html");
    }
}
