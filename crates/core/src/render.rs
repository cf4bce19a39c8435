//! Rendering a submitted request as a printable document.
//!
//! The renderer produces a self-contained HTML document, paginated and
//! grouped by category then sub-category. Lines arrive pre-sorted from
//! the submission path, so a group header is emitted whenever the
//! category or sub-category changes from the previous line, and repeated
//! at the top of every page.
//!
//! Pagination works on an explicit layout pass: the item and note columns
//! wrap at fixed character widths, a row is as tall as its tallest cell,
//! and rows are packed into pages against a fixed line budget. Multi-line
//! cells therefore never straddle a page break or misalign the row grid.
//!
//! Rendering is isolated from submission: a request is already persisted
//! by the time it is rendered, and a render failure is reported on its
//! own, never rolled back into the write.

use crate::mrn::is_error_mrn;
use crate::request::{IndentLine, IndentRequest, REQUIRED_DATE_FORMAT};
use crate::{IndentError, IndentResult};
use std::fmt::Write as _;

/// Wrap width of the item column, in characters.
pub const ITEM_COLUMN_CHARS: usize = 38;
/// Wrap width of the note column, in characters.
pub const NOTE_COLUMN_CHARS: usize = 26;

/// Text lines of table content that fit on one page.
const PAGE_LINE_BUDGET: usize = 40;
/// Lines consumed by the title and request header block on the first page.
const TITLE_BLOCK_LINES: usize = 6;
/// Lines consumed by the continuation header on later pages.
const CONTINUATION_BLOCK_LINES: usize = 2;
/// Lines consumed by the repeated column header.
const COLUMN_HEADER_LINES: usize = 2;
/// Lines consumed by one group header row.
const GROUP_HEADER_LINES: usize = 1;

/// Note cell text when a line has no note.
const NOTE_PLACEHOLDER: &str = "-";

/// Greedy word wrap at `width` characters.
///
/// Words longer than the width are hard-split so a single long token can
/// never blow up a cell. Always yields at least one (possibly empty) line.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(word.len());
            lines.push(word[..split].to_owned());
            word = &word[split..];
        }
        if current.is_empty() {
            current = word.to_owned();
        } else if current.chars().count() + 1 + word.chars().count() <= width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_owned();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// One table row after the layout pass.
#[derive(Debug)]
struct DocRow {
    item_lines: Vec<String>,
    quantity: f64,
    unit: String,
    note_lines: Vec<String>,
    height: usize,
}

impl DocRow {
    fn layout(line: &IndentLine) -> Self {
        let item_lines = wrap_text(&line.item_name, ITEM_COLUMN_CHARS);
        let note = if line.note.trim().is_empty() {
            NOTE_PLACEHOLDER
        } else {
            line.note.as_str()
        };
        let note_lines = wrap_text(note, NOTE_COLUMN_CHARS);
        // The row is as tall as its tallest cell.
        let height = item_lines.len().max(note_lines.len()).max(1);
        Self {
            item_lines,
            quantity: line.quantity,
            unit: line.unit.clone(),
            note_lines,
            height,
        }
    }
}

#[derive(Debug)]
enum DocEntry {
    GroupHeader {
        category: String,
        sub_category: String,
    },
    Row(DocRow),
}

/// Packs lines into pages against the line budget.
fn paginate(lines: &[IndentLine]) -> Vec<Vec<DocEntry>> {
    let mut pages: Vec<Vec<DocEntry>> = Vec::new();
    let mut current: Vec<DocEntry> = Vec::new();
    let mut used = TITLE_BLOCK_LINES + COLUMN_HEADER_LINES;
    let mut prev_group: Option<(String, String)> = None;
    let mut force_group_header = false;

    for line in lines {
        let group = (line.category.clone(), line.sub_category.clone());
        let row = DocRow::layout(line);

        let group_changed = prev_group.as_ref() != Some(&group);
        let mut needs_group = group_changed || force_group_header;
        let mut needed = row.height + if needs_group { GROUP_HEADER_LINES } else { 0 };

        if !current.is_empty() && used + needed > PAGE_LINE_BUDGET {
            pages.push(std::mem::take(&mut current));
            used = CONTINUATION_BLOCK_LINES + COLUMN_HEADER_LINES;
            // Every page restates the group it continues or opens.
            needs_group = true;
            needed = row.height + GROUP_HEADER_LINES;
        }

        if needs_group {
            current.push(DocEntry::GroupHeader {
                category: group.0.clone(),
                sub_category: group.1.clone(),
            });
        }
        current.push(DocEntry::Row(row));
        used += needed;
        prev_group = Some(group);
        force_group_header = false;
    }

    if !current.is_empty() {
        pages.push(current);
    }
    pages
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn cell_html(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| escape(l))
        .collect::<Vec<_>>()
        .join("<br>")
}

const DOCUMENT_STYLE: &str = "\
body { font-family: Helvetica, Arial, sans-serif; font-size: 12px; margin: 0; }\n\
section.page { width: 190mm; margin: 8mm auto; page-break-after: always; }\n\
h1 { font-size: 18px; text-align: center; }\n\
div.meta { display: flex; justify-content: space-between; margin-bottom: 8px; }\n\
table { width: 100%; border-collapse: collapse; }\n\
th, td { border: 1px solid #444; padding: 3px 6px; vertical-align: top; }\n\
th { background: #e6e6e6; }\n\
tr.group td { background: #f2f2f2; font-weight: bold; }\n\
td.num { text-align: right; white-space: nowrap; }\n\
div.pagefooter { text-align: right; color: #666; margin-top: 6px; }\n";

/// Renders the request as a paginated HTML document.
///
/// # Errors
///
/// Returns [`IndentError::Render`] when the request carries the
/// allocation-failure sentinel instead of a real identifier, or has no
/// lines to lay out.
pub fn render_document(request: &IndentRequest) -> IndentResult<String> {
    if is_error_mrn(&request.request_id) {
        return Err(IndentError::Render(
            "request has no valid identifier".into(),
        ));
    }
    if request.lines.is_empty() {
        return Err(IndentError::Render("request has no lines".into()));
    }

    let pages = paginate(&request.lines);
    let page_count = pages.len();
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Indent {id}</title>\n<style>\n{DOCUMENT_STYLE}</style>\n</head>\n<body>\n",
        id = escape(&request.request_id),
    );

    for (page_index, page) in pages.iter().enumerate() {
        html.push_str("<section class=\"page\">\n");
        if page_index == 0 {
            let _ = write!(
                html,
                "<h1>Material Indent Request</h1>\n<div class=\"meta\">\
                 <span>MRN: {id}</span><span>Date Required: {required}</span></div>\n\
                 <div class=\"meta\"><span>Department: {dept}</span>\
                 <span>Requested By: {by}</span></div>\n",
                id = escape(&request.request_id),
                required = request.required_date.format(REQUIRED_DATE_FORMAT),
                dept = escape(request.department.as_str()),
                by = escape(request.requested_by.as_str()),
            );
        } else {
            let _ = write!(
                html,
                "<div class=\"meta\"><span>MRN: {id} (continued)</span></div>\n",
                id = escape(&request.request_id),
            );
        }

        html.push_str(
            "<table>\n<thead><tr><th>Item</th><th>Qty</th><th>Unit</th><th>Note</th></tr></thead>\n<tbody>\n",
        );
        for entry in page {
            match entry {
                DocEntry::GroupHeader {
                    category,
                    sub_category,
                } => {
                    let _ = write!(
                        html,
                        "<tr class=\"group\"><td colspan=\"4\">{} / {}</td></tr>\n",
                        escape(category),
                        escape(sub_category),
                    );
                }
                DocEntry::Row(row) => {
                    let _ = write!(
                        html,
                        "<tr><td>{}</td><td class=\"num\">{:.2}</td><td>{}</td><td>{}</td></tr>\n",
                        cell_html(&row.item_lines),
                        row.quantity,
                        escape(&row.unit),
                        cell_html(&row.note_lines),
                    );
                }
            }
        }
        let _ = write!(
            html,
            "</tbody>\n</table>\n<div class=\"pagefooter\">Page {} of {}</div>\n</section>\n",
            page_index + 1,
            page_count,
        );
    }

    html.push_str("</body>\n</html>\n");
    Ok(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use indent_types::NonEmptyText;

    fn line(item: &str, qty: f64, category: &str, sub: &str, note: &str) -> IndentLine {
        IndentLine {
            item_name: item.to_owned(),
            quantity: qty,
            unit: "Kg".to_owned(),
            note: note.to_owned(),
            category: category.to_owned(),
            sub_category: sub.to_owned(),
        }
    }

    fn request(lines: Vec<IndentLine>) -> IndentRequest {
        IndentRequest {
            request_id: "MRN-009".to_owned(),
            created_at: Utc::now(),
            department: NonEmptyText::new("Kitchen").expect("valid department"),
            required_date: NaiveDate::from_ymd_opt(2026, 8, 10).expect("valid date"),
            requested_by: NonEmptyText::new("Asha").expect("valid requester"),
            lines,
        }
    }

    #[test]
    fn test_wrap_text_respects_width() {
        let lines = wrap_text("whole black peppercorns in a large jar", 12);
        assert!(lines.iter().all(|l| l.chars().count() <= 12));
        assert_eq!(lines.join(" "), "whole black peppercorns in a large jar");
    }

    #[test]
    fn test_wrap_text_hard_splits_long_words() {
        let lines = wrap_text("abcdefghijklmnop", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_wrap_text_empty_is_one_blank_line() {
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn test_row_height_is_tallest_cell() {
        let long_note = "needs the fine grind, not the coarse one we got last month";
        let row = DocRow::layout(&line("Salt", 1.0, "Grocery", "Dry", long_note));
        assert_eq!(row.item_lines.len(), 1);
        assert!(row.note_lines.len() > 1);
        assert_eq!(row.height, row.note_lines.len());
    }

    #[test]
    fn test_group_header_emitted_on_change_only() {
        let lines = vec![
            line("Pepper", 1.0, "Grocery", "Dry", ""),
            line("Salt", 1.0, "Grocery", "Dry", ""),
            line("Oil", 1.0, "Grocery", "Wet", ""),
        ];
        let pages = paginate(&lines);
        assert_eq!(pages.len(), 1);

        let headers: Vec<String> = pages[0]
            .iter()
            .filter_map(|e| match e {
                DocEntry::GroupHeader {
                    category,
                    sub_category,
                } => Some(format!("{category}/{sub_category}")),
                DocEntry::Row(_) => None,
            })
            .collect();
        assert_eq!(headers, vec!["Grocery/Dry", "Grocery/Wet"]);
    }

    #[test]
    fn test_long_requests_paginate_with_repeated_group_header() {
        let lines: Vec<IndentLine> = (0..60)
            .map(|i| line(&format!("Item {i}"), 1.0, "Grocery", "Dry", ""))
            .collect();
        let pages = paginate(&lines);
        assert!(pages.len() > 1, "60 rows cannot fit one page");

        for page in &pages {
            assert!(
                matches!(page.first(), Some(DocEntry::GroupHeader { .. })),
                "every page must restate its group"
            );
        }

        let rows: usize = pages
            .iter()
            .flatten()
            .filter(|e| matches!(e, DocEntry::Row(_)))
            .count();
        assert_eq!(rows, 60, "no row may be dropped by pagination");
    }

    #[test]
    fn test_render_includes_header_and_fixed_precision() {
        let html = render_document(&request(vec![line("Salt", 2.0, "Grocery", "Dry", "")]))
            .expect("render should succeed");

        assert!(html.contains("MRN: MRN-009"));
        assert!(html.contains("Department: Kitchen"));
        assert!(html.contains("Requested By: Asha"));
        assert!(html.contains("10-08-2026"));
        assert!(html.contains("2.00"), "quantity renders at fixed precision");
        assert!(html.contains("<td>-</td>"), "blank note renders as dash");
        assert!(html.contains("Grocery / Dry"));
    }

    #[test]
    fn test_render_escapes_markup() {
        let html = render_document(&request(vec![line(
            "Chillies <whole>",
            1.0,
            "Grocery",
            "Dry",
            "A&B brand",
        )]))
        .expect("render should succeed");

        assert!(html.contains("Chillies &lt;whole&gt;"));
        assert!(html.contains("A&amp;B brand"));
    }

    #[test]
    fn test_render_rejects_sentinel_identifier() {
        let mut req = request(vec![line("Salt", 1.0, "Grocery", "Dry", "")]);
        req.request_id = "MRN-ERR-120000".to_owned();

        let err = render_document(&req).expect_err("sentinel must not render");
        assert!(matches!(err, IndentError::Render(_)));
    }

    #[test]
    fn test_render_rejects_empty_requests() {
        let err = render_document(&request(vec![])).expect_err("empty request must not render");
        assert!(matches!(err, IndentError::Render(_)));
    }
}
