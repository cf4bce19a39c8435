//! Share-message deep link for a submitted request.
//!
//! Builds a pre-filled text from the request header and URL-encodes it
//! into a messaging deep link. The rendered document is not attached
//! automatically; the sender attaches it by hand.

use crate::request::{IndentRequest, REQUIRED_DATE_FORMAT};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

const SHARE_BASE_URL: &str = "https://wa.me/?text=";

/// The plain share text: identifier, department, requester, required date.
pub fn share_message(request: &IndentRequest) -> String {
    format!(
        "Indent {} | Department: {} | Requested By: {} | Date Required: {}",
        request.request_id,
        request.department,
        request.requested_by,
        request.required_date.format(REQUIRED_DATE_FORMAT),
    )
}

/// The share message URL-encoded into a messaging deep link.
pub fn share_link(request: &IndentRequest) -> String {
    let message = share_message(request);
    let encoded = utf8_percent_encode(&message, NON_ALPHANUMERIC);
    format!("{SHARE_BASE_URL}{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use indent_types::NonEmptyText;

    fn request() -> IndentRequest {
        IndentRequest {
            request_id: "MRN-012".to_owned(),
            created_at: Utc::now(),
            department: NonEmptyText::new("Housekeeping").expect("valid department"),
            required_date: NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid date"),
            requested_by: NonEmptyText::new("Ben").expect("valid requester"),
            lines: Vec::new(),
        }
    }

    #[test]
    fn test_share_message_carries_header_fields() {
        let message = share_message(&request());
        assert_eq!(
            message,
            "Indent MRN-012 | Department: Housekeeping | Requested By: Ben | Date Required: 01-09-2026"
        );
    }

    #[test]
    fn test_share_link_is_fully_encoded() {
        let link = share_link(&request());
        assert!(link.starts_with("https://wa.me/?text=Indent%20MRN%2D012"));
        assert!(!link.contains(' '), "spaces must be percent-encoded");
        assert!(!link.contains('|'), "separators must be percent-encoded");
    }
}
