//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and passed into core
//! services. Request handlers never read process-wide environment
//! variables, which keeps behaviour consistent across multi-threaded
//! runtimes and test harnesses.

use crate::{IndentError, IndentResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default worksheet holding submitted indent lines.
pub const DEFAULT_LOG_SHEET: &str = "indent_log";
/// Default worksheet holding the item reference data.
pub const DEFAULT_REFERENCE_SHEET: &str = "reference";
/// Default trailing window for the history view, in days.
pub const DEFAULT_HISTORY_WINDOW_DAYS: i64 = 90;

/// Reference data is refreshed at most this often.
const CATALOG_MAX_AGE: Duration = Duration::from_secs(300);
/// History rows are refreshed at most this often.
const HISTORY_MAX_AGE: Duration = Duration::from_secs(60);

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    log_sheet: String,
    reference_sheet: String,
    history_window_days: i64,
    catalog_max_age: Duration,
    history_max_age: Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(
        data_dir: PathBuf,
        log_sheet: impl Into<String>,
        reference_sheet: impl Into<String>,
        history_window_days: i64,
    ) -> IndentResult<Self> {
        let log_sheet = log_sheet.into();
        let reference_sheet = reference_sheet.into();

        if log_sheet.trim().is_empty() {
            return Err(IndentError::InvalidInput(
                "log worksheet name cannot be empty".into(),
            ));
        }
        if reference_sheet.trim().is_empty() {
            return Err(IndentError::InvalidInput(
                "reference worksheet name cannot be empty".into(),
            ));
        }
        if history_window_days <= 0 {
            return Err(IndentError::InvalidInput(
                "history window must be a positive number of days".into(),
            ));
        }

        Ok(Self {
            data_dir,
            log_sheet,
            reference_sheet,
            history_window_days,
            catalog_max_age: CATALOG_MAX_AGE,
            history_max_age: HISTORY_MAX_AGE,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn log_sheet(&self) -> &str {
        &self.log_sheet
    }

    pub fn reference_sheet(&self) -> &str {
        &self.reference_sheet
    }

    pub fn history_window_days(&self) -> i64 {
        self.history_window_days
    }

    pub fn catalog_max_age(&self) -> Duration {
        self.catalog_max_age
    }

    pub fn history_max_age(&self) -> Duration {
        self.history_max_age
    }
}

/// Parse the history window from an optional environment value.
///
/// `None` or an empty/whitespace value falls back to
/// [`DEFAULT_HISTORY_WINDOW_DAYS`].
pub fn history_window_from_env_value(value: Option<String>) -> IndentResult<i64> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_HISTORY_WINDOW_DAYS),
        Some(v) => v.parse::<i64>().map_err(|_| {
            IndentError::InvalidInput(format!("invalid history window '{v}', expected days"))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_blank_sheet_names() {
        let err = CoreConfig::new(PathBuf::from("/tmp"), "  ", DEFAULT_REFERENCE_SHEET, 90)
            .expect_err("blank log sheet name should be rejected");
        assert!(matches!(err, IndentError::InvalidInput(_)));
    }

    #[test]
    fn test_new_rejects_non_positive_window() {
        let err = CoreConfig::new(
            PathBuf::from("/tmp"),
            DEFAULT_LOG_SHEET,
            DEFAULT_REFERENCE_SHEET,
            0,
        )
        .expect_err("zero-day window should be rejected");
        assert!(matches!(err, IndentError::InvalidInput(_)));
    }

    #[test]
    fn test_history_window_from_env_value_defaults() {
        let days = history_window_from_env_value(None).expect("default should parse");
        assert_eq!(days, DEFAULT_HISTORY_WINDOW_DAYS);

        let days = history_window_from_env_value(Some("  ".into())).expect("blank should default");
        assert_eq!(days, DEFAULT_HISTORY_WINDOW_DAYS);

        let days = history_window_from_env_value(Some("30".into())).expect("30 should parse");
        assert_eq!(days, 30);
    }

    #[test]
    fn test_history_window_from_env_value_rejects_garbage() {
        let err = history_window_from_env_value(Some("ninety".into()))
            .expect_err("non-numeric window should be rejected");
        assert!(matches!(err, IndentError::InvalidInput(_)));
    }
}
