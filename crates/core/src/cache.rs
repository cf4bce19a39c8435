//! Lazily refreshed value cache.
//!
//! External reads (reference data, history rows) are throttled through an
//! explicit cache object: a value, its last-fetch instant and a
//! caller-specified max-age. The cache refreshes on access once the value
//! is older than the max-age, and keeps serving the stale value when a
//! refresh fails and an earlier value exists, so transient store failures
//! do not blank an already working view.

use std::time::{Duration, Instant};

/// A single cached value with a freshness deadline.
#[derive(Debug)]
pub struct TtlCache<T> {
    entry: Option<(T, Instant)>,
    max_age: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(max_age: Duration) -> Self {
        Self {
            entry: None,
            max_age,
        }
    }

    /// Returns the cached value, refreshing through `fetch` when it is
    /// missing or older than the max-age.
    ///
    /// A failed refresh falls back to the previous value if one exists;
    /// the failure is logged, not propagated. With no previous value the
    /// error is returned.
    pub fn get_or_refresh<E>(&mut self, fetch: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: std::fmt::Display,
    {
        let now = Instant::now();
        if let Some((value, fetched_at)) = &self.entry {
            if now.duration_since(*fetched_at) < self.max_age {
                return Ok(value.clone());
            }
        }

        match fetch() {
            Ok(value) => {
                self.entry = Some((value.clone(), now));
                Ok(value)
            }
            Err(err) => match &self.entry {
                Some((stale, _)) => {
                    tracing::warn!("refresh failed, serving stale value: {err}");
                    Ok(stale.clone())
                }
                None => Err(err),
            },
        }
    }

    /// Drops the cached value so the next access refetches.
    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}
