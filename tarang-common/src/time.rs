//! Timestamp utilities
//!
//! Includes the freshness-token clock used to cache-bust visualization URLs:
//! the server reuses stable artifact filenames across runs, so each run must
//! produce a distinct query token even when two runs land in the same
//! millisecond.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Format seconds as `m:ss` for transport displays
///
/// Negative and non-finite inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Monotonically increasing millisecond token source
///
/// Scoped to whoever owns it (one per session); not ambient global state.
#[derive(Debug, Default)]
pub struct FreshnessClock {
    last: AtomicI64,
}

impl FreshnessClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next token: current epoch milliseconds, bumped past the previous token
    /// if the wall clock has not advanced (or went backwards)
    pub fn next_token(&self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = if now_ms > prev { now_ms } else { prev + 1 };
            match self
                .last
                .compare_exchange(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Append a freshness token query parameter to `url`
pub fn stamp_url(url: &str, token: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}t={}", url, separator, token)
}
