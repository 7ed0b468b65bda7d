//! Validation errors for keys supplied by reporters.

use thiserror::Error;

/// Rejected input. Raised before any address is derived.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid country code {0:?}: expected 1-4 ASCII digits")]
    InvalidCountryCode(String),

    #[error("invalid phone number {0:?}: expected 1-20 ASCII digits")]
    InvalidNumber(String),

    #[error("day index {index} outside window of {window_days} days")]
    DayIndexOutOfRange { index: u64, window_days: u64 },

    #[error("invalid window: {window_days} days of {seconds_per_day}s, both must be non-zero")]
    InvalidWindow { window_days: u64, seconds_per_day: u64 },
}
