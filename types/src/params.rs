//! Store parameters: window geometry and daily log capacity.

use serde::{Deserialize, Serialize};

use crate::{DayWindow, KeyError};

/// Sizing of the store, fixed for the lifetime of a database.
///
/// Changing `window_days` or `seconds_per_day` after provisioning remaps
/// every day to a different slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreParams {
    // ── Window ───────────────────────────────────────────────────────────
    /// Number of daily slots kept before a slot is reused (retention horizon).
    pub window_days: u64,

    /// Length of one day in seconds.
    pub seconds_per_day: u64,

    // ── Daily logs ───────────────────────────────────────────────────────
    /// Maximum number of entries one day can hold.
    pub day_capacity: u64,
}

impl StoreParams {
    pub const SECONDS_PER_DAY: u64 = 86_400;

    /// Production defaults: 60 days of 20 000 numbers each.
    pub fn spam_db_defaults() -> Self {
        Self {
            window_days: 60,
            seconds_per_day: Self::SECONDS_PER_DAY,
            day_capacity: 20_000,
        }
    }

    /// Window geometry; fails if either dimension is zero.
    pub fn window(&self) -> Result<DayWindow, KeyError> {
        DayWindow::new(self.window_days, self.seconds_per_day)
    }
}

impl Default for StoreParams {
    fn default() -> Self {
        Self::spam_db_defaults()
    }
}
