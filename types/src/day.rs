//! Day-window arithmetic.
//!
//! Wall-clock time is cut into fixed-size epochs ("epoch days"). A window of
//! `window_days` physical slots is reused circularly: epoch day `d` lives in
//! slot `d % window_days`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{KeyError, Timestamp};

/// Absolute day number: Unix seconds divided by the day length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpochDay(u64);

impl EpochDay {
    pub fn new(day: u64) -> Self {
        Self(day)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EpochDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {}", self.0)
    }
}

/// Physical slot in the circular window, always in `[0, window_days)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DayIndex(u64);

impl DayIndex {
    /// Validate a slot number against the window size.
    pub fn new(index: u64, window_days: u64) -> Result<Self, KeyError> {
        if index < window_days {
            Ok(Self(index))
        } else {
            Err(KeyError::DayIndexOutOfRange { index, window_days })
        }
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Canonical 8-byte little-endian encoding used in address derivation.
    pub fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for DayIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// Window geometry: how many slots, and how long a day is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub window_days: u64,
    pub seconds_per_day: u64,
}

impl DayWindow {
    /// Both the slot count and the day length must be non-zero.
    pub fn new(window_days: u64, seconds_per_day: u64) -> Result<Self, KeyError> {
        if window_days == 0 || seconds_per_day == 0 {
            return Err(KeyError::InvalidWindow {
                window_days,
                seconds_per_day,
            });
        }
        Ok(Self {
            window_days,
            seconds_per_day,
        })
    }

    pub fn epoch_day(&self, ts: Timestamp) -> EpochDay {
        EpochDay(ts.as_secs() / self.seconds_per_day)
    }

    /// First second of the given day.
    pub fn start_of_day(&self, day: EpochDay) -> Timestamp {
        Timestamp::new(day.0.saturating_mul(self.seconds_per_day))
    }

    pub fn slot_of(&self, day: EpochDay) -> DayIndex {
        DayIndex(day.0 % self.window_days)
    }

    /// Validate a raw slot number against this window.
    pub fn index(&self, index: u64) -> Result<DayIndex, KeyError> {
        DayIndex::new(index, self.window_days)
    }

    /// Slot `offset` days away from `today` (negative for the past), wrapping.
    pub fn slot_at_offset(&self, today: EpochDay, offset: i64) -> DayIndex {
        let w = self.window_days as i128;
        let idx = (today.0 as i128 + offset as i128).rem_euclid(w);
        DayIndex(idx as u64)
    }

    /// Most recent epoch day, not after `today`, that maps to `slot`.
    ///
    /// This is the only day whose data a reader may see in that slot.
    pub fn latest_day_for_slot(&self, slot: DayIndex, today: EpochDay) -> EpochDay {
        let today_slot = today.0 % self.window_days;
        let back = (today_slot + self.window_days - slot.0) % self.window_days;
        EpochDay(today.0.saturating_sub(back))
    }

    /// All slots of the window, in index order.
    pub fn slots(&self) -> impl Iterator<Item = DayIndex> {
        (0..self.window_days).map(DayIndex)
    }

    /// Length of the whole window in seconds.
    pub fn span_secs(&self) -> u64 {
        self.window_days.saturating_mul(self.seconds_per_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: u64 = 86_400;

    #[test]
    fn epoch_day_and_slot() {
        let w = DayWindow::new(60, DAY).unwrap();
        let ts = Timestamp::new(DAY * 125 + 10);
        let day = w.epoch_day(ts);
        assert_eq!(day, EpochDay::new(125));
        assert_eq!(w.slot_of(day).get(), 5);
        assert_eq!(w.start_of_day(day), Timestamp::new(DAY * 125));
    }

    #[test]
    fn offsets_wrap_both_ways() {
        let w = DayWindow::new(60, DAY).unwrap();
        let today = EpochDay::new(120); // slot 0
        assert_eq!(w.slot_at_offset(today, 0).get(), 0);
        assert_eq!(w.slot_at_offset(today, -1).get(), 59);
        assert_eq!(w.slot_at_offset(today, -4).get(), 56);
        assert_eq!(w.slot_at_offset(today, 61).get(), 1);
    }

    #[test]
    fn latest_day_never_in_future() {
        let w = DayWindow::new(60, DAY).unwrap();
        let today = EpochDay::new(125); // slot 5
        assert_eq!(w.latest_day_for_slot(DayIndex(5), today), today);
        assert_eq!(w.latest_day_for_slot(DayIndex(4), today), EpochDay::new(124));
        assert_eq!(w.latest_day_for_slot(DayIndex(6), today), EpochDay::new(66));
    }

    #[test]
    fn index_is_range_checked() {
        let w = DayWindow::new(60, DAY).unwrap();
        assert!(w.index(59).is_ok());
        assert_eq!(
            w.index(60),
            Err(KeyError::DayIndexOutOfRange {
                index: 60,
                window_days: 60
            })
        );
    }

    #[test]
    fn zero_geometry_is_rejected() {
        assert_eq!(
            DayWindow::new(0, DAY),
            Err(KeyError::InvalidWindow {
                window_days: 0,
                seconds_per_day: DAY
            })
        );
        assert!(DayWindow::new(60, 0).is_err());
    }
}
