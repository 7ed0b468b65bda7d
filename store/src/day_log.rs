//! Daily log records and the storage trait for the circular day window.
//!
//! Each physical slot `(country, day_index)` is bound once, at provisioning,
//! to a [`LogHandle`]. The log behind the handle is reused every
//! `window_days` days: its header records which epoch day currently owns it,
//! and the first append for a newer day resets the count before writing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use spamdb_types::{CountryCode, DayIndex, EpochDay, StoreAddress, Timestamp};

use crate::{NumberEntry, StoreError};

/// Opaque id of an allocated daily log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogHandle(u64);

impl LogHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Big-endian so handles sort numerically as byte keys.
    pub fn to_be_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

/// A provisioned slot and the log bound to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaySlot {
    pub address: StoreAddress,
    pub day_index: DayIndex,
    pub bound_log: LogHandle,
}

/// Mutable state of a daily log, everything except the entries.
///
/// Persisted as four little-endian `u64` words:
/// `owner_day, count, last_update, capacity`, with `u64::MAX` as the
/// "never written" owner day.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayLogHeader {
    /// Epoch day whose reports occupy the log, `None` before the first append.
    pub owner_day: Option<EpochDay>,
    /// Entries written for `owner_day`. Entries past this are stale.
    pub count: u64,
    pub last_update: Timestamp,
    /// Fixed at provisioning.
    pub capacity: u64,
}

/// Result of admitting one append into a header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAdmission {
    /// Entry position the caller must write.
    pub index: u64,
    /// The log held an older day and was reset.
    pub rotated: bool,
    pub previous_day: Option<EpochDay>,
}

const NO_DAY: u64 = u64::MAX;

impl DayLogHeader {
    pub const ENCODED_LEN: usize = 32;

    /// A fresh, unowned log.
    pub fn new(capacity: u64) -> Self {
        Self {
            owner_day: None,
            count: 0,
            last_update: Timestamp::EPOCH,
            capacity,
        }
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Whether readers looking for `day` may see this log's entries.
    pub fn holds(&self, day: EpochDay) -> bool {
        self.owner_day == Some(day)
    }

    /// Reserve the next entry for a report made on `day`.
    ///
    /// Rotates the log if it belongs to an older day, then claims
    /// `entries[count]`. The header is only modified on success, so a
    /// rejected append leaves the log exactly as it was. Callers must hold
    /// the record's write lock (or write transaction) across this call and
    /// the entry write.
    pub fn admit(
        &mut self,
        slot: DayIndex,
        day: EpochDay,
        now: Timestamp,
    ) -> Result<SlotAdmission, StoreError> {
        let mut next = *self;
        let previous_day = self.owner_day;
        let rotated = match previous_day {
            Some(bound) if bound > day => {
                return Err(StoreError::StaleSlotMismatch {
                    slot,
                    bound_day: bound,
                    requested_day: day,
                })
            }
            Some(bound) if bound == day => false,
            _ => {
                next.count = 0;
                next.owner_day = Some(day);
                previous_day.is_some()
            }
        };

        if next.is_full() {
            return Err(StoreError::CapacityExceeded {
                slot,
                capacity: next.capacity,
            });
        }

        let index = next.count;
        next.count += 1;
        next.last_update = now;
        *self = next;

        Ok(SlotAdmission {
            index,
            rotated,
            previous_day,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        let owner = self.owner_day.map_or(NO_DAY, |d| d.get());
        out[0..8].copy_from_slice(&owner.to_le_bytes());
        out[8..16].copy_from_slice(&self.count.to_le_bytes());
        out[16..24].copy_from_slice(&self.last_update.as_secs().to_le_bytes());
        out[24..32].copy_from_slice(&self.capacity.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(StoreError::Corruption(format!(
                "day log header is {} bytes, expected {}",
                bytes.len(),
                Self::ENCODED_LEN
            )));
        }
        let word = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            u64::from_le_bytes(buf)
        };
        let owner = word(0);
        let header = Self {
            owner_day: (owner != NO_DAY).then(|| EpochDay::new(owner)),
            count: word(1),
            last_update: Timestamp::new(word(2)),
            capacity: word(3),
        };
        if header.count > header.capacity {
            return Err(StoreError::Corruption(format!(
                "day log count {} exceeds capacity {}",
                header.count, header.capacity
            )));
        }
        Ok(header)
    }
}

/// A consistent view of one daily log.
#[derive(Clone, Debug)]
pub struct DayLogSnapshot {
    pub slot: DaySlot,
    pub header: DayLogHeader,
    /// Entries `[0, count)`.
    pub entries: Vec<NumberEntry>,
}

impl DayLogSnapshot {
    /// Non-empty numbers in write order.
    pub fn numbers(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().filter_map(NumberEntry::decode)
    }
}

/// Storage for the circular window of daily logs.
pub trait DayLogStore {
    /// Allocate a log of `capacity` entries and bind it to the slot.
    ///
    /// Fails with [`StoreError::AlreadyProvisioned`] if the slot is bound;
    /// the existing log is left untouched.
    fn provision(
        &self,
        country: &CountryCode,
        day: DayIndex,
        capacity: u64,
    ) -> Result<DaySlot, StoreError>;

    /// Resolve a slot. [`StoreError::NotProvisioned`] if it was never bound.
    fn day_slot(&self, country: &CountryCode, day: DayIndex) -> Result<DaySlot, StoreError>;

    /// Append one entry for a report made on `owner_day`.
    ///
    /// Rotation, the capacity check and the write happen as one atomic unit;
    /// see [`DayLogHeader::admit`].
    fn append(
        &self,
        country: &CountryCode,
        day: DayIndex,
        owner_day: EpochDay,
        entry: &NumberEntry,
        now: Timestamp,
    ) -> Result<AppendOutcome, StoreError>;

    /// Header plus entries `[0, count)` of the slot's log.
    fn read_day(&self, country: &CountryCode, day: DayIndex)
        -> Result<DayLogSnapshot, StoreError>;

    fn header(&self, country: &CountryCode, day: DayIndex) -> Result<DayLogHeader, StoreError> {
        self.read_day(country, day).map(|snapshot| snapshot.header)
    }

    fn is_provisioned(&self, country: &CountryCode, day: DayIndex) -> Result<bool, StoreError> {
        match self.day_slot(country, day) {
            Ok(_) => Ok(true),
            Err(StoreError::NotProvisioned { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Distinct numbers across several slots.
    ///
    /// Each request pairs a slot with the epoch day the caller expects it to
    /// hold; a log owned by any other day (a previous cycle, or never
    /// written) contributes nothing.
    fn read_window(
        &self,
        country: &CountryCode,
        requests: &[(DayIndex, EpochDay)],
    ) -> Result<BTreeSet<String>, StoreError> {
        let mut numbers = BTreeSet::new();
        for &(day, expected) in requests {
            let snapshot = self.read_day(country, day)?;
            if snapshot.header.holds(expected) {
                numbers.extend(snapshot.numbers());
            }
        }
        Ok(numbers)
    }
}

/// What an append did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppendOutcome {
    pub slot: DaySlot,
    /// Position the entry was written to.
    pub index: u64,
    /// Count after the append.
    pub count: u64,
    pub rotated: bool,
    pub previous_day: Option<EpochDay>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> DayIndex {
        DayIndex::new(3, 60).unwrap()
    }

    #[test]
    fn first_append_binds_without_rotating() {
        let mut header = DayLogHeader::new(4);
        let admission = header.admit(slot(), EpochDay::new(10), Timestamp::new(5)).unwrap();
        assert_eq!(admission.index, 0);
        assert!(!admission.rotated);
        assert_eq!(header.owner_day, Some(EpochDay::new(10)));
        assert_eq!(header.count, 1);
        assert_eq!(header.last_update, Timestamp::new(5));
    }

    #[test]
    fn capacity_is_enforced() {
        let mut header = DayLogHeader::new(2);
        let day = EpochDay::new(10);
        header.admit(slot(), day, Timestamp::new(1)).unwrap();
        header.admit(slot(), day, Timestamp::new(2)).unwrap();
        let before = header;
        let err = header.admit(slot(), day, Timestamp::new(3)).unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { capacity: 2, .. }));
        assert_eq!(header, before);
    }

    #[test]
    fn newer_day_rotates() {
        let mut header = DayLogHeader::new(2);
        header.admit(slot(), EpochDay::new(10), Timestamp::new(1)).unwrap();
        header.admit(slot(), EpochDay::new(10), Timestamp::new(2)).unwrap();

        let admission = header.admit(slot(), EpochDay::new(70), Timestamp::new(3)).unwrap();
        assert!(admission.rotated);
        assert_eq!(admission.previous_day, Some(EpochDay::new(10)));
        assert_eq!(admission.index, 0);
        assert_eq!(header.count, 1);
        assert!(header.holds(EpochDay::new(70)));
    }

    #[test]
    fn older_day_is_stale() {
        let mut header = DayLogHeader::new(2);
        header.admit(slot(), EpochDay::new(70), Timestamp::new(1)).unwrap();
        let before = header;
        let err = header.admit(slot(), EpochDay::new(10), Timestamp::new(2)).unwrap_err();
        assert!(matches!(err, StoreError::StaleSlotMismatch { .. }));
        assert_eq!(header, before);
    }

    #[test]
    fn header_layout_round_trips() {
        let mut header = DayLogHeader::new(20_000);
        assert_eq!(DayLogHeader::from_bytes(&header.to_bytes()).unwrap(), header);

        header.admit(slot(), EpochDay::new(19_000), Timestamp::new(1_641_600_000)).unwrap();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..8], &19_000u64.to_le_bytes());
        assert_eq!(DayLogHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn corrupt_header_rejected() {
        assert!(DayLogHeader::from_bytes(&[0u8; 31]).is_err());
        let mut header = DayLogHeader::new(1);
        header.count = 2;
        assert!(DayLogHeader::from_bytes(&header.to_bytes()).is_err());
    }
}
