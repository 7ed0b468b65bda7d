//! Per-number aggregate records.

use serde::{Deserialize, Serialize};
use spamdb_types::{Category, NumberKey, StoreAddress, Timestamp};

use crate::StoreError;

/// Cumulative report counts for one number.
///
/// Persisted as seven little-endian `u64` words: `last_reported` followed by
/// one counter per category in [`Category::ALL`] order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberAggregate {
    /// Indexed by [`Category::slot`].
    pub counters: [u64; 6],
    /// Time of the most recent report; [`Timestamp::EPOCH`] if none yet.
    pub last_reported: Timestamp,
}

impl NumberAggregate {
    pub const ENCODED_LEN: usize = 8 * 7;

    pub fn count(&self, category: Category) -> u64 {
        self.counters[category.slot()]
    }

    /// Reports across all categories.
    pub fn total(&self) -> u64 {
        self.counters.iter().fold(0u64, |acc, c| acc.saturating_add(*c))
    }

    /// Apply one report. Counters never decrease and `last_reported` never
    /// moves backwards.
    pub fn record(&mut self, category: Category, now: Timestamp) {
        let slot = &mut self.counters[category.slot()];
        *slot = slot.saturating_add(1);
        self.last_reported = self.last_reported.max(now);
    }

    /// Whether the last report falls within `window_secs` of `now`.
    pub fn reported_within(&self, window_secs: u64, now: Timestamp) -> bool {
        self.last_reported > Timestamp::EPOCH && !self.last_reported.has_expired(window_secs, now)
    }

    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..8].copy_from_slice(&self.last_reported.as_secs().to_le_bytes());
        for (i, counter) in self.counters.iter().enumerate() {
            let at = 8 + i * 8;
            out[at..at + 8].copy_from_slice(&counter.to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(StoreError::Corruption(format!(
                "number aggregate is {} bytes, expected {}",
                bytes.len(),
                Self::ENCODED_LEN
            )));
        }
        let word = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            u64::from_le_bytes(buf)
        };
        let mut counters = [0u64; 6];
        for (i, counter) in counters.iter_mut().enumerate() {
            *counter = word(i + 1);
        }
        Ok(Self {
            counters,
            last_reported: Timestamp::new(word(0)),
        })
    }
}

/// Result of [`NumberStore::increment`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IncrementOutcome {
    /// The record after the report was applied.
    pub aggregate: NumberAggregate,
    /// `last_reported` as it was before this report, read in the same
    /// atomic unit as the update.
    pub previous_report: Timestamp,
}

impl IncrementOutcome {
    /// Whether this is the first report at or after `since`.
    pub fn is_first_since(&self, since: Timestamp) -> bool {
        self.previous_report == Timestamp::EPOCH || self.previous_report < since
    }
}

/// Storage for number aggregates, addressed by [`NumberKey`].
pub trait NumberStore {
    /// Create a zeroed record if none exists. Idempotent.
    fn ensure(&self, key: &NumberKey) -> Result<StoreAddress, StoreError>;

    /// Atomically apply one report and return the updated record along with
    /// the previous `last_reported`.
    ///
    /// A missing record is created here; an increment never fails because
    /// of absence.
    fn increment(
        &self,
        key: &NumberKey,
        category: Category,
        now: Timestamp,
    ) -> Result<IncrementOutcome, StoreError>;

    /// [`StoreError::NotFound`] if the key was never ensured or reported.
    fn query(&self, key: &NumberKey) -> Result<NumberAggregate, StoreError>;

    fn exists(&self, key: &NumberKey) -> Result<bool, StoreError> {
        match self.query(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Number of distinct keys with a record.
    fn number_count(&self) -> Result<u64, StoreError>;
}
