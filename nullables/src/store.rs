//! Nullable store: thread-safe in-memory storage for testing.

use spamdb_crypto::{day_address, number_address};
use spamdb_store::{
    AppendOutcome, DayLogHeader, DayLogSnapshot, DayLogStore, DaySlot, IncrementOutcome, LogHandle,
    NumberAggregate, NumberEntry, NumberStore, StoreError,
};
use spamdb_types::{Category, CountryCode, DayIndex, EpochDay, NumberKey, StoreAddress, Timestamp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

struct LogRecord {
    header: DayLogHeader,
    entries: Vec<NumberEntry>,
}

/// An in-memory day-log + number store for testing.
///
/// Each daily log sits behind its own mutex, so appends to different days
/// never contend and appends to the same day serialize exactly as they do
/// under an LMDB write transaction.
pub struct NullStore {
    slots: RwLock<HashMap<StoreAddress, DaySlot>>,
    logs: RwLock<HashMap<LogHandle, Arc<Mutex<LogRecord>>>>,
    next_handle: AtomicU64,
    numbers: Mutex<HashMap<StoreAddress, NumberAggregate>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            logs: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(0),
            numbers: Mutex::new(HashMap::new()),
        }
    }

    /// Number of logs allocated so far.
    pub fn allocated_logs(&self) -> u64 {
        self.next_handle.load(Ordering::SeqCst)
    }

    fn log_for(
        &self,
        country: &CountryCode,
        day: DayIndex,
    ) -> Result<(DaySlot, Arc<Mutex<LogRecord>>), StoreError> {
        let slot = self.day_slot(country, day)?;
        let log = self
            .logs
            .read()
            .unwrap()
            .get(&slot.bound_log)
            .cloned()
            .ok_or_else(|| {
                StoreError::Corruption(format!("slot bound to missing log {}", slot.bound_log.get()))
            })?;
        Ok((slot, log))
    }
}

impl Default for NullStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DayLogStore for NullStore {
    fn provision(
        &self,
        country: &CountryCode,
        day: DayIndex,
        capacity: u64,
    ) -> Result<DaySlot, StoreError> {
        let address = day_address(country, day);
        let mut slots = self.slots.write().unwrap();
        if slots.contains_key(&address) {
            return Err(StoreError::AlreadyProvisioned {
                country: country.clone(),
                slot: day,
            });
        }

        let handle = LogHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.logs.write().unwrap().insert(
            handle,
            Arc::new(Mutex::new(LogRecord {
                header: DayLogHeader::new(capacity),
                entries: Vec::new(),
            })),
        );
        let slot = DaySlot {
            address,
            day_index: day,
            bound_log: handle,
        };
        slots.insert(address, slot);
        Ok(slot)
    }

    fn day_slot(&self, country: &CountryCode, day: DayIndex) -> Result<DaySlot, StoreError> {
        self.slots
            .read()
            .unwrap()
            .get(&day_address(country, day))
            .copied()
            .ok_or_else(|| StoreError::NotProvisioned {
                country: country.clone(),
                slot: day,
            })
    }

    fn append(
        &self,
        country: &CountryCode,
        day: DayIndex,
        owner_day: EpochDay,
        entry: &NumberEntry,
        now: Timestamp,
    ) -> Result<AppendOutcome, StoreError> {
        let (slot, log) = self.log_for(country, day)?;
        let mut record = log.lock().unwrap();
        let admission = record.header.admit(day, owner_day, now)?;

        let index = admission.index as usize;
        if index < record.entries.len() {
            record.entries[index] = *entry;
        } else {
            record.entries.push(*entry);
        }

        Ok(AppendOutcome {
            slot,
            index: admission.index,
            count: record.header.count,
            rotated: admission.rotated,
            previous_day: admission.previous_day,
        })
    }

    fn read_day(
        &self,
        country: &CountryCode,
        day: DayIndex,
    ) -> Result<DayLogSnapshot, StoreError> {
        let (slot, log) = self.log_for(country, day)?;
        let record = log.lock().unwrap();
        Ok(DayLogSnapshot {
            slot,
            header: record.header,
            entries: record.entries[..record.header.count as usize].to_vec(),
        })
    }
}

impl NumberStore for NullStore {
    fn ensure(&self, key: &NumberKey) -> Result<StoreAddress, StoreError> {
        let address = number_address(key);
        self.numbers.lock().unwrap().entry(address).or_default();
        Ok(address)
    }

    fn increment(
        &self,
        key: &NumberKey,
        category: Category,
        now: Timestamp,
    ) -> Result<IncrementOutcome, StoreError> {
        let mut numbers = self.numbers.lock().unwrap();
        let aggregate = numbers.entry(number_address(key)).or_default();
        let previous_report = aggregate.last_reported;
        aggregate.record(category, now);
        Ok(IncrementOutcome {
            aggregate: *aggregate,
            previous_report,
        })
    }

    fn query(&self, key: &NumberKey) -> Result<NumberAggregate, StoreError> {
        self.numbers
            .lock()
            .unwrap()
            .get(&number_address(key))
            .copied()
            .ok_or_else(|| StoreError::NotFound(format!("number {}", key)))
    }

    fn number_count(&self) -> Result<u64, StoreError> {
        Ok(self.numbers.lock().unwrap().len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spamdb_types::PhoneNumber;

    fn cc() -> CountryCode {
        CountryCode::new("1").unwrap()
    }

    fn entry(n: &str) -> NumberEntry {
        NumberEntry::from_number(&PhoneNumber::new(n).unwrap())
    }

    #[test]
    fn provision_then_append_and_read() {
        let store = NullStore::new();
        let slot = DayIndex::new(3, 60).unwrap();
        store.provision(&cc(), slot, 4).unwrap();

        let out = store
            .append(&cc(), slot, EpochDay::new(3), &entry("5551234567"), Timestamp::new(9))
            .unwrap();
        assert_eq!(out.index, 0);
        assert_eq!(out.count, 1);
        assert!(!out.rotated);

        let snapshot = store.read_day(&cc(), slot).unwrap();
        assert_eq!(snapshot.numbers().collect::<Vec<_>>(), vec!["5551234567"]);
        assert_eq!(snapshot.header.last_update, Timestamp::new(9));
    }

    #[test]
    fn double_provision_is_rejected() {
        let store = NullStore::new();
        let slot = DayIndex::new(0, 60).unwrap();
        store.provision(&cc(), slot, 4).unwrap();
        assert!(matches!(
            store.provision(&cc(), slot, 8),
            Err(StoreError::AlreadyProvisioned { .. })
        ));
        assert_eq!(store.header(&cc(), slot).unwrap().capacity, 4);
        assert_eq!(store.allocated_logs(), 1);
    }

    #[test]
    fn unprovisioned_slot_is_reported() {
        let store = NullStore::new();
        let slot = DayIndex::new(1, 60).unwrap();
        assert!(!store.is_provisioned(&cc(), slot).unwrap());
        assert!(matches!(
            store.read_day(&cc(), slot),
            Err(StoreError::NotProvisioned { .. })
        ));
    }

    #[test]
    fn rotation_truncates_visible_entries() {
        let store = NullStore::new();
        let slot = DayIndex::new(0, 2).unwrap();
        store.provision(&cc(), slot, 4).unwrap();
        for n in ["1", "2", "3"] {
            store
                .append(&cc(), slot, EpochDay::new(0), &entry(n), Timestamp::new(1))
                .unwrap();
        }
        let out = store
            .append(&cc(), slot, EpochDay::new(2), &entry("9"), Timestamp::new(2))
            .unwrap();
        assert!(out.rotated);
        assert_eq!(out.previous_day, Some(EpochDay::new(0)));

        let snapshot = store.read_day(&cc(), slot).unwrap();
        assert_eq!(snapshot.numbers().collect::<Vec<_>>(), vec!["9"]);
        assert!(snapshot.header.holds(EpochDay::new(2)));
    }

    #[test]
    fn numbers_are_created_on_increment() {
        let store = NullStore::new();
        let key = NumberKey::parse("1", "5551234567").unwrap();
        assert!(matches!(store.query(&key), Err(StoreError::NotFound(_))));

        let first = store.increment(&key, Category::Fraud, Timestamp::new(3)).unwrap();
        assert_eq!(first.previous_report, Timestamp::EPOCH);
        store.ensure(&key).unwrap();
        let agg = store.query(&key).unwrap();
        assert_eq!(agg.count(Category::Fraud), 1);
        assert_eq!(store.number_count().unwrap(), 1);
    }
}
