//! LMDB implementation of DayLogStore.
//!
//! A provisioned slot is two records: the slot binding in `day_slots_db` and
//! the log header in `day_logs_db`. Entries live in `day_entries_db` under
//! `(handle, index)` keys and are only written, never deleted; a rotation
//! resets the header count and later appends overwrite the stale positions.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn};

use spamdb_crypto::day_address;
use spamdb_store::{
    AppendOutcome, DayLogHeader, DayLogSnapshot, DayLogStore, DaySlot, LogHandle, NumberEntry,
    StoreError,
};
use spamdb_types::{CountryCode, DayIndex, EpochDay, Timestamp};

use crate::meta::next_log_handle;
use crate::LmdbError;

pub struct LmdbDayLogStore {
    pub(crate) env: Arc<Env>,
    pub(crate) day_slots_db: Database<Bytes, Bytes>,
    pub(crate) day_logs_db: Database<Bytes, Bytes>,
    pub(crate) day_entries_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

pub(crate) fn entry_key(handle: LogHandle, index: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&handle.to_be_bytes());
    key[8..].copy_from_slice(&index.to_be_bytes());
    key
}

impl LmdbDayLogStore {
    fn slot_in(
        &self,
        txn: &RoTxn<'_>,
        country: &CountryCode,
        day: DayIndex,
    ) -> Result<DaySlot, StoreError> {
        let address = day_address(country, day);
        let val = self
            .day_slots_db
            .get(txn, address.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotProvisioned {
                country: country.clone(),
                slot: day,
            })?;
        let arr: [u8; 8] = val.try_into().map_err(|_| {
            StoreError::Corruption(format!("slot binding for {} has bad length", address))
        })?;
        Ok(DaySlot {
            address,
            day_index: day,
            bound_log: LogHandle::new(u64::from_be_bytes(arr)),
        })
    }

    fn header_in(&self, txn: &RoTxn<'_>, slot: &DaySlot) -> Result<DayLogHeader, StoreError> {
        let bytes = self
            .day_logs_db
            .get(txn, &slot.bound_log.to_be_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| {
                StoreError::Corruption(format!(
                    "{} is bound to missing log {}",
                    slot.day_index,
                    slot.bound_log.get()
                ))
            })?;
        DayLogHeader::from_bytes(bytes)
    }
}

impl DayLogStore for LmdbDayLogStore {
    fn provision(
        &self,
        country: &CountryCode,
        day: DayIndex,
        capacity: u64,
    ) -> Result<DaySlot, StoreError> {
        let address = day_address(country, day);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;

        let bound = self
            .day_slots_db
            .get(&wtxn, address.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        if bound {
            return Err(StoreError::AlreadyProvisioned {
                country: country.clone(),
                slot: day,
            });
        }

        let handle = next_log_handle(&self.meta_db, &mut wtxn)?;
        self.day_logs_db
            .put(
                &mut wtxn,
                &handle.to_be_bytes(),
                &DayLogHeader::new(capacity).to_bytes(),
            )
            .map_err(LmdbError::from)?;
        self.day_slots_db
            .put(&mut wtxn, address.as_bytes(), &handle.to_be_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        tracing::debug!(%country, slot = day.get(), handle = handle.get(), capacity, "provisioned day slot");
        Ok(DaySlot {
            address,
            day_index: day,
            bound_log: handle,
        })
    }

    fn day_slot(&self, country: &CountryCode, day: DayIndex) -> Result<DaySlot, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        self.slot_in(&rtxn, country, day)
    }

    fn append(
        &self,
        country: &CountryCode,
        day: DayIndex,
        owner_day: EpochDay,
        entry: &NumberEntry,
        now: Timestamp,
    ) -> Result<AppendOutcome, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let slot = self.slot_in(&wtxn, country, day)?;
        let mut header = self.header_in(&wtxn, &slot)?;

        // An error here drops the transaction, leaving the log untouched.
        let admission = header.admit(day, owner_day, now)?;

        self.day_entries_db
            .put(
                &mut wtxn,
                &entry_key(slot.bound_log, admission.index),
                entry.as_bytes(),
            )
            .map_err(LmdbError::from)?;
        self.day_logs_db
            .put(&mut wtxn, &slot.bound_log.to_be_bytes(), &header.to_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;

        if admission.rotated {
            tracing::info!(
                %country,
                slot = day.get(),
                previous_day = ?admission.previous_day,
                owner_day = owner_day.get(),
                "rotated daily log"
            );
        }

        Ok(AppendOutcome {
            slot,
            index: admission.index,
            count: header.count,
            rotated: admission.rotated,
            previous_day: admission.previous_day,
        })
    }

    fn read_day(
        &self,
        country: &CountryCode,
        day: DayIndex,
    ) -> Result<DayLogSnapshot, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let slot = self.slot_in(&rtxn, country, day)?;
        let header = self.header_in(&rtxn, &slot)?;

        let mut entries = Vec::with_capacity(header.count as usize);
        for index in 0..header.count {
            let bytes = self
                .day_entries_db
                .get(&rtxn, &entry_key(slot.bound_log, index))
                .map_err(LmdbError::from)?
                .ok_or_else(|| {
                    StoreError::Corruption(format!(
                        "log {} is missing entry {} of {}",
                        slot.bound_log.get(),
                        index,
                        header.count
                    ))
                })?;
            entries.push(NumberEntry::from_bytes(bytes)?);
        }

        Ok(DayLogSnapshot {
            slot,
            header,
            entries,
        })
    }

    fn header(&self, country: &CountryCode, day: DayIndex) -> Result<DayLogHeader, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let slot = self.slot_in(&rtxn, country, day)?;
        self.header_in(&rtxn, &slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;
    use spamdb_types::PhoneNumber;

    fn open_test_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 16 << 20).unwrap();
        (dir, env)
    }

    fn cc() -> CountryCode {
        CountryCode::new("1").unwrap()
    }

    fn slot(i: u64) -> DayIndex {
        DayIndex::new(i, 60).unwrap()
    }

    fn entry(n: &str) -> NumberEntry {
        NumberEntry::from_number(&PhoneNumber::new(n).unwrap())
    }

    #[test]
    fn provision_binds_empty_log() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();

        assert!(!store.is_provisioned(&cc(), slot(0)).unwrap());
        let bound = store.provision(&cc(), slot(0), 100).unwrap();
        assert_eq!(store.day_slot(&cc(), slot(0)).unwrap(), bound);

        let header = store.header(&cc(), slot(0)).unwrap();
        assert_eq!(header, DayLogHeader::new(100));
    }

    #[test]
    fn second_provision_is_rejected_and_harmless() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        let day = EpochDay::new(19_000);

        store.provision(&cc(), slot(4), 10).unwrap();
        store
            .append(&cc(), slot(4), day, &entry("555"), Timestamp::new(77))
            .unwrap();
        let before = store.header(&cc(), slot(4)).unwrap();

        let err = store.provision(&cc(), slot(4), 10).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyProvisioned { .. }));
        assert_eq!(store.header(&cc(), slot(4)).unwrap(), before);
        assert_eq!(env.meta_store().allocated_logs().unwrap(), 1);
    }

    #[test]
    fn append_to_unprovisioned_slot_fails() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        let err = store
            .append(&cc(), slot(9), EpochDay::new(1), &entry("1"), Timestamp::new(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotProvisioned { .. }));
    }

    #[test]
    fn append_until_full() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        let day = EpochDay::new(500);
        store.provision(&cc(), slot(20), 3).unwrap();

        for (i, n) in ["100", "200", "300"].iter().enumerate() {
            let out = store
                .append(&cc(), slot(20), day, &entry(n), Timestamp::new(10))
                .unwrap();
            assert_eq!(out.index, i as u64);
            assert_eq!(out.count, i as u64 + 1);
        }

        let err = store
            .append(&cc(), slot(20), day, &entry("400"), Timestamp::new(11))
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded { capacity: 3, .. }));

        let snapshot = store.read_day(&cc(), slot(20)).unwrap();
        assert_eq!(snapshot.header.count, 3);
        assert_eq!(snapshot.header.last_update, Timestamp::new(10));
        let numbers: Vec<String> = snapshot.numbers().collect();
        assert_eq!(numbers, vec!["100", "200", "300"]);
    }

    #[test]
    fn rotation_hides_previous_cycle() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        store.provision(&cc(), slot(5), 10).unwrap();

        let old_day = EpochDay::new(65);
        let new_day = EpochDay::new(125);
        for n in ["111", "222"] {
            store
                .append(&cc(), slot(5), old_day, &entry(n), Timestamp::new(1))
                .unwrap();
        }

        let out = store
            .append(&cc(), slot(5), new_day, &entry("333"), Timestamp::new(2))
            .unwrap();
        assert!(out.rotated);
        assert_eq!(out.previous_day, Some(old_day));
        assert_eq!(out.count, 1);

        let current = store.read_window(&cc(), &[(slot(5), new_day)]).unwrap();
        assert_eq!(current.into_iter().collect::<Vec<_>>(), vec!["333"]);
        assert!(store
            .read_window(&cc(), &[(slot(5), old_day)])
            .unwrap()
            .is_empty());
    }

    #[test]
    fn lagging_writer_gets_stale_slot() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        store.provision(&cc(), slot(5), 10).unwrap();
        store
            .append(&cc(), slot(5), EpochDay::new(125), &entry("1"), Timestamp::new(1))
            .unwrap();

        let err = store
            .append(&cc(), slot(5), EpochDay::new(65), &entry("2"), Timestamp::new(2))
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleSlotMismatch { .. }));
        assert_eq!(store.header(&cc(), slot(5)).unwrap().count, 1);
    }

    #[test]
    fn concurrent_appends_claim_distinct_entries() {
        let (_dir, env) = open_test_env();
        let store = env.day_log_store();
        let day = EpochDay::new(42);
        store.provision(&cc(), slot(42), 1_000).unwrap();

        std::thread::scope(|s| {
            for t in 0..8u64 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..25u64 {
                        let n = format!("{}{:04}", t + 1, i);
                        store
                            .append(&cc(), slot(42), day, &entry(&n), Timestamp::new(1))
                            .unwrap();
                    }
                });
            }
        });

        let snapshot = store.read_day(&cc(), slot(42)).unwrap();
        assert_eq!(snapshot.header.count, 200);
        let distinct: std::collections::BTreeSet<String> = snapshot.numbers().collect();
        assert_eq!(distinct.len(), 200);
    }

    #[test]
    fn logs_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), 8, 16 << 20).unwrap();
            let store = env.day_log_store();
            store.provision(&cc(), slot(1), 10).unwrap();
            store
                .append(&cc(), slot(1), EpochDay::new(61), &entry("5551234567"), Timestamp::new(9))
                .unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), 8, 16 << 20).unwrap();
        let numbers = env
            .day_log_store()
            .read_window(&cc(), &[(slot(1), EpochDay::new(61))])
            .unwrap();
        assert!(numbers.contains("5551234567"));
    }
}
