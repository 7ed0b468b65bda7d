//! LMDB implementation of NumberStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use spamdb_crypto::number_address;
use spamdb_store::{IncrementOutcome, NumberAggregate, NumberStore, StoreError};
use spamdb_types::{Category, NumberKey, StoreAddress, Timestamp};

use crate::LmdbError;

pub struct LmdbNumberStore {
    pub(crate) env: Arc<Env>,
    pub(crate) numbers_db: Database<Bytes, Bytes>,
}

impl NumberStore for LmdbNumberStore {
    fn ensure(&self, key: &NumberKey) -> Result<StoreAddress, StoreError> {
        let address = number_address(key);
        {
            let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
            let present = self
                .numbers_db
                .get(&rtxn, address.as_bytes())
                .map_err(LmdbError::from)?
                .is_some();
            if present {
                return Ok(address);
            }
        }

        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let present = self
            .numbers_db
            .get(&wtxn, address.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        if !present {
            self.numbers_db
                .put(
                    &mut wtxn,
                    address.as_bytes(),
                    &NumberAggregate::default().to_bytes(),
                )
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
            tracing::trace!(%key, %address, "created number aggregate");
        }
        Ok(address)
    }

    fn increment(
        &self,
        key: &NumberKey,
        category: Category,
        now: Timestamp,
    ) -> Result<IncrementOutcome, StoreError> {
        let address = number_address(key);
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut aggregate = match self
            .numbers_db
            .get(&wtxn, address.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => NumberAggregate::from_bytes(bytes)?,
            None => NumberAggregate::default(),
        };
        let previous_report = aggregate.last_reported;
        aggregate.record(category, now);
        self.numbers_db
            .put(&mut wtxn, address.as_bytes(), &aggregate.to_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(IncrementOutcome {
            aggregate,
            previous_report,
        })
    }

    fn query(&self, key: &NumberKey) -> Result<NumberAggregate, StoreError> {
        let address = number_address(key);
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .numbers_db
            .get(&rtxn, address.as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("number {}", key)))?;
        NumberAggregate::from_bytes(bytes)
    }

    fn number_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let count = self.numbers_db.len(&rtxn).map_err(LmdbError::from)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    fn open_test_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        (dir, env)
    }

    fn key(n: &str) -> NumberKey {
        NumberKey::parse("1", n).unwrap()
    }

    #[test]
    fn query_unknown_is_not_found() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        assert!(matches!(
            store.query(&key("5551234567")),
            Err(StoreError::NotFound(_))
        ));
        assert!(!store.exists(&key("5551234567")).unwrap());
    }

    #[test]
    fn ensure_creates_zeroed_record_once() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();

        let a = store.ensure(&key("5551234567")).unwrap();
        let b = store.ensure(&key("5551234567")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, number_address(&key("5551234567")));
        assert_eq!(store.query(&key("5551234567")).unwrap(), NumberAggregate::default());
        assert_eq!(store.number_count().unwrap(), 1);
    }

    #[test]
    fn ensure_does_not_reset_counters() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        store
            .increment(&key("42"), Category::Fraud, Timestamp::new(10))
            .unwrap();
        store.ensure(&key("42")).unwrap();
        assert_eq!(store.query(&key("42")).unwrap().count(Category::Fraud), 1);
    }

    #[test]
    fn increment_without_ensure_creates_record() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        let outcome = store
            .increment(&key("5551234567"), Category::Fraud, Timestamp::new(1_700_000_000))
            .unwrap();
        assert_eq!(outcome.aggregate.count(Category::Fraud), 1);
        assert_eq!(outcome.previous_report, Timestamp::EPOCH);
        assert_eq!(store.query(&key("5551234567")).unwrap(), outcome.aggregate);
    }

    #[test]
    fn increment_returns_previous_report_time() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        store
            .increment(&key("42"), Category::Fraud, Timestamp::new(100))
            .unwrap();
        let second = store
            .increment(&key("42"), Category::Survey, Timestamp::new(250))
            .unwrap();
        assert_eq!(second.previous_report, Timestamp::new(100));
        assert_eq!(second.aggregate.last_reported, Timestamp::new(250));
    }

    #[test]
    fn concurrent_first_reports_see_one_empty_record() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        let barrier = std::sync::Barrier::new(8);

        let firsts: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let (store, barrier) = (&store, &barrier);
                    s.spawn(move || {
                        barrier.wait();
                        store
                            .increment(&key("777"), Category::Fraud, Timestamp::new(500))
                            .unwrap()
                            .is_first_since(Timestamp::new(400))
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|first| *first)
                .count()
        });
        assert_eq!(firsts, 1);
        assert_eq!(store.query(&key("777")).unwrap().count(Category::Fraud), 8);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let (_dir, env) = open_test_env();
        let store = env.number_store();
        store.ensure(&key("999")).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                let store = &store;
                s.spawn(move || {
                    for i in 0..50u64 {
                        store
                            .increment(&key("999"), Category::Marketing, Timestamp::new(i))
                            .unwrap();
                    }
                });
            }
        });

        let agg = store.query(&key("999")).unwrap();
        assert_eq!(agg.count(Category::Marketing), 200);
        assert_eq!(agg.last_reported, Timestamp::new(49));
    }
}
