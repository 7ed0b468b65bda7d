//! Database metadata: schema version and the log handle sequence.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, RoTxn, RwTxn};

use spamdb_store::{LogHandle, StoreError};

use crate::LmdbError;

const SCHEMA_VERSION_KEY: &[u8] = b"schema_version";
const NEXT_LOG_HANDLE_KEY: &[u8] = b"next_log_handle";

pub struct LmdbMetaStore {
    pub(crate) env: Arc<Env>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbMetaStore {
    /// Stored schema version, 0 for a fresh database.
    pub fn schema_version(&self) -> Result<u32, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, SCHEMA_VERSION_KEY)
            .map_err(LmdbError::from)?;
        match val {
            Some(bytes) => {
                let arr: [u8; 4] = bytes.try_into().map_err(|_| {
                    LmdbError::Serialization("schema_version has unexpected byte length".into())
                })?;
                Ok(u32::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }

    pub fn set_schema_version(&self, version: u32) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.meta_db
            .put(&mut wtxn, SCHEMA_VERSION_KEY, &version.to_le_bytes())
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    /// How many daily logs have ever been allocated.
    pub fn allocated_logs(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        read_u64(&self.meta_db, &rtxn, NEXT_LOG_HANDLE_KEY)
    }
}

/// Allocate the next log handle inside an open write transaction.
pub(crate) fn next_log_handle(
    meta_db: &Database<Bytes, Bytes>,
    wtxn: &mut RwTxn<'_>,
) -> Result<LogHandle, StoreError> {
    let next = read_u64(meta_db, wtxn, NEXT_LOG_HANDLE_KEY)?;
    meta_db
        .put(wtxn, NEXT_LOG_HANDLE_KEY, &(next + 1).to_le_bytes())
        .map_err(LmdbError::from)?;
    Ok(LogHandle::new(next))
}

fn read_u64(db: &Database<Bytes, Bytes>, txn: &RoTxn<'_>, key: &[u8]) -> Result<u64, StoreError> {
    match db.get(txn, key).map_err(LmdbError::from)? {
        Some(bytes) => {
            let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                StoreError::Corruption(format!(
                    "meta key {:?} is {} bytes, expected 8",
                    String::from_utf8_lossy(key),
                    bytes.len()
                ))
            })?;
            Ok(u64::from_le_bytes(arr))
        }
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LmdbEnvironment;

    #[test]
    fn handles_are_sequential() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        let meta = env.meta_store();
        assert_eq!(meta.allocated_logs().unwrap(), 0);

        let mut wtxn = env.env().write_txn().unwrap();
        let a = next_log_handle(&env.meta_db, &mut wtxn).unwrap();
        let b = next_log_handle(&env.meta_db, &mut wtxn).unwrap();
        wtxn.commit().unwrap();

        assert_eq!(a, LogHandle::new(0));
        assert_eq!(b, LogHandle::new(1));
        assert_eq!(meta.allocated_logs().unwrap(), 2);
    }

    #[test]
    fn aborted_allocation_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let env = LmdbEnvironment::open(dir.path(), 8, 1 << 20).unwrap();
        {
            let mut wtxn = env.env().write_txn().unwrap();
            next_log_handle(&env.meta_db, &mut wtxn).unwrap();
        }
        assert_eq!(env.meta_store().allocated_logs().unwrap(), 0);
    }
}
