//! LMDB environment setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::migration::Migrator;
use crate::{LmdbDayLogStore, LmdbError, LmdbMetaStore, LmdbNumberStore, LmdbStore};

/// Names of every database in a spamdb environment.
pub(crate) const DATABASE_NAMES: &[&str] = &[
    DAY_SLOTS_DB,
    DAY_LOGS_DB,
    DAY_ENTRIES_DB,
    NUMBERS_DB,
    META_DB,
];

const DAY_SLOTS_DB: &str = "day_slots";
const DAY_LOGS_DB: &str = "day_logs";
const DAY_ENTRIES_DB: &str = "day_entries";
const NUMBERS_DB: &str = "numbers";
const META_DB: &str = "meta";

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    path: PathBuf,
    /// `day_address` → log handle (u64 BE).
    pub(crate) day_slots_db: Database<Bytes, Bytes>,
    /// Log handle → [`spamdb_store::DayLogHeader`] bytes.
    pub(crate) day_logs_db: Database<Bytes, Bytes>,
    /// `(log handle BE, entry index BE)` → fixed-width entry.
    pub(crate) day_entries_db: Database<Bytes, Bytes>,
    /// `number_address` → [`spamdb_store::NumberAggregate`] bytes.
    pub(crate) numbers_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Smallest `max_dbs` that fits every spamdb database.
    pub const MIN_DBS: u32 = DATABASE_NAMES.len() as u32;

    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, creates any missing databases and
    /// brings the schema up to date.
    pub fn open(path: &Path, max_dbs: u32, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the data directory is owned by this process and is not
        // mapped by any other environment handle while this one is alive.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(max_dbs.max(Self::MIN_DBS))
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let day_slots_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(DAY_SLOTS_DB))?;
        let day_logs_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(DAY_LOGS_DB))?;
        let day_entries_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(DAY_ENTRIES_DB))?;
        let numbers_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(NUMBERS_DB))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        let environment = Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
            day_slots_db,
            day_logs_db,
            day_entries_db,
            numbers_db,
            meta_db,
        };

        Migrator::run(&environment.meta_store())?;
        tracing::info!(path = %path.display(), map_size, "opened LMDB environment");
        Ok(environment)
    }

    pub fn env(&self) -> &Arc<Env> {
        &self.env
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn day_log_store(&self) -> LmdbDayLogStore {
        LmdbDayLogStore {
            env: Arc::clone(&self.env),
            day_slots_db: self.day_slots_db,
            day_logs_db: self.day_logs_db,
            day_entries_db: self.day_entries_db,
            meta_db: self.meta_db,
        }
    }

    pub fn number_store(&self) -> LmdbNumberStore {
        LmdbNumberStore {
            env: Arc::clone(&self.env),
            numbers_db: self.numbers_db,
        }
    }

    /// Day logs and number aggregates over this environment.
    pub fn store(&self) -> LmdbStore {
        LmdbStore {
            days: self.day_log_store(),
            numbers: self.number_store(),
        }
    }

    pub fn meta_store(&self) -> LmdbMetaStore {
        LmdbMetaStore {
            env: Arc::clone(&self.env),
            meta_db: self.meta_db,
        }
    }
}
