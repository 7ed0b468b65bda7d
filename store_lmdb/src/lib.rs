//! LMDB storage backend for spamdb.
//!
//! Implements the storage traits from `spamdb-store` using the `heed` LMDB
//! bindings. Every logical store maps to one or more LMDB databases within a
//! single environment. LMDB serializes write transactions, which gives each
//! append and each increment its per-record atomicity; readers use MVCC read
//! transactions and never block writers.

pub mod day_log;
pub mod environment;
pub mod error;
pub mod integrity;
pub mod meta;
pub mod migration;
pub mod number;
pub mod store;

pub use day_log::LmdbDayLogStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use number::LmdbNumberStore;
pub use store::LmdbStore;
