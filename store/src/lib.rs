//! Record layouts and abstract storage traits for spamdb.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! The rotation and capacity rules of a daily log live on the record types
//! themselves ([`DayLogHeader::admit`]), so every backend applies them the
//! same way inside its own atomic unit (a write transaction or a record lock).

pub mod day_log;
pub mod entry;
pub mod error;
pub mod number;

pub use day_log::{
    AppendOutcome, DayLogHeader, DayLogSnapshot, DayLogStore, DaySlot, LogHandle, SlotAdmission,
};
pub use entry::{NumberEntry, ENTRY_WIDTH};
pub use error::StoreError;
pub use number::{IncrementOutcome, NumberAggregate, NumberStore};
