use spamdb_types::{CountryCode, DayIndex, EpochDay};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("{slot} of country {country} is already provisioned")]
    AlreadyProvisioned { country: CountryCode, slot: DayIndex },

    #[error("{slot} of country {country} has not been provisioned")]
    NotProvisioned { country: CountryCode, slot: DayIndex },

    #[error("daily log for {slot} is full ({capacity} entries)")]
    CapacityExceeded { slot: DayIndex, capacity: u64 },

    #[error("{slot} is bound to {bound_day}, writer is on older {requested_day}")]
    StaleSlotMismatch {
        slot: DayIndex,
        bound_day: EpochDay,
        requested_day: EpochDay,
    },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}
