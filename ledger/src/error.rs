use spamdb_store::StoreError;
use spamdb_types::KeyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Today's log is full; the report was not recorded.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::Store(StoreError::CapacityExceeded { .. }))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotFound(_)))
    }

    pub fn is_already_provisioned(&self) -> bool {
        matches!(self, Self::Store(StoreError::AlreadyProvisioned { .. }))
    }

    pub fn is_not_provisioned(&self) -> bool {
        matches!(self, Self::Store(StoreError::NotProvisioned { .. }))
    }

    /// The writer's clock lags the day that already owns the slot.
    pub fn is_stale_slot(&self) -> bool {
        matches!(self, Self::Store(StoreError::StaleSlotMismatch { .. }))
    }

    /// Bad caller input, as opposed to a storage condition.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidKey(_))
    }
}
