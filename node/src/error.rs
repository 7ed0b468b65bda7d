use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("ledger error: {0}")]
    Ledger(#[from] spamdb_ledger::LedgerError),

    #[error("store error: {0}")]
    Store(#[from] spamdb_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] spamdb_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// The report was refused because today's log is full.
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_capacity_exceeded())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_not_found())
    }
}
