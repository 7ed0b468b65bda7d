//! The report protocol.
//!
//! A report resolves today's slot in the circular day window, appends the
//! number to that slot's daily log and bumps the number's aggregate. The two
//! writes land on independent records; each is atomic on its own, the pair
//! is not. Queries read the aggregate directly; downloads walk the window.

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::{LedgerConfig, ProvisionSummary, ReportReceipt, ReputationLedger};
