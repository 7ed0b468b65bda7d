//! Nullable infrastructure for deterministic testing.
//!
//! The ledger reaches time and storage only through traits (`Clock`,
//! `DayLogStore`, `NumberStore`). This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullStore;
