//! Cryptographic primitives for spamdb.
//!
//! - **Blake2b-256** for hashing
//! - Domain-separated address derivation for number aggregates and day slots

pub mod address;
pub mod hash;

pub use address::{day_address, number_address, DOMAIN_TAG};
pub use hash::{blake2b_256, blake2b_256_multi, hash_address};
