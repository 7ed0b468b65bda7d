//! Storage address derivation.
//!
//! Two address families share one hash, separated by a family tag:
//!
//! ```text
//! number: Blake2b-256("spam_db" || "number" || len(cc) || cc || number)
//! day:    Blake2b-256("spam_db" || "day"    || len(cc) || cc || day_index as u64 LE)
//! ```
//!
//! The country code is length-prefixed so that `("1", "23")` and `("12", "3")`
//! never hash the same bytes. Inputs are validated types, so derivation is
//! infallible.

use spamdb_types::{CountryCode, DayIndex, NumberKey, StoreAddress};

use crate::hash_address;

/// Domain tag prefixed to every derivation.
pub const DOMAIN_TAG: &[u8] = b"spam_db";

const NUMBER_FAMILY: &[u8] = b"number";
const DAY_FAMILY: &[u8] = b"day";

/// Address of the aggregate record for a number.
pub fn number_address(key: &NumberKey) -> StoreAddress {
    let cc_len = [key.country.as_bytes().len() as u8];
    hash_address(&[
        DOMAIN_TAG,
        NUMBER_FAMILY,
        &cc_len,
        key.country.as_bytes(),
        key.number.as_bytes(),
    ])
}

/// Address of the day slot `day` for a country.
pub fn day_address(country: &CountryCode, day: DayIndex) -> StoreAddress {
    let cc_len = [country.as_bytes().len() as u8];
    hash_address(&[
        DOMAIN_TAG,
        DAY_FAMILY,
        &cc_len,
        country.as_bytes(),
        &day.to_le_bytes(),
    ])
}
