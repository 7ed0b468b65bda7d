//! Number keys: a country code plus a domestic number.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::KeyError;

/// A country calling code such as `"1"` or `"44"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CountryCode(String);

impl CountryCode {
    /// Longest accepted country code.
    pub const MAX_LEN: usize = 4;

    /// Validate and wrap a country code.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        let s = raw.into();
        if is_digits(&s, Self::MAX_LEN) {
            Ok(Self(s))
        } else {
            Err(KeyError::InvalidCountryCode(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{}", self.0)
    }
}

/// A domestic phone number, stored as its ASCII digit string.
///
/// The length limit equals the width of one daily log entry, so every valid
/// number fits in an entry without truncation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Longest accepted number, in digits.
    pub const MAX_LEN: usize = 20;

    /// Validate and wrap a phone number.
    pub fn new(raw: impl Into<String>) -> Result<Self, KeyError> {
        let s = raw.into();
        if is_digits(&s, Self::MAX_LEN) {
            Ok(Self(s))
        } else {
            Err(KeyError::InvalidNumber(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a reported entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumberKey {
    pub country: CountryCode,
    pub number: PhoneNumber,
}

impl NumberKey {
    pub fn new(country: CountryCode, number: PhoneNumber) -> Self {
        Self { country, number }
    }

    /// Validate both parts from raw strings.
    pub fn parse(country: &str, number: &str) -> Result<Self, KeyError> {
        Ok(Self {
            country: CountryCode::new(country)?,
            number: PhoneNumber::new(number)?,
        })
    }
}

impl fmt::Display for NumberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.country, self.number)
    }
}

fn is_digits(s: &str, max_len: usize) -> bool {
    !s.is_empty() && s.len() <= max_len && s.bytes().all(|b| b.is_ascii_digit())
}
