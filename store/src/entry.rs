//! Fixed-width daily log entries.

use spamdb_types::PhoneNumber;

use crate::StoreError;

/// Bytes per entry. Equal to the longest accepted number.
pub const ENTRY_WIDTH: usize = PhoneNumber::MAX_LEN;

/// One slot of a daily log: the number's digits, left-packed, zero-padded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NumberEntry([u8; ENTRY_WIDTH]);

impl NumberEntry {
    pub const EMPTY: Self = Self([0u8; ENTRY_WIDTH]);

    pub fn from_number(number: &PhoneNumber) -> Self {
        let mut bytes = [0u8; ENTRY_WIDTH];
        let digits = number.as_bytes();
        bytes[..digits.len()].copy_from_slice(digits);
        Self(bytes)
    }

    /// Load an entry from its persisted bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        let arr: [u8; ENTRY_WIDTH] = bytes.try_into().map_err(|_| {
            StoreError::Corruption(format!(
                "log entry is {} bytes, expected {}",
                bytes.len(),
                ENTRY_WIDTH
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; ENTRY_WIDTH] {
        &self.0
    }

    /// The stored number with padding stripped.
    ///
    /// Returns `None` for an all-zero (unused) entry or bytes that are not UTF-8.
    pub fn decode(&self) -> Option<String> {
        let end = self.0.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        if end == 0 {
            return None;
        }
        std::str::from_utf8(&self.0[..end]).ok().map(str::to_owned)
    }
}
