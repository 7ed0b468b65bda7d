//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the store accepts
//! reports: every slot binding must resolve to a log whose header decodes
//! and whose entries `[0, count)` are present.

use std::path::Path;

use spamdb_store::{DayLogHeader, LogHandle, NumberAggregate};

use crate::day_log::entry_key;
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub slots_checked: u64,
    pub entries_checked: u64,
    pub numbers_checked: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walk every slot binding and number record.
///
/// Decoding failures are recorded in the report rather than returned.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env().read_txn()?;

    for item in env.day_slots_db.iter(&rtxn)? {
        let (address, handle) = item?;
        report.slots_checked += 1;

        let Ok(raw) = <[u8; 8]>::try_from(handle) else {
            report
                .errors
                .push(format!("slot {} has a malformed log handle", hex_prefix(address)));
            continue;
        };
        let handle = LogHandle::new(u64::from_be_bytes(raw));
        let Some(header_bytes) = env.day_logs_db.get(&rtxn, &raw)? else {
            report.errors.push(format!(
                "slot {} is bound to missing log {}",
                hex_prefix(address),
                handle.get()
            ));
            continue;
        };
        let header = match DayLogHeader::from_bytes(header_bytes) {
            Ok(header) => header,
            Err(e) => {
                report.errors.push(e.to_string());
                continue;
            }
        };

        for index in 0..header.count {
            if env
                .day_entries_db
                .get(&rtxn, &entry_key(handle, index))?
                .is_none()
            {
                report
                    .errors
                    .push(format!("log {} is missing entry {}", handle.get(), index));
            } else {
                report.entries_checked += 1;
            }
        }
    }

    for item in env.numbers_db.iter(&rtxn)? {
        let (address, bytes) = item?;
        report.numbers_checked += 1;
        if let Err(e) = NumberAggregate::from_bytes(bytes) {
            report
                .errors
                .push(format!("number {}: {}", hex_prefix(address), e));
        }
    }

    Ok(report)
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing, which suggests
/// corruption or misconfiguration.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}

fn hex_prefix(bytes: &[u8]) -> String {
    bytes.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}
