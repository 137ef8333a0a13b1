//! Completeness and checksum verification of snapshot files.

use crate::compression::Compression;
use crate::dialect::SqlDialect;
use crate::snapshot::{CHECKSUM_PREFIX, HEADER_MARKER};
use anyhow::Context;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Outcome of verifying a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    /// Checksum footer present and matching
    Complete,
    /// Checksum footer present but content differs
    ChecksumMismatch,
    /// Integrity re-enable statement present, no checksum footer
    Unverified,
    /// Neither footer nor integrity re-enable statement: the write stopped early
    Truncated,
}

impl std::fmt::Display for VerifyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerifyStatus::Complete => write!(f, "complete"),
            VerifyStatus::ChecksumMismatch => write!(f, "checksum mismatch"),
            VerifyStatus::Unverified => write!(f, "unverified (no checksum)"),
            VerifyStatus::Truncated => write!(f, "truncated"),
        }
    }
}

/// Verification report
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub status: VerifyStatus,
    /// Format version from the header marker, if present
    pub format_version: Option<u32>,
    /// Checksum recorded in the footer
    pub expected_checksum: Option<String>,
    /// Checksum computed over the content before the footer
    pub actual_checksum: Option<String>,
    /// Size of the uncompressed snapshot text
    pub bytes: u64,
}

impl VerifyReport {
    pub fn is_complete(&self) -> bool {
        self.status == VerifyStatus::Complete
    }
}

/// Verify a snapshot file, decompressing by extension
pub fn verify_snapshot(path: &Path) -> anyhow::Result<VerifyReport> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open snapshot: {}", path.display()))?;
    let mut reader = Compression::from_path(path).wrap_reader(Box::new(file))?;
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
    Ok(verify_text(&text))
}

/// Verify snapshot text
pub fn verify_text(text: &str) -> VerifyReport {
    let format_version = text
        .lines()
        .next()
        .and_then(|l| l.strip_prefix(HEADER_MARKER))
        .and_then(|v| v.trim().parse().ok());

    let trimmed = text.trim_end_matches('\n');
    let last_start = trimmed.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let last_line = &trimmed[last_start..];

    let mut report = VerifyReport {
        status: VerifyStatus::Truncated,
        format_version,
        expected_checksum: None,
        actual_checksum: None,
        bytes: text.len() as u64,
    };

    match last_line.strip_prefix(CHECKSUM_PREFIX) {
        Some(expected) => {
            let actual = hex::encode(Sha256::digest(&text.as_bytes()[..last_start]));
            let expected = expected.trim().to_lowercase();
            report.status = if expected == actual {
                VerifyStatus::Complete
            } else {
                VerifyStatus::ChecksumMismatch
            };
            report.expected_checksum = Some(expected);
            report.actual_checksum = Some(actual);
        }
        None if is_integrity_restore(last_line) => {
            report.status = VerifyStatus::Unverified;
        }
        None => {}
    }

    report
}

fn is_integrity_restore(line: &str) -> bool {
    [SqlDialect::MySql, SqlDialect::Postgres, SqlDialect::Sqlite]
        .iter()
        .any(|d| d.enable_integrity() == line.trim())
}
