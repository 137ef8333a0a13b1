//! Verify command - check a snapshot file for completeness.

use crate::verify::{verify_snapshot, VerifyStatus};
use anyhow::{bail, Result};
use std::path::PathBuf;

pub fn run(file: PathBuf, strict: bool, json: bool) -> Result<()> {
    if !file.exists() {
        bail!("snapshot file does not exist: {}", file.display());
    }

    let report = verify_snapshot(&file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        eprintln!("Snapshot: {}", file.display());
        if let Some(version) = report.format_version {
            eprintln!("  Format version: {}", version);
        }
        eprintln!("  Size:           {} bytes", report.bytes);
        if let Some(ref expected) = report.expected_checksum {
            eprintln!("  Checksum:       {}", expected);
        }
        if report.status == VerifyStatus::ChecksumMismatch {
            if let Some(ref actual) = report.actual_checksum {
                eprintln!("  Computed:       {}", actual);
            }
        }
        eprintln!("  Status:         {}", report.status);
    }

    match report.status {
        VerifyStatus::Complete => Ok(()),
        VerifyStatus::Unverified if !strict => Ok(()),
        status => bail!("snapshot verification failed: {}", status),
    }
}
