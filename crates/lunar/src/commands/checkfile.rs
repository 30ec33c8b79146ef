//! Checkfile command

use anyhow::{bail, Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use lunar_bootstrap::integrity::{self, IntegrityStatus};
use lunar_core::Version;
use tracing::debug;

use crate::cli::{CheckfileArgs, CheckfileCommands};
use crate::output;

pub fn run(cmd: CheckfileCommands) -> Result<()> {
    match cmd {
        CheckfileCommands::Write(args) => write(args),
        CheckfileCommands::Verify(args) => verify(args),
    }
}

fn parse_version(text: &str) -> Result<Version> {
    text.parse::<Version>()
        .with_context(|| format!("'{}' is not a framework version", text))
}

fn write(args: CheckfileArgs) -> Result<()> {
    let version = parse_version(&args.framework_version)?;
    for (payload, check_file) in write_all(&version, &args.files)? {
        output::success(&format!("{} -> {}", payload, check_file));
    }
    Ok(())
}

fn verify(args: CheckfileArgs) -> Result<()> {
    let version = parse_version(&args.framework_version)?;
    let results = verify_all(&version, &args.files);

    let mut failed = 0;
    for (payload, status) in &results {
        match status {
            IntegrityStatus::Valid => output::success(&format!("{}: valid", payload)),
            IntegrityStatus::CheckFileMissing => {
                failed += 1;
                output::error(&format!("{}: check file missing", payload));
            }
            IntegrityStatus::Mismatch => {
                failed += 1;
                output::error(&format!("{}: damaged or keyed to another version", payload));
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed verification", failed, results.len());
    }
    Ok(())
}

/// Write a check file for each payload, returning `(payload, check file)` pairs
pub fn write_all(version: &Version, files: &[Utf8PathBuf]) -> Result<Vec<(Utf8PathBuf, Utf8PathBuf)>> {
    files
        .iter()
        .map(|payload| {
            let check_file = integrity::write_check_file(version, payload.as_std_path())
                .with_context(|| format!("Failed to write check file for {}", payload))?;
            let check_file = Utf8PathBuf::from_path_buf(check_file)
                .map_err(|p| anyhow::anyhow!("non UTF-8 path {:?}", p))?;
            debug!("Wrote {}", check_file);
            Ok((payload.clone(), check_file))
        })
        .collect()
}

pub fn verify_all(version: &Version, files: &[Utf8PathBuf]) -> Vec<(Utf8PathBuf, IntegrityStatus)> {
    files
        .iter()
        .map(|payload| (payload.clone(), verify_one(version, payload)))
        .collect()
}

fn verify_one(version: &Version, payload: &Utf8Path) -> IntegrityStatus {
    integrity::check(version, payload.as_std_path())
}
