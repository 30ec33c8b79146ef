//! Check-file integrity verification
//!
//! Every shipped payload has a side-car check file (`Foo.dll` → `Foo.lfc`)
//! holding `md5(payload) XOR md5(version)`, where `version` is the ASCII
//! text of the providing package's declared version. A check file from a
//! different release is therefore rejected even when the bytes match.

use crate::layout::CHECK_FILE_EXTENSION;
use lunar_core::Version;
use md5::{Digest, Md5};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Length of a check-file digest in bytes
pub const DIGEST_LEN: usize = 16;

/// Result of checking one payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityStatus {
    Valid,
    /// No side-car check file next to the payload
    CheckFileMissing,
    /// Payload unreadable, or digest differs
    Mismatch,
}

/// Side-car path for a payload: the extension is replaced by `.lfc`
pub fn check_file_for(payload: &Path) -> PathBuf {
    payload.with_extension(CHECK_FILE_EXTENSION)
}

/// `md5(payload) XOR md5(version)`
pub fn checksum(payload: &[u8], version: &str) -> [u8; DIGEST_LEN] {
    let payload_hash = Md5::digest(payload);
    let version_hash = Md5::digest(version.as_bytes());

    let mut digest = [0u8; DIGEST_LEN];
    for (i, byte) in digest.iter_mut().enumerate() {
        *byte = payload_hash[i] ^ version_hash[i];
    }
    digest
}

/// Write the check file for `payload`, returning its path
pub fn write_check_file(version: &Version, payload: &Path) -> io::Result<PathBuf> {
    let bytes = fs::read(payload)?;
    let digest = checksum(&bytes, &version.to_string());
    let path = check_file_for(payload);
    fs::write(&path, digest)?;
    debug!("Wrote check file {:?}", path);
    Ok(path)
}

/// Recompute and compare; any I/O error or mismatch yields false
pub fn verify(version: &Version, payload: &Path) -> bool {
    let Ok(bytes) = fs::read(payload) else {
        return false;
    };
    let Ok(expected) = fs::read(check_file_for(payload)) else {
        return false;
    };
    expected.len() == DIGEST_LEN && expected == checksum(&bytes, &version.to_string())
}

/// Like [`verify`], but tells a missing check file apart from a bad one
pub fn check(version: &Version, payload: &Path) -> IntegrityStatus {
    if !check_file_for(payload).is_file() {
        return IntegrityStatus::CheckFileMissing;
    }
    if verify(version, payload) {
        IntegrityStatus::Valid
    } else {
        IntegrityStatus::Mismatch
    }
}
