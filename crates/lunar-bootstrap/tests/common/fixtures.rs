//! Temporary mod trees on disk

#![allow(dead_code)]

use super::builders::ModBuilder;
use super::mocks::FakeHost;
use lunar_bootstrap::integrity::write_check_file;
use lunar_bootstrap::InstalledPackage;
use lunar_core::Version;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A mods directory under a temporary folder
pub struct ModTree {
    temp_dir: TempDir,
    packages: Vec<InstalledPackage>,
}

impl ModTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
            packages: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a package and add it to the installed list, in load order
    pub fn add(&mut self, builder: ModBuilder) -> InstalledPackage {
        let package = builder.build(self.temp_dir.path());
        self.packages.push(package.clone());
        package
    }

    pub fn packages(&self) -> &[InstalledPackage] {
        &self.packages
    }

    pub fn host(&self, version: Version) -> FakeHost {
        FakeHost::new(version, self.packages.clone())
    }
}

/// Bytes of a stand-in binary carrying a `FileVersion` resource string
pub fn fake_assembly(name: &str, file_version: Option<&str>) -> Vec<u8> {
    let mut bytes = b"MZ\x90\x00".to_vec();
    bytes.extend(name.as_bytes());
    if let Some(version) = file_version {
        bytes.extend(utf16("FileVersion\0"));
        bytes.extend([0, 0]);
        bytes.extend(utf16(version));
        bytes.extend([0, 0]);
    }
    bytes
}

fn utf16(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Write a file, creating parent folders
pub fn write_file(path: &Path, contents: impl AsRef<[u8]>) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(path, contents).expect("Failed to write file");
}

/// Write a payload and its check file for `version`
pub fn write_with_check_file(path: &Path, contents: impl AsRef<[u8]>, version: &Version) -> PathBuf {
    write_file(path, contents);
    write_check_file(version, path).expect("Failed to write check file")
}
