//! Moves assemblies left over from pre-framework releases out of the way
//!
//! Older releases shipped their binaries directly in `Assemblies/`. Once a
//! package bundles the framework, only the loader may remain there; anything
//! else is moved to `Lunar/Backup/` and the host has to restart.

use crate::error::{BootstrapError, Result};
use crate::host::InstalledPackage;
use crate::layout::{self, ASSEMBLY_EXTENSION, LOADER_ASSEMBLY_FILE};
use lunar_core::utils::eq_ignore_case;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Leftover assemblies across every load folder, highest priority first
///
/// A file name already seen in a higher-priority folder is not listed again.
pub fn find_old_assemblies(package: &InstalledPackage) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for folder in &package.load_folders {
        let dir = layout::assemblies_dir_in(folder);
        let Ok(entries) = fs::read_dir(&dir) else {
            continue;
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_legacy_assembly(p))
            .collect();
        files.sort();

        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if seen.insert(name) {
                found.push(file);
            }
        }
    }

    found
}

fn is_legacy_assembly(path: &Path) -> bool {
    let is_dll = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| eq_ignore_case(e, ASSEMBLY_EXTENSION));
    let is_loader = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == LOADER_ASSEMBLY_FILE);
    is_dll && !is_loader
}

/// Move leftovers into `<framework dir>/Backup`, returning the original paths
///
/// Fails if leftovers exist but a backup folder is already there: a previous
/// cleanup evidently did not take effect.
pub fn clean_up_old_assemblies(
    package: &InstalledPackage,
    framework_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let old = find_old_assemblies(package);
    if old.is_empty() {
        return Ok(Vec::new());
    }

    let backup = layout::backup_dir_in(framework_dir);
    if backup.exists() {
        return Err(BootstrapError::integrity("its files are damaged or incomplete"));
    }

    fs::create_dir_all(&backup).map_err(|e| {
        BootstrapError::internal(format!("failed to create {}: {}", backup.display(), e))
    })?;

    warn!(
        "Found leftover files from an old version of mod: {}",
        package.package_id
    );

    move_into_backup(&old, &backup, |from, to| fs::rename(from, to))
}

/// Move every file into `backup`
///
/// On the first failed move, files already moved are put back and the backup
/// folder is removed again, leaving the package as it was found.
fn move_into_backup(
    files: &[PathBuf],
    backup: &Path,
    mut move_file: impl FnMut(&Path, &Path) -> io::Result<()>,
) -> Result<Vec<PathBuf>> {
    let mut moved: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = backup.join(name);
        if let Err(e) = move_file(file, &dest) {
            for (original, dest) in moved.iter().rev() {
                if let Err(undo) = move_file(dest, original) {
                    warn!("Failed to restore {:?}: {}", original, undo);
                }
            }
            if let Err(undo) = fs::remove_dir(backup) {
                warn!("Failed to remove {:?}: {}", backup, undo);
            }
            return Err(BootstrapError::internal(format!(
                "failed to move {}: {}",
                file.display(),
                e
            )));
        }
        debug!("Moved {:?} to {:?}", file, dest);
        moved.push((file.clone(), dest));
    }

    Ok(moved.into_iter().map(|(original, _)| original).collect())
}
