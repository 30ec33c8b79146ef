//! On-disk layout of a framework bundle
//!
//! ```text
//! <package root>/
//!   About/Version.txt                  declared framework version
//!   <load folder>/
//!     Assemblies/LunarLoader.dll       loader; anything else here is legacy
//!     Lunar/
//!       Manifest.xml  Manifest.lfc
//!       Components/
//!         LunarFramework.dll  LunarFramework.lfc
//!         <AssemblyName>.dll  <AssemblyName>.lfc
//!       Backup/                        legacy assemblies moved aside
//! ```

use std::path::{Path, PathBuf};

pub const FRAMEWORK_DIR: &str = "Lunar";
pub const COMPONENTS_DIR: &str = "Components";
pub const ASSEMBLIES_DIR: &str = "Assemblies";
pub const BACKUP_DIR: &str = "Backup";
pub const MANIFEST_FILE: &str = "Manifest.xml";
pub const FRAMEWORK_ASSEMBLY_FILE: &str = "LunarFramework.dll";
pub const LOADER_ASSEMBLY_FILE: &str = "LunarLoader.dll";
pub const ASSEMBLY_EXTENSION: &str = "dll";
pub const CHECK_FILE_EXTENSION: &str = "lfc";

pub fn framework_dir_in(load_folder: &Path) -> PathBuf {
    load_folder.join(FRAMEWORK_DIR)
}

pub fn assemblies_dir_in(load_folder: &Path) -> PathBuf {
    load_folder.join(ASSEMBLIES_DIR)
}

pub fn components_dir_in(framework_dir: &Path) -> PathBuf {
    framework_dir.join(COMPONENTS_DIR)
}

pub fn manifest_file_in(framework_dir: &Path) -> PathBuf {
    framework_dir.join(MANIFEST_FILE)
}

pub fn backup_dir_in(framework_dir: &Path) -> PathBuf {
    framework_dir.join(BACKUP_DIR)
}

pub fn framework_assembly_file_in(framework_dir: &Path) -> PathBuf {
    components_dir_in(framework_dir).join(FRAMEWORK_ASSEMBLY_FILE)
}

/// `<components dir>/<assembly name>.dll`
pub fn component_file_in(components_dir: &Path, assembly_name: &str) -> PathBuf {
    components_dir.join(format!("{}.{}", assembly_name, ASSEMBLY_EXTENSION))
}

pub fn version_file_in(package_root: &Path) -> PathBuf {
    package_root.join("About").join("Version.txt")
}
