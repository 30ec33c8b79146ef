//! Filesystem-backed host for dry runs
//!
//! [`FsHost`] treats every folder of a mods directory that has an
//! `About/About.xml` as an installed package. [`DryRunRuntime`] pretends to
//! load modules: nothing is executed, but file versions are read from the
//! binaries so validation behaves as it would in the host.

use crate::api::EntryPointContext;
use crate::compat::ModCompat;
use crate::host::{
    HostEnvironment, InstalledPackage, ModuleHandle, ModuleRuntime, RuntimeError, TypeDescriptor,
};
use crate::report::Notice;
use anyhow::anyhow;
use lunar_core::Version;
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AboutXml {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    package_id: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

/// Host backed by a mods directory on disk
#[derive(Debug)]
pub struct FsHost {
    mods_dir: PathBuf,
    host_version: Version,
    restart_requested: Cell<bool>,
    notices: RefCell<Vec<Notice>>,
}

impl FsHost {
    pub fn new(mods_dir: impl Into<PathBuf>, host_version: Version) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            host_version,
            restart_requested: Cell::new(false),
            notices: RefCell::new(Vec::new()),
        }
    }

    pub fn mods_dir(&self) -> &Path {
        &self.mods_dir
    }

    pub fn restart_requested(&self) -> bool {
        self.restart_requested.get()
    }

    /// Notices presented so far
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }

    fn read_package(&self, root: &Path) -> Option<InstalledPackage> {
        let about_file = root.join("About").join("About.xml");
        let content = fs::read_to_string(&about_file).ok()?;
        let about: AboutXml = match quick_xml::de::from_str(&content) {
            Ok(about) => about,
            Err(e) => {
                warn!("Skipping {:?}: {}", about_file, e);
                return None;
            }
        };

        let Some(package_id) = about.package_id.filter(|id| !id.trim().is_empty()) else {
            debug!("Skipping {:?}: no packageId", about_file);
            return None;
        };

        let name = about.name.unwrap_or_else(|| package_id.clone());
        let version_folder = root.join(format!(
            "{}.{}",
            self.host_version.major(),
            self.host_version.minor()
        ));

        let mut package = InstalledPackage::new(package_id.trim(), name, root)
            .with_load_folders(vec![version_folder, root.to_path_buf()]);
        if let Some(url) = about.url {
            package = package.with_url(url.trim());
        }
        Some(package)
    }
}

impl HostEnvironment for FsHost {
    fn host_version(&self) -> Version {
        self.host_version
    }

    fn installed_packages(&self) -> Vec<InstalledPackage> {
        let Ok(entries) = fs::read_dir(&self.mods_dir) else {
            warn!("Mods directory {:?} is not readable", self.mods_dir);
            return Vec::new();
        };

        let mut roots: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();
        roots.sort();

        roots.iter().filter_map(|root| self.read_package(root)).collect()
    }

    fn request_restart(&self) {
        warn!("Restart requested");
        self.restart_requested.set(true);
    }

    fn present_notice(&self, notice: &Notice) {
        match &notice.link {
            Some(link) => info!("{} [{}: {}]", notice.message, link.label, link.url),
            None => info!("{}", notice.message),
        }
        self.notices.borrow_mut().push(notice.clone());
    }
}

/// Module runtime that loads nothing
#[derive(Debug, Default)]
pub struct DryRunRuntime {
    preloaded: Vec<String>,
    loaded: Vec<ModuleHandle>,
    owners: HashMap<ModuleHandle, String>,
    next_id: u64,
}

impl DryRunRuntime {
    /// `preloaded` are module names reported as already present
    pub fn new(preloaded: Vec<String>) -> Self {
        Self {
            preloaded,
            ..Self::default()
        }
    }

    pub fn loaded(&self) -> &[ModuleHandle] {
        &self.loaded
    }

    pub fn owner_of(&self, module: &ModuleHandle) -> Option<&str> {
        self.owners.get(module).map(String::as_str)
    }
}

impl ModuleRuntime for DryRunRuntime {
    fn loaded_module_names(&self) -> Vec<String> {
        self.preloaded
            .iter()
            .cloned()
            .chain(self.loaded.iter().map(|m| m.name.clone()))
            .collect()
    }

    fn file_version(&self, path: &Path) -> Version {
        match fs::read(path) {
            Ok(bytes) => embedded_file_version(&bytes).unwrap_or(Version::INVALID),
            Err(_) => Version::INVALID,
        }
    }

    fn load_module(&mut self, name: &str, bytes: &[u8]) -> Result<ModuleHandle, RuntimeError> {
        if bytes.is_empty() {
            return Err(RuntimeError::new("empty module image"));
        }
        self.next_id += 1;
        let handle = ModuleHandle {
            id: self.next_id,
            name: name.to_string(),
        };
        debug!("[dry-run] loaded {} ({} bytes)", handle, bytes.len());
        self.loaded.push(handle.clone());
        Ok(handle)
    }

    fn list_types(&self, _module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, RuntimeError> {
        Ok(Vec::new())
    }

    fn run_entry_point(
        &mut self,
        ty: &TypeDescriptor,
        _ctx: &mut EntryPointContext,
    ) -> anyhow::Result<()> {
        debug!("[dry-run] entry point {}", ty.full_name);
        Ok(())
    }

    fn mod_instance_exists(&self, _ty: &TypeDescriptor) -> bool {
        false
    }

    fn instantiate_mod(
        &mut self,
        ty: &TypeDescriptor,
        owner: &InstalledPackage,
    ) -> anyhow::Result<()> {
        debug!("[dry-run] mod class {} for {}", ty.full_name, owner.package_id);
        Ok(())
    }

    fn register_module_owner(&mut self, module: &ModuleHandle, owner: &InstalledPackage) {
        self.owners
            .insert(module.clone(), owner.package_id.clone());
    }

    fn invalidate_type_caches(&mut self) {
        debug!("[dry-run] type caches cleared");
    }

    fn create_compat(&mut self, ty: &TypeDescriptor) -> anyhow::Result<Box<dyn ModCompat>> {
        Err(anyhow!("cannot instantiate {} in a dry run", ty.full_name))
    }
}

/// Read the `FileVersion` string from a binary's version resource
///
/// The resource stores the key and its value as NUL-terminated UTF-16LE
/// strings, padded to 32-bit boundaries.
pub fn embedded_file_version(bytes: &[u8]) -> Option<Version> {
    let key: Vec<u8> = "FileVersion\0"
        .encode_utf16()
        .flat_map(|u| u.to_le_bytes())
        .collect();

    let start = bytes.windows(key.len()).position(|w| w == key.as_slice())? + key.len();
    let units = bytes[start..]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .skip_while(|&u| u == 0);

    let mut value = Vec::new();
    for unit in units {
        if unit == 0 {
            break;
        }
        value.push(unit);
    }

    let text = String::from_utf16(&value).ok()?;
    text.parse().ok()
}
