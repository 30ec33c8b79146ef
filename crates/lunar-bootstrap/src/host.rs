//! Capabilities the bootstrap needs from the host process
//!
//! Everything that touches the running game sits behind these traits, so the
//! discovery and activation engines can run against a filesystem-backed dry
//! run or against test doubles.

use crate::api::EntryPointContext;
use crate::compat::ModCompat;
use crate::report::Notice;
use lunar_core::Version;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// An installed package as reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstalledPackage {
    /// Lowercased package id
    pub package_id: String,
    pub name: String,
    pub root_dir: PathBuf,
    /// Last path component of the root, e.g. a workshop item id
    pub folder_name: String,
    /// Candidate content folders, highest priority first
    pub load_folders: Vec<PathBuf>,
    /// Source URL from the package metadata
    pub url: Option<String>,
}

impl InstalledPackage {
    pub fn new(package_id: &str, name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let folder_name = root_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            package_id: package_id.to_lowercase(),
            name: name.into(),
            load_folders: vec![root_dir.clone()],
            root_dir,
            folder_name,
            url: None,
        }
    }

    pub fn with_load_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.load_folders = folders;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }
}

/// The host application as seen by the bootstrap
pub trait HostEnvironment {
    /// Version of the running host
    fn host_version(&self) -> Version;

    /// Installed packages in load order
    fn installed_packages(&self) -> Vec<InstalledPackage>;

    /// Ask the host to restart itself
    fn request_restart(&self);

    /// Show a prompt to the user; called once the main menu is reachable
    fn present_notice(&self, notice: &Notice);
}

/// A module loaded into the host process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ModuleHandle {
    pub id: u64,
    pub name: String,
}

impl fmt::Display for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Annotations a type in a loaded module can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// Static initializer to run when the component loads
    ComponentEntryPoint,
    /// Host-recognized mod class, instantiated with the owning package
    ModClass,
    /// Compatibility adapter for another module
    CompatAdapter,
    /// Patch class belonging to `<module>.<name>`
    PatchGroup(String),
    /// Patch class skipped when the named module is loaded
    ExcludedIfPresent(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    ComponentEntryPoint,
    ModClass,
    CompatAdapter,
    PatchGroup,
    ExcludedIfPresent,
}

impl Marker {
    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::ComponentEntryPoint => MarkerKind::ComponentEntryPoint,
            Marker::ModClass => MarkerKind::ModClass,
            Marker::CompatAdapter => MarkerKind::CompatAdapter,
            Marker::PatchGroup(_) => MarkerKind::PatchGroup,
            Marker::ExcludedIfPresent(_) => MarkerKind::ExcludedIfPresent,
        }
    }
}

/// A type found in a loaded module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub full_name: String,
    pub is_abstract: bool,
    pub markers: Vec<Marker>,
}

impl TypeDescriptor {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            is_abstract: false,
            markers: Vec::new(),
        }
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Name carried by the `PatchGroup` marker, if any
    pub fn patch_group(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::PatchGroup(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Module named by the `ExcludedIfPresent` marker, if any
    pub fn excluded_if_present(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::ExcludedIfPresent(module) => Some(module.as_str()),
            _ => None,
        })
    }
}

/// Failure reported by the module runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RuntimeError {
    pub message: String,
    /// Nested loader diagnostics, e.g. one per type that failed to resolve
    pub loader_errors: Vec<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            loader_errors: Vec::new(),
        }
    }

    pub fn with_loader_errors(mut self, errors: Vec<String>) -> Self {
        self.loader_errors = errors;
        self
    }
}

/// Loading binaries into the host and inspecting what they contain
pub trait ModuleRuntime {
    /// Names of every module currently present in the host process
    fn loaded_module_names(&self) -> Vec<String>;

    /// Embedded file version of a binary, or [`Version::INVALID`]
    fn file_version(&self, path: &Path) -> Version;

    fn load_module(&mut self, name: &str, bytes: &[u8]) -> Result<ModuleHandle, RuntimeError>;

    fn list_types(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, RuntimeError>;

    fn has_marker(&self, ty: &TypeDescriptor, kind: MarkerKind) -> bool {
        ty.markers.iter().any(|m| m.kind() == kind)
    }

    /// Trigger a type's static initialization
    fn run_entry_point(
        &mut self,
        ty: &TypeDescriptor,
        ctx: &mut EntryPointContext,
    ) -> anyhow::Result<()>;

    fn mod_instance_exists(&self, ty: &TypeDescriptor) -> bool;

    /// Instantiate a mod class, passing the owning package
    fn instantiate_mod(&mut self, ty: &TypeDescriptor, owner: &InstalledPackage)
        -> anyhow::Result<()>;

    /// Record which package a module belongs to, host side
    fn register_module_owner(&mut self, module: &ModuleHandle, owner: &InstalledPackage);

    /// Drop process-wide type lookup caches after a load
    fn invalidate_type_caches(&mut self);

    /// Instantiate a compatibility adapter type
    fn create_compat(&mut self, ty: &TypeDescriptor) -> anyhow::Result<Box<dyn ModCompat>>;
}
