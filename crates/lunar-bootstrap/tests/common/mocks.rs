//! Mock host, module runtime and patch backend

#![allow(dead_code)]

use anyhow::anyhow;
use lunar_bootstrap::fs_host::embedded_file_version;
use lunar_bootstrap::{
    EntryPointContext, HostEnvironment, InstalledPackage, ModCompat, ModuleHandle, ModuleRuntime,
    Notice, RuntimeError, TypeDescriptor,
};
use lunar_core::Version;
use lunar_patching::{PatchApplier, PatchClass, Result as PatchResult};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Host with a fixed package list that records prompts and restarts
pub struct FakeHost {
    version: Version,
    packages: Vec<InstalledPackage>,
    restarts: Cell<usize>,
    notices: RefCell<Vec<Notice>>,
}

impl FakeHost {
    pub fn new(version: Version, packages: Vec<InstalledPackage>) -> Self {
        Self {
            version,
            packages,
            restarts: Cell::new(0),
            notices: RefCell::new(Vec::new()),
        }
    }

    pub fn restarts(&self) -> usize {
        self.restarts.get()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.borrow().clone()
    }
}

impl HostEnvironment for FakeHost {
    fn host_version(&self) -> Version {
        self.version
    }

    fn installed_packages(&self) -> Vec<InstalledPackage> {
        self.packages.clone()
    }

    fn request_restart(&self) {
        self.restarts.set(self.restarts.get() + 1);
    }

    fn present_notice(&self, notice: &Notice) {
        self.notices.borrow_mut().push(notice.clone());
    }
}

/// Behaviour of one entry point type
pub type EntryPointFn = Rc<dyn Fn(&mut EntryPointContext) -> anyhow::Result<()>>;

/// Shared, ordered record of what the runtime and component code did
pub type EventLog = Rc<RefCell<Vec<String>>>;

/// Compatibility adapter with scripted behaviour
#[derive(Debug, Clone)]
pub struct FakeCompat {
    pub target: String,
    pub classes: Vec<PatchClass>,
    pub enabled: bool,
    pub fail: bool,
}

impl FakeCompat {
    pub fn new(target: &str, classes: &[&str]) -> Self {
        Self {
            target: target.to_string(),
            classes: classes.iter().map(|c| PatchClass::new(*c)).collect(),
            enabled: true,
            fail: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

impl ModCompat for FakeCompat {
    fn target_module(&self) -> &str {
        &self.target
    }

    fn on_apply(&mut self) -> anyhow::Result<bool> {
        if self.fail {
            return Err(anyhow!("adapter for {} threw", self.target));
        }
        Ok(self.enabled)
    }

    fn patch_classes(&self) -> Vec<PatchClass> {
        self.classes.clone()
    }
}

/// Module runtime driven by per-module type lists and scripted failures
#[derive(Default)]
pub struct FakeRuntime {
    preloaded: Vec<String>,
    loaded: Vec<ModuleHandle>,
    types: HashMap<String, Vec<TypeDescriptor>>,
    load_errors: HashMap<String, RuntimeError>,
    type_errors: HashMap<String, RuntimeError>,
    entry_points: HashMap<String, EntryPointFn>,
    failing_mod_classes: HashSet<String>,
    existing_mod_instances: HashSet<String>,
    compats: HashMap<String, FakeCompat>,
    owners: Vec<(String, String)>,
    cache_invalidations: usize,
    events: EventLog,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preloaded(mut self, module: &str) -> Self {
        self.preloaded.push(module.to_string());
        self
    }

    pub fn with_types(mut self, module: &str, types: Vec<TypeDescriptor>) -> Self {
        self.types.insert(module.to_string(), types);
        self
    }

    pub fn with_load_error(mut self, module: &str, error: RuntimeError) -> Self {
        self.load_errors.insert(module.to_string(), error);
        self
    }

    pub fn with_type_error(mut self, module: &str, error: RuntimeError) -> Self {
        self.type_errors.insert(module.to_string(), error);
        self
    }

    pub fn with_entry_point(
        mut self,
        type_name: &str,
        f: impl Fn(&mut EntryPointContext) -> anyhow::Result<()> + 'static,
    ) -> Self {
        self.entry_points.insert(type_name.to_string(), Rc::new(f));
        self
    }

    pub fn failing_mod_class(mut self, type_name: &str) -> Self {
        self.failing_mod_classes.insert(type_name.to_string());
        self
    }

    pub fn with_existing_mod_instance(mut self, type_name: &str) -> Self {
        self.existing_mod_instances.insert(type_name.to_string());
        self
    }

    pub fn with_compat(mut self, type_name: &str, compat: FakeCompat) -> Self {
        self.compats.insert(type_name.to_string(), compat);
        self
    }

    /// Handle to the event log, for closures that record into it
    pub fn event_log(&self) -> EventLog {
        self.events.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn loaded_names(&self) -> Vec<String> {
        self.loaded.iter().map(|m| m.name.clone()).collect()
    }

    /// `(module name, package id)` pairs registered host side
    pub fn owners(&self) -> &[(String, String)] {
        &self.owners
    }

    pub fn cache_invalidations(&self) -> usize {
        self.cache_invalidations
    }

    fn record(&self, event: String) {
        self.events.borrow_mut().push(event);
    }
}

impl ModuleRuntime for FakeRuntime {
    fn loaded_module_names(&self) -> Vec<String> {
        self.preloaded
            .iter()
            .cloned()
            .chain(self.loaded_names())
            .collect()
    }

    fn file_version(&self, path: &Path) -> Version {
        fs::read(path)
            .ok()
            .and_then(|bytes| embedded_file_version(&bytes))
            .unwrap_or(Version::INVALID)
    }

    fn load_module(&mut self, name: &str, _bytes: &[u8]) -> Result<ModuleHandle, RuntimeError> {
        if let Some(error) = self.load_errors.get(name) {
            return Err(error.clone());
        }
        let handle = ModuleHandle {
            id: self.loaded.len() as u64 + 1,
            name: name.to_string(),
        };
        self.record(format!("load:{}", name));
        self.loaded.push(handle.clone());
        Ok(handle)
    }

    fn list_types(&self, module: &ModuleHandle) -> Result<Vec<TypeDescriptor>, RuntimeError> {
        if let Some(error) = self.type_errors.get(&module.name) {
            return Err(error.clone());
        }
        Ok(self.types.get(&module.name).cloned().unwrap_or_default())
    }

    fn run_entry_point(
        &mut self,
        ty: &TypeDescriptor,
        ctx: &mut EntryPointContext,
    ) -> anyhow::Result<()> {
        self.record(format!("entry:{}", ty.full_name));
        match self.entry_points.get(&ty.full_name).cloned() {
            Some(f) => f(ctx),
            None => Ok(()),
        }
    }

    fn mod_instance_exists(&self, ty: &TypeDescriptor) -> bool {
        self.existing_mod_instances.contains(&ty.full_name)
    }

    fn instantiate_mod(
        &mut self,
        ty: &TypeDescriptor,
        owner: &InstalledPackage,
    ) -> anyhow::Result<()> {
        if self.failing_mod_classes.contains(&ty.full_name) {
            return Err(anyhow!("constructor of {} threw", ty.full_name));
        }
        self.record(format!("mod:{}:{}", ty.full_name, owner.package_id));
        Ok(())
    }

    fn register_module_owner(&mut self, module: &ModuleHandle, owner: &InstalledPackage) {
        self.owners
            .push((module.name.clone(), owner.package_id.clone()));
    }

    fn invalidate_type_caches(&mut self) {
        self.cache_invalidations += 1;
    }

    fn create_compat(&mut self, ty: &TypeDescriptor) -> anyhow::Result<Box<dyn ModCompat>> {
        match self.compats.get(&ty.full_name) {
            Some(compat) => Ok(Box::new(compat.clone())),
            None => Err(anyhow!("no default constructor on {}", ty.full_name)),
        }
    }
}

/// Patch backend recording `apply:<group>:<class>` and `remove:<group>`
#[derive(Default)]
pub struct RecordingApplier {
    calls: RefCell<Vec<String>>,
    failing_classes: RefCell<HashSet<String>>,
}

impl RecordingApplier {
    pub fn fail_on(&self, class: &str) {
        self.failing_classes.borrow_mut().insert(class.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }
}

impl PatchApplier for RecordingApplier {
    fn apply_class(&self, group: &str, class: &PatchClass) -> PatchResult<()> {
        if self.failing_classes.borrow().contains(class.name()) {
            return Err(lunar_patching::PatchError::apply_failed(
                group,
                class.name(),
                "target method not found",
            ));
        }
        self.calls
            .borrow_mut()
            .push(format!("apply:{}:{}", group, class));
        Ok(())
    }

    fn remove_all(&self, group: &str) {
        self.calls.borrow_mut().push(format!("remove:{}", group));
    }
}
