//! What the framework exposes to the components it loads

use crate::host::{InstalledPackage, TypeDescriptor};
use lunar_core::{LoadingState, LoadingStateCell, Version};
use lunar_patching::{LifecycleHooks, PatchClass, PatchClassDecl, PatchEnv, PatchGroup};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// Runs once when the host reports it is ready
pub type InitAction = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Runs if a component's initialization fails
pub type CleanupAction = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Root patch groups created on behalf of components, reversed at shutdown
#[derive(Clone, Default)]
pub struct RootGroups(Rc<RefCell<Vec<PatchGroup>>>);

impl RootGroups {
    pub fn track(&self, group: PatchGroup) {
        self.0.borrow_mut().push(group);
    }

    pub fn all(&self) -> Vec<PatchGroup> {
        self.0.borrow().clone()
    }
}

/// Shared framework services handed to components
#[derive(Clone)]
pub struct FrameworkServices {
    pub framework_version: Version,
    pub hooks: LifecycleHooks,
    pub patch_env: PatchEnv,
    pub root_groups: RootGroups,
}

impl FrameworkServices {
    /// Create a root patch group and track it for shutdown
    pub fn create_root_patch_group(&self, name: &str, unpatch_delay: Duration) -> PatchGroup {
        debug!("Creating root patch group {}", name);
        let group = PatchGroup::new(name, unpatch_delay, self.patch_env.clone());
        self.root_groups.track(group.clone());
        group
    }
}

/// A component's view of its own state
#[derive(Debug, Clone)]
pub struct ComponentHandle {
    name: String,
    state: LoadingStateCell,
}

impl ComponentHandle {
    pub(crate) fn new(name: impl Into<String>, state: LoadingStateCell) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LoadingState {
        self.state.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.state.get() == LoadingState::Initialized
    }
}

/// Passed to a component entry point while it runs
pub struct EntryPointContext {
    component: ComponentHandle,
    package: InstalledPackage,
    services: FrameworkServices,
    init_actions: Vec<InitAction>,
    cleanup_actions: Vec<CleanupAction>,
}

impl EntryPointContext {
    pub(crate) fn new(
        component: ComponentHandle,
        package: InstalledPackage,
        services: FrameworkServices,
    ) -> Self {
        Self {
            component,
            package,
            services,
            init_actions: Vec::new(),
            cleanup_actions: Vec::new(),
        }
    }

    pub fn component(&self) -> &ComponentHandle {
        &self.component
    }

    /// Package the component was loaded from
    pub fn package(&self) -> &InstalledPackage {
        &self.package
    }

    pub fn framework_version(&self) -> Version {
        self.services.framework_version
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.services.hooks
    }

    /// Register an action to run once the host is ready
    pub fn on_init(&mut self, action: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.init_actions.push(Box::new(action));
    }

    /// Register an action to run if initialization fails
    pub fn on_cleanup(&mut self, action: impl FnOnce() -> anyhow::Result<()> + 'static) {
        self.cleanup_actions.push(Box::new(action));
    }

    pub fn create_root_patch_group(&self, name: &str, unpatch_delay: Duration) -> PatchGroup {
        self.services.create_root_patch_group(name, unpatch_delay)
    }

    pub(crate) fn into_actions(self) -> (Vec<InitAction>, Vec<CleanupAction>) {
        (self.init_actions, self.cleanup_actions)
    }
}

/// Handle given to a provider that loaded successfully
#[derive(Clone)]
pub struct LunarApi {
    package: InstalledPackage,
    services: FrameworkServices,
}

impl LunarApi {
    pub(crate) fn new(package: InstalledPackage, services: FrameworkServices) -> Self {
        Self { package, services }
    }

    pub fn package(&self) -> &InstalledPackage {
        &self.package
    }

    pub fn framework_version(&self) -> Version {
        self.services.framework_version
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.services.hooks
    }

    pub fn create_root_patch_group(&self, name: &str, unpatch_delay: Duration) -> PatchGroup {
        self.services.create_root_patch_group(name, unpatch_delay)
    }
}

/// Patch class declarations carried by a module's types
pub fn patch_class_decls(types: &[TypeDescriptor]) -> Vec<PatchClassDecl> {
    types
        .iter()
        .filter_map(|ty| {
            ty.patch_group().map(|group| PatchClassDecl {
                class: PatchClass::new(ty.full_name.clone()),
                group: group.to_string(),
                excluded_if_present: ty.excluded_if_present().map(str::to_string),
            })
        })
        .collect()
}
