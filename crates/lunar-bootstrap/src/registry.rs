//! In-memory registry of providers and components
//!
//! [`BootstrapContext`] owns every [`Provider`] and [`Component`] for one
//! process run. Both live in arenas indexed by [`ProviderId`] and
//! [`ComponentId`]; the index doubles as the load-order index.

use crate::api::{CleanupAction, InitAction};
use crate::host::{InstalledPackage, ModuleHandle};
use crate::layout;
use crate::report::FailureReporter;
use lunar_core::types::ComponentDef;
use lunar_core::{LoadingState, LoadingStateCell, Manifest, Version};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Load-order index of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ProviderId(pub usize);

/// Load-order index of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentId(pub usize);

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An installed package that bundles a framework copy
#[derive(Debug)]
pub struct Provider {
    pub id: ProviderId,
    pub package: InstalledPackage,
    pub framework_dir: PathBuf,
    /// Declared version from `About/Version.txt`, or the invalid sentinel
    pub version: Version,
    /// Set once the manifest has been parsed
    pub manifest: Option<Manifest>,
    pub state: LoadingStateCell,
    /// Modules loaded on behalf of this provider
    pub modules: Vec<ModuleHandle>,
}

impl Provider {
    pub fn package_id(&self) -> &str {
        &self.package.package_id
    }

    pub fn name(&self) -> &str {
        &self.package.name
    }

    pub fn state(&self) -> LoadingState {
        self.state.get()
    }

    pub fn components_dir(&self) -> PathBuf {
        layout::components_dir_in(&self.framework_dir)
    }

    pub fn manifest_file(&self) -> PathBuf {
        layout::manifest_file_in(&self.framework_dir)
    }

    pub fn component_file(&self, assembly_name: &str) -> PathBuf {
        layout::component_file_in(&self.components_dir(), assembly_name)
    }
}

/// One shared-assembly slot, aggregated across every provider declaring it
pub struct Component {
    pub id: ComponentId,
    pub assembly_name: String,
    /// Version each provider offers
    pub offers: BTreeMap<ProviderId, Version>,
    pub aliases: BTreeSet<String>,
    /// Soft dependency names
    pub dependencies: BTreeSet<String>,
    /// Components that declared this one as a dependency
    pub dependents: BTreeSet<ComponentId>,
    /// Whether a copy not loaded by the framework satisfies this slot
    pub allow_foreign: bool,
    pub state: LoadingStateCell,
    pub module: Option<ModuleHandle>,
    pub(crate) init_actions: Vec<InitAction>,
    pub(crate) cleanup_actions: Vec<CleanupAction>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("assembly_name", &self.assembly_name)
            .field("offers", &self.offers)
            .field("aliases", &self.aliases)
            .field("dependencies", &self.dependencies)
            .field("allow_foreign", &self.allow_foreign)
            .field("state", &self.state.get())
            .field("module", &self.module)
            .finish()
    }
}

impl Component {
    pub fn new(id: ComponentId, assembly_name: impl Into<String>) -> Self {
        Self {
            id,
            assembly_name: assembly_name.into(),
            offers: BTreeMap::new(),
            aliases: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
            allow_foreign: true,
            state: LoadingStateCell::new(),
            module: None,
            init_actions: Vec::new(),
            cleanup_actions: Vec::new(),
        }
    }

    pub fn state(&self) -> LoadingState {
        self.state.get()
    }

    /// Merge one provider's declaration of this component
    ///
    /// `allow_foreign` only ever moves from true to false. When it does, the
    /// aliases gathered so far are discarded, and from then on only
    /// declarations that themselves forbid foreign copies contribute aliases.
    pub fn merge_declaration(&mut self, provider: ProviderId, version: Version, decl: &ComponentDef) {
        self.offers.insert(provider, version);

        if !decl.allow_non_lunar_source && self.allow_foreign {
            self.allow_foreign = false;
            self.aliases.clear();
        }

        if !decl.allow_non_lunar_source || self.allow_foreign {
            self.aliases.extend(decl.aliases().iter().cloned());
        }

        self.dependencies.extend(decl.depends_on().iter().cloned());
    }

    /// Provider offering the highest version; ties go to the lowest load-order index
    pub fn latest_version_provided_by(&self) -> Option<(ProviderId, Version)> {
        self.offers
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, version)| (*id, *version))
    }

    pub fn latest_version(&self) -> Option<Version> {
        self.latest_version_provided_by().map(|(_, v)| v)
    }

    /// Assembly name followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.assembly_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Everything the bootstrap knows about one process run
#[derive(Debug, Default)]
pub struct BootstrapContext {
    providers: Vec<Provider>,
    provider_index: HashMap<String, ProviderId>,
    components: Vec<Component>,
    component_index: HashMap<String, ComponentId>,
    installed: Vec<InstalledPackage>,
    module_owners: HashMap<ModuleHandle, String>,
    cleaned_up: Vec<PathBuf>,
    host_ready_done: bool,
    pub(crate) reporter: FailureReporter,
}

impl BootstrapContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider; a repeated package id replaces the earlier entry in place
    pub fn add_provider(
        &mut self,
        package: InstalledPackage,
        framework_dir: PathBuf,
        version: Version,
    ) -> ProviderId {
        if let Some(&id) = self.provider_index.get(&package.package_id) {
            warn!(
                "Package {} was discovered twice, keeping the copy at {:?}",
                package.package_id, package.root_dir
            );
            self.providers[id.0] = Provider {
                id,
                package,
                framework_dir,
                version,
                manifest: None,
                state: LoadingStateCell::new(),
                modules: Vec::new(),
            };
            return id;
        }

        let id = ProviderId(self.providers.len());
        self.provider_index.insert(package.package_id.clone(), id);
        self.providers.push(Provider {
            id,
            package,
            framework_dir,
            version,
            manifest: None,
            state: LoadingStateCell::new(),
            modules: Vec::new(),
        });
        id
    }

    pub fn provider(&self, id: ProviderId) -> &Provider {
        &self.providers[id.0]
    }

    pub fn provider_mut(&mut self, id: ProviderId) -> &mut Provider {
        &mut self.providers[id.0]
    }

    /// Case-insensitive lookup by package id
    pub fn provider_by_package(&self, package_id: &str) -> Option<&Provider> {
        self.provider_index
            .get(&package_id.to_lowercase())
            .map(|id| &self.providers[id.0])
    }

    /// Providers in load order
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id).collect()
    }

    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id.0]
    }

    pub fn component_mut(&mut self, id: ComponentId) -> &mut Component {
        &mut self.components[id.0]
    }

    pub fn component_by_name(&self, assembly_name: &str) -> Option<&Component> {
        self.component_index
            .get(assembly_name)
            .map(|id| &self.components[id.0])
    }

    pub fn component_id(&self, assembly_name: &str) -> Option<ComponentId> {
        self.component_index.get(assembly_name).copied()
    }

    /// Components in load order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.iter().map(|c| c.id).collect()
    }

    pub fn find_or_create_component(&mut self, assembly_name: &str) -> ComponentId {
        if let Some(&id) = self.component_index.get(assembly_name) {
            return id;
        }
        let id = ComponentId(self.components.len());
        self.components.push(Component::new(id, assembly_name));
        self.component_index.insert(assembly_name.to_string(), id);
        id
    }

    pub(crate) fn set_installed(&mut self, installed: Vec<InstalledPackage>) {
        self.installed = installed;
    }

    /// Snapshot of installed packages taken at discovery
    pub fn installed(&self) -> &[InstalledPackage] {
        &self.installed
    }

    pub fn installed_package(&self, package_id: &str) -> Option<&InstalledPackage> {
        let package_id = package_id.to_lowercase();
        self.installed.iter().find(|p| p.package_id == package_id)
    }

    pub(crate) fn set_module_owner(&mut self, module: ModuleHandle, package_id: String) {
        self.module_owners.insert(module, package_id);
    }

    /// Package id of the provider a module was loaded for
    pub fn owner_of(&self, module: &ModuleHandle) -> Option<&str> {
        self.module_owners.get(module).map(String::as_str)
    }

    pub(crate) fn record_cleanup(&mut self, moved: impl IntoIterator<Item = PathBuf>) {
        self.cleaned_up.extend(moved);
    }

    /// Legacy files moved aside during preparation
    pub fn cleaned_up(&self) -> &[PathBuf] {
        &self.cleaned_up
    }

    pub(crate) fn mark_host_ready(&mut self) -> bool {
        !std::mem::replace(&mut self.host_ready_done, true)
    }

    pub fn failures(&self) -> &[crate::report::FailureRecord] {
        self.reporter.records()
    }
}
