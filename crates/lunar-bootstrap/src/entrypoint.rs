//! Entry point tying the bootstrap to the host's lifecycle
//!
//! The host calls [`Bootstrap::run`] once its own loader hands over control,
//! then forwards its lifecycle callbacks:
//!
//! ```text
//! run() ──► on_static_init_complete() ──► on_main_menu_reached()
//!                 on_frame_tick() (every frame)      on_shutdown()
//! ```

use crate::activation::{load_components, on_host_ready};
use crate::api::{patch_class_decls, FrameworkServices, LunarApi, RootGroups};
use crate::compat;
use crate::discovery::{discover, prepare_all};
use crate::host::{HostEnvironment, ModuleRuntime};
use crate::registry::BootstrapContext;
use crate::report::ScanSummary;
use lunar_core::utils::eq_ignore_case;
use lunar_core::{LoadingState, LunarConfig, Version};
use lunar_patching::{
    Clock, LifecycleHooks, PatchApplier, PatchClass, PatchEnv, PatchGroup, Subscriber,
};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Name of the framework's own long-lived patch group
pub const MAIN_GROUP: &str = "Lunar.Main";

/// Name of the patch group that only lives until the host is ready
pub const BOOTSTRAP_GROUP: &str = "Lunar.Bootstrap";

/// Tunables for one bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub framework_version: Version,
    /// Grace delay of the main patch group
    pub unpatch_delay: Duration,
    /// Move legacy assemblies aside and restart when any are found
    pub cleanup_old_assemblies: bool,
    /// Patch classes of the main group
    pub main_patches: Vec<PatchClass>,
    /// Patch classes only needed while the host starts up
    pub bootstrap_patches: Vec<PatchClass>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            framework_version: Version::parse_or_invalid(env!("CARGO_PKG_VERSION")),
            unpatch_delay: Duration::ZERO,
            cleanup_old_assemblies: true,
            main_patches: Vec::new(),
            bootstrap_patches: Vec::new(),
        }
    }
}

impl BootstrapOptions {
    pub fn from_config(config: &LunarConfig) -> Self {
        Self {
            unpatch_delay: Duration::from_secs(config.unpatch_delay_secs),
            cleanup_old_assemblies: config.cleanup_old_assemblies,
            ..Self::default()
        }
    }
}

/// Where the bootstrap is in the host lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    /// Components are loaded, waiting for the host to become ready
    Loaded,
    /// Init actions have run
    Ready,
    /// Legacy files were moved; the host is restarting
    Restarting,
    Shutdown,
}

/// Result of [`Bootstrap::run`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    RestartRequested,
    AlreadyRan,
}

/// One process run of the framework
pub struct Bootstrap<H: HostEnvironment, R: ModuleRuntime> {
    host: H,
    runtime: R,
    ctx: BootstrapContext,
    services: FrameworkServices,
    options: BootstrapOptions,
    main_group: PatchGroup,
    bootstrap_group: PatchGroup,
    subscriber: Subscriber,
    phase: Phase,
}

impl<H: HostEnvironment, R: ModuleRuntime> Bootstrap<H, R> {
    pub fn new(
        host: H,
        runtime: R,
        applier: Rc<dyn PatchApplier>,
        clock: Rc<dyn Clock>,
        options: BootstrapOptions,
    ) -> Self {
        let hooks = LifecycleHooks::new(clock);
        let services = FrameworkServices {
            framework_version: options.framework_version,
            patch_env: PatchEnv::new(applier, hooks.clone()),
            hooks,
            root_groups: RootGroups::default(),
        };

        let main_group = services.create_root_patch_group(MAIN_GROUP, options.unpatch_delay);
        let bootstrap_group = services.create_root_patch_group(BOOTSTRAP_GROUP, Duration::ZERO);

        Self {
            host,
            runtime,
            ctx: BootstrapContext::new(),
            services,
            options,
            main_group,
            bootstrap_group,
            subscriber: Subscriber::new("Lunar"),
            phase: Phase::Created,
        }
    }

    /// Discover, validate and load every component
    pub fn run(&mut self) -> RunOutcome {
        if self.phase != Phase::Created {
            warn!("Bootstrap already ran, ignoring");
            return RunOutcome::AlreadyRan;
        }

        info!(
            "Lunar framework v{} starting",
            self.options.framework_version
        );
        self.services.hooks.set_ready(true);

        if let Err(e) = self.activate_root_groups() {
            error!("Failed to apply framework patches: {}", e);
            self.main_group.unsubscribe_all(true);
            self.bootstrap_group.unsubscribe_all(true);
        }

        discover(&mut self.ctx, &self.host);
        prepare_all(
            &mut self.ctx,
            &self.host,
            &self.runtime,
            self.options.cleanup_old_assemblies,
        );

        if !self.ctx.cleaned_up().is_empty() {
            warn!(
                "Moved {} leftover files from old mod versions, the game needs to restart",
                self.ctx.cleaned_up().len()
            );
            self.host.request_restart();
            self.phase = Phase::Restarting;
            return RunOutcome::RestartRequested;
        }

        load_components(&mut self.ctx, &mut self.runtime, &self.services);

        for provider in self.ctx.providers() {
            provider.state.transition(LoadingState::Loaded);
        }

        self.phase = Phase::Loaded;
        RunOutcome::Completed
    }

    fn activate_root_groups(&self) -> lunar_patching::Result<()> {
        for class in &self.options.main_patches {
            self.main_group.add_patch_class(class.clone())?;
        }
        for class in &self.options.bootstrap_patches {
            self.bootstrap_group.add_patch_class(class.clone())?;
        }
        self.main_group.subscribe(&self.subscriber, true)?;
        self.bootstrap_group.subscribe(&self.subscriber, true)?;
        Ok(())
    }

    /// The host finished its own static initialization
    pub fn on_static_init_complete(&mut self) {
        if self.phase != Phase::Loaded {
            debug!("Ignoring static init signal in phase {:?}", self.phase);
            return;
        }
        self.bootstrap_group.unsubscribe_all(true);
        on_host_ready(&mut self.ctx);
        self.phase = Phase::Ready;
    }

    /// Show deferred prompts and run main-menu hooks
    pub fn on_main_menu_reached(&mut self) {
        if self.phase == Phase::Shutdown {
            return;
        }
        for notice in self.ctx.reporter.take_notices() {
            self.host.present_notice(&notice);
        }
        self.services.hooks.fire_main_menu();
    }

    pub fn on_frame_tick(&self) {
        if self.phase == Phase::Shutdown {
            return;
        }
        self.services.hooks.tick();
    }

    /// Run shutdown hooks and reverse every patch
    pub fn on_shutdown(&mut self) {
        if self.phase == Phase::Shutdown {
            return;
        }
        info!("Lunar framework shutting down");
        self.services.hooks.fire_shutdown();
        self.services.hooks.set_ready(false);
        for group in self.services.root_groups.all() {
            group.unsubscribe_all(true);
        }
        self.phase = Phase::Shutdown;
    }

    /// Framework handle for a provider that loaded successfully
    pub fn api_for(&self, package_id: &str) -> Option<LunarApi> {
        let provider = self.ctx.provider_by_package(package_id)?;
        match provider.state() {
            LoadingState::Loaded | LoadingState::Initialized => Some(LunarApi::new(
                provider.package.clone(),
                self.services.clone(),
            )),
            _ => None,
        }
    }

    /// Apply the compatibility adapters a loaded component ships
    pub fn apply_compat(&mut self, component: &str, group: &PatchGroup) -> usize {
        let Some(module) = self
            .ctx
            .component_by_name(component)
            .and_then(|c| c.module.clone())
        else {
            warn!("Component {} is not loaded, no compatibility patches", component);
            return 0;
        };

        match self.runtime.list_types(&module) {
            Ok(types) => compat::apply_all(&mut self.runtime, &types, group),
            Err(e) => {
                error!("Failed to create compatibility patches from {}: {}", module.name, e);
                0
            }
        }
    }

    /// Add the patch classes a loaded component declares for `group`
    pub fn add_patches_from(&self, group: &PatchGroup, component: &str) -> lunar_patching::Result<()> {
        let Some(module) = self
            .ctx
            .component_by_name(component)
            .and_then(|c| c.module.as_ref())
        else {
            debug!("Component {} is not loaded, no patches for {}", component, group.name());
            return Ok(());
        };

        let types = match self.runtime.list_types(module) {
            Ok(types) => types,
            Err(e) => {
                error!("Failed to list patch classes in {}: {}", module.name, e);
                return Ok(());
            }
        };

        let loaded = self.runtime.loaded_module_names();
        group.add_patches_from(&module.name, patch_class_decls(&types), |name| {
            loaded.iter().any(|m| eq_ignore_case(m, name))
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &BootstrapContext {
        &self.ctx
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_context(&self.ctx)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn hooks(&self) -> &LifecycleHooks {
        &self.services.hooks
    }

    pub fn main_group(&self) -> &PatchGroup {
        &self.main_group
    }

    pub fn bootstrap_group(&self) -> &PatchGroup {
        &self.bootstrap_group
    }
}
