//! Activation engine
//!
//! Loads the winning copy of every pending component, runs its entry points
//! and mod classes, and later runs the init actions those entry points
//! registered. Failures are propagated to every provider that offers the
//! failed component and to every component that depends on it.

use crate::api::{ComponentHandle, EntryPointContext, FrameworkServices};
use crate::error::{BootstrapError, Result};
use crate::guard::{catch, guard};
use crate::host::{MarkerKind, ModuleRuntime, RuntimeError, TypeDescriptor};
use crate::registry::{BootstrapContext, ComponentId, ProviderId};
use lunar_core::utils::eq_ignore_case;
use lunar_core::LoadingState;
use std::fs;
use tracing::{debug, error, info, warn};

/// Load every pending component in ascending index order
pub fn load_components<R: ModuleRuntime + ?Sized>(
    ctx: &mut BootstrapContext,
    runtime: &mut R,
    services: &FrameworkServices,
) {
    wire_dependencies(ctx);
    detect_collisions(ctx, runtime);

    for id in ctx.component_ids() {
        if ctx.component(id).state() != LoadingState::Pending {
            continue;
        }
        guard(
            ctx,
            |ctx| load_component(ctx, id, &mut *runtime, services),
            |ctx, e| fail_component(ctx, id, e),
        );
    }
}

/// Register each component as a dependent of the components it names
pub fn wire_dependencies(ctx: &mut BootstrapContext) {
    let declared: Vec<(ComponentId, Vec<String>)> = ctx
        .components()
        .iter()
        .map(|c| (c.id, c.dependencies.iter().cloned().collect()))
        .collect();

    for (id, dependencies) in declared {
        for name in dependencies {
            match ctx.component_id(&name) {
                Some(dependency) if dependency != id => {
                    ctx.component_mut(dependency).dependents.insert(id);
                }
                Some(_) => {}
                None => debug!(
                    "Ignoring unknown dependency {} of {}",
                    name,
                    ctx.component(id).assembly_name
                ),
            }
        }
    }
}

/// Settle components whose name or alias is already present in the host
pub fn detect_collisions<R: ModuleRuntime + ?Sized>(ctx: &mut BootstrapContext, runtime: &R) {
    let present = runtime.loaded_module_names();

    for id in ctx.component_ids() {
        let component = ctx.component(id);
        if component.state() != LoadingState::Pending {
            continue;
        }

        let Some(name) = component
            .names()
            .find(|name| present.iter().any(|m| eq_ignore_case(m, name)))
            .map(str::to_string)
        else {
            continue;
        };

        if component.allow_foreign {
            info!(
                "Component {} is already present as {}, using the existing copy",
                component.assembly_name, name
            );
            component.state.transition(LoadingState::Loaded);
        } else {
            fail_component(ctx, id, BootstrapError::CollisionFailure { module: name });
        }
    }
}

fn load_component<R: ModuleRuntime + ?Sized>(
    ctx: &mut BootstrapContext,
    id: ComponentId,
    runtime: &mut R,
    services: &FrameworkServices,
) -> Result<()> {
    let component = ctx.component(id);
    let name = component.assembly_name.clone();
    let Some((provider_id, version)) = component.latest_version_provided_by() else {
        warn!("Component {} has no provider, skipping", name);
        return Ok(());
    };

    let provider = ctx.provider(provider_id);
    let package = provider.package.clone();
    let file = provider.component_file(&name);
    info!(
        "Loading component {} v{} from mod {}",
        name, version, package.package_id
    );

    let bytes = fs::read(&file)
        .map_err(|e| BootstrapError::load(&name, format!("{}: {}", file.display(), e)))?;
    let module = runtime
        .load_module(&name, &bytes)
        .map_err(|e| load_failure(&name, e))?;

    ctx.component_mut(id).module = Some(module.clone());
    ctx.provider_mut(provider_id).modules.push(module.clone());
    ctx.set_module_owner(module.clone(), package.package_id.clone());
    runtime.register_module_owner(&module, &package);
    runtime.invalidate_type_caches();

    let types = runtime.list_types(&module).map_err(|e| {
        load_failure(
            &name,
            RuntimeError {
                message: format!("could not list types: {}", e.message),
                loader_errors: e.loader_errors,
            },
        )
    })?;

    let handle = ComponentHandle::new(&name, ctx.component(id).state.clone());
    let mut entry_ctx = EntryPointContext::new(handle, package.clone(), services.clone());

    let entry_points: Vec<&TypeDescriptor> = types
        .iter()
        .filter(|t| runtime.has_marker(t, MarkerKind::ComponentEntryPoint))
        .collect();
    for ty in entry_points {
        debug!("Running entry point {}", ty.full_name);
        let result = catch(|| {
            runtime
                .run_entry_point(ty, &mut entry_ctx)
                .map_err(|e| BootstrapError::init(&name, format!("{:#}", e)))
        });
        if let Err(e) = result {
            fail_component(ctx, id, e);
        }
    }

    let (init_actions, cleanup_actions) = entry_ctx.into_actions();
    let component = ctx.component_mut(id);
    component.init_actions.extend(init_actions);
    component.cleanup_actions.extend(cleanup_actions);

    if ctx.component(id).state() == LoadingState::Errored {
        return Ok(());
    }

    let mod_classes: Vec<&TypeDescriptor> = types
        .iter()
        .filter(|t| !t.is_abstract && runtime.has_marker(t, MarkerKind::ModClass))
        .collect();
    for ty in mod_classes {
        if runtime.mod_instance_exists(ty) {
            continue;
        }
        let result = catch(|| {
            runtime.instantiate_mod(ty, &package).map_err(|e| {
                BootstrapError::init(&name, format!("error in '{}': {:#}", ty.full_name, e))
            })
        });
        if let Err(e) = result {
            fail_component(ctx, id, e);
            break;
        }
    }

    ctx.component(id).state.transition(LoadingState::Loaded);
    Ok(())
}

fn load_failure(component: &str, e: RuntimeError) -> BootstrapError {
    BootstrapError::LoadFailure {
        component: component.to_string(),
        detail: e.message,
        loader_errors: e.loader_errors,
    }
}

/// Mark a component `Errored` and propagate to its providers and dependents
///
/// Re-failing an `Errored` component is a no-op, which also stops cycles.
pub fn fail_component(ctx: &mut BootstrapContext, id: ComponentId, failure: BootstrapError) {
    let component = ctx.component(id);
    if !component.state.transition(LoadingState::Errored) {
        if component.state() == LoadingState::Initialized {
            debug!(
                "Component {} is already initialized, ignoring: {}",
                component.assembly_name, failure
            );
        }
        return;
    }

    let name = component.assembly_name.clone();
    let providers: Vec<ProviderId> = component.offers.keys().copied().collect();
    let dependents: Vec<ComponentId> = component.dependents.iter().copied().collect();

    ctx.reporter.component_failed(&name, &failure);

    let propagated = BootstrapError::propagated(&name, &failure);
    for provider in providers {
        fail_provider(ctx, provider, propagated.clone());
    }
    for dependent in dependents {
        fail_component(ctx, dependent, propagated.clone());
    }
}

/// Mark a provider `Errored` and report the failure once
pub fn fail_provider(ctx: &mut BootstrapContext, id: ProviderId, failure: BootstrapError) {
    let provider = ctx.provider(id);
    if !provider.state.transition(LoadingState::Errored) {
        if provider.state() == LoadingState::Initialized {
            debug!(
                "Mod {} is already initialized, ignoring: {}",
                provider.package_id(),
                failure
            );
        }
        return;
    }

    let package = provider.package.clone();
    let related = match &failure {
        BootstrapError::MutualRefusal { other_id, .. } => ctx.installed_package(other_id).cloned(),
        _ => None,
    };
    ctx.reporter
        .provider_failed(&package, &failure, related.as_ref());
}

/// Run init actions of every loaded component, then settle loaded providers
///
/// Only the first call has any effect.
pub fn on_host_ready(ctx: &mut BootstrapContext) {
    if !ctx.mark_host_ready() {
        debug!("Host ready signal already handled");
        return;
    }

    for id in ctx.component_ids() {
        if ctx.component(id).state() != LoadingState::Loaded {
            continue;
        }

        let component = ctx.component_mut(id);
        let name = component.assembly_name.clone();
        let init_actions = std::mem::take(&mut component.init_actions);
        let cleanup_actions = std::mem::take(&mut component.cleanup_actions);

        let result = catch(|| {
            for action in init_actions {
                action().map_err(|e| BootstrapError::init(&name, format!("{:#}", e)))?;
            }
            Ok(())
        });

        match result {
            Ok(()) => {
                ctx.component(id).state.transition(LoadingState::Initialized);
                debug!("Initialized component {}", name);
            }
            Err(e) => {
                fail_component(ctx, id, e);
                for action in cleanup_actions {
                    let cleanup = catch(|| action().map_err(|e| BootstrapError::internal(format!("{:#}", e))));
                    if let Err(e) = cleanup {
                        error!("Cleanup of component {} failed: {}", name, e);
                    }
                }
            }
        }
    }

    for provider in ctx.providers() {
        if provider.state.transition(LoadingState::Initialized) {
            info!("Mod {} initialized", provider.package_id());
        }
    }
}
