//! Resolution and discovery
//!
//! [`discover`] finds every installed package that bundles the framework.
//! [`prepare_all`] then validates each one in load order and merges the
//! components of every provider that passes into the registry. A provider
//! that fails any step is marked `Errored` before any of its declarations
//! are merged.

use crate::activation::fail_provider;
use crate::cleanup::clean_up_old_assemblies;
use crate::error::{BootstrapError, Result};
use crate::guard::guard;
use crate::host::{HostEnvironment, InstalledPackage, ModuleRuntime};
use crate::integrity::{self, IntegrityStatus};
use crate::layout;
use crate::registry::{BootstrapContext, Provider, ProviderId};
use lunar_core::types::{CompatibilityEntry, ComponentDef};
use lunar_core::utils::eq_ignore_case;
use lunar_core::{LoadingState, Manifest, Version};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Register every installed package that bundles a framework copy
///
/// Packages without a framework folder are simply not providers.
pub fn discover<H: HostEnvironment + ?Sized>(ctx: &mut BootstrapContext, host: &H) -> Vec<ProviderId> {
    let installed = host.installed_packages();
    ctx.set_installed(installed.clone());

    let mut found = Vec::new();
    for package in installed {
        let Some(framework_dir) = find_framework_dir(&package) else {
            continue;
        };

        let version = read_declared_version(package.root());
        info!(
            "Found Lunar framework v{} in mod {}",
            version, package.package_id
        );

        let id = ctx.add_provider(package, framework_dir, version);
        if !found.contains(&id) {
            found.push(id);
        }
    }

    debug!("Discovered {} framework providers", found.len());
    found
}

/// First load folder with a framework directory, if it holds the framework binary
pub fn find_framework_dir(package: &InstalledPackage) -> Option<PathBuf> {
    let framework_dir = package
        .load_folders
        .iter()
        .map(|folder| layout::framework_dir_in(folder))
        .find(|dir| dir.is_dir())?;

    if layout::framework_assembly_file_in(&framework_dir).is_file() {
        Some(framework_dir)
    } else {
        debug!(
            "Ignoring {:?}: {} is missing",
            framework_dir,
            layout::FRAMEWORK_ASSEMBLY_FILE
        );
        None
    }
}

/// Declared version from `About/Version.txt`, or [`Version::INVALID`]
pub fn read_declared_version(package_root: &Path) -> Version {
    let path = layout::version_file_in(package_root);
    match fs::read_to_string(&path) {
        Ok(text) => {
            let version = Version::parse_or_invalid(&text);
            if version.is_invalid() {
                warn!("Unreadable framework version in {:?}", path);
            }
            version
        }
        Err(e) => {
            warn!("Failed to read {:?}: {}", path, e);
            Version::INVALID
        }
    }
}

/// Validate every pending provider in load order
pub fn prepare_all<H, R>(
    ctx: &mut BootstrapContext,
    host: &H,
    runtime: &R,
    cleanup_old_assemblies: bool,
) where
    H: HostEnvironment + ?Sized,
    R: ModuleRuntime + ?Sized,
{
    let host_version = host.host_version();

    for id in ctx.provider_ids() {
        if ctx.provider(id).state() != LoadingState::Pending {
            continue;
        }
        guard(
            ctx,
            |ctx| prepare_provider(ctx, id, host_version, runtime, cleanup_old_assemblies),
            |ctx, e| fail_provider(ctx, id, e),
        );
    }
}

fn prepare_provider<R: ModuleRuntime + ?Sized>(
    ctx: &mut BootstrapContext,
    id: ProviderId,
    host_version: Version,
    runtime: &R,
    cleanup_old_assemblies: bool,
) -> Result<()> {
    let provider = ctx.provider(id);
    let manifest_file = provider.manifest_file();
    check_integrity(&provider.version, &manifest_file)?;

    let manifest =
        Manifest::from_file(&manifest_file).map_err(|e| BootstrapError::parse(e.to_string()))?;
    ctx.provider_mut(id).manifest = Some(manifest.clone());

    let provider = ctx.provider(id);
    if !eq_ignore_case(&manifest.package_id, provider.package_id()) {
        return Err(BootstrapError::IdentityMismatch {
            declared: manifest.package_id.clone(),
            installed: provider.package_id().to_string(),
        });
    }

    if let Some(min) = &manifest.min_game_version {
        let required: Version = min
            .parse()
            .map_err(|e: lunar_core::Error| BootstrapError::parse(e.to_string()))?;
        if host_version < required {
            return Err(BootstrapError::VersionRequirementUnmet {
                required,
                current: host_version,
            });
        }
    }

    for entry in manifest.lunar_requirements() {
        check_sibling(ctx, provider, entry)?;
    }

    for entry in manifest.refusals() {
        if let Some(other) = ctx.installed_package(&entry.package_id) {
            return Err(BootstrapError::MutualRefusal {
                other_id: other.package_id.clone(),
                other_name: other.name.clone(),
                min_version: None,
            });
        }
    }

    if cleanup_old_assemblies {
        let moved = clean_up_old_assemblies(&provider.package, &provider.framework_dir)?;
        ctx.record_cleanup(moved);
    }

    let provider = ctx.provider(id);
    let offered = manifest
        .components()
        .iter()
        .map(|decl| validate_component(provider, decl, runtime))
        .collect::<Result<Vec<Version>>>()?;

    for (decl, version) in manifest.components().iter().zip(offered) {
        let component = ctx.find_or_create_component(&decl.assembly_name);
        ctx.component_mut(component).merge_declaration(id, version, decl);
    }

    debug!(
        "Mod {} offers {} components",
        ctx.provider(id).package_id(),
        manifest.components().len()
    );
    Ok(())
}

/// An installed sibling must itself be a provider at the required minimum version
fn check_sibling(ctx: &BootstrapContext, provider: &Provider, entry: &CompatibilityEntry) -> Result<()> {
    if eq_ignore_case(&entry.package_id, provider.package_id()) {
        return Ok(());
    }
    let Some(other) = ctx.installed_package(&entry.package_id) else {
        return Ok(());
    };

    let min_version = entry
        .min_version
        .as_deref()
        .map(|v| v.parse::<Version>())
        .transpose()
        .map_err(|e| BootstrapError::parse(e.to_string()))?;

    let satisfied = match ctx.provider_by_package(&other.package_id) {
        Some(sibling) => min_version.map_or(true, |min| sibling.version >= min),
        None => false,
    };

    if satisfied {
        Ok(())
    } else {
        Err(BootstrapError::MutualRefusal {
            other_id: other.package_id.clone(),
            other_name: other.name.clone(),
            min_version,
        })
    }
}

fn check_integrity(version: &Version, payload: &Path) -> Result<()> {
    match integrity::check(version, payload) {
        IntegrityStatus::Valid => Ok(()),
        IntegrityStatus::CheckFileMissing => Err(BootstrapError::integrity(format!(
            "file is missing: {}",
            integrity::check_file_for(payload).display()
        ))),
        IntegrityStatus::Mismatch => Err(BootstrapError::integrity(format!(
            "file is damaged or incomplete: {}",
            payload.display()
        ))),
    }
}

/// Check one declared binary and return the version it embeds
fn validate_component<R: ModuleRuntime + ?Sized>(
    provider: &Provider,
    decl: &ComponentDef,
    runtime: &R,
) -> Result<Version> {
    let file = provider.component_file(&decl.assembly_name);
    if !file.is_file() {
        return Err(BootstrapError::integrity(format!(
            "file is missing: {}",
            file.display()
        )));
    }

    check_integrity(&provider.version, &file)?;

    let version = runtime.file_version(&file);
    if version.is_invalid() {
        return Err(BootstrapError::integrity(format!(
            "file has invalid version info: {}",
            file.display()
        )));
    }

    Ok(version)
}
