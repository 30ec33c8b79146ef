//! Compatibility adapters
//!
//! A component can ship adapter types for other mods. Each adapter names the
//! module it targets; when that module is present its patch classes go into a
//! sub-group of the component's patch group named after the target.

use crate::error::BootstrapError;
use crate::guard::catch;
use crate::host::{MarkerKind, ModuleRuntime, TypeDescriptor};
use lunar_core::utils::eq_ignore_case;
use lunar_patching::{PatchClass, PatchGroup};
use std::time::Duration;
use tracing::{debug, error, info};

/// An adapter that patches another mod when it is loaded
pub trait ModCompat {
    /// Name of the module this adapter targets
    fn target_module(&self) -> &str;

    fn display_name(&self) -> &str {
        self.target_module()
    }

    /// Prepare the adapter; returning `Ok(false)` skips its patches
    fn on_apply(&mut self) -> anyhow::Result<bool> {
        Ok(true)
    }

    fn patch_classes(&self) -> Vec<PatchClass> {
        Vec::new()
    }
}

/// Instantiate and apply every adapter type among `types`
///
/// Returns how many adapters contributed patches. Failures are logged and
/// never stop the remaining adapters.
pub fn apply_all<R: ModuleRuntime + ?Sized>(
    runtime: &mut R,
    types: &[TypeDescriptor],
    group: &PatchGroup,
) -> usize {
    let loaded = runtime.loaded_module_names();
    let mut applied = 0;

    for ty in types {
        if ty.is_abstract || !runtime.has_marker(ty, MarkerKind::CompatAdapter) {
            continue;
        }

        let mut compat = match runtime.create_compat(ty) {
            Ok(compat) => compat,
            Err(e) => {
                error!("Failed to create compatibility patches from {}: {:#}", ty.full_name, e);
                continue;
            }
        };

        let target = compat.target_module().to_string();
        if !loaded.iter().any(|m| eq_ignore_case(m, &target)) {
            debug!("Skipping {}: {} is not loaded", ty.full_name, target);
            continue;
        }

        let result = catch(|| {
            let enabled = compat
                .on_apply()
                .map_err(|e| BootstrapError::internal(format!("{:#}", e)))?;
            let classes = compat.patch_classes();
            if !enabled || classes.is_empty() {
                return Ok(false);
            }
            let sub_group = group
                .new_sub_group(&target, Duration::ZERO)
                .map_err(|e| BootstrapError::internal(e.to_string()))?;
            for class in classes {
                sub_group
                    .add_patch_class(class)
                    .map_err(|e| BootstrapError::internal(e.to_string()))?;
            }
            Ok(true)
        });

        match result {
            Ok(true) => {
                info!("Applied compatibility patches for {}", compat.display_name());
                applied += 1;
            }
            Ok(false) => debug!("Compatibility adapter for {} has nothing to apply", target),
            Err(e) => error!(
                "Failed to apply compatibility patches for {}: {}",
                compat.display_name(),
                e
            ),
        }
    }

    applied
}
