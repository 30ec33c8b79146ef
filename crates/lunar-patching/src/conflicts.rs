//! Advisory detection of conflicting destructive patches
//!
//! A prefix that can skip the original method, installed by someone else on
//! a method we also control, will silently disable our patch if it runs
//! first. This module reports such pairs; it never changes patch state.

use crate::applier::{MethodRef, PatchApplier, PatchEntry, PatchInfo};
use tracing::warn;

/// Walk every patched method and report foreign patches that may override ours
///
/// `owner` is the group id whose patches are "ours"; `is_interesting` further
/// restricts which of our patches are checked. Methods whose patch info
/// cannot be read are logged and skipped.
pub fn check_conflicts(
    applier: &dyn PatchApplier,
    owner: &str,
    is_interesting: impl Fn(&PatchEntry) -> bool,
    mut on_conflict: impl FnMut(&MethodRef, &PatchEntry),
) {
    for method in applier.patched_methods() {
        match applier.patch_info(&method) {
            Ok(info) => {
                for other in conflicts_in(&info, owner, &is_interesting) {
                    on_conflict(&method, other);
                }
            }
            Err(e) => warn!("Error while checking for conflicts on {}: {}", method, e),
        }
    }
}

/// Foreign prefixes on one method that conflict with our first prefix or transpiler
pub fn conflicts_in<'a>(
    info: &'a PatchInfo,
    owner: &str,
    is_interesting: impl Fn(&PatchEntry) -> bool,
) -> Vec<&'a PatchEntry> {
    let ours = |p: &&PatchEntry| p.owner == owner && is_interesting(p);
    let prefix = info.prefixes.iter().find(ours);
    let transpiler = info.transpilers.iter().find(ours);

    if prefix.is_none() && transpiler.is_none() {
        return Vec::new();
    }

    info.prefixes
        .iter()
        .filter(|other| other.owner != owner)
        .filter(|other| other.can_skip_original)
        .filter(|other| match (transpiler, prefix) {
            // our prefix alone only loses to prefixes that run before it
            (None, Some(prefix)) => other.priority >= prefix.priority,
            _ => true,
        })
        .filter(|other| !prefix.is_some_and(|p| p.is_ordered_against(&other.owner)))
        .filter(|other| !transpiler.is_some_and(|t| t.is_ordered_against(&other.owner)))
        .collect()
}
