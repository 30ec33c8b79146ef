//! The seam between patch groups and the host's method-rewriting backend

use crate::error::Result;
use std::fmt;
use tracing::debug;

/// A class of patches, applied and reversed as a unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchClass(String);

impl PatchClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatchClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A patched host method, e.g. `Verse.Root::Update`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef(String);

impl MethodRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One installed patch on a method
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchEntry {
    /// Id of the group that installed it
    pub owner: String,
    /// Fully qualified patch method, for diagnostics
    pub patch_method: String,
    /// Higher runs first
    pub priority: i32,
    /// Owners this patch must run before
    pub before: Vec<String>,
    /// Owners this patch must run after
    pub after: Vec<String>,
    /// Whether the patch can suppress the original method body
    pub can_skip_original: bool,
    /// Opted out of conflict checks
    pub excluded_from_conflict_check: bool,
}

impl PatchEntry {
    /// Whether this patch declares an ordering relative to `owner`
    pub fn is_ordered_against(&self, owner: &str) -> bool {
        self.before.iter().any(|o| o == owner) || self.after.iter().any(|o| o == owner)
    }
}

/// All patches currently installed on one method
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatchInfo {
    /// Patches that run before the original body
    pub prefixes: Vec<PatchEntry>,
    /// Patches that rewrite the original body
    pub transpilers: Vec<PatchEntry>,
}

/// Backend that installs and removes patches in the host process
///
/// Failures from `apply_class` are never swallowed by patch groups; they
/// propagate to whoever subscribed the group.
pub trait PatchApplier {
    /// Install every patch declared by one class under the group id
    fn apply_class(&self, group: &str, class: &PatchClass) -> Result<()>;

    /// Install several classes, stopping at the first failure
    fn apply_all(&self, group: &str, classes: &[PatchClass]) -> Result<()> {
        for class in classes {
            self.apply_class(group, class)?;
        }
        Ok(())
    }

    /// Remove every patch installed under the group id
    fn remove_all(&self, group: &str);

    /// Every method patched by anyone in the process
    fn patched_methods(&self) -> Vec<MethodRef> {
        Vec::new()
    }

    /// Patches installed on one method
    fn patch_info(&self, method: &MethodRef) -> Result<PatchInfo> {
        let _ = method;
        Ok(PatchInfo::default())
    }
}

/// Applier that records nothing and patches nothing
///
/// Used for dry runs where no host process is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPatchApplier;

impl PatchApplier for NoopPatchApplier {
    fn apply_class(&self, group: &str, class: &PatchClass) -> Result<()> {
        debug!("[dry-run] apply {} for {}", class, group);
        Ok(())
    }

    fn remove_all(&self, group: &str) {
        debug!("[dry-run] remove all patches of {}", group);
    }
}
