//! # lunar-patching
//!
//! Patch management for Lunar components:
//! - [`PatchGroup`]: a reference-counted tree of patch classes that is applied
//!   while at least one [`Subscriber`] holds it and reversed (optionally after
//!   a grace delay) when the last one lets go
//! - [`PatchApplier`]: the seam to whatever actually rewrites host methods
//! - [`LifecycleHooks`]: deferred actions driven by host frame ticks
//! - Conflict detection between a group's patches and foreign patches

pub mod applier;
pub mod clock;
pub mod conflicts;
pub mod error;
pub mod group;
pub mod hooks;
pub mod subscriber;

pub use applier::{MethodRef, NoopPatchApplier, PatchApplier, PatchClass, PatchEntry, PatchInfo};
pub use clock::{Clock, ManualClock, SystemClock};
pub use conflicts::{check_conflicts, conflicts_in};
pub use error::{PatchError, Result};
pub use group::{PatchClassDecl, PatchEnv, PatchGroup};
pub use hooks::{panic_message, LifecycleHooks};
pub use subscriber::Subscriber;
