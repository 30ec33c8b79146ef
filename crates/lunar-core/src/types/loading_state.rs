//! Loading-state machine shared by providers and components
//!
//! ```text
//! Pending ──► Loaded ──► Initialized
//!    │          │
//!    └──────────┴──► Errored (terminal)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a provider or component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingState {
    /// Discovered, not yet loaded
    #[default]
    Pending,
    /// Binary loaded (or satisfied by a pre-existing copy)
    Loaded,
    /// Init actions have run
    Initialized,
    /// Failed; never leaves this state
    Errored,
}

impl LoadingState {
    /// Whether the machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: LoadingState) -> bool {
        use LoadingState::*;
        matches!(
            (self, next),
            (Pending, Loaded) | (Loaded, Initialized) | (Pending, Errored) | (Loaded, Errored)
        )
    }

    pub fn is_errored(self) -> bool {
        self == LoadingState::Errored
    }

    fn to_u8(self) -> u8 {
        match self {
            LoadingState::Pending => 0,
            LoadingState::Loaded => 1,
            LoadingState::Initialized => 2,
            LoadingState::Errored => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => LoadingState::Pending,
            1 => LoadingState::Loaded,
            2 => LoadingState::Initialized,
            _ => LoadingState::Errored,
        }
    }
}

impl fmt::Display for LoadingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadingState::Pending => "pending",
            LoadingState::Loaded => "loaded",
            LoadingState::Initialized => "initialized",
            LoadingState::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// Shared, forward-only loading state
///
/// The registry owns one cell per provider/component; handles given to
/// component code clone it so they observe transitions made later.
#[derive(Debug, Clone, Default)]
pub struct LoadingStateCell(Arc<AtomicU8>);

impl LoadingStateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> LoadingState {
        LoadingState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if the state machine allows it
    ///
    /// Returns false and leaves the state untouched for illegal transitions,
    /// including any attempt to leave `Errored`.
    pub fn transition(&self, next: LoadingState) -> bool {
        let current = self.get();
        if !current.can_transition_to(next) {
            return false;
        }
        self.0
            .compare_exchange(
                current.to_u8(),
                next.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}
