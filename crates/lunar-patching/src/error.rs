//! Error types for lunar-patching

use thiserror::Error;

/// Result type alias using lunar-patching's error type
pub type Result<T> = std::result::Result<T, PatchError>;

/// Errors raised by a [`crate::PatchApplier`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Installing a patch class into the host failed
    #[error("Failed to apply patch class {class} for group {group}: {message}")]
    ApplyFailed {
        group: String,
        class: String,
        message: String,
    },

    /// Patch information for a method could not be read
    #[error("Failed to query patches on {method}: {message}")]
    QueryFailed { method: String, message: String },
}

impl PatchError {
    pub fn apply_failed(
        group: impl Into<String>,
        class: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ApplyFailed {
            group: group.into(),
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn query_failed(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            method: method.into(),
            message: message.into(),
        }
    }
}
