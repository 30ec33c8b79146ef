//! Failure taxonomy for providers and components

use lunar_core::Version;
use serde::Serialize;
use thiserror::Error;

/// Result type alias using lunar-bootstrap's error type
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// How a failure is surfaced to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Files are missing or corrupted; prompt to redownload after startup
    AskRedownload,
    /// The host is too old; prompt to update it
    UpdateHost,
    /// Logged only; a redownload would not help
    LogOnly,
}

/// Why a provider or component failed
///
/// The display text completes the sentence "Failed to load mod 'X', ...".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BootstrapError {
    /// A payload or its check file is missing or does not match
    #[error("{detail}")]
    IntegrityFailure { detail: String },

    /// The manifest could not be read
    #[error("an error occurred while reading its manifest file: {detail}")]
    ParseFailure { detail: String },

    /// The manifest names a different package than the one installed
    #[error("its metadata is damaged or incomplete (manifest declares '{declared}', installed as '{installed}')")]
    IdentityMismatch { declared: String, installed: String },

    /// The running host is older than the manifest requires
    #[error("it requires game version {required} or later (running {current})")]
    VersionRequirementUnmet { required: Version, current: Version },

    /// Explicit refusal, or a required sibling that is absent from the framework or too old
    #[error("{}", refusal_text(other_name, min_version))]
    MutualRefusal {
        other_id: String,
        other_name: String,
        min_version: Option<Version>,
    },

    /// A module with this name is already present and may not be replaced
    #[error("assembly '{module}' is already loaded")]
    CollisionFailure { module: String },

    /// The component binary could not be loaded or inspected
    #[error("failed to load assembly '{component}': {detail}")]
    LoadFailure {
        component: String,
        detail: String,
        loader_errors: Vec<String>,
    },

    /// Code supplied by the component failed
    #[error("an error occurred during initialization of '{component}': {detail}")]
    InitFailure { component: String, detail: String },

    /// Inherited from a failed component this one depends on or supplies
    #[error("component '{origin}' failed: {detail}")]
    DependencyPropagated { origin: String, detail: String },

    /// Unexpected fault, including panics caught by the guard
    #[error("an unknown error occurred: {detail}")]
    Internal { detail: String },
}

fn refusal_text(other_name: &str, min_version: &Option<Version>) -> String {
    match min_version {
        Some(min) => format!(
            "it is incompatible with old versions of '{}'. Update '{}' to version {} or newer to fix this problem.",
            other_name, other_name, min
        ),
        None => format!("it is incompatible with '{}'.", other_name),
    }
}

impl BootstrapError {
    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::IntegrityFailure {
            detail: detail.into(),
        }
    }

    pub fn parse(detail: impl Into<String>) -> Self {
        Self::ParseFailure {
            detail: detail.into(),
        }
    }

    pub fn load(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::LoadFailure {
            component: component.into(),
            detail: detail.into(),
            loader_errors: Vec::new(),
        }
    }

    pub fn init(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InitFailure {
            component: component.into(),
            detail: detail.into(),
        }
    }

    pub fn propagated(origin: impl Into<String>, cause: &BootstrapError) -> Self {
        Self::DependencyPropagated {
            origin: origin.into(),
            detail: cause.to_string(),
        }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// Short machine-readable name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IntegrityFailure { .. } => "integrity",
            Self::ParseFailure { .. } => "parse",
            Self::IdentityMismatch { .. } => "identity_mismatch",
            Self::VersionRequirementUnmet { .. } => "version_requirement",
            Self::MutualRefusal { .. } => "refusal",
            Self::CollisionFailure { .. } => "collision",
            Self::LoadFailure { .. } => "load",
            Self::InitFailure { .. } => "init",
            Self::DependencyPropagated { .. } => "propagated",
            Self::Internal { .. } => "internal",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::IntegrityFailure { .. }
            | Self::ParseFailure { .. }
            | Self::IdentityMismatch { .. } => Severity::AskRedownload,
            Self::VersionRequirementUnmet { .. } => Severity::UpdateHost,
            Self::MutualRefusal {
                min_version: Some(_),
                ..
            } => Severity::AskRedownload,
            Self::MutualRefusal { .. }
            | Self::CollisionFailure { .. }
            | Self::LoadFailure { .. }
            | Self::InitFailure { .. }
            | Self::DependencyPropagated { .. }
            | Self::Internal { .. } => Severity::LogOnly,
        }
    }
}
