//! # lunar-bootstrap
//!
//! Finds every installed package that bundles a copy of the Lunar framework,
//! verifies what it ships, decides which version of each shared component
//! wins, loads the winners into the host and drives their initialization.
//!
//! The host process is reached only through two traits:
//! [`HostEnvironment`] (installed packages, host version, user prompts) and
//! [`ModuleRuntime`] (loading binaries and inspecting their types).
//! [`Bootstrap`] ties both to the host's lifecycle callbacks.
//!
//! Failures are always local: a broken provider or component ends up
//! `Errored` with a [`FailureRecord`], and everything else keeps loading.

pub mod activation;
pub mod api;
pub mod cleanup;
pub mod compat;
pub mod discovery;
pub mod entrypoint;
pub mod error;
pub mod fs_host;
pub mod guard;
pub mod host;
pub mod integrity;
pub mod layout;
pub mod registry;
pub mod report;

pub use api::{ComponentHandle, EntryPointContext, FrameworkServices, LunarApi};
pub use compat::ModCompat;
pub use entrypoint::{Bootstrap, BootstrapOptions, Phase, RunOutcome};
pub use error::{BootstrapError, Result, Severity};
pub use fs_host::{DryRunRuntime, FsHost};
pub use host::{
    HostEnvironment, InstalledPackage, Marker, MarkerKind, ModuleHandle, ModuleRuntime,
    RuntimeError, TypeDescriptor,
};
pub use integrity::IntegrityStatus;
pub use registry::{BootstrapContext, Component, ComponentId, Provider, ProviderId};
pub use report::{FailureRecord, Notice, ScanSummary, Subject, UpdateLink};
