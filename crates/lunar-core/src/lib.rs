//! # lunar-core
//!
//! Core library for the Lunar framework providing:
//! - Four-part framework versions with the `0.0.0.0` invalid sentinel
//! - The shared loading-state machine used by providers and components
//! - The framework manifest model (Manifest.xml)
//! - Configuration loading (lunar.yaml)

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::LunarConfig;
pub use error::{Error, Result};
pub use types::{LoadingState, LoadingStateCell, Manifest, Version};
pub use utils::get_home_dir;
