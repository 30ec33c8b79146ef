//! Configuration loading and management

mod loader;

pub use loader::{LunarConfig, CONFIG_FILE_NAME};
