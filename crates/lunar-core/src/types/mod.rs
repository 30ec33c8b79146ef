//! Type definitions shared across Lunar crates

mod loading_state;
mod manifest_types;
mod version;

pub use loading_state::*;
pub use manifest_types::*;
pub use version::*;
