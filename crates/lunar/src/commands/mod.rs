//! CLI command implementations

pub mod checkfile;
pub mod manifest;
pub mod scan;
pub mod version;
