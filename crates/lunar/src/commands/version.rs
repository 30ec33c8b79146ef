//! Version command

use crate::cli::VersionArgs;
use anyhow::Result;
use serde::Serialize;
use std::fmt;

/// Version information for this build
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: String,
    /// Framework version the bootstrap reports to components
    pub framework: String,
    pub target: Option<String>,
}

impl VersionInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            framework: lunar_bootstrap::BootstrapOptions::default()
                .framework_version
                .to_string(),
            target: option_env!("TARGET").map(String::from),
        }
    }

    pub fn display(&self) -> String {
        let mut parts = vec![format!("lunar {}", self.version)];
        parts.push(format!("(framework {})", self.framework));
        if let Some(target) = &self.target {
            parts.push(target.clone());
        }
        parts.join(" ")
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_version_parses_as_framework_version() {
        let info = VersionInfo::current();
        let parsed: lunar_core::Version = info.version.parse().unwrap();
        assert!(!parsed.is_invalid());
        assert_eq!(info.framework, info.version);
    }

    #[test]
    fn test_display_without_target() {
        let info = VersionInfo {
            version: "1.1.0".to_string(),
            framework: "1.1.0".to_string(),
            target: None,
        };
        assert_eq!(info.display(), "lunar 1.1.0 (framework 1.1.0)");
        assert_eq!(format!("{}", info), info.display());
    }

    #[test]
    fn test_json_contains_version() {
        let json = serde_json::to_value(VersionInfo::current()).unwrap();
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
