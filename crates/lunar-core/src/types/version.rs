//! Dotted framework versions
//!
//! Versions have two to four numeric components (`major.minor[.build[.revision]]`).
//! Display reproduces exactly the components that were parsed, which matters
//! because the textual form is part of every check-file digest: `1.2` and
//! `1.2.0` are different versions and produce different digests.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A two to four component dotted version
///
/// Ordering compares component by component; a missing component sorts
/// before any present one, so `1.2 < 1.2.0 < 1.2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Version {
    major: u32,
    minor: u32,
    build: Option<u32>,
    revision: Option<u32>,
}

impl Version {
    /// Sentinel for unreadable or unparseable version information
    pub const INVALID: Version = Version {
        major: 0,
        minor: 0,
        build: Some(0),
        revision: Some(0),
    };

    /// Create a two-component version
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            build: None,
            revision: None,
        }
    }

    /// Create a three-component version
    pub const fn with_build(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: None,
        }
    }

    /// Create a four-component version
    pub const fn full(major: u32, minor: u32, build: u32, revision: u32) -> Self {
        Self {
            major,
            minor,
            build: Some(build),
            revision: Some(revision),
        }
    }

    /// Parse a version, returning the invalid sentinel on any failure
    pub fn parse_or_invalid(text: &str) -> Self {
        text.parse().unwrap_or(Self::INVALID)
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn build(&self) -> Option<u32> {
        self.build
    }

    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Whether this is the `0.0.0.0` sentinel
    pub fn is_invalid(&self) -> bool {
        *self == Self::INVALID
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let parts: Vec<&str> = trimmed.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(Error::invalid_version(trimmed));
        }

        let mut numbers = Vec::with_capacity(parts.len());
        for part in &parts {
            // components are signed 32-bit on the host side
            let n: u32 = part
                .parse()
                .map_err(|_| Error::invalid_version(trimmed))?;
            if n > i32::MAX as u32 {
                return Err(Error::invalid_version(trimmed));
            }
            numbers.push(n);
        }

        Ok(Self {
            major: numbers[0],
            minor: numbers[1],
            build: numbers.get(2).copied(),
            revision: numbers.get(3).copied(),
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
            if let Some(revision) = self.revision {
                write!(f, ".{}", revision)?;
            }
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
