//! Framework manifest (Lunar/Manifest.xml)
//!
//! ```xml
//! <Manifest>
//!   <Name>My Mod</Name>
//!   <PackageId>author.mymod</PackageId>
//!   <Authors>Author</Authors>
//!   <MinGameVersion>1.5</MinGameVersion>
//!   <Compatibility>
//!     <Lunar><li><PackageId>author.othermod</PackageId><MinVersion>1.2</MinVersion></li></Lunar>
//!     <Refuse><li><PackageId>someone.conflicting</PackageId></li></Refuse>
//!   </Compatibility>
//!   <Components>
//!     <li>
//!       <AssemblyName>MyModCore</AssemblyName>
//!       <AllowNonLunarSource>false</AllowNonLunarSource>
//!       <Aliases><li>MyModCoreLegacy</li></Aliases>
//!       <DependsOn><li>LunarFramework</li></DependsOn>
//!     </li>
//!   </Components>
//! </Manifest>
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A `<li>`-item list as written in game XML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlList<T> {
    #[serde(rename = "li", default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for XmlList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> From<Vec<T>> for XmlList<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

/// Declarative description of one mod's framework bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Manifest {
    /// Display name
    pub name: String,

    /// Package id, cross-checked against the installed package
    pub package_id: String,

    #[serde(default)]
    pub authors: Option<String>,

    /// Minimum host (game) version, dotted
    #[serde(default)]
    pub min_game_version: Option<String>,

    #[serde(default)]
    pub compatibility: Option<CompatibilityList>,

    /// Shared components this mod offers
    pub components: XmlList<ComponentDef>,
}

/// Compatibility directives against other installed packages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompatibilityList {
    /// Sibling framework copies that must be at least the given version
    #[serde(default)]
    pub lunar: Option<XmlList<CompatibilityEntry>>,

    /// Packages that must not be installed alongside this one
    #[serde(default)]
    pub refuse: Option<XmlList<CompatibilityEntry>>,
}

/// One compatibility directive; `min_version` only matters in `Lunar`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompatibilityEntry {
    pub package_id: String,

    #[serde(default)]
    pub min_version: Option<String>,
}

/// Declaration of one shared component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComponentDef {
    /// Base name of the backing binary (`<AssemblyName>.dll`)
    pub assembly_name: String,

    /// Whether a copy not sourced from the framework may satisfy this slot
    #[serde(default)]
    pub allow_non_lunar_source: bool,

    #[serde(default)]
    pub aliases: Option<XmlList<String>>,

    #[serde(default)]
    pub depends_on: Option<XmlList<String>>,
}

impl ComponentDef {
    pub fn aliases(&self) -> &[String] {
        self.aliases.as_ref().map(|l| l.items.as_slice()).unwrap_or(&[])
    }

    pub fn depends_on(&self) -> &[String] {
        self.depends_on
            .as_ref()
            .map(|l| l.items.as_slice())
            .unwrap_or(&[])
    }
}

impl Manifest {
    /// Read and validate a manifest file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading manifest from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_xml(&content)
    }

    /// Parse and validate manifest XML
    pub fn from_xml(xml: &str) -> Result<Self> {
        let manifest: Manifest = quick_xml::de::from_str(xml)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Reject manifests whose required fields are present but blank
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("Name"));
        }
        if self.package_id.trim().is_empty() {
            return Err(Error::missing_field("PackageId"));
        }
        for component in self.components() {
            if component.assembly_name.trim().is_empty() {
                return Err(Error::missing_field("Components.li.AssemblyName"));
            }
        }
        for entry in self.lunar_requirements().iter().chain(self.refusals()) {
            if entry.package_id.trim().is_empty() {
                return Err(Error::missing_field("Compatibility.li.PackageId"));
            }
        }
        Ok(())
    }

    pub fn components(&self) -> &[ComponentDef] {
        &self.components.items
    }

    /// Required minimum versions of sibling framework providers
    pub fn lunar_requirements(&self) -> &[CompatibilityEntry] {
        self.compatibility
            .as_ref()
            .and_then(|c| c.lunar.as_ref())
            .map(|l| l.items.as_slice())
            .unwrap_or(&[])
    }

    /// Packages this mod refuses to run alongside
    pub fn refusals(&self) -> &[CompatibilityEntry] {
        self.compatibility
            .as_ref()
            .and_then(|c| c.refuse.as_ref())
            .map(|l| l.items.as_slice())
            .unwrap_or(&[])
    }
}
