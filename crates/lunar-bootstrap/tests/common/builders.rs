//! Fluent builders for framework packages
//!
//! A [`ModBuilder`] writes a complete package: `About/Version.txt`, the
//! framework binary, the manifest and every component, each with a check
//! file keyed to the package's framework version.

#![allow(dead_code)]

use super::fixtures::{fake_assembly, write_file, write_with_check_file};
use lunar_bootstrap::integrity::check_file_for;
use lunar_bootstrap::layout;
use lunar_bootstrap::InstalledPackage;
use lunar_core::Version;
use std::fs;
use std::path::Path;

/// One component declared by a package
#[derive(Debug, Clone)]
pub struct ComponentSpec {
    pub name: String,
    pub allow_foreign: bool,
    pub aliases: Vec<String>,
    pub depends_on: Vec<String>,
    pub file_version: Option<String>,
    pub check_file: bool,
    pub write_binary: bool,
}

impl ComponentSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            allow_foreign: false,
            aliases: Vec::new(),
            depends_on: Vec::new(),
            file_version: Some("1.0.0.0".to_string()),
            check_file: true,
            write_binary: true,
        }
    }

    /// Tolerate a copy of the binary not loaded by the framework
    pub fn foreign(mut self) -> Self {
        self.allow_foreign = true;
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn depends_on(mut self, name: &str) -> Self {
        self.depends_on.push(name.to_string());
        self
    }

    /// `FileVersion` embedded in the binary, which is the version offered
    pub fn file_version(mut self, version: &str) -> Self {
        self.file_version = Some(version.to_string());
        self
    }

    pub fn without_version_info(mut self) -> Self {
        self.file_version = None;
        self
    }

    pub fn without_check_file(mut self) -> Self {
        self.check_file = false;
        self
    }

    pub fn without_binary(mut self) -> Self {
        self.write_binary = false;
        self
    }
}

/// Builder for an installed package bundling the framework
pub struct ModBuilder {
    package_id: String,
    name: String,
    framework_version: String,
    url: Option<String>,
    min_game_version: Option<String>,
    lunar: Vec<(String, Option<String>)>,
    refuse: Vec<String>,
    components: Vec<ComponentSpec>,
    manifest_package_id: Option<String>,
    raw_manifest: Option<String>,
    manifest_check_file: bool,
    check_file_version: Option<String>,
    legacy_assemblies: Vec<String>,
    backup_dir: bool,
    framework: bool,
    folder: Option<String>,
}

impl ModBuilder {
    pub fn new(package_id: &str, name: &str) -> Self {
        Self {
            package_id: package_id.to_string(),
            name: name.to_string(),
            framework_version: "1.0.0".to_string(),
            url: None,
            min_game_version: None,
            lunar: Vec::new(),
            refuse: Vec::new(),
            components: Vec::new(),
            manifest_package_id: None,
            raw_manifest: None,
            manifest_check_file: true,
            check_file_version: None,
            legacy_assemblies: Vec::new(),
            backup_dir: false,
            framework: true,
            folder: None,
        }
    }

    /// A package that does not bundle the framework at all
    pub fn plain(package_id: &str, name: &str) -> Self {
        let mut builder = Self::new(package_id, name);
        builder.framework = false;
        builder
    }

    pub fn version(mut self, version: &str) -> Self {
        self.framework_version = version.to_string();
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Install under a different folder name, e.g. a workshop id
    pub fn folder(mut self, folder: &str) -> Self {
        self.folder = Some(folder.to_string());
        self
    }

    pub fn min_game_version(mut self, version: &str) -> Self {
        self.min_game_version = Some(version.to_string());
        self
    }

    pub fn requires_sibling(mut self, package_id: &str, min_version: Option<&str>) -> Self {
        self.lunar
            .push((package_id.to_string(), min_version.map(str::to_string)));
        self
    }

    pub fn refuses(mut self, package_id: &str) -> Self {
        self.refuse.push(package_id.to_string());
        self
    }

    pub fn component(mut self, spec: ComponentSpec) -> Self {
        self.components.push(spec);
        self
    }

    /// Declare a different package id in the manifest
    pub fn manifest_package_id(mut self, package_id: &str) -> Self {
        self.manifest_package_id = Some(package_id.to_string());
        self
    }

    /// Replace the generated manifest with raw text
    pub fn raw_manifest(mut self, xml: &str) -> Self {
        self.raw_manifest = Some(xml.to_string());
        self
    }

    pub fn without_manifest_check_file(mut self) -> Self {
        self.manifest_check_file = false;
        self
    }

    /// Key every check file to another version than the declared one
    pub fn check_files_for(mut self, version: &str) -> Self {
        self.check_file_version = Some(version.to_string());
        self
    }

    /// Leave a pre-framework binary in `Assemblies/`
    pub fn legacy_assembly(mut self, file_name: &str) -> Self {
        self.legacy_assemblies.push(file_name.to_string());
        self
    }

    pub fn with_backup_dir(mut self) -> Self {
        self.backup_dir = true;
        self
    }

    pub fn manifest_xml(&self) -> String {
        if let Some(raw) = &self.raw_manifest {
            return raw.clone();
        }

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<Manifest>\n");
        xml.push_str(&format!("  <Name>{}</Name>\n", self.name));
        xml.push_str(&format!(
            "  <PackageId>{}</PackageId>\n",
            self.manifest_package_id.as_deref().unwrap_or(&self.package_id)
        ));
        if let Some(min) = &self.min_game_version {
            xml.push_str(&format!("  <MinGameVersion>{}</MinGameVersion>\n", min));
        }

        if !self.lunar.is_empty() || !self.refuse.is_empty() {
            xml.push_str("  <Compatibility>\n");
            if !self.lunar.is_empty() {
                xml.push_str("    <Lunar>\n");
                for (id, min) in &self.lunar {
                    xml.push_str(&format!("      <li><PackageId>{}</PackageId>", id));
                    if let Some(min) = min {
                        xml.push_str(&format!("<MinVersion>{}</MinVersion>", min));
                    }
                    xml.push_str("</li>\n");
                }
                xml.push_str("    </Lunar>\n");
            }
            if !self.refuse.is_empty() {
                xml.push_str("    <Refuse>\n");
                for id in &self.refuse {
                    xml.push_str(&format!("      <li><PackageId>{}</PackageId></li>\n", id));
                }
                xml.push_str("    </Refuse>\n");
            }
            xml.push_str("  </Compatibility>\n");
        }

        xml.push_str("  <Components>\n");
        for c in &self.components {
            xml.push_str("    <li>\n");
            xml.push_str(&format!("      <AssemblyName>{}</AssemblyName>\n", c.name));
            xml.push_str(&format!(
                "      <AllowNonLunarSource>{}</AllowNonLunarSource>\n",
                c.allow_foreign
            ));
            if !c.aliases.is_empty() {
                xml.push_str(&format!("      <Aliases>{}</Aliases>\n", li_items(&c.aliases)));
            }
            if !c.depends_on.is_empty() {
                xml.push_str(&format!(
                    "      <DependsOn>{}</DependsOn>\n",
                    li_items(&c.depends_on)
                ));
            }
            xml.push_str("    </li>\n");
        }
        xml.push_str("  </Components>\n</Manifest>\n");
        xml
    }

    /// Write the package under `mods_dir`
    pub fn build(&self, mods_dir: &Path) -> InstalledPackage {
        let root = mods_dir.join(self.folder.as_deref().unwrap_or(&self.package_id));
        fs::create_dir_all(&root).expect("Failed to create package root");

        let mut package = InstalledPackage::new(&self.package_id, self.name.clone(), &root);
        if let Some(url) = &self.url {
            package = package.with_url(url.clone());
        }

        for file_name in &self.legacy_assemblies {
            write_file(
                &layout::assemblies_dir_in(&root).join(file_name),
                fake_assembly(file_name, Some("0.9.0.0")),
            );
        }

        if !self.framework {
            return package;
        }

        write_file(&layout::version_file_in(&root), &self.framework_version);
        let key = Version::parse_or_invalid(
            self.check_file_version
                .as_deref()
                .unwrap_or(&self.framework_version),
        );

        let framework_dir = layout::framework_dir_in(&root);
        write_with_check_file(
            &layout::framework_assembly_file_in(&framework_dir),
            fake_assembly("LunarFramework", Some("1.0.0.0")),
            &key,
        );

        let manifest = layout::manifest_file_in(&framework_dir);
        write_with_check_file(&manifest, self.manifest_xml(), &key);
        if !self.manifest_check_file {
            fs::remove_file(check_file_for(&manifest)).expect("Failed to remove check file");
        }

        let components_dir = layout::components_dir_in(&framework_dir);
        for c in &self.components {
            if !c.write_binary {
                continue;
            }
            let file = layout::component_file_in(&components_dir, &c.name);
            write_with_check_file(&file, fake_assembly(&c.name, c.file_version.as_deref()), &key);
            if !c.check_file {
                fs::remove_file(check_file_for(&file)).expect("Failed to remove check file");
            }
        }

        if self.backup_dir {
            fs::create_dir_all(layout::backup_dir_in(&framework_dir))
                .expect("Failed to create backup dir");
        }

        package
    }
}

fn li_items(items: &[String]) -> String {
    items.iter().map(|i| format!("<li>{}</li>", i)).collect()
}
