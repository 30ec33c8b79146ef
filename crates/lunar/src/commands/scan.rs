//! Scan command
//!
//! Drives a complete bootstrap lifecycle over a mods directory: discovery,
//! validation, dry-run loading, host-ready, main menu and shutdown. Nothing
//! is loaded into any process; binaries are only read and inspected.

use anyhow::{anyhow, Context, Result};
use camino::Utf8PathBuf;
use lunar_bootstrap::{
    Bootstrap, BootstrapOptions, DryRunRuntime, FsHost, Notice, RunOutcome, ScanSummary,
};
use lunar_core::{LunarConfig, Version};
use lunar_patching::{NoopPatchApplier, SystemClock};
use serde::Serialize;
use std::rc::Rc;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::cli::ScanArgs;
use crate::output;

/// Everything a scan found, as printed or serialized
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub mods_dir: Utf8PathBuf,
    pub host_version: Version,
    pub restart_requested: bool,
    #[serde(flatten)]
    pub summary: ScanSummary,
    pub notices: Vec<Notice>,
}

pub fn run(args: ScanArgs, config: &LunarConfig) -> Result<()> {
    let mods_dir = args
        .mods_dir
        .clone()
        .or_else(|| config.mods_dir.clone())
        .ok_or_else(|| anyhow!("No mods directory given. Pass --mods-dir or set mods_dir in lunar.yaml"))?;
    if !mods_dir.is_dir() {
        return Err(anyhow!("Mods directory {} does not exist", mods_dir));
    }

    let host_version = match &args.host_version {
        Some(text) => text
            .parse::<Version>()
            .with_context(|| format!("'{}' is not a game version", text))?,
        None => config.host_version.ok_or_else(|| {
            anyhow!("No game version given. Pass --host-version or set host_version in lunar.yaml")
        })?,
    };

    let mut options = BootstrapOptions::from_config(config);
    if args.no_cleanup {
        options.cleanup_old_assemblies = false;
    }

    let report = scan(mods_dir, host_version, options, config.preloaded_modules.clone());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Run one full lifecycle over `mods_dir`
pub fn scan(
    mods_dir: Utf8PathBuf,
    host_version: Version,
    options: BootstrapOptions,
    preloaded: Vec<String>,
) -> ScanReport {
    info!("Scanning {} as game version {}", mods_dir, host_version);

    let mut bootstrap = Bootstrap::new(
        FsHost::new(mods_dir.as_std_path(), host_version),
        DryRunRuntime::new(preloaded),
        Rc::new(NoopPatchApplier),
        Rc::new(SystemClock),
        options,
    );

    if bootstrap.run() == RunOutcome::Completed {
        bootstrap.on_static_init_complete();
        bootstrap.on_main_menu_reached();
        bootstrap.on_frame_tick();
        bootstrap.on_shutdown();
    }

    ScanReport {
        mods_dir,
        host_version,
        restart_requested: bootstrap.host().restart_requested(),
        summary: bootstrap.summary(),
        notices: bootstrap.host().notices(),
    }
}

#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "#")]
    index: usize,
    package: String,
    name: String,
    version: String,
    state: String,
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "#")]
    index: usize,
    component: String,
    version: String,
    #[tabled(rename = "loaded from")]
    provided_by: String,
    offers: usize,
    state: String,
}

#[derive(Tabled)]
struct FailureRow {
    subject: String,
    kind: String,
    action: String,
    message: String,
}

fn print_report(report: &ScanReport) {
    let summary = &report.summary;

    output::header(&format!("Framework providers in {}", report.mods_dir));
    if summary.providers.is_empty() {
        output::info("No installed mod bundles the Lunar framework");
    } else {
        let rows: Vec<ProviderRow> = summary
            .providers
            .iter()
            .map(|p| ProviderRow {
                index: p.index,
                package: p.package_id.clone(),
                name: p.name.clone(),
                version: p.version.to_string(),
                state: output::state(p.state),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    if !summary.components.is_empty() {
        output::header("Components");
        let rows: Vec<ComponentRow> = summary
            .components
            .iter()
            .map(|c| ComponentRow {
                index: c.index,
                component: c.name.clone(),
                version: c
                    .latest_version
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                provided_by: c.provided_by.clone().unwrap_or_else(|| "-".to_string()),
                offers: c.offers,
                state: output::state(c.state),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    if !summary.failures.is_empty() {
        output::header("Failures");
        let rows: Vec<FailureRow> = summary
            .failures
            .iter()
            .map(|f| FailureRow {
                subject: f.name.clone(),
                kind: f.kind.to_string(),
                action: output::severity(f.severity),
                message: f.message.clone(),
            })
            .collect();
        println!("{}", Table::new(rows).with(Style::sharp()));
    }

    for notice in &report.notices {
        output::warning(&notice.message);
        if let Some(link) = &notice.link {
            output::kv(&link.label, &link.url);
        }
    }

    if report.restart_requested {
        output::warning(&format!(
            "Moved {} leftover file(s) from old mod versions; run the scan again",
            summary.cleaned_up.len()
        ));
        for path in &summary.cleaned_up {
            output::kv("moved", path);
        }
    } else if summary.failures.is_empty() {
        output::success(&format!(
            "{} provider(s), {} component(s), no failures",
            summary.providers.len(),
            summary.components.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lunar_bootstrap::integrity::write_check_file;
    use lunar_core::LoadingState;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    fn assembly(version: &str) -> Vec<u8> {
        let mut bytes = b"MZ\x90\x00".to_vec();
        bytes.extend(utf16("FileVersion\0"));
        bytes.extend(utf16(version));
        bytes.extend([0, 0]);
        bytes
    }

    fn write(path: &Path, contents: impl AsRef<[u8]>) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// A package bundling the framework in its `1.5` load folder
    ///
    /// `component` ships as `(name, embedded file version)`.
    fn framework_mod(mods: &Path, folder: &str, package_id: &str, version: &str, component: (&str, &str)) {
        let (component, component_version) = component;
        let root = mods.join(folder);
        let key: Version = version.parse().unwrap();
        write(
            &root.join("About/About.xml"),
            format!(
                "<ModMetaData><name>{0}</name><packageId>{0}</packageId>\
                 <url>https://github.com/author/{0}</url></ModMetaData>",
                package_id
            ),
        );
        write(&root.join("About/Version.txt"), version);

        let lunar = root.join("1.5/Lunar");
        let files = [
            (lunar.join("Components/LunarFramework.dll"), assembly("1.0.0.0")),
            (
                lunar.join("Manifest.xml"),
                format!(
                    "<Manifest><Name>{0}</Name><PackageId>{0}</PackageId><Components>\
                     <li><AssemblyName>{1}</AssemblyName></li></Components></Manifest>",
                    package_id, component
                )
                .into_bytes(),
            ),
            (lunar.join(format!("Components/{}.dll", component)), assembly(component_version)),
        ];
        for (path, bytes) in files {
            write(&path, bytes);
            write_check_file(&key, &path).unwrap();
        }
    }

    fn mods_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
    }

    #[test]
    fn test_scan_resolves_shared_component() {
        let temp = TempDir::new().unwrap();
        framework_mod(temp.path(), "ModA", "author.a", "1.0.0", ("Shared", "2.0.0.0"));
        framework_mod(temp.path(), "ModB", "author.b", "1.2.0", ("Shared", "2.1.0.0"));
        fs::create_dir_all(temp.path().join("NotAMod")).unwrap();

        let report = scan(
            mods_dir(&temp),
            Version::with_build(1, 5, 4104),
            BootstrapOptions::default(),
            Vec::new(),
        );

        assert!(!report.restart_requested);
        assert!(report.summary.failures.is_empty());
        assert_eq!(report.summary.providers.len(), 2);
        assert!(report
            .summary
            .providers
            .iter()
            .all(|p| p.state == LoadingState::Initialized));
        let shared = &report.summary.components[0];
        assert_eq!(shared.provided_by.as_deref(), Some("author.b"));
        assert_eq!(shared.latest_version, Some(Version::full(2, 1, 0, 0)));
        assert_eq!(shared.offers, 2);
        assert_eq!(shared.state, LoadingState::Initialized);
    }

    #[test]
    fn test_scan_reports_damaged_mod_with_notice() {
        let temp = TempDir::new().unwrap();
        framework_mod(temp.path(), "ModA", "author.a", "1.0.0", ("Shared", "2.0.0.0"));
        fs::remove_file(temp.path().join("ModA/1.5/Lunar/Components/Shared.lfc")).unwrap();

        let report = scan(
            mods_dir(&temp),
            Version::with_build(1, 5, 4104),
            BootstrapOptions::default(),
            Vec::new(),
        );

        assert_eq!(report.summary.failures.len(), 1);
        assert_eq!(report.summary.providers[0].state, LoadingState::Errored);
        assert_eq!(report.notices.len(), 1);
        assert_eq!(
            report.notices[0].link.as_ref().unwrap().url,
            "https://github.com/author/author.a/releases"
        );

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["host_version"], "1.5.4104");
        assert_eq!(json["failures"][0]["kind"], "integrity");
    }

    #[test]
    fn test_scan_stops_after_cleanup() {
        let temp = TempDir::new().unwrap();
        framework_mod(temp.path(), "ModA", "author.a", "1.0.0", ("Shared", "2.0.0.0"));
        write(&temp.path().join("ModA/1.5/Assemblies/Shared.dll"), b"legacy");

        let mut options = BootstrapOptions::default();
        let report = scan(mods_dir(&temp), Version::with_build(1, 5, 4104), options.clone(), Vec::new());
        assert!(report.restart_requested);
        assert_eq!(report.summary.cleaned_up.len(), 1);
        assert!(temp.path().join("ModA/1.5/Lunar/Backup/Shared.dll").is_file());

        options.cleanup_old_assemblies = false;
        let second = scan(mods_dir(&temp), Version::with_build(1, 5, 4104), options, Vec::new());
        assert!(!second.restart_requested);
    }
}
