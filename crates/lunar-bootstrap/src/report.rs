//! Failure records, user notices and update links
//!
//! Every failure is logged and recorded. Failures the user can fix by
//! redownloading (or by updating the host) also queue a [`Notice`], which
//! the bootstrap hands to the host once the main menu is reachable.

use crate::error::{BootstrapError, Severity};
use crate::host::InstalledPackage;
use crate::registry::BootstrapContext;
use chrono::{DateTime, Utc};
use lunar_core::{LoadingState, Version};
use regex::Regex;
use serde::Serialize;
use std::path::Component as PathComponent;
use std::sync::LazyLock;
use tracing::{error, warn};

static GITHUB_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://github\.com/").expect("github url regex is valid"));

/// What failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Subject {
    /// A provider, by package id
    Provider(String),
    /// A component, by assembly name
    Component(String),
}

/// One recorded failure
#[derive(Debug, Clone, Serialize)]
pub struct FailureRecord {
    pub subject: Subject,
    /// Display name of the provider or component
    pub name: String,
    pub kind: &'static str,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
}

/// Link to where a package can be updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateLink {
    pub url: String,
    pub label: String,
}

/// A prompt shown once the main menu is reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub message: String,
    pub link: Option<UpdateLink>,
}

/// Whether the package was installed through the workshop
pub fn is_workshop_content(package: &InstalledPackage) -> bool {
    let parts: Vec<PathComponent<'_>> = package.root_dir.components().collect();
    parts.windows(2).any(|pair| {
        pair[0].as_os_str() == "workshop" && pair[1].as_os_str() == "content"
    })
}

/// `steam://url/CommunityFilePage/<id>` when the folder name is a workshop id
pub fn workshop_url(package: &InstalledPackage) -> Option<String> {
    let id: u64 = package.folder_name.parse().ok()?;
    Some(format!("steam://url/CommunityFilePage/{}", id))
}

/// The package's GitHub releases page, if its metadata URL points at GitHub
pub fn github_releases_url(package: &InstalledPackage) -> Option<String> {
    let url = package.url.as_deref()?;
    if !GITHUB_URL_RE.is_match(url) {
        return None;
    }
    if url.contains("/releases") {
        Some(url.to_string())
    } else {
        Some(format!("{}/releases", url.trim_end_matches('/')))
    }
}

/// Where the user should go to get a fresh copy of the package
pub fn update_link(package: &InstalledPackage) -> Option<UpdateLink> {
    if is_workshop_content(package) {
        workshop_url(package).map(|url| UpdateLink {
            url,
            label: "Open Workshop page".to_string(),
        })
    } else {
        github_releases_url(package).map(|url| UpdateLink {
            url,
            label: "Open GitHub page".to_string(),
        })
    }
}

fn redownload_hint(package: &InstalledPackage) -> &'static str {
    if is_workshop_content(package) {
        "If you are using Steam, unsubscribe from the mod, restart Steam and resubscribe. \
         This forces Steam to redownload the mod files."
    } else {
        "You can download the latest version from the project's GitHub Releases page."
    }
}

/// Accumulates failure records and pending notices
#[derive(Debug, Default)]
pub struct FailureReporter {
    records: Vec<FailureRecord>,
    notices: Vec<Notice>,
}

impl FailureReporter {
    pub fn records(&self) -> &[FailureRecord] {
        &self.records
    }

    /// Notices not yet shown, oldest first
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn pending_notices(&self) -> usize {
        self.notices.len()
    }

    /// Log and record a provider failure
    ///
    /// `related` is the other package involved in a refusal; update prompts
    /// for outdated siblings link to it rather than to the failing package.
    pub fn provider_failed(
        &mut self,
        package: &InstalledPackage,
        failure: &BootstrapError,
        related: Option<&InstalledPackage>,
    ) {
        let severity = failure.severity();
        let log_message = format!("Failed to load mod '{}', {}", package.name, failure);

        match severity {
            Severity::AskRedownload => {
                warn!("{}", log_message);
                match failure {
                    BootstrapError::MutualRefusal { .. } => {
                        let target = related.unwrap_or(package);
                        self.queue_notice(
                            format!("Failed to load mod '{}' because {}", package.name, failure),
                            target,
                        );
                    }
                    _ => {
                        self.queue_notice(
                            format!(
                                "Failed to load mod '{}' because its files are damaged or incomplete. \
                                 Redownload the mod to fix this problem.",
                                package.name
                            ),
                            package,
                        );
                    }
                }
            }
            Severity::UpdateHost => {
                warn!("{}", log_message);
                self.notices.push(Notice {
                    message: format!(
                        "Failed to load mod '{}' because {}. Update the game to fix this problem.",
                        package.name, failure
                    ),
                    link: None,
                });
            }
            Severity::LogOnly => error!("{}", log_message),
        }

        self.records.push(FailureRecord {
            subject: Subject::Provider(package.package_id.clone()),
            name: package.name.clone(),
            kind: failure.kind(),
            message: failure.to_string(),
            severity,
            timestamp: Utc::now(),
        });
    }

    /// Log and record a component failure (always log-only)
    pub fn component_failed(&mut self, assembly_name: &str, failure: &BootstrapError) {
        error!("Component '{}' failed: {}", assembly_name, failure);
        if let BootstrapError::LoadFailure { loader_errors, .. } = failure {
            if !loader_errors.is_empty() {
                let lines: Vec<String> = loader_errors.iter().map(|e| format!("   => {}", e)).collect();
                error!("Loader errors:\n{}", lines.join("\n"));
            }
        }

        self.records.push(FailureRecord {
            subject: Subject::Component(assembly_name.to_string()),
            name: assembly_name.to_string(),
            kind: failure.kind(),
            message: failure.to_string(),
            severity: Severity::LogOnly,
            timestamp: Utc::now(),
        });
    }

    fn queue_notice(&mut self, message: String, link_target: &InstalledPackage) {
        // no prompt without somewhere to send the user
        let Some(link) = update_link(link_target) else {
            return;
        };
        self.notices.push(Notice {
            message: format!("{}\n\n{}", message, redownload_hint(link_target)),
            link: Some(link),
        });
    }
}

/// Serializable view of a finished scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub providers: Vec<ProviderSummary>,
    pub components: Vec<ComponentSummary>,
    pub failures: Vec<FailureRecord>,
    pub cleaned_up: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub index: usize,
    pub package_id: String,
    pub name: String,
    pub version: Version,
    pub state: LoadingState,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    pub index: usize,
    pub name: String,
    pub latest_version: Option<Version>,
    pub provided_by: Option<String>,
    pub offers: usize,
    pub aliases: Vec<String>,
    pub allow_foreign: bool,
    pub state: LoadingState,
}

impl ScanSummary {
    pub fn from_context(ctx: &BootstrapContext) -> Self {
        let providers = ctx
            .providers()
            .iter()
            .map(|p| ProviderSummary {
                index: p.id.0,
                package_id: p.package_id().to_string(),
                name: p.name().to_string(),
                version: p.version,
                state: p.state(),
            })
            .collect();

        let components = ctx
            .components()
            .iter()
            .map(|c| {
                let latest = c.latest_version_provided_by();
                ComponentSummary {
                    index: c.id.0,
                    name: c.assembly_name.clone(),
                    latest_version: latest.map(|(_, v)| v),
                    provided_by: latest.map(|(id, _)| ctx.provider(id).package_id().to_string()),
                    offers: c.offers.len(),
                    aliases: c.aliases.iter().cloned().collect(),
                    allow_foreign: c.allow_foreign,
                    state: c.state(),
                }
            })
            .collect();

        Self {
            providers,
            components,
            failures: ctx.failures().to_vec(),
            cleaned_up: ctx
                .cleaned_up()
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }
}
