//! Manifest command

use anyhow::{Context, Result};
use lunar_core::types::ComponentDef;
use lunar_core::Manifest;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{ManifestCommands, ManifestValidateArgs};
use crate::output;

pub fn run(cmd: ManifestCommands) -> Result<()> {
    match cmd {
        ManifestCommands::Validate(args) => validate(args),
    }
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "component")]
    assembly_name: String,
    #[tabled(rename = "foreign copies")]
    allow_foreign: String,
    aliases: String,
    #[tabled(rename = "depends on")]
    depends_on: String,
}

impl From<&ComponentDef> for ComponentRow {
    fn from(def: &ComponentDef) -> Self {
        Self {
            assembly_name: def.assembly_name.clone(),
            allow_foreign: if def.allow_non_lunar_source { "allowed" } else { "refused" }.to_string(),
            aliases: def.aliases().join(", "),
            depends_on: def.depends_on().join(", "),
        }
    }
}

fn validate(args: ManifestValidateArgs) -> Result<()> {
    let manifest = Manifest::from_file(args.path.as_std_path())
        .with_context(|| format!("Invalid manifest {}", args.path))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&manifest)?);
        return Ok(());
    }

    output::success(&format!("Manifest is valid: {}", args.path));
    output::kv("Name", &manifest.name);
    output::kv("Package", &manifest.package_id);
    if let Some(min) = &manifest.min_game_version {
        output::kv("Minimum game version", min);
    }
    for entry in manifest.lunar_requirements() {
        output::kv(
            "Requires",
            &format!(
                "{} {}",
                entry.package_id,
                entry.min_version.as_deref().unwrap_or("(any version)")
            ),
        );
    }
    for entry in manifest.refusals() {
        output::kv("Refuses", &entry.package_id);
    }

    if manifest.components().is_empty() {
        output::info("No components declared");
        return Ok(());
    }

    output::header("Components");
    println!("{}", component_table(&manifest));
    Ok(())
}

fn component_table(manifest: &Manifest) -> String {
    let rows: Vec<ComponentRow> = manifest.components().iter().map(ComponentRow::from).collect();
    Table::new(rows).with(Style::sharp()).to_string()
}
