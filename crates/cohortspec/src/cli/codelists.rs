//! Codelists command implementation

use super::output::{self, OutputFormat};
use crate::codelists;
use anyhow::{Result, bail};
use cohortspec_codelist::{Codelist, CodelistSource};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

/// Configuration for codelists command
pub struct CodelistsConfig {
    pub codelists: PathBuf,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
}

/// One line of the codelist listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CodelistSummary {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "System")]
    pub system: String,
    #[tabled(rename = "Codes")]
    pub codes: usize,
    #[tabled(rename = "Categories")]
    pub categories: usize,
    #[tabled(rename = "Source")]
    pub source: String,
    #[tabled(rename = "Quality flag")]
    pub quality_flag: String,
}

impl From<&Codelist> for CodelistSummary {
    fn from(list: &Codelist) -> Self {
        let source = match list.source() {
            CodelistSource::Inline { .. } => "inline".to_string(),
            CodelistSource::Csv { path, .. } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            CodelistSource::Derived { from } => format!("derived from {}", from.join(", ")),
        };
        Self {
            name: list.name().to_string(),
            system: list.system().display_name().to_string(),
            codes: list.len(),
            categories: list.categories().len(),
            source,
            quality_flag: list.quality_flag().unwrap_or_default().to_string(),
        }
    }
}

/// Load the built-in codelists and list them
pub fn list(config: CodelistsConfig) -> Result<Vec<CodelistSummary>> {
    let registry = match codelists::load(&config.codelists) {
        Ok(registry) => registry,
        Err(err) => {
            for line in output::render_errors(&err) {
                eprintln!("{}", line);
            }
            bail!("Failed to load codelists from {}", config.codelists.display());
        }
    };
    let summaries: Vec<CodelistSummary> = registry
        .iter()
        .map(|list| CodelistSummary::from(list.as_ref()))
        .collect();

    let content = match config.format {
        OutputFormat::Json => output::format_json(&summaries, false)?,
        OutputFormat::Pretty => output::format_json(&summaries, true)?,
        OutputFormat::Table => {
            let mut table = tabled::Table::new(&summaries);
            table.with(tabled::settings::Style::modern());
            table.to_string()
        }
    };
    output::write_output(&content, config.output_file.as_deref())?;
    for warning in output::render_warnings(&registry.warnings()) {
        eprintln!("{}", warning);
    }
    Ok(summaries)
}
