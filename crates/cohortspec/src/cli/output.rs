//! Output formatting utilities

use anyhow::{Context, Result};
use cohortspec_diagnostics::{CohortError, Diagnostic};
use cohortspec_eval::{Dataset, MeasureRow};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::IsTerminal;
use std::path::Path;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON
    Json,
    /// Indented JSON
    #[default]
    Pretty,
    /// Terminal table
    Table,
}

/// When to colour terminal output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

pub fn setup_colors(mode: ColorMode) {
    let enabled = match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    };
    colored::control::set_override(enabled);
}

/// Format an error for display
pub fn format_error(error: &anyhow::Error) -> String {
    format!("{} {:#}", "Error:".red().bold(), error)
}

pub fn format_warning(warning: &str) -> String {
    format!("{} {}", "Warning:".yellow().bold(), warning)
}

pub fn format_success(message: &str) -> String {
    format!("{} {}", "Success:".green().bold(), message)
}

/// Every error inside `error` rendered as a diagnostic block
pub fn render_errors(error: &CohortError) -> Vec<String> {
    error
        .errors()
        .into_iter()
        .map(|e| e.to_diagnostic().render())
        .collect()
}

pub fn render_warnings(warnings: &[Diagnostic]) -> Vec<String> {
    warnings.iter().map(Diagnostic::render).collect()
}

/// Write output to a file or stdout
pub fn write_output(content: &str, output_file: Option<&Path>) -> Result<()> {
    match output_file {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            eprintln!("{}", format_success(&format!("Output written to {}", path.display())));
        }
        None => println!("{}", content),
    }
    Ok(())
}

pub fn format_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize JSON")
}

fn table(header: Vec<String>, rows: impl IntoIterator<Item = Vec<String>>) -> String {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

/// One line per patient; dates and categories as text, flags as 1/0
pub fn dataset_table(dataset: &Dataset) -> String {
    let header = std::iter::once("patient_id".to_string())
        .chain(dataset.columns.iter().cloned())
        .collect();
    let rows = dataset.rows.iter().map(|row| {
        std::iter::once(row.patient_id.to_string())
            .chain(
                dataset
                    .columns
                    .iter()
                    .map(|c| row.get(c).map(ToString::to_string).unwrap_or_default()),
            )
            .collect()
    });
    table(header, rows)
}

pub fn measures_table(rows: &[MeasureRow]) -> String {
    let header = ["measure", "group", "numerator", "denominator", "value"]
        .map(String::from)
        .to_vec();
    let count = |c: Option<u64>| c.map_or_else(|| "[REDACTED]".to_string(), |c| c.to_string());
    let body = rows.iter().map(|row| {
        let group: Vec<String> = row
            .group
            .iter()
            .map(|(column, value)| format!("{}={}", column, value))
            .collect();
        vec![
            row.measure_id.clone(),
            group.join(", "),
            count(row.numerator),
            count(row.denominator),
            row.value.map(|v| format!("{:.4}", v)).unwrap_or_default(),
        ]
    });
    table(header, body)
}

pub fn render_dataset(dataset: &Dataset, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_json(&dataset.rows, false),
        OutputFormat::Pretty => format_json(&dataset.rows, true),
        OutputFormat::Table => Ok(dataset_table(dataset)),
    }
}

pub fn render_measures(rows: &[MeasureRow], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => format_json(rows, false),
        OutputFormat::Pretty => format_json(rows, true),
        OutputFormat::Table => Ok(measures_table(rows)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_eval::{Row, Value};

    fn dataset() -> Dataset {
        Dataset {
            study: "main".to_string(),
            columns: vec!["pa_ca".to_string(), "ca_date".to_string()],
            rows: vec![Row {
                patient_id: 7,
                values: [
                    ("pa_ca".to_string(), Value::Bool(true)),
                    ("ca_date".to_string(), Value::str("2021-06-01")),
                ]
                .into_iter()
                .collect(),
            }],
        }
    }

    #[test]
    fn test_compact_json_rows() {
        let json = render_dataset(&dataset(), OutputFormat::Json).unwrap();
        assert_eq!(json, r#"[{"patient_id":7,"pa_ca":true,"ca_date":"2021-06-01"}]"#);
    }

    #[test]
    fn test_dataset_table_has_header_and_row() {
        let table = dataset_table(&dataset());
        assert!(table.contains("patient_id"));
        assert!(table.contains("2021-06-01"));
        assert_eq!(table.lines().filter(|l| l.contains("│ 7")).count(), 1);
    }

    #[test]
    fn test_redacted_measure_in_table() {
        let rows = vec![MeasureRow {
            measure_id: "died_by_region".to_string(),
            group: [("region".to_string(), Value::str("Wales"))].into_iter().collect(),
            numerator: None,
            denominator: None,
            value: None,
            redacted: true,
        }];
        let table = measures_table(&rows);
        assert!(table.contains("region=Wales"));
        assert!(table.contains("[REDACTED]"));
    }
}
