//! Validate command implementation

use super::output;
use crate::codelists;
use crate::studies::BuiltinStudy;
use anyhow::{Result, bail};
use colored::Colorize;
use std::path::PathBuf;

/// Configuration for validate command
pub struct ValidateConfig {
    pub studies: Vec<BuiltinStudy>,
    pub codelists: PathBuf,
    /// Treat warnings as errors
    pub strict: bool,
    pub verbose: bool,
}

/// Counts across every validated study
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub studies: usize,
    pub errors: usize,
    pub warnings: usize,
}

/// Load the codelists, compile each study and print what was found
pub fn validate(config: ValidateConfig) -> Result<ValidationReport> {
    let studies = if config.studies.is_empty() {
        BuiltinStudy::ALL.to_vec()
    } else {
        config.studies
    };

    let registry = match codelists::load(&config.codelists) {
        Ok(registry) => registry,
        Err(err) => {
            for line in output::render_errors(&err) {
                eprintln!("{}", line);
            }
            bail!("Failed to load codelists from {}", config.codelists.display());
        }
    };
    if config.verbose {
        eprintln!("Loaded {} codelists from {}", registry.len(), config.codelists.display());
    }

    let mut report = ValidationReport::default();
    for study in studies {
        let validation = crate::validate(&study.definition(), &registry);
        report.studies += 1;
        report.errors += validation.errors.len();
        report.warnings += validation.warnings.len();

        let status = if validation.is_ok() {
            "ok".green().bold()
        } else {
            "failed".red().bold()
        };
        println!("{} {}", study.to_string().bold(), status);
        if config.verbose {
            if let Some(compiled) = &validation.study {
                eprintln!(
                    "  {} variables, {} columns, {} measures",
                    compiled.variables.len(),
                    compiled.columns.len(),
                    compiled.measures.len()
                );
            }
        }
        for error in &validation.errors {
            for line in output::render_errors(error) {
                println!("{}", line);
            }
        }
        for line in output::render_warnings(&validation.warnings) {
            println!("{}", line);
        }
    }

    println!();
    if report.errors > 0 {
        bail!(
            "Validation failed: {} error(s), {} warning(s)",
            report.errors,
            report.warnings
        );
    }
    if config.strict && report.warnings > 0 {
        bail!(
            "Strict mode: {} warning(s) treated as errors",
            report.warnings
        );
    }
    let summary = format!("{} study definition(s) validated", report.studies);
    if report.warnings > 0 {
        println!(
            "{}",
            output::format_warning(&format!("{} with {} warning(s)", summary, report.warnings))
        );
    } else {
        println!("{}", output::format_success(&summary));
    }
    Ok(report)
}
