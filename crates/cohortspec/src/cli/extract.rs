//! Extract and measures command implementations

use super::output::{self, OutputFormat};
use crate::studies::BuiltinStudy;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use cohortspec_definition::CompiledStudy;
use cohortspec_eval::{Dataset, Extractor, InMemoryRecords, MeasureAggregator, MeasureRow};
use std::path::PathBuf;

/// Configuration shared by the extract and measures commands
pub struct ExtractConfig {
    pub study: BuiltinStudy,
    pub codelists: PathBuf,
    /// JSON array of patient records
    pub records: PathBuf,
    /// Date that `today` anchors resolve to; the current date when unset
    pub today: Option<NaiveDate>,
    pub format: OutputFormat,
    pub output_file: Option<PathBuf>,
    pub verbose: bool,
}

fn run(config: &ExtractConfig) -> Result<(CompiledStudy, Dataset)> {
    let study = crate::compile_builtin(config.study, &config.codelists)
        .with_context(|| format!("Failed to compile study '{}'", config.study))?;
    for warning in &study.warnings {
        log::warn!("{}", warning);
    }

    let records = InMemoryRecords::from_path(&config.records)
        .with_context(|| format!("Failed to load records: {}", config.records.display()))?;
    if config.verbose {
        eprintln!("Loaded {} patients from {}", records.len(), config.records.display());
    }

    let mut extractor = Extractor::new(&study);
    if let Some(today) = config.today {
        extractor = extractor.with_today(today);
    }
    let dataset = extractor
        .extract(&records)
        .with_context(|| format!("Extraction failed for study '{}'", config.study))?;
    if config.verbose {
        eprintln!(
            "{} of {} patients in population",
            dataset.len(),
            records.len()
        );
    }
    Ok((study, dataset))
}

/// Extract the dataset and print it
pub fn extract(config: ExtractConfig) -> Result<Dataset> {
    let (_, dataset) = run(&config)?;
    let content = output::render_dataset(&dataset, config.format)?;
    output::write_output(&content, config.output_file.as_deref())?;
    Ok(dataset)
}

/// Extract the dataset, aggregate the study's measures and print the rows
pub fn measures(config: ExtractConfig) -> Result<Vec<MeasureRow>> {
    let (study, dataset) = run(&config)?;
    if study.measures.is_empty() {
        eprintln!(
            "{}",
            output::format_warning(&format!("Study '{}' declares no measures", config.study))
        );
    }
    let rows = MeasureAggregator::for_study(&study)
        .aggregate(&dataset)
        .context("Failed to aggregate measures")?;
    let content = output::render_measures(&rows, config.format)?;
    output::write_output(&content, config.output_file.as_deref())?;
    Ok(rows)
}
