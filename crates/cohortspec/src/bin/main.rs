//! cohortspec command-line interface

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use cohortspec::BuiltinStudy;
use cohortspec::cli::codelists::{CodelistsConfig, list as list_codelists};
use cohortspec::cli::extract::{self, ExtractConfig};
use cohortspec::cli::output::{self, ColorMode, OutputFormat};
use cohortspec::cli::validate::{self, ValidateConfig};
use log::LevelFilter;
use std::path::PathBuf;

/// Cohort-extraction tool for the pancreatic-cancer study definitions
#[derive(Parser)]
#[command(name = "cohortspec")]
#[command(author, version, about = "Pancreatic-cancer cohort specifications", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t, global = true)]
    format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output
    #[arg(long, value_enum, default_value_t, global = true)]
    color: ColorMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Source {
    /// Built-in study definition
    #[arg(short, long, value_enum, default_value_t = BuiltinStudy::Main)]
    study: BuiltinStudy,

    /// Directory holding the codelist CSV files
    #[arg(short, long, default_value = "codelists")]
    codelists: PathBuf,

    /// Patient records (JSON array)
    #[arg(short, long)]
    records: PathBuf,

    /// Date used for `today` anchors (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile study definitions and report errors and warnings
    Validate {
        /// Studies to validate (default: all)
        #[arg(short, long, value_enum)]
        study: Vec<BuiltinStudy>,

        /// Directory holding the codelist CSV files
        #[arg(short, long, default_value = "codelists")]
        codelists: PathBuf,

        /// Strict mode (warnings as errors)
        #[arg(long)]
        strict: bool,
    },

    /// Extract the dataset for a study
    Extract(Source),

    /// Extract, then aggregate the study's measures
    Measures(Source),

    /// List the loaded codelists
    Codelists {
        /// Directory holding the codelist CSV files
        #[arg(short, long, default_value = "codelists")]
        codelists: PathBuf,
    },
}

fn parse_date(text: &str) -> Result<NaiveDate, String> {
    cohortspec::parser::parse_iso_date(text)
        .ok_or_else(|| format!("'{}' is not a YYYY-MM-DD date", text))
}

fn extract_config(source: &Source, cli: &Cli) -> ExtractConfig {
    ExtractConfig {
        study: source.study,
        codelists: source.codelists.clone(),
        records: source.records.clone(),
        today: source.today,
        format: cli.format,
        output_file: cli.output.clone(),
        verbose: cli.verbose,
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Validate {
            study,
            codelists,
            strict,
        } => {
            validate::validate(ValidateConfig {
                studies: study.clone(),
                codelists: codelists.clone(),
                strict: *strict,
                verbose: cli.verbose,
            })?;
        }
        Commands::Extract(source) => {
            let config = extract_config(source, cli);
            extract::extract(config)?;
        }
        Commands::Measures(source) => {
            let config = extract_config(source, cli);
            extract::measures(config)?;
        }
        Commands::Codelists { codelists } => {
            list_codelists(CodelistsConfig {
                codelists: codelists.clone(),
                format: cli.format,
                output_file: cli.output.clone(),
            })?;
        }
    }
    Ok(())
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    output::setup_colors(cli.color);

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
