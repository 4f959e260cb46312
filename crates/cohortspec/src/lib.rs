//! Cohort-extraction specifications for a pancreatic-cancer observational study
//!
//! This crate ties the workspace together:
//! - the built-in study definitions ([`studies`]) and their codelists ([`codelists`])
//! - re-exports of the parser, codelist registry, study compiler and reference extractor
//! - the `cohortspec` command-line tool (behind the `cli` feature)
//!
//! # Example
//!
//! ```ignore
//! use cohortspec::{BuiltinStudy, Extractor, InMemoryRecords};
//! use std::path::Path;
//!
//! let study = cohortspec::compile_builtin(BuiltinStudy::Main, Path::new("codelists"))?;
//! let records = InMemoryRecords::from_path(Path::new("demos/patients.json"))?;
//! let dataset = Extractor::new(&study).extract(&records)?;
//! ```

pub use cohortspec_ast as ast;
pub use cohortspec_codelist as codelist;
pub use cohortspec_definition as definition;
pub use cohortspec_diagnostics as diagnostics;
pub use cohortspec_eval as eval;
pub use cohortspec_parser as parser;

pub use cohortspec_codelist::{Codelist, CodelistRegistry, CodingSystem};
pub use cohortspec_definition::{CompiledStudy, Measure, StudyDefinition, Validation, compile, validate};
pub use cohortspec_diagnostics::{CohortError, Diagnostic, Result};
pub use cohortspec_eval::{Dataset, Extractor, InMemoryRecords, MeasureAggregator, MeasureRow};
pub use studies::BuiltinStudy;

pub mod codelists;
pub mod studies;

#[cfg(feature = "cli")]
pub mod cli;

use std::path::Path;

/// Load the built-in codelists from `codelist_dir` and compile one of the studies
pub fn compile_builtin(study: BuiltinStudy, codelist_dir: &Path) -> Result<CompiledStudy> {
    let registry = codelists::load(codelist_dir)?;
    compile(&study.definition(), &registry)
}
