//! CLI functionality for the cohortspec tool
//!
//! - validation of the built-in study definitions
//! - extraction against a JSON record file
//! - measures aggregation
//! - codelist listing

pub mod codelists;
pub mod extract;
pub mod output;
pub mod validate;
