//! Reference extraction for compiled cohort studies
//!
//! This crate runs a [`CompiledStudy`](cohortspec_definition::CompiledStudy)
//! against patient records held in memory:
//!
//! - [`Extractor`] resolves every variable per patient in dependency order,
//!   applies the population predicate and emits a [`Dataset`]
//! - [`predicate`] evaluates predicates with three-valued logic
//! - [`MeasureAggregator`] turns a dataset into grouped rates with optional
//!   small-number suppression
//!
//! Defaults when nothing matches: binary flags `false`, dates `null`, counts
//! and numeric values `0`, categories `""`, deprivation rank `0`.

pub mod dataset;
pub mod error;
pub mod extract;
pub mod measures;
pub mod predicate;
pub mod record;
pub mod source;
pub mod value;

pub use dataset::{Dataset, Row};
pub use error::{EvalError, EvalResult};
pub use extract::{Extractor, Resolved};
pub use measures::{MeasureAggregator, MeasureRow, SMALL_NUMBER_THRESHOLD, aggregate_measure};
pub use predicate::{Scope, compare, evaluate, holds};
pub use record::{
    Address, Admission, BmiMeasurement, CareHome, CauseOfDeath, ClinicalEvent, DeathRecord,
    EmergencyAttendance, GpConsultation, PatientRecord, Practice, Registration,
};
pub use source::{InMemoryRecords, RecordSource};
pub use value::Value;
