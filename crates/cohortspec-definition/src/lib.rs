//! Study definitions and their compilation
//!
//! A [`StudyDefinition`] declares a population predicate, an ordered list of
//! variables (each an extraction [`Rule`] over patient records) and the
//! measures computed from the resulting dataset. [`compile`] checks the whole
//! definition against a [`CodelistRegistry`](cohortspec_codelist::CodelistRegistry)
//! and produces a [`CompiledStudy`] whose variables are in dependency order.
//!
//! ```
//! use cohortspec_definition::{StudyDefinition, patients};
//!
//! let study = StudyDefinition::new("denominator")
//!     .index_date("2015-01-01")
//!     .population("registered AND (age >= 18 AND age <= 110)")
//!     .variable("age", patients::age_as_of("index_date"))
//!     .variable("registered", patients::registered_as_of("index_date"));
//! assert_eq!(study.variables.len(), 2);
//! ```

mod compile;
mod expectations;
mod format;
mod measure;
mod plan;
mod rule;
mod study;
mod variable;
mod window;

pub use compile::{Validation, compile, validate};
pub use expectations::{CategoryRatios, DateRange, Distribution, Rate, ReturnExpectations};
pub use format::DateFormat;
pub use measure::{Measure, POPULATION};
pub use plan::{
    CARE_HOME_ATTRIBUTES, CategoryTable, CompiledRule, CompiledStudy, CompiledVariable,
    DateWindow, DeathOutput, DerivedColumn, EventOutput, EventQuery, EventSource, Selection,
};
pub use rule::{
    AddressAttribute, AdmissionReturning, AdmissionsRule, BmiRule, Categorisation, Category,
    ClinicalEventsRule, ConsultationReturning, DateOfMatch, DeathCertificateRule, DeathReturning,
    DeathRule, EmergencyCareRule, EmergencyReturning, EventReturning, GpConsultationsRule,
    MatchSelection, PracticeAttribute, Rule,
};
pub use study::StudyDefinition;
pub use variable::{VariableDecl, patients};
pub use window::TimeWindow;
