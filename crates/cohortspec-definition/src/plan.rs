//! Compiled extraction plan
//!
//! The plan is what an executor consumes: every date expression and
//! predicate parsed, every codelist resolved to a shared handle, and the
//! variables arranged in an order where each one follows everything it reads.

use crate::expectations::ReturnExpectations;
use crate::format::DateFormat;
use crate::measure::Measure;
use crate::rule::{AddressAttribute, PracticeAttribute};
use chrono::NaiveDate;
use cohortspec_ast::{DateAnchor, DateExpr, Expression};
use cohortspec_codelist::Codelist;
use cohortspec_diagnostics::Diagnostic;
use std::sync::Arc;

/// Address attributes a care-home categorisation may test
pub const CARE_HOME_ATTRIBUTES: &[&str] = &[
    "IsPotentialCareHome",
    "LocationRequiresNursing",
    "LocationDoesNotRequireNursing",
];

/// Which matching event a value-returning rule reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Selection {
    /// Earliest event date in the window
    First,
    /// Latest event date in the window
    Last,
}

/// Inclusive window; an absent bound is open
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DateWindow {
    pub start: Option<DateExpr>,
    pub end: Option<DateExpr>,
}

impl DateWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Variables the bounds are anchored on
    pub fn variables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for bound in [&self.start, &self.end].into_iter().flatten() {
            if let Some(name) = bound.referenced_variable() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }

    pub fn uses_index_date(&self) -> bool {
        [&self.start, &self.end]
            .into_iter()
            .flatten()
            .any(|b| b.anchor == DateAnchor::IndexDate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    ClinicalEvents,
    Admissions,
    EmergencyCare,
    GpConsultations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOutput {
    BinaryFlag,
    Date(DateFormat),
    NumericValue,
    Count,
    Category,
}

/// A query over one of the dated event sources
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub source: EventSource,
    /// Codes an event must carry; `None` matches every event of the source
    pub codelist: Option<Arc<Codelist>>,
    pub window: DateWindow,
    pub selection: Selection,
    pub output: EventOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeathOutput {
    BinaryFlag,
    Date(DateFormat),
}

/// Ordered labelled predicates with the label used when none holds
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTable {
    pub rules: Vec<(String, Expression)>,
    pub default_label: String,
}

#[derive(Debug, Clone)]
pub enum CompiledRule {
    Events(EventQuery),
    Death {
        /// Cause codes; `None` for death from any cause
        causes: Option<Arc<Codelist>>,
        underlying_only: bool,
        window: DateWindow,
        output: DeathOutput,
    },
    Bmi {
        window: DateWindow,
        minimum_age: u32,
    },
    Age {
        as_of: DateExpr,
    },
    Sex,
    Registered {
        as_of: DateExpr,
    },
    Practice {
        as_of: DateExpr,
        attribute: PracticeAttribute,
    },
    Address {
        as_of: DateExpr,
        attribute: AddressAttribute,
        round_to_nearest: Option<u32>,
    },
    CareHome {
        as_of: DateExpr,
        table: CategoryTable,
    },
    Categorised(CategoryTable),
}

impl CompiledRule {
    /// Whether the resolved value can anchor a window or `as_of` date
    pub fn returns_date(&self) -> bool {
        matches!(
            self,
            Self::Events(EventQuery {
                output: EventOutput::Date(_),
                ..
            }) | Self::Death {
                output: DeathOutput::Date(_),
                ..
            }
        )
    }
}

/// Extra date column emitted next to its variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedColumn {
    pub name: String,
    pub format: DateFormat,
}

#[derive(Debug, Clone)]
pub struct CompiledVariable {
    pub name: String,
    /// Helper of a categorisation: resolved but never emitted
    pub hidden: bool,
    pub rule: CompiledRule,
    /// Variables that must be resolved first
    pub dependencies: Vec<String>,
    /// Own hints merged over the study defaults
    pub expectations: ReturnExpectations,
    pub date_column: Option<DerivedColumn>,
}

/// A validated study, ready for extraction
#[derive(Debug, Clone)]
pub struct CompiledStudy {
    pub name: String,
    pub index_date: Option<NaiveDate>,
    pub default_expectations: ReturnExpectations,
    pub population: Expression,
    /// Resolution order
    pub variables: Vec<CompiledVariable>,
    /// Output columns in declaration order
    pub columns: Vec<String>,
    pub measures: Vec<Measure>,
    pub warnings: Vec<Diagnostic>,
}

impl CompiledStudy {
    pub fn variable(&self, name: &str) -> Option<&CompiledVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Names in resolution order
    pub fn resolution_order(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn measure(&self, id: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.id == id)
    }
}
