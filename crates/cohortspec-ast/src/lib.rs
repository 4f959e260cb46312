//! Syntax trees for cohort specifications
//!
//! Two small languages appear inside a study definition:
//!
//! - **Predicates**, used by the population filter and by categorisations,
//!   e.g. `pa_ca AND (age >= 18 AND age <= 110)`.
//! - **Date expressions**, used to anchor time windows on literal dates or on
//!   other variables, e.g. `ca_date - 6 months`.
//!
//! Both are parsed by `cohortspec-parser` into the types defined here.

mod date;
mod expression;
mod literal;
mod operator;

pub use date::*;
pub use expression::*;
pub use literal::*;
pub use operator::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// A bare identifier naming a variable or a record attribute
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
