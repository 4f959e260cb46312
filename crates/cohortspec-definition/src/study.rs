//! Study definitions

use crate::expectations::ReturnExpectations;
use crate::measure::Measure;
use crate::rule::Rule;
use crate::variable::VariableDecl;
use serde::{Deserialize, Serialize};

/// A complete cohort specification: population, ordered variables and measures
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StudyDefinition {
    pub name: String,
    /// `YYYY-MM-DD`, referenced by `index_date` anchors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_date: Option<String>,
    #[serde(default)]
    pub default_expectations: ReturnExpectations,
    /// Predicate over resolved variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<String>,
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub measures: Vec<Measure>,
}

impl StudyDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn index_date(mut self, date: impl Into<String>) -> Self {
        self.index_date = Some(date.into());
        self
    }

    pub fn default_expectations(mut self, expectations: ReturnExpectations) -> Self {
        self.default_expectations = expectations;
        self
    }

    pub fn population(mut self, predicate: impl Into<String>) -> Self {
        self.population = Some(predicate.into());
        self
    }

    pub fn variable(mut self, name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        self.variables.push(VariableDecl::new(name, rule));
        self
    }

    pub fn declare(mut self, variable: VariableDecl) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    /// Every declaration in resolution order: hidden helpers come just before
    /// the categorisation that owns them
    pub fn flattened(&self) -> Vec<(&VariableDecl, bool)> {
        let mut out = Vec::new();
        for variable in &self.variables {
            flatten_into(variable, false, &mut out);
        }
        out
    }
}

fn flatten_into<'a>(variable: &'a VariableDecl, hidden: bool, out: &mut Vec<(&'a VariableDecl, bool)>) {
    if let Rule::CategorisedAs(categorisation) = &variable.rule {
        for helper in &categorisation.hidden {
            flatten_into(helper, true, out);
        }
    }
    out.push((variable, hidden));
}
