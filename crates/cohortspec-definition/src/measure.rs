//! Measure declarations

use serde::{Deserialize, Serialize};

/// Pseudo-variable naming the whole population
pub const POPULATION: &str = "population";

/// A numerator/denominator rate over the extracted cohort
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    pub id: String,
    pub numerator: String,
    /// A variable, or `population`
    pub denominator: String,
    /// Group-by columns; `["population"]` means a single group
    pub group_by: Vec<String>,
    #[serde(default)]
    pub small_number_suppression: bool,
}

impl Measure {
    pub fn new(
        id: impl Into<String>,
        numerator: impl Into<String>,
        denominator: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            numerator: numerator.into(),
            denominator: denominator.into(),
            group_by: vec![POPULATION.to_string()],
            small_number_suppression: false,
        }
    }

    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_small_number_suppression(mut self) -> Self {
        self.small_number_suppression = true;
        self
    }

    /// Group-by columns that name real variables
    pub fn group_columns(&self) -> impl Iterator<Item = &str> {
        self.group_by
            .iter()
            .map(String::as_str)
            .filter(|c| *c != POPULATION)
    }
}
