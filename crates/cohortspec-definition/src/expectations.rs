//! Simulation hints carried with each variable
//!
//! Hints describe what dummy data for a column should look like. They are
//! validated and passed through to the compiled plan but never drive
//! extraction.

use cohortspec_diagnostics::{COH0114, CohortError, Diagnostic, ErrorBuilder};
use cohortspec_parser::parse_iso_date;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const RATIO_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rate {
    Uniform,
    ExponentialIncrease,
    Universal,
}

/// Bounds of simulated dates, each a `YYYY-MM-DD` literal or `today`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}

impl DateRange {
    pub fn new(earliest: impl Into<String>, latest: impl Into<String>) -> Self {
        Self {
            earliest: Some(earliest.into()),
            latest: Some(latest.into()),
        }
    }

    pub fn earliest(earliest: impl Into<String>) -> Self {
        Self {
            earliest: Some(earliest.into()),
            latest: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, stddev: f64 },
    PopulationAges,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryRatios {
    pub ratios: IndexMap<String, f64>,
}

impl<K: Into<String>, const N: usize> From<[(K, f64); N]> for CategoryRatios {
    fn from(pairs: [(K, f64); N]) -> Self {
        Self {
            ratios: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// `return_expectations` of a variable, or the study's defaults
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReturnExpectations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub float: Option<Distribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRatios>,
}

impl ReturnExpectations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn incidence(mut self, incidence: f64) -> Self {
        self.incidence = Some(incidence);
        self
    }

    pub fn date(mut self, range: DateRange) -> Self {
        self.date = Some(range);
        self
    }

    pub fn int(mut self, distribution: Distribution) -> Self {
        self.int = Some(distribution);
        self
    }

    pub fn float(mut self, distribution: Distribution) -> Self {
        self.float = Some(distribution);
        self
    }

    pub fn category(mut self, ratios: impl Into<CategoryRatios>) -> Self {
        self.category = Some(ratios.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Fill unset fields from `defaults`
    pub fn merged_over(&self, defaults: &ReturnExpectations) -> ReturnExpectations {
        ReturnExpectations {
            rate: self.rate.or(defaults.rate),
            incidence: self.incidence.or(defaults.incidence),
            date: self.date.clone().or_else(|| defaults.date.clone()),
            int: self.int.or(defaults.int),
            float: self.float.or(defaults.float),
            category: self.category.clone().or_else(|| defaults.category.clone()),
        }
    }

    /// Errors for impossible hints, warnings for suspicious ones
    pub fn validate(&self, subject: &str) -> (Vec<CohortError>, Vec<Diagnostic>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let error = |message: String| {
            ErrorBuilder::new(COH0114, message)
                .subject(subject)
                .specification()
        };

        if let Some(incidence) = self.incidence {
            if !(0.0..=1.0).contains(&incidence) {
                errors.push(error(format!("Incidence {} is outside [0, 1]", incidence)));
            }
        }

        for distribution in [self.int, self.float].into_iter().flatten() {
            if let Distribution::Normal { stddev, .. } = distribution {
                if stddev < 0.0 {
                    errors.push(error(format!("Standard deviation {} is negative", stddev)));
                }
            }
        }

        if let Some(range) = &self.date {
            let bounds = [&range.earliest, &range.latest];
            for bound in bounds.into_iter().flatten() {
                if bound != "today" && parse_iso_date(bound).is_none() {
                    errors.push(error(format!(
                        "Date bound '{}' must be YYYY-MM-DD or today",
                        bound
                    )));
                }
            }
            let earliest = range.earliest.as_deref().and_then(parse_iso_date);
            let latest = range.latest.as_deref().and_then(parse_iso_date);
            if let (Some(earliest), Some(latest)) = (earliest, latest) {
                if earliest > latest {
                    errors.push(error(format!(
                        "Earliest date {} is after latest date {}",
                        earliest, latest
                    )));
                }
            }
        }

        if let Some(category) = &self.category {
            if let Some((label, ratio)) = category.ratios.iter().find(|(_, r)| **r < 0.0) {
                errors.push(error(format!("Ratio for '{}' is negative ({})", label, ratio)));
            }
            let total: f64 = category.ratios.values().sum();
            if (total - 1.0).abs() > RATIO_TOLERANCE {
                warnings.push(
                    Diagnostic::warning(
                        COH0114,
                        format!("Category ratios sum to {:.2}, not 1", total),
                    )
                    .with_subject(subject),
                );
            }
        }

        (errors, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_prefers_variable_hints() {
        let defaults = ReturnExpectations::new()
            .date(DateRange::new("1900-01-01", "today"))
            .rate(Rate::Uniform)
            .incidence(0.5);
        let own = ReturnExpectations::new().incidence(1.0);
        let merged = own.merged_over(&defaults);
        assert_eq!(merged.incidence, Some(1.0));
        assert_eq!(merged.rate, Some(Rate::Uniform));
        assert_eq!(merged.date, Some(DateRange::new("1900-01-01", "today")));
    }

    #[test]
    fn test_incidence_out_of_range() {
        let (errors, _) = ReturnExpectations::new().incidence(1.5).validate("pa_ca");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), COH0114);
    }

    #[test]
    fn test_ratio_sum_is_only_a_warning() {
        let hints = ReturnExpectations::new().category([
            ("1", 0.4),
            ("2", 0.4),
            ("3", 0.2),
            ("4", 0.2),
            ("5", 0.2),
        ]);
        let (errors, warnings) = hints.validate("ethnicity_code");
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("1.40"));
    }

    #[test]
    fn test_bad_date_bound_and_negative_stddev() {
        let hints = ReturnExpectations::new()
            .date(DateRange::earliest("2015-1-1"))
            .float(Distribution::Normal {
                mean: 25.0,
                stddev: -8.0,
            });
        let (errors, _) = hints.validate("bmi");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_deserialize_original_shape() {
        let json = r#"{
            "rate": "exponential_increase",
            "int": {"distribution": "population_ages"},
            "category": {"ratios": {"M": 0.49, "F": 0.51}}
        }"#;
        let hints: ReturnExpectations = serde_json::from_str(json).unwrap();
        assert_eq!(hints.rate, Some(Rate::ExponentialIncrease));
        assert_eq!(hints.int, Some(Distribution::PopulationAges));
        assert_eq!(hints.category.unwrap().ratios.len(), 2);
    }
}
