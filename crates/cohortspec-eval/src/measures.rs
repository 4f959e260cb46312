//! Measures aggregator
//!
//! Groups an extracted dataset by each measure's group-by columns and counts,
//! per group, the rows where the denominator holds and, among those, the rows
//! where the numerator holds.

use crate::dataset::Dataset;
use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use cohortspec_definition::{CompiledStudy, Measure, POPULATION};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Non-zero counts at or below this are redacted under small-number suppression
pub const SMALL_NUMBER_THRESHOLD: u64 = 5;

/// Zero discloses nothing, so only counts from 1 to the threshold are small
fn is_small(count: u64) -> bool {
    (1..=SMALL_NUMBER_THRESHOLD).contains(&count)
}

/// One group of one measure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureRow {
    pub measure_id: String,
    /// Group-by column values; empty for a whole-population measure
    pub group: IndexMap<String, Value>,
    /// `None` when redacted
    pub numerator: Option<u64>,
    pub denominator: Option<u64>,
    /// `None` when redacted or the denominator is zero
    pub value: Option<f64>,
    pub redacted: bool,
}

pub struct MeasureAggregator<'a> {
    measures: &'a [Measure],
}

impl<'a> MeasureAggregator<'a> {
    pub fn new(measures: &'a [Measure]) -> Self {
        Self { measures }
    }

    pub fn for_study(study: &'a CompiledStudy) -> Self {
        Self::new(&study.measures)
    }

    /// Rows of every measure, in declaration order
    pub fn aggregate(&self, dataset: &Dataset) -> EvalResult<Vec<MeasureRow>> {
        let mut rows = Vec::new();
        for measure in self.measures {
            rows.extend(aggregate_measure(measure, dataset)?);
        }
        Ok(rows)
    }
}

/// Rows of one measure, sorted by group values
pub fn aggregate_measure(measure: &Measure, dataset: &Dataset) -> EvalResult<Vec<MeasureRow>> {
    let columns: Vec<&str> = measure.group_columns().collect();
    let mut groups: BTreeMap<Vec<Value>, (u64, u64)> = BTreeMap::new();

    for row in &dataset.rows {
        let read = |column: &str| {
            row.get(column)
                .ok_or_else(|| EvalError::unresolved(column))
        };
        let key = columns
            .iter()
            .map(|c| read(c).cloned())
            .collect::<EvalResult<Vec<Value>>>()?;
        let counts = groups.entry(key).or_insert((0, 0));

        let in_denominator = measure.denominator == POPULATION
            || read(&measure.denominator)?.truthiness() == Some(true);
        if !in_denominator {
            continue;
        }
        counts.1 += 1;
        if read(&measure.numerator)?.truthiness() == Some(true) {
            counts.0 += 1;
        }
    }

    let rows: Vec<MeasureRow> = groups
        .into_iter()
        .map(|(key, (numerator, denominator))| {
            let group = columns
                .iter()
                .map(|c| c.to_string())
                .zip(key)
                .collect();
            let redacted = measure.small_number_suppression
                && (is_small(numerator) || is_small(denominator));
            if redacted {
                return MeasureRow {
                    measure_id: measure.id.clone(),
                    group,
                    numerator: None,
                    denominator: None,
                    value: None,
                    redacted,
                };
            }
            let value = (denominator > 0).then(|| numerator as f64 / denominator as f64);
            MeasureRow {
                measure_id: measure.id.clone(),
                group,
                numerator: Some(numerator),
                denominator: Some(denominator),
                value,
                redacted,
            }
        })
        .collect();

    log::debug!(
        "measure '{}': {} groups, {} redacted",
        measure.id,
        rows.len(),
        rows.iter().filter(|r| r.redacted).count()
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Row;
    use pretty_assertions::assert_eq;

    fn dataset(rows: &[(u64, bool, bool, &str)]) -> Dataset {
        Dataset {
            study: "t".to_string(),
            columns: vec!["registered".into(), "died".into(), "region".into()],
            rows: rows
                .iter()
                .map(|(id, registered, died, region)| Row {
                    patient_id: *id,
                    values: [
                        ("registered".to_string(), Value::Bool(*registered)),
                        ("died".to_string(), Value::Bool(*died)),
                        ("region".to_string(), Value::str(*region)),
                    ]
                    .into_iter()
                    .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_numerator_counted_within_denominator() {
        let data = dataset(&[
            (1, true, true, "London"),
            (2, false, true, "London"),
            (3, true, false, "London"),
        ]);
        let measure = Measure::new("died_rate", "died", "registered");
        let rows = aggregate_measure(&measure, &data).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].group.is_empty());
        assert_eq!(rows[0].numerator, Some(1));
        assert_eq!(rows[0].denominator, Some(2));
        assert_eq!(rows[0].value, Some(0.5));
    }

    #[test]
    fn test_zero_denominator_has_no_value() {
        let data = dataset(&[(1, false, true, "London")]);
        let measure = Measure::new("died_rate", "died", "registered").group_by(["region"]);
        let rows = aggregate_measure(&measure, &data).unwrap();
        assert_eq!(rows[0].denominator, Some(0));
        assert_eq!(rows[0].value, None);
    }

    #[test]
    fn test_groups_sorted_by_value() {
        let data = dataset(&[
            (1, true, true, "Wales"),
            (2, true, false, "East"),
            (3, true, false, "London"),
        ]);
        let measure = Measure::new("died_by_region", "died", POPULATION).group_by(["region"]);
        let regions: Vec<String> = aggregate_measure(&measure, &data)
            .unwrap()
            .iter()
            .map(|r| r.group["region"].to_string())
            .collect();
        assert_eq!(regions, vec!["East", "London", "Wales"]);
    }

    #[test]
    fn test_suppression_at_threshold() {
        let rows: Vec<_> = (1..=5).map(|id| (id, true, true, "London")).collect();
        let data = dataset(&rows);
        let measure = Measure::new("died_rate", "died", POPULATION).with_small_number_suppression();
        let out = aggregate_measure(&measure, &data).unwrap();
        assert!(out[0].redacted);
        assert_eq!((out[0].numerator, out[0].denominator, out[0].value), (None, None, None));
    }

    #[test]
    fn test_zero_numerator_is_not_suppressed() {
        let rows: Vec<_> = (1..=200).map(|id| (id, true, false, "London")).collect();
        let data = dataset(&rows);
        let measure = Measure::new("died_rate", "died", POPULATION).with_small_number_suppression();
        let out = aggregate_measure(&measure, &data).unwrap();
        assert!(!out[0].redacted);
        assert_eq!((out[0].numerator, out[0].denominator, out[0].value), (Some(0), Some(200), Some(0.0)));
    }

    #[test]
    fn test_missing_column() {
        let data = dataset(&[(1, true, true, "London")]);
        let measure = Measure::new("m", "died", POPULATION).group_by(["stp"]);
        assert!(aggregate_measure(&measure, &data).is_err());
    }
}
