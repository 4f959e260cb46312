//! Reference extractor
//!
//! Resolves a compiled study against patient records one patient at a time.
//! Variables are evaluated in the plan's resolution order, so every window
//! anchor and predicate identifier is already in scope when it is read.

use crate::dataset::{Dataset, Row};
use crate::error::{EvalError, EvalResult};
use crate::predicate;
use crate::record::{BmiMeasurement, PatientRecord};
use crate::source::RecordSource;
use crate::value::Value;
use chrono::{Local, NaiveDate};
use cohortspec_ast::{DateAnchor, DateExpr};
use cohortspec_definition::{
    AddressAttribute, CompiledRule, CompiledStudy, CompiledVariable, DateFormat, DateWindow,
    DeathOutput, EventOutput, EventQuery, EventSource, PracticeAttribute, Selection,
};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Every resolved value of one patient, hidden helpers and date columns included
pub type Resolved = IndexMap<String, Value>;

/// One event that satisfied a query
#[derive(Debug, Clone, Copy)]
struct Match<'r> {
    date: NaiveDate,
    code: Option<&'r str>,
    value: Option<Decimal>,
}

/// Inclusive bounds of a resolved window; `None` is open
type Bounds = (Option<NaiveDate>, Option<NaiveDate>);

fn within((start, end): Bounds, date: NaiveDate) -> bool {
    start.is_none_or(|s| s <= date) && end.is_none_or(|e| date <= e)
}

pub struct Extractor<'a> {
    study: &'a CompiledStudy,
    today: NaiveDate,
    /// Output format of every date-valued column
    formats: HashMap<&'a str, DateFormat>,
}

impl<'a> Extractor<'a> {
    /// Extractor with `today` fixed to the current local date
    pub fn new(study: &'a CompiledStudy) -> Self {
        let mut formats = HashMap::new();
        for variable in &study.variables {
            if let Some(format) = output_format(&variable.rule) {
                formats.insert(variable.name.as_str(), format);
            }
            if let Some(column) = &variable.date_column {
                formats.insert(column.name.as_str(), column.format);
            }
        }
        Self {
            study,
            today: Local::now().date_naive(),
            formats,
        }
    }

    /// Pin `today` so repeated runs see the same anchor
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// One row per patient passing the population, ordered by patient id
    pub fn extract(&self, source: &dyn RecordSource) -> EvalResult<Dataset> {
        let mut patients: Vec<&PatientRecord> = source.patients().collect();
        patients.sort_by_key(|p| p.patient_id);

        let mut rows = Vec::new();
        for patient in &patients {
            let resolved = self.resolve(patient)?;
            let included = predicate::holds(&self.study.population, &resolved)
                .map_err(|e| e.in_variable(patient.patient_id, "population"))?;
            if included {
                rows.push(self.row(patient.patient_id, &resolved));
            }
        }

        log::info!(
            "study '{}': {} of {} patients in population",
            self.study.name,
            rows.len(),
            patients.len()
        );
        Ok(Dataset {
            study: self.study.name.clone(),
            columns: self.study.columns.clone(),
            rows,
        })
    }

    /// Resolve every variable of the study for one patient
    pub fn resolve(&self, patient: &PatientRecord) -> EvalResult<Resolved> {
        let mut resolved = Resolved::new();
        for variable in &self.study.variables {
            let (value, date) = self
                .variable(variable, patient, &resolved)
                .map_err(|e| e.in_variable(patient.patient_id, &variable.name))?;
            resolved.insert(variable.name.clone(), value);
            if let Some(column) = &variable.date_column {
                resolved.insert(column.name.clone(), Value::from(date));
            }
        }
        Ok(resolved)
    }

    fn row(&self, patient_id: u64, resolved: &Resolved) -> Row {
        let values = self
            .study
            .columns
            .iter()
            .map(|column| {
                let value = resolved.get(column).cloned().unwrap_or(Value::Null);
                let value = match (value, self.formats.get(column.as_str())) {
                    (Value::Date(date), Some(format)) => Value::Str(format.format(date)),
                    (value, _) => value,
                };
                (column.clone(), value)
            })
            .collect();
        Row { patient_id, values }
    }

    /// A variable's value and, for rules with a derived column, the matched date
    fn variable(
        &self,
        variable: &CompiledVariable,
        patient: &PatientRecord,
        scope: &Resolved,
    ) -> EvalResult<(Value, Option<NaiveDate>)> {
        match &variable.rule {
            CompiledRule::Events(query) => self.events(query, patient, scope),
            CompiledRule::Death {
                causes,
                underlying_only,
                window,
                output,
            } => {
                let bounds = self.window(window, scope)?;
                let death = patient.death.as_ref().filter(|death| {
                    bounds.is_some_and(|b| within(b, death.date))
                        && causes.as_ref().is_none_or(|list| {
                            death
                                .causes
                                .iter()
                                .filter(|cause| cause.underlying || !underlying_only)
                                .any(|cause| list.matches(&cause.code))
                        })
                });
                let value = match output {
                    DeathOutput::BinaryFlag => Value::Bool(death.is_some()),
                    DeathOutput::Date(_) => Value::from(death.map(|d| d.date)),
                };
                Ok((value, None))
            }
            CompiledRule::Bmi {
                window,
                minimum_age,
            } => {
                let Some(bounds) = self.window(window, scope)? else {
                    return Ok((Value::Decimal(Decimal::ZERO), None));
                };
                let latest = patient
                    .bmi_measurements
                    .iter()
                    .filter(|m| within(bounds, m.date))
                    .filter(|m| *minimum_age == 0 || patient.age_on(m.date).is_some_and(|age| age >= *minimum_age))
                    .fold(None, |best: Option<&BmiMeasurement>, m| match best {
                        Some(b) if b.date >= m.date => Some(b),
                        _ => Some(m),
                    });
                Ok((
                    Value::Decimal(latest.map_or(Decimal::ZERO, |m| m.value)),
                    latest.map(|m| m.date),
                ))
            }
            CompiledRule::Age { as_of } => {
                let age = self
                    .date(as_of, scope)?
                    .and_then(|date| patient.age_on(date));
                Ok((age.map_or(Value::Null, |a| Value::Integer(i64::from(a))), None))
            }
            CompiledRule::Sex => Ok((Value::str(patient.sex.clone().unwrap_or_default()), None)),
            CompiledRule::Registered { as_of } => {
                let registered = self
                    .date(as_of, scope)?
                    .is_some_and(|date| patient.registration_on(date).is_some());
                Ok((Value::Bool(registered), None))
            }
            CompiledRule::Practice { as_of, attribute } => {
                let practice = self
                    .date(as_of, scope)?
                    .and_then(|date| patient.registration_on(date))
                    .map(|r| &r.practice);
                let value = practice.and_then(|p| match attribute {
                    PracticeAttribute::MsoaCode => p.msoa_code.clone(),
                    PracticeAttribute::StpCode => p.stp_code.clone(),
                    PracticeAttribute::Nuts1RegionName => p.nuts1_region_name.clone(),
                });
                Ok((Value::str(value.unwrap_or_default()), None))
            }
            CompiledRule::Address {
                as_of,
                attribute: AddressAttribute::IndexOfMultipleDeprivation,
                round_to_nearest,
            } => {
                let rank = self
                    .date(as_of, scope)?
                    .and_then(|date| patient.address_on(date))
                    .and_then(|a| a.index_of_multiple_deprivation)
                    .unwrap_or(0);
                let rank = match round_to_nearest {
                    Some(step) => round_to(rank, i64::from(*step)),
                    None => rank,
                };
                Ok((Value::Integer(rank), None))
            }
            CompiledRule::CareHome { as_of, table } => {
                let address = self
                    .date(as_of, scope)?
                    .and_then(|date| patient.address_on(date));
                let Some(address) = address else {
                    return Ok((Value::str(table.default_label.clone()), None));
                };
                let care_home = address.care_home.clone().unwrap_or_default();
                let attributes: IndexMap<String, Value> = [
                    ("IsPotentialCareHome", Value::Bool(care_home.is_potential_care_home)),
                    (
                        "LocationRequiresNursing",
                        care_home.location_requires_nursing.map_or(Value::Null, Value::Str),
                    ),
                    (
                        "LocationDoesNotRequireNursing",
                        care_home.location_does_not_require_nursing.map_or(Value::Null, Value::Str),
                    ),
                ]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
                let label = predicate::categorise(table, &attributes)?;
                Ok((Value::str(label), None))
            }
            CompiledRule::Categorised(table) => {
                let label = predicate::categorise(table, scope)?;
                Ok((Value::str(label), None))
            }
        }
    }

    fn events(
        &self,
        query: &EventQuery,
        patient: &PatientRecord,
        scope: &Resolved,
    ) -> EvalResult<(Value, Option<NaiveDate>)> {
        let mut matches = match self.window(&query.window, scope)? {
            Some(bounds) => matching_events(query, patient, bounds),
            None => Vec::new(),
        };
        // Stable sorts: equal dates keep record order
        match query.selection {
            Selection::First => matches.sort_by_key(|m| m.date),
            Selection::Last => matches.sort_by(|a, b| b.date.cmp(&a.date)),
        }
        let selected = matches.first().copied();

        let value = match query.output {
            EventOutput::BinaryFlag => Value::Bool(selected.is_some()),
            EventOutput::Date(_) => Value::from(selected.map(|m| m.date)),
            EventOutput::NumericValue => {
                Value::Decimal(selected.and_then(|m| m.value).unwrap_or(Decimal::ZERO))
            }
            EventOutput::Count => Value::Integer(matches.len() as i64),
            EventOutput::Category => {
                let label = selected
                    .and_then(|m| m.code)
                    .zip(query.codelist.as_ref())
                    .and_then(|(code, list)| list.category_of(code));
                Value::str(label.unwrap_or_default())
            }
        };
        Ok((value, selected.map(|m| m.date)))
    }

    fn window(&self, window: &DateWindow, scope: &Resolved) -> EvalResult<Option<Bounds>> {
        let start = match &window.start {
            Some(expr) => match self.date(expr, scope)? {
                Some(date) => Some(date),
                None => return Ok(None),
            },
            None => None,
        };
        let end = match &window.end {
            Some(expr) => match self.date(expr, scope)? {
                Some(date) => Some(date),
                None => return Ok(None),
            },
            None => None,
        };
        Ok(Some((start, end)))
    }

    /// Resolve a date expression; `None` when its anchor is null
    fn date(&self, expr: &DateExpr, scope: &Resolved) -> EvalResult<Option<NaiveDate>> {
        let anchor = match &expr.anchor {
            DateAnchor::Literal(date) => Some(*date),
            DateAnchor::Today => Some(self.today),
            DateAnchor::IndexDate => self.study.index_date,
            DateAnchor::Variable(id) => scope.get(&id.name).and_then(Value::as_date),
        };
        let Some(anchor) = anchor else {
            return Ok(None);
        };
        expr.shift(anchor)
            .map(Some)
            .ok_or_else(|| EvalError::DateOverflow {
                expression: expr.to_string(),
            })
    }
}

fn matching_events<'r>(query: &EventQuery, patient: &'r PatientRecord, bounds: Bounds) -> Vec<Match<'r>> {
    let list = query.codelist.as_deref();
    match query.source {
        EventSource::ClinicalEvents => patient
            .clinical_events
            .iter()
            .filter(|e| within(bounds, e.date))
            .filter(|e| list.is_none_or(|l| l.system() == e.system && l.matches(&e.code)))
            .map(|e| Match {
                date: e.date,
                code: Some(&e.code),
                value: e.numeric_value,
            })
            .collect(),
        EventSource::Admissions => patient
            .admissions
            .iter()
            .filter(|a| within(bounds, a.admission_date))
            .filter_map(|a| {
                let code = match list {
                    Some(l) => Some(a.diagnoses.iter().find(|d| l.matches(d))?.as_str()),
                    None => None,
                };
                Some(Match {
                    date: a.admission_date,
                    code,
                    value: None,
                })
            })
            .collect(),
        EventSource::EmergencyCare => patient
            .emergency_attendances
            .iter()
            .filter(|a| within(bounds, a.arrival_date))
            .map(|a| Match {
                date: a.arrival_date,
                code: None,
                value: None,
            })
            .collect(),
        EventSource::GpConsultations => patient
            .gp_consultations
            .iter()
            .filter(|c| within(bounds, c.date))
            .map(|c| Match {
                date: c.date,
                code: None,
                value: None,
            })
            .collect(),
    }
}

/// Round half up to a multiple of `step`
fn round_to(value: i64, step: i64) -> i64 {
    if step <= 1 {
        return value;
    }
    (value + step / 2).div_euclid(step) * step
}

/// Date format used when a variable's own value is a date
fn output_format(rule: &CompiledRule) -> Option<DateFormat> {
    match rule {
        CompiledRule::Events(EventQuery {
            output: EventOutput::Date(format),
            ..
        })
        | CompiledRule::Death {
            output: DeathOutput::Date(format),
            ..
        } => Some(*format),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_nearest() {
        assert_eq!(round_to(32844, 100), 32800);
        assert_eq!(round_to(150, 100), 200);
        assert_eq!(round_to(149, 100), 100);
        assert_eq!(round_to(0, 100), 0);
        assert_eq!(round_to(17, 1), 17);
    }

    #[test]
    fn test_within_is_inclusive() {
        let d = |day| NaiveDate::from_ymd_opt(2021, 6, day).unwrap();
        assert!(within((Some(d(1)), Some(d(1))), d(1)));
        assert!(within((None, Some(d(10))), d(1)));
        assert!(!within((Some(d(2)), None), d(1)));
    }
}
