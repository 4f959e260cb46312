//! Variable declarations and the `patients` rule builders

use crate::expectations::ReturnExpectations;
use crate::format::DateFormat;
use crate::rule::{
    AddressAttribute, AdmissionReturning, AdmissionsRule, BmiRule, Categorisation, Category,
    ClinicalEventsRule, ConsultationReturning, DeathCertificateRule, DeathReturning, DeathRule,
    EmergencyCareRule, EmergencyReturning, EventReturning, GpConsultationsRule, PracticeAttribute,
    Rule,
};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};

/// One output column (or hidden helper) and the rule that fills it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub rule: Rule,
    #[serde(default, skip_serializing_if = "ReturnExpectations::is_empty")]
    pub return_expectations: ReturnExpectations,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, rule: impl Into<Rule>) -> Self {
        Self {
            name: name.into(),
            rule: rule.into(),
            return_expectations: ReturnExpectations::default(),
        }
    }

    pub fn expecting(mut self, expectations: ReturnExpectations) -> Self {
        self.return_expectations = expectations;
        self
    }
}

macro_rules! window_builders {
    ($($rule:ty),*) => {$(
        impl $rule {
            pub fn between(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
                self.window = TimeWindow::between(start, end);
                self
            }

            pub fn on_or_after(mut self, start: impl Into<String>) -> Self {
                self.window.on_or_after = Some(start.into());
                self
            }

            pub fn on_or_before(mut self, end: impl Into<String>) -> Self {
                self.window.on_or_before = Some(end.into());
                self
            }
        }
    )*};
}

window_builders!(
    ClinicalEventsRule,
    AdmissionsRule,
    EmergencyCareRule,
    DeathRule,
    DeathCertificateRule,
    GpConsultationsRule,
    BmiRule
);

macro_rules! selection_builders {
    ($($rule:ty),*) => {$(
        impl $rule {
            pub fn find_first(mut self) -> Self {
                self.selection.find_first_match_in_period = true;
                self
            }

            pub fn find_last(mut self) -> Self {
                self.selection.find_last_match_in_period = true;
                self
            }

            pub fn date_format(mut self, format: DateFormat) -> Self {
                self.date_format = Some(format);
                self
            }
        }
    )*};
}

selection_builders!(ClinicalEventsRule, AdmissionsRule, EmergencyCareRule);

impl ClinicalEventsRule {
    pub fn returning(mut self, returning: EventReturning) -> Self {
        self.returning = returning;
        self
    }

    /// Adds a `<name>_date` column at the given precision
    pub fn include_date_of_match(mut self, include_month: bool, include_day: bool) -> Self {
        self.date_of_match.include_date_of_match = true;
        self.date_of_match.include_month = include_month;
        self.date_of_match.include_day = include_day;
        self
    }
}

impl AdmissionsRule {
    pub fn returning(mut self, returning: AdmissionReturning) -> Self {
        self.returning = returning;
        self
    }

    pub fn with_these_diagnoses(mut self, codelist: impl Into<String>) -> Self {
        self.with_these_diagnoses = Some(codelist.into());
        self
    }
}

impl EmergencyCareRule {
    pub fn returning(mut self, returning: EmergencyReturning) -> Self {
        self.returning = returning;
        self
    }
}

impl DeathRule {
    pub fn returning(mut self, returning: DeathReturning) -> Self {
        self.returning = returning;
        self
    }

    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }
}

impl DeathCertificateRule {
    pub fn returning(mut self, returning: DeathReturning) -> Self {
        self.returning = returning;
        self
    }

    pub fn match_only_underlying_cause(mut self, only: bool) -> Self {
        self.match_only_underlying_cause = only;
        self
    }

    pub fn date_format(mut self, format: DateFormat) -> Self {
        self.date_format = Some(format);
        self
    }
}

impl GpConsultationsRule {
    pub fn returning(mut self, returning: ConsultationReturning) -> Self {
        self.returning = returning;
        self
    }
}

impl BmiRule {
    pub fn minimum_age_at_measurement(mut self, age: u32) -> Self {
        self.minimum_age_at_measurement = age;
        self
    }

    /// Adds a `<name>_date_measured` column
    pub fn include_measurement_date(mut self, format: DateFormat) -> Self {
        self.include_measurement_date = true;
        self.date_format = Some(format);
        self
    }
}

impl Categorisation {
    /// Declare a helper variable the predicates may reference
    pub fn hidden(mut self, variable: VariableDecl) -> Self {
        self.hidden.push(variable);
        self
    }
}

macro_rules! into_rule {
    ($($rule:ty => $variant:ident),*) => {$(
        impl From<$rule> for Rule {
            fn from(rule: $rule) -> Self {
                Rule::$variant(rule)
            }
        }
    )*};
}

into_rule!(
    ClinicalEventsRule => ClinicalEvents,
    AdmissionsRule => AdmittedToHospital,
    EmergencyCareRule => AttendedEmergencyCare,
    DeathRule => DiedFromAnyCause,
    DeathCertificateRule => DeathCertificate,
    GpConsultationsRule => GpConsultations,
    BmiRule => MostRecentBmi,
    Categorisation => CategorisedAs
);

/// Rule constructors named after the study-definition vocabulary
pub mod patients {
    use super::*;

    pub fn with_these_clinical_events(codelist: impl Into<String>) -> ClinicalEventsRule {
        ClinicalEventsRule {
            codelist: codelist.into(),
            window: TimeWindow::unbounded(),
            returning: EventReturning::BinaryFlag,
            selection: Default::default(),
            date_of_match: Default::default(),
            date_format: None,
        }
    }

    pub fn admitted_to_hospital() -> AdmissionsRule {
        AdmissionsRule::default()
    }

    pub fn attended_emergency_care() -> EmergencyCareRule {
        EmergencyCareRule::default()
    }

    pub fn died_from_any_cause() -> DeathRule {
        DeathRule::default()
    }

    pub fn with_these_codes_on_death_certificate(
        codelist: impl Into<String>,
    ) -> DeathCertificateRule {
        DeathCertificateRule {
            codelist: codelist.into(),
            window: TimeWindow::unbounded(),
            match_only_underlying_cause: false,
            returning: DeathReturning::BinaryFlag,
            date_format: None,
        }
    }

    pub fn with_gp_consultations() -> GpConsultationsRule {
        GpConsultationsRule::default()
    }

    pub fn most_recent_bmi() -> BmiRule {
        BmiRule::default()
    }

    pub fn age_as_of(date: impl Into<String>) -> Rule {
        Rule::AgeAsOf { date: date.into() }
    }

    pub fn sex() -> Rule {
        Rule::Sex
    }

    pub fn registered_as_of(date: impl Into<String>) -> Rule {
        Rule::RegisteredAsOf { date: date.into() }
    }

    pub fn registered_practice_as_of(date: impl Into<String>, returning: PracticeAttribute) -> Rule {
        Rule::RegisteredPracticeAsOf {
            date: date.into(),
            returning,
        }
    }

    pub fn address_as_of(
        date: impl Into<String>,
        returning: AddressAttribute,
        round_to_nearest: Option<u32>,
    ) -> Rule {
        Rule::AddressAsOf {
            date: date.into(),
            returning,
            round_to_nearest,
        }
    }

    pub fn care_home_status_as_of<L, P>(
        date: impl Into<String>,
        categories: impl IntoIterator<Item = (L, P)>,
    ) -> Rule
    where
        L: Into<String>,
        P: Into<String>,
    {
        Rule::CareHomeStatusAsOf {
            date: date.into(),
            categorised_as: categories
                .into_iter()
                .map(|(label, predicate)| Category::new(label, predicate))
                .collect(),
        }
    }

    pub fn categorised_as<L, P>(categories: impl IntoIterator<Item = (L, P)>) -> Categorisation
    where
        L: Into<String>,
        P: Into<String>,
    {
        Categorisation {
            categories: categories
                .into_iter()
                .map(|(label, predicate)| Category::new(label, predicate))
                .collect(),
            hidden: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_matches_declared_shape() {
        let decl = VariableDecl::new(
            "ca_date",
            patients::with_these_clinical_events("pan_cancer_codes")
                .find_first()
                .returning(EventReturning::Date)
                .date_format(DateFormat::YearMonthDay),
        );
        let Rule::ClinicalEvents(rule) = &decl.rule else {
            panic!("expected clinical events rule");
        };
        assert!(rule.selection.find_first_match_in_period);
        assert!(rule.window.is_unbounded());
        assert_eq!(decl.rule.codelists(), vec!["pan_cancer_codes"]);
    }

    #[test]
    fn test_serde_uses_rule_vocabulary() {
        let decl = VariableDecl::new(
            "liver_funct",
            patients::with_these_clinical_events("liver_funct_codes")
                .between("ca_date - 6 months", "ca_date")
                .find_last(),
        );
        let json = serde_json::to_value(&decl).unwrap();
        assert_eq!(json["rule"]["kind"], "with_these_clinical_events");
        assert_eq!(json["rule"]["find_last_match_in_period"], true);
        assert_eq!(json["rule"]["window"]["on_or_after"], "ca_date - 6 months");

        let back: VariableDecl = serde_json::from_value(json).unwrap();
        assert_eq!(back, decl);
    }
}
