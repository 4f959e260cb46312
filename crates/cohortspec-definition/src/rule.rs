//! Extraction rules as declared in a study definition

use crate::format::DateFormat;
use crate::variable::VariableDecl;
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};

/// What a coded clinical-events rule reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventReturning {
    #[default]
    BinaryFlag,
    Date,
    NumericValue,
    NumberOfMatchesInPeriod,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionReturning {
    #[default]
    BinaryFlag,
    DateAdmitted,
    NumberOfMatchesInPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyReturning {
    #[default]
    BinaryFlag,
    DateArrived,
    NumberOfMatchesInPeriod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathReturning {
    #[default]
    BinaryFlag,
    DateOfDeath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationReturning {
    #[default]
    BinaryFlag,
    NumberOfMatchesInPeriod,
}

/// Attribute of the practice a patient is registered with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeAttribute {
    MsoaCode,
    StpCode,
    Nuts1RegionName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressAttribute {
    IndexOfMultipleDeprivation,
}

/// First/last flags exactly as written; the compiler decides if they are consistent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchSelection {
    #[serde(default)]
    pub find_first_match_in_period: bool,
    #[serde(default)]
    pub find_last_match_in_period: bool,
}

/// Extra `<name>_date` column for the matched event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateOfMatch {
    #[serde(default)]
    pub include_date_of_match: bool,
    #[serde(default)]
    pub include_month: bool,
    #[serde(default)]
    pub include_day: bool,
}

/// `with_these_clinical_events`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClinicalEventsRule {
    pub codelist: String,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub returning: EventReturning,
    #[serde(flatten)]
    pub selection: MatchSelection,
    #[serde(flatten)]
    pub date_of_match: DateOfMatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// `admitted_to_hospital`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AdmissionsRule {
    /// ICD-10 codelist matched against any recorded diagnosis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub with_these_diagnoses: Option<String>,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub returning: AdmissionReturning,
    #[serde(flatten)]
    pub selection: MatchSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// `attended_emergency_care`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmergencyCareRule {
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub returning: EmergencyReturning,
    #[serde(flatten)]
    pub selection: MatchSelection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// `died_from_any_cause`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeathRule {
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub returning: DeathReturning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// `with_these_codes_on_death_certificate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCertificateRule {
    pub codelist: String,
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub match_only_underlying_cause: bool,
    #[serde(default)]
    pub returning: DeathReturning,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// `with_gp_consultations`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GpConsultationsRule {
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub returning: ConsultationReturning,
}

/// `most_recent_bmi`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BmiRule {
    #[serde(default)]
    pub window: TimeWindow,
    #[serde(default)]
    pub minimum_age_at_measurement: u32,
    #[serde(default)]
    pub include_measurement_date: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<DateFormat>,
}

/// One labelled predicate of a categorisation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub label: String,
    /// Predicate text, or `DEFAULT`
    pub predicate: String,
}

impl Category {
    pub fn new(label: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            predicate: predicate.into(),
        }
    }
}

/// `categorised_as`: first matching predicate wins, `DEFAULT` otherwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Categorisation {
    pub categories: Vec<Category>,
    /// Helper variables resolved for the predicates but not emitted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hidden: Vec<VariableDecl>,
}

/// A variable's extraction rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    #[serde(rename = "with_these_clinical_events")]
    ClinicalEvents(ClinicalEventsRule),
    AdmittedToHospital(AdmissionsRule),
    AttendedEmergencyCare(EmergencyCareRule),
    DiedFromAnyCause(DeathRule),
    #[serde(rename = "with_these_codes_on_death_certificate")]
    DeathCertificate(DeathCertificateRule),
    #[serde(rename = "with_gp_consultations")]
    GpConsultations(GpConsultationsRule),
    MostRecentBmi(BmiRule),
    AgeAsOf {
        date: String,
    },
    Sex,
    RegisteredAsOf {
        date: String,
    },
    RegisteredPracticeAsOf {
        date: String,
        returning: PracticeAttribute,
    },
    AddressAsOf {
        date: String,
        returning: AddressAttribute,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round_to_nearest: Option<u32>,
    },
    CareHomeStatusAsOf {
        date: String,
        categorised_as: Vec<Category>,
    },
    CategorisedAs(Categorisation),
}

impl Rule {
    /// Name used in messages and listings
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ClinicalEvents(_) => "with_these_clinical_events",
            Self::AdmittedToHospital(_) => "admitted_to_hospital",
            Self::AttendedEmergencyCare(_) => "attended_emergency_care",
            Self::DiedFromAnyCause(_) => "died_from_any_cause",
            Self::DeathCertificate(_) => "with_these_codes_on_death_certificate",
            Self::GpConsultations(_) => "with_gp_consultations",
            Self::MostRecentBmi(_) => "most_recent_bmi",
            Self::AgeAsOf { .. } => "age_as_of",
            Self::Sex => "sex",
            Self::RegisteredAsOf { .. } => "registered_as_of",
            Self::RegisteredPracticeAsOf { .. } => "registered_practice_as_of",
            Self::AddressAsOf { .. } => "address_as_of",
            Self::CareHomeStatusAsOf { .. } => "care_home_status_as_of",
            Self::CategorisedAs(_) => "categorised_as",
        }
    }

    /// Codelists the rule draws on
    pub fn codelists(&self) -> Vec<&str> {
        match self {
            Self::ClinicalEvents(r) => vec![r.codelist.as_str()],
            Self::DeathCertificate(r) => vec![r.codelist.as_str()],
            Self::AdmittedToHospital(r) => r.with_these_diagnoses.as_deref().into_iter().collect(),
            _ => Vec::new(),
        }
    }
}
