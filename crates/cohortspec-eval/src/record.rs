//! Patient records the reference extractor reads
//!
//! One [`PatientRecord`] holds everything known about a patient across the
//! primary-care, hospital and registry sources. Records deserialize from JSON
//! with every collection optional.

use chrono::NaiveDate;
use cohortspec_codelist::CodingSystem;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientRecord {
    pub patient_id: u64,
    pub date_of_birth: Option<NaiveDate>,
    /// `M`, `F`, `I` or `U`
    pub sex: Option<String>,
    pub death: Option<DeathRecord>,
    pub registrations: Vec<Registration>,
    pub addresses: Vec<Address>,
    pub clinical_events: Vec<ClinicalEvent>,
    pub admissions: Vec<Admission>,
    pub emergency_attendances: Vec<EmergencyAttendance>,
    pub gp_consultations: Vec<GpConsultation>,
    pub bmi_measurements: Vec<BmiMeasurement>,
}

impl PatientRecord {
    pub fn new(patient_id: u64) -> Self {
        Self {
            patient_id,
            ..Self::default()
        }
    }

    /// Whole years between birth and `date`; `None` before birth or when unknown
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        date.years_since(self.date_of_birth?)
    }

    /// The registration active on `date`, preferring the most recent start
    pub fn registration_on(&self, date: NaiveDate) -> Option<&Registration> {
        self.registrations
            .iter()
            .filter(|r| covers(r.start_date, r.end_date, date))
            .max_by_key(|r| r.start_date)
    }

    /// The address held on `date`, preferring the most recent start
    pub fn address_on(&self, date: NaiveDate) -> Option<&Address> {
        self.addresses
            .iter()
            .filter(|a| covers(a.start_date, a.end_date, date))
            .max_by_key(|a| a.start_date)
    }
}

fn covers(start: NaiveDate, end: Option<NaiveDate>, date: NaiveDate) -> bool {
    start <= date && end.is_none_or(|end| date <= end)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeathRecord {
    pub date: NaiveDate,
    /// ICD-10 causes as recorded on the certificate
    #[serde(default)]
    pub causes: Vec<CauseOfDeath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CauseOfDeath {
    pub code: String,
    #[serde(default)]
    pub underlying: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub practice: Practice,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Practice {
    pub msoa_code: Option<String>,
    pub stp_code: Option<String>,
    pub nuts1_region_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub index_of_multiple_deprivation: Option<i64>,
    #[serde(default)]
    pub care_home: Option<CareHome>,
}

/// Care-home attributes of an address, as matched by the address register
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CareHome {
    pub is_potential_care_home: bool,
    /// `Y` or `N`
    pub location_requires_nursing: Option<String>,
    /// `Y` or `N`
    pub location_does_not_require_nursing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalEvent {
    pub system: CodingSystem,
    pub code: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub numeric_value: Option<Decimal>,
}

impl ClinicalEvent {
    pub fn new(system: CodingSystem, code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            system,
            code: code.into(),
            date,
            numeric_value: None,
        }
    }

    pub fn with_value(mut self, value: Decimal) -> Self {
        self.numeric_value = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub admission_date: NaiveDate,
    /// ICD-10 diagnoses recorded for the spell
    #[serde(default)]
    pub diagnoses: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyAttendance {
    pub arrival_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpConsultation {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiMeasurement {
    pub date: NaiveDate,
    pub value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_age_in_whole_years() {
        let patient = PatientRecord {
            date_of_birth: Some(date(1951, 6, 2)),
            ..PatientRecord::new(1)
        };
        assert_eq!(patient.age_on(date(2021, 6, 1)), Some(69));
        assert_eq!(patient.age_on(date(2021, 6, 2)), Some(70));
        assert_eq!(patient.age_on(date(1950, 1, 1)), None);
        assert_eq!(PatientRecord::new(2).age_on(date(2021, 6, 1)), None);
    }

    #[test]
    fn test_registration_prefers_latest_start() {
        let practice = |stp: &str| Practice {
            stp_code: Some(stp.to_string()),
            ..Practice::default()
        };
        let patient = PatientRecord {
            registrations: vec![
                Registration {
                    start_date: date(2000, 1, 1),
                    end_date: None,
                    practice: practice("E54000005"),
                },
                Registration {
                    start_date: date(2015, 3, 1),
                    end_date: Some(date(2019, 12, 31)),
                    practice: practice("E54000006"),
                },
            ],
            ..PatientRecord::new(1)
        };
        let stp = |d| {
            patient
                .registration_on(d)
                .and_then(|r| r.practice.stp_code.clone())
        };
        assert_eq!(stp(date(2016, 1, 1)).as_deref(), Some("E54000006"));
        assert_eq!(stp(date(2019, 12, 31)).as_deref(), Some("E54000006"));
        assert_eq!(stp(date(2020, 1, 1)).as_deref(), Some("E54000005"));
        assert_eq!(stp(date(1999, 1, 1)), None);
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let json = r#"{
            "patient_id": 12,
            "date_of_birth": "1951-06-01",
            "clinical_events": [
                {"system": "snomed", "code": "363418001", "date": "2021-06-01"},
                {"system": "ctv3", "code": "XaPbt", "date": "2021-05-01", "numeric_value": "48.5"}
            ]
        }"#;
        let patient: PatientRecord = serde_json::from_str(json).unwrap();
        assert_eq!(patient.patient_id, 12);
        assert_eq!(patient.clinical_events.len(), 2);
        assert_eq!(patient.clinical_events[1].numeric_value, Some(Decimal::new(485, 1)));
        assert!(patient.admissions.is_empty());
        assert!(patient.death.is_none());
    }
}
