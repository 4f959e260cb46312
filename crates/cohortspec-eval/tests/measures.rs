//! Measures Tests
//!
//! Extract-then-aggregate runs over a synthetic practice population.

use chrono::NaiveDate;
use cohortspec_codelist::{Codelist, CodelistRegistry, CodingSystem};
use cohortspec_definition::{
    CompiledStudy, Measure, PracticeAttribute, StudyDefinition, compile, patients,
};
use cohortspec_eval::{
    ClinicalEvent, Dataset, Extractor, InMemoryRecords, MeasureAggregator, MeasureRow,
    PatientRecord, Practice, Registration, Value,
};
use pretty_assertions::assert_eq;

const REGIONS: [&str; 5] = ["East", "London", "North West", "South East", "West Midlands"];

fn date(text: &str) -> NaiveDate {
    text.parse().unwrap()
}

fn study() -> CompiledStudy {
    let mut registry = CodelistRegistry::new();
    registry
        .insert(Codelist::inline("pan_cancer_codes", CodingSystem::Snomed, ["363418001"]).unwrap())
        .unwrap();
    let definition = StudyDefinition::new("regional_rates")
        .population("registered")
        .variable("registered", patients::registered_as_of("2020-01-01"))
        .variable(
            "region",
            patients::registered_practice_as_of("2020-01-01", PracticeAttribute::Nuts1RegionName),
        )
        .variable("pa_ca", patients::with_these_clinical_events("pan_cancer_codes"))
        .measure(
            Measure::new("cancer_by_region", "pa_ca", "population")
                .group_by(["region"])
                .with_small_number_suppression(),
        )
        .measure(Measure::new("cancer_overall", "pa_ca", "registered"));
    compile(&definition, &registry).unwrap()
}

fn patient(id: u64, region: &str, cancer: bool) -> PatientRecord {
    PatientRecord {
        date_of_birth: Some(date("1960-01-01")),
        registrations: vec![Registration {
            start_date: date("2010-01-01"),
            end_date: None,
            practice: Practice {
                nuts1_region_name: Some(region.to_string()),
                ..Practice::default()
            },
        }],
        clinical_events: if cancer {
            vec![ClinicalEvent::new(CodingSystem::Snomed, "363418001", date("2019-05-01"))]
        } else {
            Vec::new()
        },
        ..PatientRecord::new(id)
    }
}

/// 200 patients per region with 10% cancer, three in Wales, two deregistered
fn population() -> Vec<PatientRecord> {
    let mut patients: Vec<PatientRecord> = (1..=1000u64)
        .map(|id| {
            let region = REGIONS[((id - 1) % 5) as usize];
            patient(id, region, ((id - 1) / 5) % 10 == 0)
        })
        .collect();
    patients.extend((1001..=1003).map(|id| patient(id, "Wales", id == 1001)));
    for id in [1004, 1005] {
        let mut left = patient(id, "East", true);
        left.registrations[0].end_date = Some(date("2019-06-30"));
        patients.push(left);
    }
    patients
}

fn extract(study: &CompiledStudy) -> Dataset {
    let records = InMemoryRecords::new(population()).unwrap();
    Extractor::new(study)
        .with_today(date("2022-01-01"))
        .extract(&records)
        .unwrap()
}

fn summary(rows: &[MeasureRow]) -> String {
    let count = |c: Option<u64>| c.map_or("-".to_string(), |c| c.to_string());
    rows.iter()
        .map(|row| {
            let group: Vec<String> = row.group.values().map(Value::to_string).collect();
            format!(
                "{} [{}] {}/{} {}",
                row.measure_id,
                group.join(","),
                count(row.numerator),
                count(row.denominator),
                row.value.map_or("-".to_string(), |v| format!("{:.2}", v)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn test_population_excludes_deregistered() {
    let dataset = extract(&study());
    assert_eq!(dataset.len(), 1003);
    assert!(dataset.row(1004).is_none());
    assert_eq!(dataset.row(1001).and_then(|r| r.get("region")), Some(&Value::str("Wales")));
}

#[test]
fn test_rates_by_region_with_suppression() {
    let study = study();
    let dataset = extract(&study);
    let rows = MeasureAggregator::for_study(&study).aggregate(&dataset).unwrap();

    insta::assert_snapshot!(summary(&rows), @r"
    cancer_by_region [East] 20/200 0.10
    cancer_by_region [London] 20/200 0.10
    cancer_by_region [North West] 20/200 0.10
    cancer_by_region [South East] 20/200 0.10
    cancer_by_region [Wales] -/- -
    cancer_by_region [West Midlands] 20/200 0.10
    cancer_overall [] 101/1003 0.10
    ");

    let wales = &rows[4];
    assert!(wales.redacted);
    assert_eq!(wales.group.get("region"), Some(&Value::str("Wales")));
}

#[test]
fn test_measure_rows_serialize_plainly() {
    let study = study();
    let dataset = extract(&study);
    let rows = MeasureAggregator::for_study(&study).aggregate(&dataset).unwrap();
    let json = serde_json::to_value(&rows[0]).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "measure_id": "cancer_by_region",
            "group": {"region": "East"},
            "numerator": 20,
            "denominator": 200,
            "value": 0.1,
            "redacted": false
        })
    );
}
