//! CLI Command Tests
//!
//! Runs the command implementations directly, writing output to temp files.

use cohortspec::BuiltinStudy;
use cohortspec::cli::codelists::{CodelistsConfig, list};
use cohortspec::cli::extract::{ExtractConfig, extract, measures};
use cohortspec::cli::output::OutputFormat;
use cohortspec::cli::validate::{ValidateConfig, validate};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn codelist_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../codelists")
}

const PATIENTS: &str = r#"[
    {
        "patient_id": 2,
        "date_of_birth": "1940-02-10",
        "sex": "F",
        "registrations": [{"start_date": "2001-01-01", "practice": {"nuts1_region_name": "London"}}],
        "clinical_events": [
            {"system": "snomed", "code": "363418001", "date": "2020-09-14"},
            {"system": "snomed", "code": "18165001", "date": "2020-08-30"}
        ],
        "death": {"date": "2021-02-01", "causes": [{"code": "C25.0", "underlying": true}]}
    },
    {
        "patient_id": 1,
        "date_of_birth": "1951-05-15",
        "sex": "M",
        "clinical_events": [{"system": "snomed", "code": "363418001", "date": "2021-06-01"}]
    },
    {"patient_id": 3, "date_of_birth": "1980-01-01", "sex": "F"}
]"#;

fn setup() -> (TempDir, ExtractConfig) {
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("patients.json");
    fs::write(&records, PATIENTS).unwrap();
    let config = ExtractConfig {
        study: BuiltinStudy::Main,
        codelists: codelist_dir(),
        records,
        today: "2022-01-01".parse().ok(),
        format: OutputFormat::Json,
        output_file: Some(dir.path().join("out.json")),
        verbose: false,
    };
    (dir, config)
}

fn written(dir: &TempDir) -> Value {
    let text = fs::read_to_string(dir.path().join("out.json")).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_validate_all_studies() {
    let report = validate(ValidateConfig {
        studies: Vec::new(),
        codelists: codelist_dir(),
        strict: false,
        verbose: false,
    })
    .unwrap();
    assert_eq!(report.studies, 3);
    assert_eq!(report.errors, 0);
    assert!(report.warnings > 0);
}

#[test]
fn test_validate_strict_fails_on_warnings() {
    let result = validate(ValidateConfig {
        studies: vec![BuiltinStudy::Main],
        codelists: codelist_dir(),
        strict: true,
        verbose: false,
    });
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Strict mode"));
}

#[test]
fn test_validate_strict_passes_clean_study() {
    let report = validate(ValidateConfig {
        studies: vec![BuiltinStudy::Denominator],
        codelists: codelist_dir(),
        strict: true,
        verbose: false,
    })
    .unwrap();
    assert_eq!(report.warnings, 0);
}

#[test]
fn test_extract_writes_rows_in_patient_order() {
    let (dir, config) = setup();
    let dataset = extract(config).unwrap();
    assert_eq!(dataset.len(), 2);

    let rows = written(&dir);
    let ids: Vec<u64> = rows
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["patient_id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let second = &rows[1];
    assert_eq!(second["ca_date"], json!("2020-09-14"));
    assert_eq!(second["jaundice"], json!(true));
    assert_eq!(second["died_ca_date"], json!("2021-02-01"));
    assert_eq!(second["region"], json!("London"));
    // No registration on the diagnosis date
    assert_eq!(rows[0]["region"], json!(""));
}

#[test]
fn test_measures_are_redacted_for_small_cohort() {
    let (dir, config) = setup();
    let rows = measures(config).unwrap();
    assert!(rows.iter().all(|r| r.redacted));
    assert_eq!(
        written(&dir)[0],
        json!({
            "measure_id": "died_by_region",
            "group": {"region": ""},
            "numerator": null,
            "denominator": null,
            "value": null,
            "redacted": true
        })
    );
}

#[test]
fn test_missing_records_file() {
    let (_dir, mut config) = setup();
    config.records = PathBuf::from("/nonexistent/patients.json");
    let err = extract(config).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load records"));
}

#[test]
fn test_list_codelists() {
    let dir = TempDir::new().unwrap();
    let summaries = list(CodelistsConfig {
        codelists: codelist_dir(),
        format: OutputFormat::Table,
        output_file: Some(dir.path().join("codelists.txt")),
    })
    .unwrap();

    assert_eq!(summaries.len(), cohortspec::codelists::specs().len());
    let ethnicity = summaries.iter().find(|s| s.name == "ethnicity_codes").unwrap();
    assert_eq!(ethnicity.categories, 5);
    assert_eq!(ethnicity.system, "CTV3");
    let enzyme = summaries.iter().find(|s| s.name == "enzyme_replace").unwrap();
    assert!(!enzyme.quality_flag.is_empty());

    let table = fs::read_to_string(dir.path().join("codelists.txt")).unwrap();
    assert!(table.contains("pancreatic_resection_opcs4"));
}
