use cohortspec_codelist::{CodelistRegistry, CodelistSource, CodelistSpec, CodingSystem};
use cohortspec_diagnostics::{COH0303, COH0304};
use pretty_assertions::assert_eq;
use std::fs;

fn write(dir: &std::path::Path, name: &str, text: &str) {
    fs::create_dir_all(dir.join("codelists")).unwrap();
    fs::write(dir.join("codelists").join(name), text).unwrap();
}

#[test]
fn test_relative_paths_resolve_against_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "opensafely-ethnicity.csv",
        "Code,Grouping_6,Grouping_16\nXaJQv,1,1\nXaJR0,3,8\n",
    );
    write(
        dir.path(),
        "user-agleman-pa_ca_icd10.csv",
        "code,term\nC25,Malignant neoplasm of pancreas\n",
    );

    let mut registry = CodelistRegistry::with_base_dir(dir.path());
    let specs = [
        CodelistSpec::new(
            "ethnicity_codes",
            CodingSystem::Ctv3,
            CodelistSource::csv_with_categories(
                "codelists/opensafely-ethnicity.csv",
                "Code",
                "Grouping_6",
            ),
        ),
        CodelistSpec::new(
            "ethnicity_codes_16",
            CodingSystem::Ctv3,
            CodelistSource::csv_with_categories(
                "codelists/opensafely-ethnicity.csv",
                "Code",
                "Grouping_16",
            ),
        ),
        CodelistSpec::new(
            "pa_ca_icd10",
            CodingSystem::Icd10,
            CodelistSource::csv("codelists/user-agleman-pa_ca_icd10.csv", "code"),
        ),
    ];
    registry.load_all(&specs).unwrap();

    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["ethnicity_codes", "ethnicity_codes_16", "pa_ca_icd10"]
    );
    let eth16 = registry.require("ethnicity_codes_16").unwrap();
    assert_eq!(eth16.category_of("XaJR0"), Some("8"));
    assert!(registry.require("pa_ca_icd10").unwrap().matches("C25.1"));
}

#[test]
fn test_load_all_collects_every_failure() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "diabetes.csv", "code\nC10..\n");

    let mut registry = CodelistRegistry::with_base_dir(dir.path());
    let specs = [
        CodelistSpec::new(
            "diabetes_codes",
            CodingSystem::Ctv3,
            CodelistSource::csv("codelists/diabetes.csv", "CTV3ID"),
        ),
        CodelistSpec::new(
            "jaundice",
            CodingSystem::Snomed,
            CodelistSource::csv("codelists/missing.csv", "code"),
        ),
    ];
    let err = registry.load_all(&specs).unwrap_err();
    let codes: Vec<_> = err.errors().iter().map(|e| e.code()).collect();
    assert_eq!(codes, vec![COH0304, COH0303]);
    assert!(registry.is_empty());
}
