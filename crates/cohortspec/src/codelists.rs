//! Codelists used by the pancreatic-cancer studies
//!
//! CSV-backed lists name their file relative to the codelist directory given
//! to [`load`]. The two short lists are declared inline.

use cohortspec_codelist::{CodelistRegistry, CodelistSource, CodelistSpec, CodingSystem};
use cohortspec_diagnostics::Result;
use std::path::Path;

/// Enzyme replacement therapy is a medication, but the list is declared as SNOMED CT
pub const ENZYME_REPLACE_FLAG: &str =
    "medication concepts declared as SNOMED CT; dm+d is the expected system";

/// Every codelist the built-in studies refer to, in declaration order
pub fn specs() -> Vec<CodelistSpec> {
    use CodingSystem::{Ctv3, Icd10, Opcs4, Snomed};

    let csv = |name: &str, system, file: &str, column: &str| {
        CodelistSpec::new(name, system, CodelistSource::csv(file, column))
    };
    vec![
        CodelistSpec::new(
            "ethnicity_codes",
            Ctv3,
            CodelistSource::csv_with_categories("opensafely-ethnicity.csv", "Code", "Grouping_6"),
        ),
        CodelistSpec::new(
            "ethnicity_codes_16",
            Ctv3,
            CodelistSource::csv_with_categories("opensafely-ethnicity.csv", "Code", "Grouping_16"),
        ),
        csv("jaundice", Snomed, "user-agleman-jaundice.csv", "code"),
        csv("ca19_9", Snomed, "user-agleman-ca_19_9.csv", "code"),
        csv("cea", Snomed, "user-agleman-cea.csv", "code"),
        csv(
            "cancer_referral_codes",
            Snomed,
            "user-agleman-cancer_referrals_pancreatic_cancer_snomed.csv",
            "code",
        ),
        csv(
            "enzyme_replace",
            Snomed,
            "user-agleman-pancreatic-enzyme-replacement-therapy.csv",
            "code",
        )
        .with_quality_flag(ENZYME_REPLACE_FLAG),
        csv(
            "chemotherapy_or_radiotherapy_codes",
            Ctv3,
            "opensafely-chemotherapy-or-radiotherapy.csv",
            "CTV3ID",
        ),
        csv("pan_cancer_codes", Snomed, "user-agleman-pancreatic_cancer_snomed.csv", "code"),
        csv("diabetes_codes", Ctv3, "opensafely-diabetes.csv", "CTV3ID"),
        csv("liver_funct_codes", Snomed, "user-agleman-liver_function_tests.csv", "code"),
        csv("pa_ca_icd10", Icd10, "user-agleman-pancreatic-cancer-icd10.csv", "code"),
        CodelistSpec::new(
            "hba1c_new_codes",
            Ctv3,
            CodelistSource::inline(["XaPbt", "Xaeze", "Xaezd"]),
        ),
        CodelistSpec::new(
            "pancreatic_resection_opcs4",
            Opcs4,
            CodelistSource::inline([
                "J55", "J55.1", "J55.2", "J55.3", "J55.8", "J55.9", "J56", "J56.1", "J56.2",
                "J56.3", "J56.4", "J56.8", "J56.9", "J57", "J57.1", "J57.2", "J57.3", "J57.4",
                "J57.5", "J57.6", "J57.8", "J57.9",
            ]),
        ),
    ]
}

/// Load every built-in codelist, resolving CSV files against `dir`
pub fn load(dir: &Path) -> Result<CodelistRegistry> {
    let mut registry = CodelistRegistry::with_base_dir(dir);
    registry.load_all(&specs())?;
    log::debug!("loaded {} codelists from {}", registry.len(), dir.display());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let specs = specs();
        let names: HashSet<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn test_only_enzyme_list_is_flagged() {
        let flagged: Vec<String> = specs()
            .into_iter()
            .filter(|s| s.quality_flag.is_some())
            .map(|s| s.name)
            .collect();
        assert_eq!(flagged, vec!["enzyme_replace".to_string()]);
    }
}
