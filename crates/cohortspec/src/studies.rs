//! Built-in pancreatic-cancer study definitions
//!
//! - [`main`]: the analysis cohort, anchored on the first pancreatic-cancer code
//! - [`full`]: the wider variable set (before/after splits, ethnicity groups)
//! - [`denominator`]: adults registered on the index date
//!
//! The cancer studies have no study-wide index date; every window is anchored
//! on `ca_date`.

use cohortspec_definition::{
    AddressAttribute, AdmissionReturning, DateFormat, DateRange, DeathReturning, Distribution,
    EmergencyReturning, EventReturning, Measure, PracticeAttribute, Rate, ReturnExpectations,
    StudyDefinition, VariableDecl, patients,
};
use std::fmt;
use std::str::FromStr;

const ADULT_POPULATION: &str = "pa_ca AND\n(age >=18 AND age <= 110)";
const BEFORE_DIAGNOSIS: (&str, &str) = ("ca_date - 6 months", "ca_date");
const AFTER_DIAGNOSIS: (&str, &str) = ("ca_date", "ca_date + 6 months");

/// One of the shipped study definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BuiltinStudy {
    Main,
    Full,
    Denominator,
}

impl BuiltinStudy {
    pub const ALL: [BuiltinStudy; 3] = [Self::Main, Self::Full, Self::Denominator];

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Full => "full",
            Self::Denominator => "denominator",
        }
    }

    pub fn definition(&self) -> StudyDefinition {
        match self {
            Self::Main => main(),
            Self::Full => full(),
            Self::Denominator => denominator(),
        }
    }
}

impl fmt::Display for BuiltinStudy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BuiltinStudy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|study| study.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown study '{}' (expected main, full or denominator)", s))
    }
}

// ============================================================================
// Shared declarations
// ============================================================================

fn expect() -> ReturnExpectations {
    ReturnExpectations::new()
}

fn incidence(p: f64) -> ReturnExpectations {
    expect().incidence(p)
}

fn normal_int(mean: f64, stddev: f64, p: f64) -> ReturnExpectations {
    expect().int(Distribution::Normal { mean, stddev }).incidence(p)
}

fn var(name: &str, rule: impl Into<cohortspec_definition::Rule>, hints: ReturnExpectations) -> VariableDecl {
    VariableDecl::new(name, rule).expecting(hints)
}

fn age(anchor: &str) -> VariableDecl {
    var(
        "age",
        patients::age_as_of(anchor),
        expect()
            .rate(Rate::ExponentialIncrease)
            .int(Distribution::PopulationAges),
    )
}

fn sex() -> VariableDecl {
    var(
        "sex",
        patients::sex(),
        expect()
            .rate(Rate::Universal)
            .category([("M", 0.49), ("F", 0.51)]),
    )
}

fn stp() -> VariableDecl {
    var(
        "stp",
        patients::registered_practice_as_of("ca_date", PracticeAttribute::StpCode),
        expect().rate(Rate::Universal).category([
            ("E54000005", 0.25),
            ("E54000006", 0.25),
            ("E54000007", 0.25),
            ("E54000008", 0.25),
        ]),
    )
}

fn region() -> VariableDecl {
    var(
        "region",
        patients::registered_practice_as_of("ca_date", PracticeAttribute::Nuts1RegionName),
        expect().rate(Rate::Universal).category([
            ("North East", 0.1),
            ("North West", 0.1),
            ("Yorkshire and the Humber", 0.2),
            ("East Midlands", 0.1),
            ("West Midlands", 0.1),
            ("East of England", 0.1),
            ("London", 0.1),
            ("South East", 0.2),
        ]),
    )
}

fn imd_rank(name: &str, hints: ReturnExpectations) -> VariableDecl {
    var(
        name,
        patients::address_as_of("ca_date", AddressAttribute::IndexOfMultipleDeprivation, Some(100)),
        hints,
    )
}

fn imd_rank_hints() -> ReturnExpectations {
    expect()
        .rate(Rate::Universal)
        .category([("100", 0.1), ("200", 0.2), ("300", 0.7)])
}

/// Quintiles of the 32,844 English LSOAs, `default` when the rank is unknown
fn imd_quintiles(name: &str, default: &str, ratios: [(&str, f64); 6]) -> VariableDecl {
    let bound = |q: u32| format!("32844*{}/5", q);
    let mut categories = vec![(default.to_string(), "DEFAULT".to_string())];
    categories.push((
        "1".to_string(),
        format!("index_of_multiple_deprivation >=1 AND index_of_multiple_deprivation < {}", bound(1)),
    ));
    for q in 2..=4 {
        categories.push((
            q.to_string(),
            format!(
                "index_of_multiple_deprivation >= {} AND index_of_multiple_deprivation < {}",
                bound(q - 1),
                bound(q)
            ),
        ));
    }
    categories.push((
        "5".to_string(),
        format!("index_of_multiple_deprivation >= {} AND index_of_multiple_deprivation < 32844", bound(4)),
    ));
    var(
        name,
        patients::categorised_as(categories)
            .hidden(imd_rank("index_of_multiple_deprivation", expect())),
        expect().rate(Rate::Universal).category(ratios),
    )
}

fn bmi_categories(window: (&str, &str)) -> VariableDecl {
    var(
        "bmi_cat",
        patients::categorised_as([
            ("No data", "DEFAULT"),
            ("Underweight (<18.5)", "bmi_value >= 5 AND bmi_value < 18.5"),
            ("Normal (18.5-24.9)", "bmi_value >= 18.5 AND bmi_value < 25"),
            ("Overweight (25-29.9)", "bmi_value >= 25 AND bmi_value < 30"),
            ("Obese I (30-34.9)", "bmi_value >= 30 AND bmi_value < 35"),
            ("Obese II (35-39.9)", "bmi_value >= 35 AND bmi_value < 40"),
            ("Obese III (40+)", "bmi_value >= 40 AND bmi_value < 100"),
        ])
        .hidden(VariableDecl::new(
            "bmi_value",
            patients::most_recent_bmi()
                .between(window.0, window.1)
                .minimum_age_at_measurement(16),
        )),
        expect().rate(Rate::Universal).category([
            ("No data", 0.2),
            ("Underweight (<18.5)", 0.2),
            ("Normal (18.5-24.9)", 0.3),
            ("Overweight (25-29.9)", 0.1),
            ("Obese I (30-34.9)", 0.1),
            ("Obese II (35-39.9)", 0.05),
            ("Obese III (40+)", 0.05),
        ]),
    )
}

fn diabetes() -> VariableDecl {
    var(
        "diabetes",
        patients::with_these_clinical_events("diabetes_codes").include_date_of_match(true, true),
        incidence(0.30),
    )
}

/// Binary flags for tests, symptoms and referrals in the six months before diagnosis
fn pre_diagnosis_flags(find_last: bool) -> Vec<VariableDecl> {
    [
        ("liver_funct", "liver_funct_codes", 0.50),
        ("ca19_9", "ca19_9", 0.20),
        ("CEAntigen", "cea", 0.10),
        ("jaundice", "jaundice", 0.60),
        ("Refer", "cancer_referral_codes", 0.6),
    ]
    .into_iter()
    .map(|(name, codelist, p)| {
        let rule = patients::with_these_clinical_events(codelist)
            .between(BEFORE_DIAGNOSIS.0, BEFORE_DIAGNOSIS.1);
        let rule = if find_last { rule.find_last() } else { rule };
        var(name, rule, incidence(p))
    })
    .collect()
}

/// Enzyme prescriptions, admissions, emergency care, deaths, consultations and care homes
fn outcomes() -> Vec<VariableDecl> {
    vec![
        var(
            "enz_repl",
            patients::with_these_clinical_events("enzyme_replace")
                .between(BEFORE_DIAGNOSIS.0, BEFORE_DIAGNOSIS.1)
                .returning(EventReturning::NumberOfMatchesInPeriod),
            normal_int(3.0, 2.0, 0.1),
        ),
        var(
            "adm_before",
            patients::admitted_to_hospital()
                .between(BEFORE_DIAGNOSIS.0, BEFORE_DIAGNOSIS.1)
                .returning(AdmissionReturning::NumberOfMatchesInPeriod),
            normal_int(2.0, 1.0, 0.4),
        ),
        var(
            "adm_after",
            patients::admitted_to_hospital()
                .between(AFTER_DIAGNOSIS.0, AFTER_DIAGNOSIS.1)
                .returning(AdmissionReturning::NumberOfMatchesInPeriod),
            normal_int(3.0, 3.0, 0.6),
        ),
        var(
            "adm_ca",
            patients::admitted_to_hospital()
                .with_these_diagnoses("pa_ca_icd10")
                .between("ca_date - 6 months", "ca_date + 6 months")
                .returning(AdmissionReturning::NumberOfMatchesInPeriod),
            normal_int(2.0, 2.0, 0.3),
        ),
        var(
            "adm_ca_date",
            patients::admitted_to_hospital()
                .with_these_diagnoses("pa_ca_icd10")
                .on_or_after("ca_date")
                .find_first()
                .returning(AdmissionReturning::DateAdmitted)
                .date_format(DateFormat::YearMonthDay),
            expect().date(DateRange::earliest("2015-01-01")),
        ),
        var(
            "emergency_care_before",
            patients::attended_emergency_care()
                .between(BEFORE_DIAGNOSIS.0, BEFORE_DIAGNOSIS.1)
                .returning(EmergencyReturning::NumberOfMatchesInPeriod),
            normal_int(2.0, 2.0, 0.3),
        ),
        var(
            "emergency_care_after",
            patients::attended_emergency_care()
                .between(AFTER_DIAGNOSIS.0, AFTER_DIAGNOSIS.1)
                .returning(EmergencyReturning::NumberOfMatchesInPeriod),
            normal_int(2.0, 2.0, 0.3),
        ),
        var(
            "died",
            patients::died_from_any_cause().on_or_after("ca_date"),
            incidence(0.80),
        ),
        var(
            "died_any",
            patients::died_from_any_cause()
                .on_or_after("ca_date")
                .returning(DeathReturning::DateOfDeath)
                .date_format(DateFormat::YearMonthDay),
            expect()
                .date(DateRange::earliest("2015-01-01"))
                .rate(Rate::ExponentialIncrease)
                .incidence(0.80),
        ),
        var(
            "died_ca",
            patients::with_these_codes_on_death_certificate("pa_ca_icd10")
                .on_or_after("ca_date")
                .match_only_underlying_cause(false),
            incidence(0.50),
        ),
        var(
            "died_ca_date",
            patients::with_these_codes_on_death_certificate("pa_ca_icd10")
                .on_or_after("ca_date")
                .match_only_underlying_cause(false)
                .returning(DeathReturning::DateOfDeath)
                .date_format(DateFormat::YearMonthDay),
            expect()
                .date(DateRange::earliest("2015-01-01"))
                .rate(Rate::ExponentialIncrease)
                .incidence(0.50),
        ),
        var(
            "gp_count",
            patients::with_gp_consultations()
                .between("ca_date - 1 years", "ca_date")
                .returning(cohortspec_definition::ConsultationReturning::NumberOfMatchesInPeriod),
            normal_int(6.0, 3.0, 0.6),
        ),
        var(
            "care_home_type",
            patients::care_home_status_as_of(
                "ca_date",
                [
                    (
                        "PC",
                        "IsPotentialCareHome\nAND LocationDoesNotRequireNursing='Y'\nAND LocationRequiresNursing='N'",
                    ),
                    (
                        "PN",
                        "IsPotentialCareHome\nAND LocationDoesNotRequireNursing='N'\nAND LocationRequiresNursing='Y'",
                    ),
                    ("PS", "IsPotentialCareHome"),
                    ("PR", "NOT IsPotentialCareHome"),
                    ("", "DEFAULT"),
                ],
            ),
            expect()
                .rate(Rate::Universal)
                .category([("PC", 0.05), ("PN", 0.05), ("PS", 0.05), ("PR", 0.84), ("", 0.01)]),
        ),
    ]
}

/// Death rate among the cohort by region, small groups redacted
fn died_by_region() -> Measure {
    Measure::new("died_by_region", "died", "population")
        .group_by(["region"])
        .with_small_number_suppression()
}

fn declare_all(study: StudyDefinition, variables: Vec<VariableDecl>) -> StudyDefinition {
    variables.into_iter().fold(study, StudyDefinition::declare)
}

// ============================================================================
// Studies
// ============================================================================

/// The analysis cohort: adults with a pancreatic-cancer code
pub fn main() -> StudyDefinition {
    let study = StudyDefinition::new("main")
        .default_expectations(
            expect()
                .date(DateRange::new("1900-01-01", "today"))
                .rate(Rate::Uniform)
                .incidence(0.5),
        )
        .population(ADULT_POPULATION);

    let mut variables = vec![
        var("pa_ca", patients::with_these_clinical_events("pan_cancer_codes"), incidence(1.0)),
        var(
            "ca_date",
            patients::with_these_clinical_events("pan_cancer_codes")
                .find_first()
                .returning(EventReturning::Date)
                .date_format(DateFormat::YearMonthDay),
            incidence(1.0),
        ),
        age("ca_date"),
        sex(),
        var(
            "ethnicity",
            patients::with_these_clinical_events("ethnicity_codes")
                .find_last()
                .returning(EventReturning::Category),
            expect()
                .category([("1", 0.8), ("2", 0.01), ("3", 0.01), ("4", 0.18)])
                .incidence(0.75),
        ),
        stp(),
        region(),
        imd_rank("imd", imd_rank_hints()),
        imd_quintiles(
            "imd_quin",
            "No data",
            [("No data", 0.2), ("1", 0.2), ("2", 0.2), ("3", 0.2), ("4", 0.1), ("5", 0.1)],
        ),
        var(
            "bmi",
            patients::most_recent_bmi()
                .between("ca_date - 1 years", "ca_date + 1 years")
                .minimum_age_at_measurement(16)
                .include_measurement_date(DateFormat::YearMonthDay),
            expect()
                .date(DateRange::new("1900-01-01", "today"))
                .float(Distribution::Normal { mean: 25.0, stddev: 8.0 })
                .incidence(0.80),
        ),
        bmi_categories(("ca_date - 1 years", "ca_date + 1 years")),
        var(
            "latest_hba1c",
            patients::with_these_clinical_events("hba1c_new_codes")
                .find_last()
                .between("ca_date - 1 years", "ca_date + 1 years")
                .returning(EventReturning::NumericValue)
                .include_date_of_match(true, true),
            expect()
                .float(Distribution::Normal { mean: 40.0, stddev: 20.0 })
                .incidence(0.95),
        ),
        diabetes(),
    ];
    variables.extend(pre_diagnosis_flags(true));
    variables.extend(outcomes());

    declare_all(study, variables).measure(died_by_region())
}

/// The wider variable set with before/after splits and grouped ethnicity
pub fn full() -> StudyDefinition {
    let study = StudyDefinition::new("full")
        .default_expectations(
            expect()
                .date(DateRange::new("2000-01-01", "today"))
                .rate(Rate::Uniform)
                .incidence(0.5),
        )
        .population(ADULT_POPULATION);

    let bmi_hints = || {
        expect()
            .date(DateRange::new("2013-01-01", "today"))
            .float(Distribution::Normal { mean: 25.0, stddev: 8.0 })
            .incidence(0.1)
    };

    let mut variables = vec![
        var(
            "pa_ca",
            patients::with_these_clinical_events("pan_cancer_codes")
                .on_or_after("1900-01-01")
                .find_first()
                .include_date_of_match(true, true),
            incidence(1.0),
        ),
        var(
            "ca_date",
            patients::with_these_clinical_events("pan_cancer_codes")
                .on_or_after("1900-01-01")
                .find_last()
                .returning(EventReturning::Date)
                .date_format(DateFormat::YearMonthDay),
            incidence(1.0),
        ),
        age("ca_date"),
        sex(),
        var(
            "ethnicity",
            patients::categorised_as([
                ("Missing", "DEFAULT"),
                ("White", "ethnicity_code=1"),
                ("Mixed", "ethnicity_code=2"),
                ("South Asian", "ethnicity_code=3"),
                ("Black", "ethnicity_code=4"),
                ("Other", "ethnicity_code=5"),
            ])
            .hidden(var(
                "ethnicity_code",
                patients::with_these_clinical_events("ethnicity_codes")
                    .returning(EventReturning::Category)
                    .find_last()
                    .on_or_before("ca_date"),
                expect()
                    .category([("1", 0.4), ("2", 0.4), ("3", 0.2), ("4", 0.2), ("5", 0.2)])
                    .incidence(0.75),
            )),
            expect().rate(Rate::Universal).category([
                ("Missing", 0.4),
                ("White", 0.2),
                ("Mixed", 0.1),
                ("South Asian", 0.1),
                ("Black", 0.1),
                ("Other", 0.1),
            ]),
        ),
        var(
            "msoa",
            patients::registered_practice_as_of("ca_date", PracticeAttribute::MsoaCode),
            expect().rate(Rate::Universal).category([
                ("E02002488", 0.1),
                ("E02002586", 0.1),
                ("E02002677", 0.1),
                ("E02002814", 0.1),
                ("E02002915", 0.1),
                ("E02003251", 0.1),
                ("E02000003", 0.2),
                ("E02003334", 0.1),
                ("E02002986", 0.1),
            ]),
        ),
        stp(),
        imd_rank("imd_Q", imd_rank_hints()),
        imd_quintiles(
            "imd_cat",
            "0",
            [("0", 0.05), ("1", 0.19), ("2", 0.19), ("3", 0.19), ("4", 0.19), ("5", 0.19)],
        ),
        region(),
        var(
            "bmi_before",
            patients::most_recent_bmi()
                .between("ca_date - 1 years", "ca_date")
                .minimum_age_at_measurement(16),
            bmi_hints(),
        ),
        var(
            "bmi_after",
            patients::most_recent_bmi()
                .between("ca_date", "ca_date + 1 years")
                .minimum_age_at_measurement(16),
            bmi_hints(),
        ),
        // Broader window so the category is available to measures
        bmi_categories(("ca_date - 2 years", "ca_date + 1 years")),
        var(
            "hba1c_before",
            patients::with_these_clinical_events("hba1c_new_codes")
                .find_last()
                .between("ca_date - 1 years", "ca_date")
                .returning(EventReturning::NumericValue),
            expect()
                .float(Distribution::Normal { mean: 40.0, stddev: 20.0 })
                .incidence(0.95),
        ),
        var(
            "hba1c_after",
            patients::with_these_clinical_events("hba1c_new_codes")
                .find_last()
                .between("ca_date", "ca_date + 1 years")
                .include_date_of_match(true, true),
            incidence(0.30),
        ),
        diabetes(),
    ];
    variables.extend(pre_diagnosis_flags(false));
    variables.extend(outcomes());

    declare_all(study, variables).measure(died_by_region())
}

/// Adults registered with a practice on 2015-01-01
pub fn denominator() -> StudyDefinition {
    StudyDefinition::new("denominator")
        .default_expectations(
            expect()
                .date(DateRange::new("2015-01-01", "today"))
                .rate(Rate::Uniform)
                .incidence(0.5),
        )
        .index_date("2015-01-01")
        .population("registered AND\n(age >=18 AND age <= 110)")
        .declare(age("index_date"))
        .declare(var("registered", patients::registered_as_of("index_date"), incidence(0.95)))
        .measure(Measure::new("registered_rate", "registered", "population"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_study_names_round_trip() {
        for study in BuiltinStudy::ALL {
            assert_eq!(study.name().parse::<BuiltinStudy>(), Ok(study));
            assert_eq!(study.definition().name, study.name());
        }
        assert!("household".parse::<BuiltinStudy>().is_err());
    }

    #[test]
    fn test_imd_quintile_predicates() {
        let decl = imd_quintiles("imd_quin", "No data", [("No data", 1.0), ("1", 0.0), ("2", 0.0), ("3", 0.0), ("4", 0.0), ("5", 0.0)]);
        let cohortspec_definition::Rule::CategorisedAs(categorisation) = decl.rule else {
            panic!("imd_quin should be a categorisation");
        };
        let predicates: Vec<&str> = categorisation
            .categories
            .iter()
            .map(|c| c.predicate.as_str())
            .collect();
        assert_eq!(predicates[0], "DEFAULT");
        assert_eq!(
            predicates[3],
            "index_of_multiple_deprivation >= 32844*2/5 AND index_of_multiple_deprivation < 32844*3/5"
        );
        assert_eq!(categorisation.hidden[0].name, "index_of_multiple_deprivation");
    }

    #[test]
    fn test_main_columns_in_declaration_order() {
        let names: Vec<String> = main().variables.into_iter().map(|v| v.name).collect();
        assert_eq!(&names[..4], ["pa_ca", "ca_date", "age", "sex"]);
        assert_eq!(names.last().map(String::as_str), Some("care_home_type"));
    }
}
