//! Coding systems and their code formats

use cohortspec_diagnostics::{COH0300, CohortError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static SCTID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[1-9][0-9]{5,17}$").unwrap());
static CTV3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9.]{5}$").unwrap());
static ICD10: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][0-9]{2}(\.?[0-9A-Za-z]{1,4})?$").unwrap());
static OPCS4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][0-9]{2}(\.?[0-9])?$").unwrap());

/// Terminologies a codelist can be drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodingSystem {
    /// SNOMED CT concept ids
    Snomed,
    /// Read codes version 3
    Ctv3,
    Icd10,
    Opcs4,
    /// Dictionary of medicines and devices
    Dmd,
}

impl CodingSystem {
    pub const ALL: [CodingSystem; 5] = [
        Self::Snomed,
        Self::Ctv3,
        Self::Icd10,
        Self::Opcs4,
        Self::Dmd,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Snomed => "snomed",
            Self::Ctv3 => "ctv3",
            Self::Icd10 => "icd10",
            Self::Opcs4 => "opcs4",
            Self::Dmd => "dmd",
        }
    }

    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Snomed => "SNOMED CT",
            Self::Ctv3 => "CTV3",
            Self::Icd10 => "ICD-10",
            Self::Opcs4 => "OPCS-4",
            Self::Dmd => "dm+d",
        }
    }

    /// Whether `code` has the shape this system uses
    pub fn is_well_formed(&self, code: &str) -> bool {
        match self {
            Self::Snomed | Self::Dmd => SCTID.is_match(code),
            Self::Ctv3 => CTV3.is_match(code),
            Self::Icd10 => ICD10.is_match(code),
            Self::Opcs4 => OPCS4.is_match(code),
        }
    }

    /// ICD-10 entries cover their sub-codes
    pub const fn matches_by_prefix(&self) -> bool {
        matches!(self, Self::Icd10)
    }

    /// Comparable form of a code: ICD-10 and OPCS-4 ignore the dot and case
    pub fn normalise(&self, code: &str) -> String {
        let code = code.trim();
        match self {
            Self::Icd10 | Self::Opcs4 => code.replace('.', "").to_ascii_uppercase(),
            Self::Snomed | Self::Ctv3 | Self::Dmd => code.to_string(),
        }
    }

    /// Whether a recorded code is covered by a codelist entry
    pub fn code_matches(&self, entry: &str, recorded: &str) -> bool {
        let entry = self.normalise(entry);
        let recorded = self.normalise(recorded);
        if self.matches_by_prefix() {
            recorded.starts_with(&entry)
        } else {
            recorded == entry
        }
    }
}

impl FromStr for CodingSystem {
    type Err = CohortError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snomed" | "snomedct" | "snomed-ct" | "snomed ct" => Ok(Self::Snomed),
            "ctv3" | "readv3" => Ok(Self::Ctv3),
            "icd10" | "icd-10" => Ok(Self::Icd10),
            "opcs4" | "opcs-4" => Ok(Self::Opcs4),
            "dmd" | "dm+d" => Ok(Self::Dmd),
            other => Err(CohortError::codelist(
                COH0300,
                format!("Unknown coding system '{}'", other),
            )),
        }
    }
}

impl fmt::Display for CodingSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(CodingSystem::Snomed, "363418001", true)]
    #[case(CodingSystem::Snomed, "0363418001", false)]
    #[case(CodingSystem::Snomed, "1234", false)]
    #[case(CodingSystem::Ctv3, "XaPbt", true)]
    #[case(CodingSystem::Ctv3, "9i0..", true)]
    #[case(CodingSystem::Ctv3, "XaPb", false)]
    #[case(CodingSystem::Icd10, "C25", true)]
    #[case(CodingSystem::Icd10, "C25.0", true)]
    #[case(CodingSystem::Icd10, "C250", true)]
    #[case(CodingSystem::Icd10, "25C", false)]
    #[case(CodingSystem::Opcs4, "J55", true)]
    #[case(CodingSystem::Opcs4, "J55.1", true)]
    #[case(CodingSystem::Opcs4, "J55.12", false)]
    #[case(CodingSystem::Dmd, "10514511000001106", true)]
    fn test_code_formats(#[case] system: CodingSystem, #[case] code: &str, #[case] ok: bool) {
        assert_eq!(system.is_well_formed(code), ok);
    }

    #[test]
    fn test_icd10_prefix_matching_ignores_dot() {
        let icd = CodingSystem::Icd10;
        assert!(icd.code_matches("C25", "C25.3"));
        assert!(icd.code_matches("C25", "C253"));
        assert!(icd.code_matches("C25.0", "C250"));
        assert!(!icd.code_matches("C25.0", "C25.1"));
        assert!(!icd.code_matches("C25", "C2"));
    }

    #[test]
    fn test_other_systems_match_exactly() {
        assert!(CodingSystem::Ctv3.code_matches("XaPbt", "XaPbt"));
        assert!(!CodingSystem::Ctv3.code_matches("XaPbt", "XaPbtX"));
        assert!(!CodingSystem::Opcs4.code_matches("J55", "J55.1"));
    }

    #[test]
    fn test_parse_system_names() {
        assert_eq!("SNOMED".parse::<CodingSystem>().unwrap(), CodingSystem::Snomed);
        assert_eq!("dm+d".parse::<CodingSystem>().unwrap(), CodingSystem::Dmd);
        let err = "loinc".parse::<CodingSystem>().unwrap_err();
        assert_eq!(err.code(), COH0300);
    }
}
