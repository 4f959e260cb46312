//! Immutable codelists

use crate::system::CodingSystem;
use cohortspec_diagnostics::{
    COH0301, COH0302, COH0307, COH0308, COH0309, CohortError, ErrorBuilder, Result,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Where a codelist's codes came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CodelistSource {
    /// Literal codes written in the study definition
    Inline { codes: Vec<String> },
    /// A CSV file, resolved against the registry's base directory when relative
    Csv {
        path: PathBuf,
        column: String,
        category_column: Option<String>,
    },
    /// Built from other codelists by filtering or combining
    Derived { from: Vec<String> },
}

impl CodelistSource {
    pub fn inline<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Inline {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn csv(path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        Self::Csv {
            path: path.into(),
            column: column.into(),
            category_column: None,
        }
    }

    pub fn csv_with_categories(
        path: impl Into<PathBuf>,
        column: impl Into<String>,
        category_column: impl Into<String>,
    ) -> Self {
        Self::Csv {
            path: path.into(),
            column: column.into(),
            category_column: Some(category_column.into()),
        }
    }
}

/// Declaration of a codelist before it is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodelistSpec {
    pub name: String,
    pub system: CodingSystem,
    pub source: CodelistSource,
    /// Known issue with the list, reported as a warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_flag: Option<String>,
}

impl CodelistSpec {
    pub fn new(name: impl Into<String>, system: CodingSystem, source: CodelistSource) -> Self {
        Self {
            name: name.into(),
            system,
            source,
            quality_flag: None,
        }
    }

    pub fn with_quality_flag(mut self, flag: impl Into<String>) -> Self {
        self.quality_flag = Some(flag.into());
        self
    }
}

/// A named set of codes from one coding system, each with an optional category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Codelist {
    name: String,
    system: CodingSystem,
    codes: IndexMap<String, Option<String>>,
    source: CodelistSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quality_flag: Option<String>,
}

impl Codelist {
    /// Build a codelist, checking every code's format and uniqueness.
    ///
    /// All problems are reported together.
    pub fn from_codes<I>(
        name: impl Into<String>,
        system: CodingSystem,
        entries: I,
        source: CodelistSource,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        let name = name.into();
        let mut codes = IndexMap::new();
        let mut seen = HashSet::new();
        let mut errors = Vec::new();

        for (code, category) in entries {
            let code = code.trim().to_string();
            let category = category.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());
            if !system.is_well_formed(&code) {
                errors.push(
                    ErrorBuilder::new(
                        COH0302,
                        format!("'{}' is not a well-formed {} code", code, system.display_name()),
                    )
                    .subject(&name)
                    .codelist(),
                );
                continue;
            }
            if !seen.insert(system.normalise(&code)) {
                errors.push(
                    ErrorBuilder::new(COH0301, format!("Duplicate code '{}'", code))
                        .subject(&name)
                        .codelist(),
                );
                continue;
            }
            codes.insert(code, category);
        }

        if let Some(err) = CohortError::from_many(errors) {
            return Err(err);
        }
        if codes.is_empty() {
            return Err(ErrorBuilder::new(COH0309, "Codelist has no codes")
                .subject(&name)
                .codelist());
        }

        log::debug!("codelist '{}': {} {} codes", name, codes.len(), system);
        Ok(Self {
            name,
            system,
            codes,
            source,
            quality_flag: None,
        })
    }

    /// Inline codelist without categories
    pub fn inline<I, S>(name: impl Into<String>, system: CodingSystem, codes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<String> = codes.into_iter().map(Into::into).collect();
        let source = CodelistSource::inline(codes.clone());
        Self::from_codes(name, system, codes.into_iter().map(|c| (c, None)), source)
    }

    pub fn with_quality_flag(mut self, flag: Option<String>) -> Self {
        self.quality_flag = flag;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system(&self) -> CodingSystem {
        self.system
    }

    pub fn source(&self) -> &CodelistSource {
        &self.source
    }

    pub fn quality_flag(&self) -> Option<&str> {
        self.quality_flag.as_deref()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Codes in declaration order
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    /// Distinct category labels in order of first appearance
    pub fn categories(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for label in self.codes.values().flatten() {
            if !labels.contains(&label.as_str()) {
                labels.push(label);
            }
        }
        labels
    }

    /// The entry covering a recorded code, if any
    fn matching_entry(&self, recorded: &str) -> Option<(&String, &Option<String>)> {
        if !self.system.matches_by_prefix() {
            let normalised = self.system.normalise(recorded);
            if let Some(entry) = self.codes.get_key_value(&normalised) {
                return Some(entry);
            }
        }
        // Most specific entry wins; ties keep declaration order
        self.codes
            .iter()
            .filter(|(entry, _)| self.system.code_matches(entry, recorded))
            .min_by_key(|(entry, _)| Reverse(self.system.normalise(entry).len()))
    }

    /// Whether a recorded code in this list's system belongs to the list
    pub fn matches(&self, recorded: &str) -> bool {
        self.matching_entry(recorded).is_some()
    }

    /// Category label of the entry covering a recorded code
    pub fn category_of(&self, recorded: &str) -> Option<&str> {
        self.matching_entry(recorded)
            .and_then(|(_, category)| category.as_deref())
    }

    /// Sub-list holding only codes labelled with one of `labels`
    pub fn filter_by_category(&self, name: impl Into<String>, labels: &[&str]) -> Result<Self> {
        let entries: Vec<(String, Option<String>)> = self
            .codes
            .iter()
            .filter(|(_, category)| {
                category
                    .as_deref()
                    .is_some_and(|c| labels.contains(&c))
            })
            .map(|(code, category)| (code.clone(), category.clone()))
            .collect();
        let source = CodelistSource::Derived {
            from: vec![self.name.clone()],
        };
        Self::from_codes(name, self.system, entries, source)
            .map(|list| list.with_quality_flag(self.quality_flag.clone()))
    }

    /// Union of several lists from the same system
    pub fn combine(name: impl Into<String>, lists: &[&Codelist]) -> Result<Self> {
        let name = name.into();
        let Some(first) = lists.first() else {
            return Err(ErrorBuilder::new(COH0309, "Nothing to combine")
                .subject(&name)
                .codelist());
        };

        let mut codes: IndexMap<String, Option<String>> = IndexMap::new();
        // Normalised form to the spelling kept in `codes`
        let mut spellings: HashMap<String, String> = HashMap::new();
        let mut errors = Vec::new();
        for list in lists {
            if list.system != first.system {
                errors.push(
                    ErrorBuilder::new(
                        COH0308,
                        format!(
                            "Cannot combine {} list '{}' with {} list '{}'",
                            list.system.display_name(),
                            list.name,
                            first.system.display_name(),
                            first.name
                        ),
                    )
                    .subject(&name)
                    .codelist(),
                );
                continue;
            }
            for (code, category) in &list.codes {
                let key = spellings
                    .entry(list.system.normalise(code))
                    .or_insert_with(|| code.clone())
                    .clone();
                match codes.get(&key) {
                    Some(existing) if existing.is_some() && category.is_some() && existing != category => {
                        errors.push(
                            ErrorBuilder::new(
                                COH0307,
                                format!(
                                    "Code '{}' is labelled both '{}' and '{}'",
                                    code,
                                    existing.as_deref().unwrap_or_default(),
                                    category.as_deref().unwrap_or_default()
                                ),
                            )
                            .subject(&name)
                            .codelist(),
                        );
                    }
                    Some(Some(_)) => {}
                    _ => {
                        codes.insert(key, category.clone());
                    }
                }
            }
        }

        if let Some(err) = CohortError::from_many(errors) {
            return Err(err);
        }
        let source = CodelistSource::Derived {
            from: lists.iter().map(|l| l.name.clone()).collect(),
        };
        Self::from_codes(name, first.system, codes, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ethnicity() -> Codelist {
        Codelist::from_codes(
            "ethnicity_codes",
            CodingSystem::Ctv3,
            [
                ("XaJQv".to_string(), Some("1".to_string())),
                ("XaJQw".to_string(), Some("1".to_string())),
                ("XaJR0".to_string(), Some("3".to_string())),
                ("XaJR1".to_string(), None),
            ],
            CodelistSource::csv_with_categories("ethnicity.csv", "Code", "Grouping_6"),
        )
        .unwrap()
    }

    #[test]
    fn test_categories_and_lookup() {
        let list = ethnicity();
        assert_eq!(list.len(), 4);
        assert_eq!(list.categories(), vec!["1", "3"]);
        assert_eq!(list.category_of("XaJR0"), Some("3"));
        assert_eq!(list.category_of("XaJR1"), None);
        assert!(list.matches("XaJR1"));
        assert!(!list.matches("XaJR2"));
    }

    #[test]
    fn test_duplicate_and_malformed_codes_are_all_reported() {
        let err = Codelist::inline("bad", CodingSystem::Opcs4, ["J55", "J55", "nope"]).unwrap_err();
        let codes: Vec<_> = err.errors().iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec![COH0301, COH0302]);
    }

    #[test]
    fn test_codes_differing_in_dot_or_case_are_duplicates() {
        let err = Codelist::inline("pa_ca_icd10", CodingSystem::Icd10, ["C25.0", "C250", "c25.0"])
            .unwrap_err();
        let codes: Vec<_> = err.errors().iter().map(|e| e.code()).collect();
        assert_eq!(codes, vec![COH0301, COH0301]);
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let err = Codelist::inline("none", CodingSystem::Ctv3, Vec::<String>::new()).unwrap_err();
        assert_eq!(err.code(), COH0309);
    }

    #[test]
    fn test_icd10_list_matches_sub_codes() {
        let list = Codelist::inline("pa_ca_icd10", CodingSystem::Icd10, ["C25"]).unwrap();
        assert!(list.matches("C25.9"));
        assert!(list.matches("C251"));
        assert!(!list.matches("C24"));
    }

    #[test]
    fn test_most_specific_icd10_entry_wins() {
        let list = Codelist::from_codes(
            "pa_ca_icd10",
            CodingSystem::Icd10,
            [
                ("C25".to_string(), Some("pancreas".to_string())),
                ("C25.0".to_string(), Some("head".to_string())),
            ],
            CodelistSource::inline(["C25", "C25.0"]),
        )
        .unwrap();
        assert_eq!(list.category_of("C25.0"), Some("head"));
        assert_eq!(list.category_of("C250"), Some("head"));
        assert_eq!(list.category_of("C25.3"), Some("pancreas"));
    }

    #[test]
    fn test_filter_by_category() {
        let white = ethnicity().filter_by_category("white", &["1"]).unwrap();
        assert_eq!(white.codes().collect::<Vec<_>>(), vec!["XaJQv", "XaJQw"]);
        assert_eq!(
            white.source(),
            &CodelistSource::Derived {
                from: vec!["ethnicity_codes".to_string()]
            }
        );
    }

    #[test]
    fn test_combine_same_system() {
        let a = Codelist::inline("a", CodingSystem::Opcs4, ["J55", "J56"]).unwrap();
        let b = Codelist::inline("b", CodingSystem::Opcs4, ["J56", "J57"]).unwrap();
        let both = Codelist::combine("resection", &[&a, &b]).unwrap();
        assert_eq!(both.codes().collect::<Vec<_>>(), vec!["J55", "J56", "J57"]);
    }

    #[test]
    fn test_combine_merges_spellings_of_one_code() {
        let a = Codelist::inline("a", CodingSystem::Icd10, ["C25.0"]).unwrap();
        let b = Codelist::inline("b", CodingSystem::Icd10, ["C250", "C25.1"]).unwrap();
        let both = Codelist::combine("pa_ca", &[&a, &b]).unwrap();
        assert_eq!(both.codes().collect::<Vec<_>>(), vec!["C25.0", "C25.1"]);
    }

    #[test]
    fn test_combine_rejects_mixed_systems() {
        let a = Codelist::inline("a", CodingSystem::Opcs4, ["J55"]).unwrap();
        let b = Codelist::inline("b", CodingSystem::Icd10, ["C25"]).unwrap();
        assert_eq!(Codelist::combine("mixed", &[&a, &b]).unwrap_err().code(), COH0308);
    }

    #[test]
    fn test_combine_rejects_conflicting_categories() {
        let a = Codelist::from_codes(
            "a",
            CodingSystem::Ctv3,
            [("XaJQv".to_string(), Some("1".to_string()))],
            CodelistSource::inline(["XaJQv"]),
        )
        .unwrap();
        let b = Codelist::from_codes(
            "b",
            CodingSystem::Ctv3,
            [("XaJQv".to_string(), Some("2".to_string()))],
            CodelistSource::inline(["XaJQv"]),
        )
        .unwrap();
        assert_eq!(Codelist::combine("c", &[&a, &b]).unwrap_err().code(), COH0307);
    }
}
