//! CSV codelist loading

use crate::codelist::{Codelist, CodelistSource};
use crate::system::CodingSystem;
use cohortspec_diagnostics::{COH0303, COH0304, COH0305, ErrorBuilder, Result};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Load a codelist from a CSV file with a header row
pub fn load_csv(
    name: &str,
    system: CodingSystem,
    path: &Path,
    column: &str,
    category_column: Option<&str>,
) -> Result<Codelist> {
    let file = File::open(path).map_err(|e| {
        let code = if e.kind() == io::ErrorKind::NotFound {
            COH0303
        } else {
            COH0305
        };
        ErrorBuilder::new(code, format!("Cannot open '{}': {}", path.display(), e))
            .subject(name)
            .codelist()
    })?;

    let source = CodelistSource::Csv {
        path: path.to_path_buf(),
        column: column.to_string(),
        category_column: category_column.map(str::to_string),
    };
    let list = read_csv(name, system, file, column, category_column, source)?;
    log::debug!("loaded codelist '{}' from {}", name, path.display());
    Ok(list)
}

/// Read codes (and optional category labels) from CSV text.
///
/// Rows with an empty code cell are skipped.
pub fn read_csv<R: Read>(
    name: &str,
    system: CodingSystem,
    reader: R,
    column: &str,
    category_column: Option<&str>,
    source: CodelistSource,
) -> Result<Codelist> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let malformed = |e: csv::Error| {
        let line = e.position().map(|p| p.line()).unwrap_or_default();
        ErrorBuilder::new(COH0305, format!("Malformed CSV: {}", e))
            .subject(name)
            .context(format!("line {}", line))
            .codelist()
    };

    let headers = reader.headers().map_err(malformed)?.clone();
    let find = |wanted: &str| {
        headers.iter().position(|h| h == wanted).ok_or_else(|| {
            ErrorBuilder::new(COH0304, format!("Missing column '{}'", wanted))
                .subject(name)
                .context(format!(
                    "available columns: {}",
                    headers.iter().collect::<Vec<_>>().join(", ")
                ))
                .codelist()
        })
    };
    let code_idx = find(column)?;
    let category_idx = category_column.map(find).transpose()?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(malformed)?;
        let Some(code) = record.get(code_idx).filter(|c| !c.is_empty()) else {
            continue;
        };
        let category = category_idx
            .and_then(|idx| record.get(idx))
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        entries.push((code.to_string(), category));
    }

    Codelist::from_codes(name, system, entries, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::{COH0302, COH0309};
    use pretty_assertions::assert_eq;

    fn read(text: &str, column: &str, category: Option<&str>) -> Result<Codelist> {
        read_csv(
            "test",
            CodingSystem::Ctv3,
            text.as_bytes(),
            column,
            category,
            CodelistSource::csv("test.csv", column),
        )
    }

    #[test]
    fn test_reads_code_and_category_columns() {
        let text = "Code,Description,Grouping_6\nXaJQv,White British,1\nXaJR0,Indian,3\n";
        let list = read(text, "Code", Some("Grouping_6")).unwrap();
        assert_eq!(list.codes().collect::<Vec<_>>(), vec!["XaJQv", "XaJR0"]);
        assert_eq!(list.category_of("XaJR0"), Some("3"));
    }

    #[test]
    fn test_missing_column() {
        let err = read("code,term\nXaJQv,x\n", "CTV3ID", None).unwrap_err();
        assert_eq!(err.code(), COH0304);
        assert!(err.to_diagnostic().help.unwrap().contains("code, term"));
    }

    #[test]
    fn test_blank_codes_are_skipped() {
        let list = read("CTV3ID\nXaPbt\n\n \nXaeze\n", "CTV3ID", None).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_malformed_code_is_reported() {
        let err = read("CTV3ID\nXaPbtTOOLONG\n", "CTV3ID", None).unwrap_err();
        assert_eq!(err.code(), COH0302);
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let err = read("CTV3ID\n", "CTV3ID", None).unwrap_err();
        assert_eq!(err.code(), COH0309);
    }

    #[test]
    fn test_missing_file() {
        let err = load_csv(
            "jaundice",
            CodingSystem::Snomed,
            Path::new("/nonexistent/codelists/jaundice.csv"),
            "code",
            None,
        )
        .unwrap_err();
        assert_eq!(err.code(), COH0303);
    }
}
