//! Where patient records come from

use crate::error::{EvalError, EvalResult};
use crate::record::PatientRecord;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A store of patient records the extractor can scan
pub trait RecordSource {
    /// Every patient once, in any order
    fn patients(&self) -> Box<dyn Iterator<Item = &PatientRecord> + '_>;

    fn patient_count(&self) -> usize;
}

/// Records held in memory, typically loaded from a JSON array
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    patients: Vec<PatientRecord>,
}

impl InMemoryRecords {
    /// Rejects repeated patient ids
    pub fn new(patients: Vec<PatientRecord>) -> EvalResult<Self> {
        let mut seen = HashSet::new();
        if let Some(dup) = patients.iter().find(|p| !seen.insert(p.patient_id)) {
            return Err(EvalError::record_source(format!(
                "patient id {} appears more than once",
                dup.patient_id
            )));
        }
        Ok(Self { patients })
    }

    pub fn from_json(json: &str) -> EvalResult<Self> {
        let patients: Vec<PatientRecord> = serde_json::from_str(json)
            .map_err(|e| EvalError::record_source(format!("invalid patient JSON: {}", e)))?;
        Self::new(patients)
    }

    pub fn from_reader<R: Read>(reader: R) -> EvalResult<Self> {
        let patients: Vec<PatientRecord> = serde_json::from_reader(reader)
            .map_err(|e| EvalError::record_source(format!("invalid patient JSON: {}", e)))?;
        Self::new(patients)
    }

    pub fn from_path(path: &Path) -> EvalResult<Self> {
        let file = File::open(path).map_err(|e| {
            EvalError::record_source(format!("cannot open '{}': {}", path.display(), e))
        })?;
        let records = Self::from_reader(BufReader::new(file))?;
        log::debug!("loaded {} patients from {}", records.len(), path.display());
        Ok(records)
    }

    pub fn len(&self) -> usize {
        self.patients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patients.is_empty()
    }
}

impl RecordSource for InMemoryRecords {
    fn patients(&self) -> Box<dyn Iterator<Item = &PatientRecord> + '_> {
        Box::new(self.patients.iter())
    }

    fn patient_count(&self) -> usize {
        self.patients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohortspec_diagnostics::COH0205;
    use std::io::Write;

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = InMemoryRecords::new(vec![PatientRecord::new(1), PatientRecord::new(1)]).unwrap_err();
        assert_eq!(err.code(), COH0205);
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"patient_id": 3}}, {{"patient_id": 1, "sex": "F"}}]"#).unwrap();
        let records = InMemoryRecords::from_path(file.path()).unwrap();
        assert_eq!(records.patient_count(), 2);

        let missing = InMemoryRecords::from_path(Path::new("/nonexistent/patients.json"));
        assert!(missing.is_err());
    }

    #[test]
    fn test_invalid_json() {
        let err = InMemoryRecords::from_json(r#"{"patient_id": 1}"#).unwrap_err();
        assert!(err.to_string().contains("invalid patient JSON"));
    }
}
