//! Extracted datasets

use crate::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// One output row: the patient id followed by every output column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub patient_id: u64,
    #[serde(flatten)]
    pub values: IndexMap<String, Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

/// Rows of the patients that passed the population, ordered by patient id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub study: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, patient_id: u64) -> Option<&Row> {
        self.rows
            .binary_search_by_key(&patient_id, |r| r.patient_id)
            .ok()
            .map(|i| &self.rows[i])
    }

    /// Values of one column, top to bottom
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().filter_map(move |r| r.get(name))
    }

    /// Rows as a JSON array of objects
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.rows)
    }
}
