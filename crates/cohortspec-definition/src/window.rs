//! Time windows as declared

use serde::{Deserialize, Serialize};

/// Inclusive window bounds written as date expressions
///
/// Either bound may be absent. `between` sets both.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_or_before: Option<String>,
}

impl TimeWindow {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn between(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            on_or_after: Some(start.into()),
            on_or_before: Some(end.into()),
        }
    }

    pub fn on_or_after(start: impl Into<String>) -> Self {
        Self {
            on_or_after: Some(start.into()),
            on_or_before: None,
        }
    }

    pub fn on_or_before(end: impl Into<String>) -> Self {
        Self {
            on_or_after: None,
            on_or_before: Some(end.into()),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.on_or_after.is_none() && self.on_or_before.is_none()
    }
}
