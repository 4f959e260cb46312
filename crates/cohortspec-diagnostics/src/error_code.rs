//! Structured error codes
//!
//! Ranges:
//! - COH0001-COH0099: expression parse errors (predicates, date expressions)
//! - COH0100-COH0199: specification errors (references, ordering, rule shape)
//! - COH0200-COH0299: evaluation errors (extraction, aggregation)
//! - COH0300-COH0399: codelist errors (sources, codes, registry)
//! - COH0400-COH0499: system errors (I/O, configuration)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Error code identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorCode(u16);

impl ErrorCode {
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    pub const fn code(&self) -> u16 {
        self.0
    }

    /// Static description for this code
    pub fn info(&self) -> &'static ErrorInfo {
        ERROR_INFO.get(&self.0).unwrap_or(&UNKNOWN_ERROR)
    }

    pub const fn is_parse_error(&self) -> bool {
        self.0 >= 1 && self.0 < 100
    }

    pub const fn is_specification_error(&self) -> bool {
        self.0 >= 100 && self.0 < 200
    }

    pub const fn is_evaluation_error(&self) -> bool {
        self.0 >= 200 && self.0 < 300
    }

    pub const fn is_codelist_error(&self) -> bool {
        self.0 >= 300 && self.0 < 400
    }

    pub const fn is_system_error(&self) -> bool {
        self.0 >= 400 && self.0 < 500
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COH{:04}", self.0)
    }
}

/// Information about an error code
#[derive(Debug, Clone)]
pub struct ErrorInfo {
    /// Short description of the error
    pub description: &'static str,
    /// Detailed help text
    pub help: Option<&'static str>,
}

impl ErrorInfo {
    const fn new(description: &'static str) -> Self {
        Self {
            description,
            help: None,
        }
    }

    const fn with_help(mut self, help: &'static str) -> Self {
        self.help = Some(help);
        self
    }
}

static UNKNOWN_ERROR: ErrorInfo = ErrorInfo::new("Unknown error");

static ERROR_INFO: LazyLock<HashMap<u16, ErrorInfo>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    // Parse errors
    map.insert(1, ErrorInfo::new("Unexpected token"));
    map.insert(2, ErrorInfo::new("Unexpected end of input"));
    map.insert(3, ErrorInfo::new("Invalid number literal"));
    map.insert(4, ErrorInfo::new("Unterminated string literal"));
    map.insert(5, ErrorInfo::new("Invalid date literal"));
    map.insert(6, ErrorInfo::new("Invalid date offset")
        .with_help("Offsets look like `ca_date - 6 months` or `index_date + 1 years`"));
    map.insert(7, ErrorInfo::new("Empty expression"));

    // Specification errors
    map.insert(100, ErrorInfo::new("Undefined variable")
        .with_help("Variables must be declared before they are referenced"));
    map.insert(101, ErrorInfo::new("Undefined codelist"));
    map.insert(102, ErrorInfo::new("Duplicate variable name"));
    map.insert(103, ErrorInfo::new("Forward reference")
        .with_help("Move the referenced variable above the variable that uses it"));
    map.insert(104, ErrorInfo::new("Circular reference"));
    map.insert(105, ErrorInfo::new("Ambiguous match selection")
        .with_help("Request either the first or the last match, not both"));
    map.insert(106, ErrorInfo::new("Missing match selection")
        .with_help("Value-returning rules must say whether the first or last match is used"));
    map.insert(107, ErrorInfo::new("Missing DEFAULT category"));
    map.insert(108, ErrorInfo::new("Duplicate category label"));
    map.insert(109, ErrorInfo::new("Unsupported return type for rule"));
    map.insert(110, ErrorInfo::new("Missing population"));
    map.insert(111, ErrorInfo::new("Undefined index date"));
    map.insert(112, ErrorInfo::new("Invalid time window"));
    map.insert(113, ErrorInfo::new("Codelist system mismatch"));
    map.insert(114, ErrorInfo::new("Invalid simulation hint"));
    map.insert(115, ErrorInfo::new("Undefined measure variable"));
    map.insert(116, ErrorInfo::new("Duplicate measure id"));
    map.insert(117, ErrorInfo::new("Invalid rounding"));
    map.insert(118, ErrorInfo::new("Anchor is not a date")
        .with_help("Windows and as-of dates can only be anchored on date-returning variables"));

    // Evaluation errors
    map.insert(200, ErrorInfo::new("Evaluation failed"));
    map.insert(201, ErrorInfo::new("Type mismatch"));
    map.insert(202, ErrorInfo::new("Division by zero"));
    map.insert(203, ErrorInfo::new("Unresolved variable"));
    map.insert(204, ErrorInfo::new("Date arithmetic overflow"));
    map.insert(205, ErrorInfo::new("Record source failure"));

    // Codelist errors
    map.insert(300, ErrorInfo::new("Unknown coding system"));
    map.insert(301, ErrorInfo::new("Duplicate code"));
    map.insert(302, ErrorInfo::new("Malformed code"));
    map.insert(303, ErrorInfo::new("Codelist source not found"));
    map.insert(304, ErrorInfo::new("Missing codelist column"));
    map.insert(305, ErrorInfo::new("Malformed codelist source"));
    map.insert(306, ErrorInfo::new("Duplicate codelist name"));
    map.insert(307, ErrorInfo::new("Conflicting category"));
    map.insert(308, ErrorInfo::new("Incompatible coding systems"));
    map.insert(309, ErrorInfo::new("Empty codelist"));
    map.insert(310, ErrorInfo::new("Data-quality flag"));

    // System errors
    map.insert(400, ErrorInfo::new("Internal error"));
    map.insert(401, ErrorInfo::new("I/O error"));
    map.insert(402, ErrorInfo::new("Configuration error"));
    map.insert(403, ErrorInfo::new("Invalid format"));

    map
});

// Parse errors
pub const COH0001: ErrorCode = ErrorCode::new(1);
pub const COH0002: ErrorCode = ErrorCode::new(2);
pub const COH0003: ErrorCode = ErrorCode::new(3);
pub const COH0004: ErrorCode = ErrorCode::new(4);
pub const COH0005: ErrorCode = ErrorCode::new(5);
pub const COH0006: ErrorCode = ErrorCode::new(6);
pub const COH0007: ErrorCode = ErrorCode::new(7);

// Specification errors
pub const COH0100: ErrorCode = ErrorCode::new(100);
pub const COH0101: ErrorCode = ErrorCode::new(101);
pub const COH0102: ErrorCode = ErrorCode::new(102);
pub const COH0103: ErrorCode = ErrorCode::new(103);
pub const COH0104: ErrorCode = ErrorCode::new(104);
pub const COH0105: ErrorCode = ErrorCode::new(105);
pub const COH0106: ErrorCode = ErrorCode::new(106);
pub const COH0107: ErrorCode = ErrorCode::new(107);
pub const COH0108: ErrorCode = ErrorCode::new(108);
pub const COH0109: ErrorCode = ErrorCode::new(109);
pub const COH0110: ErrorCode = ErrorCode::new(110);
pub const COH0111: ErrorCode = ErrorCode::new(111);
pub const COH0112: ErrorCode = ErrorCode::new(112);
pub const COH0113: ErrorCode = ErrorCode::new(113);
pub const COH0114: ErrorCode = ErrorCode::new(114);
pub const COH0115: ErrorCode = ErrorCode::new(115);
pub const COH0116: ErrorCode = ErrorCode::new(116);
pub const COH0117: ErrorCode = ErrorCode::new(117);
pub const COH0118: ErrorCode = ErrorCode::new(118);

// Evaluation errors
pub const COH0200: ErrorCode = ErrorCode::new(200);
pub const COH0201: ErrorCode = ErrorCode::new(201);
pub const COH0202: ErrorCode = ErrorCode::new(202);
pub const COH0203: ErrorCode = ErrorCode::new(203);
pub const COH0204: ErrorCode = ErrorCode::new(204);
pub const COH0205: ErrorCode = ErrorCode::new(205);

// Codelist errors
pub const COH0300: ErrorCode = ErrorCode::new(300);
pub const COH0301: ErrorCode = ErrorCode::new(301);
pub const COH0302: ErrorCode = ErrorCode::new(302);
pub const COH0303: ErrorCode = ErrorCode::new(303);
pub const COH0304: ErrorCode = ErrorCode::new(304);
pub const COH0305: ErrorCode = ErrorCode::new(305);
pub const COH0306: ErrorCode = ErrorCode::new(306);
pub const COH0307: ErrorCode = ErrorCode::new(307);
pub const COH0308: ErrorCode = ErrorCode::new(308);
pub const COH0309: ErrorCode = ErrorCode::new(309);
pub const COH0310: ErrorCode = ErrorCode::new(310);

// System errors
pub const COH0400: ErrorCode = ErrorCode::new(400);
pub const COH0401: ErrorCode = ErrorCode::new(401);
pub const COH0402: ErrorCode = ErrorCode::new(402);
pub const COH0403: ErrorCode = ErrorCode::new(403);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(COH0001.to_string(), "COH0001");
        assert_eq!(COH0103.to_string(), "COH0103");
    }

    #[test]
    fn test_error_categories() {
        assert!(COH0001.is_parse_error());
        assert!(COH0104.is_specification_error());
        assert!(!COH0104.is_parse_error());
        assert!(COH0202.is_evaluation_error());
        assert!(COH0301.is_codelist_error());
        assert!(COH0401.is_system_error());
    }

    #[test]
    fn test_error_info() {
        assert_eq!(COH0105.info().description, "Ambiguous match selection");
        assert!(COH0103.info().help.is_some());
        assert_eq!(ErrorCode::new(999).info().description, "Unknown error");
    }
}
