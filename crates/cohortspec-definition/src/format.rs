//! Output date formats

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Precision a date column is reported at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYY")]
    Year,
    #[serde(rename = "YYYY-MM")]
    YearMonth,
    #[serde(rename = "YYYY-MM-DD")]
    YearMonthDay,
}

impl DateFormat {
    /// Precision selected by the `include_month` / `include_day` pair
    pub const fn from_precision(include_month: bool, include_day: bool) -> Self {
        match (include_month, include_day) {
            (true, true) => Self::YearMonthDay,
            (true, false) => Self::YearMonth,
            _ => Self::Year,
        }
    }

    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            Self::Year => date.format("%Y").to_string(),
            Self::YearMonth => date.format("%Y-%m").to_string(),
            Self::YearMonthDay => date.format("%Y-%m-%d").to_string(),
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Year => "YYYY",
            Self::YearMonth => "YYYY-MM",
            Self::YearMonthDay => "YYYY-MM-DD",
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_precisions() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        assert_eq!(DateFormat::Year.format(date), "2021");
        assert_eq!(DateFormat::YearMonth.format(date), "2021-06");
        assert_eq!(DateFormat::YearMonthDay.format(date), "2021-06-01");
        assert_eq!(DateFormat::from_precision(true, false), DateFormat::YearMonth);
        assert_eq!(DateFormat::from_precision(false, false), DateFormat::Year);
    }
}
