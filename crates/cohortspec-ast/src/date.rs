//! Anchored date expressions such as `ca_date - 6 months`

use crate::Identifier;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a date expression is measured from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateAnchor {
    /// `YYYY-MM-DD`
    Literal(NaiveDate),
    /// `today`, fixed once per extraction run
    Today,
    /// The study-level `index_date`
    IndexDate,
    /// The resolved date of another variable
    Variable(Identifier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateUnit {
    Days,
    Months,
    Years,
}

impl DateUnit {
    /// Accepts singular and plural spellings
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "day" | "days" => Some(Self::Days),
            "month" | "months" => Some(Self::Months),
            "year" | "years" => Some(Self::Years),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Days => "days",
            Self::Months => "months",
            Self::Years => "years",
        }
    }
}

/// Signed offset applied to an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateOffset {
    /// Negative amounts move back in time
    pub amount: i32,
    pub unit: DateUnit,
}

impl DateOffset {
    pub const fn new(amount: i32, unit: DateUnit) -> Self {
        Self { amount, unit }
    }

    /// Shift a date; month and year steps clamp to the last day of the month.
    ///
    /// Returns `None` when the result leaves chrono's date range.
    pub fn apply(&self, date: NaiveDate) -> Option<NaiveDate> {
        let magnitude = self.amount.unsigned_abs();
        let forward = self.amount >= 0;
        match self.unit {
            DateUnit::Days => {
                let days = Days::new(u64::from(magnitude));
                if forward {
                    date.checked_add_days(days)
                } else {
                    date.checked_sub_days(days)
                }
            }
            DateUnit::Months | DateUnit::Years => {
                let months = if self.unit == DateUnit::Years {
                    magnitude.checked_mul(12)?
                } else {
                    magnitude
                };
                if forward {
                    date.checked_add_months(Months::new(months))
                } else {
                    date.checked_sub_months(Months::new(months))
                }
            }
        }
    }

    /// Whole months and days this offset moves by
    pub const fn as_months_and_days(&self) -> (i64, i64) {
        match self.unit {
            DateUnit::Days => (0, self.amount as i64),
            DateUnit::Months => (self.amount as i64, 0),
            DateUnit::Years => (self.amount as i64 * 12, 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateExpr {
    pub anchor: DateAnchor,
    pub offset: Option<DateOffset>,
}

impl DateExpr {
    pub fn literal(date: NaiveDate) -> Self {
        Self {
            anchor: DateAnchor::Literal(date),
            offset: None,
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            anchor: DateAnchor::Variable(Identifier::new(name)),
            offset: None,
        }
    }

    pub fn with_offset(mut self, amount: i32, unit: DateUnit) -> Self {
        self.offset = Some(DateOffset::new(amount, unit));
        self
    }

    /// Resolve against a concrete anchor date
    pub fn shift(&self, anchor: NaiveDate) -> Option<NaiveDate> {
        match &self.offset {
            Some(offset) => offset.apply(anchor),
            None => Some(anchor),
        }
    }

    /// Name of the variable this expression is anchored on, if any
    pub fn referenced_variable(&self) -> Option<&str> {
        match &self.anchor {
            DateAnchor::Variable(id) => Some(&id.name),
            _ => None,
        }
    }
}

impl fmt::Display for DateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.anchor {
            DateAnchor::Literal(date) => write!(f, "{}", date.format("%Y-%m-%d"))?,
            DateAnchor::Today => f.write_str("today")?,
            DateAnchor::IndexDate => f.write_str("index_date")?,
            DateAnchor::Variable(id) => write!(f, "{}", id)?,
        }
        if let Some(offset) = &self.offset {
            let sign = if offset.amount < 0 { '-' } else { '+' };
            write!(f, " {} {} {}", sign, offset.amount.unsigned_abs(), offset.unit.as_str())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_round_trips_original_spelling() {
        let expr = DateExpr::variable("ca_date").with_offset(-6, DateUnit::Months);
        assert_eq!(expr.to_string(), "ca_date - 6 months");
        assert_eq!(expr.referenced_variable(), Some("ca_date"));

        let literal = DateExpr::literal(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(literal.to_string(), "1900-01-01");
        assert_eq!(literal.referenced_variable(), None);
    }

    #[test]
    fn test_offsets_clamp_to_month_end() {
        let date = NaiveDate::from_ymd_opt(2021, 8, 31).unwrap();
        let back = DateOffset::new(-6, DateUnit::Months).apply(date).unwrap();
        assert_eq!(back, NaiveDate::from_ymd_opt(2021, 2, 28).unwrap());

        let leap = NaiveDate::from_ymd_opt(2020, 2, 29).unwrap();
        let next = DateOffset::new(1, DateUnit::Years).apply(leap).unwrap();
        assert_eq!(next, NaiveDate::from_ymd_opt(2021, 2, 28).unwrap());

        let days = DateOffset::new(-30, DateUnit::Days).apply(date).unwrap();
        assert_eq!(days, NaiveDate::from_ymd_opt(2021, 8, 1).unwrap());
    }

    #[test]
    fn test_unit_keywords() {
        assert_eq!(DateUnit::from_keyword("Years"), Some(DateUnit::Years));
        assert_eq!(DateUnit::from_keyword("day"), Some(DateUnit::Days));
        assert_eq!(DateUnit::from_keyword("weeks"), None);
    }
}
