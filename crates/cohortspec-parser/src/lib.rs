//! Parsers for the two small languages embedded in study definitions
//!
//! [`parse_predicate`] reads population and categorisation predicates such as
//! `registered AND (age >= 18 AND age <= 110)`. [`parse_date_expr`] reads the
//! anchored dates used by time windows, such as `ca_date + 6 months`.
//!
//! Both are built on winnow with hand-written recursive descent and report
//! failures as [`CohortError::Parse`] located at the offending byte offset.

mod combinators;
mod date;
mod predicate;

use chrono::NaiveDate;
use cohortspec_ast::{DateAnchor, DateExpr, DateOffset, DateUnit, Expression, Identifier};
use cohortspec_diagnostics::{
    COH0001, COH0002, COH0003, COH0004, COH0005, COH0006, COH0007, CohortError, Result, Span,
};

/// Parse a predicate expression
pub fn parse_predicate(source: &str) -> Result<Expression> {
    if source.trim().is_empty() {
        return Err(CohortError::parse(COH0007, "Empty expression", source));
    }

    let mut input = source;
    match predicate::expression_parser(&mut input) {
        Ok(expr) if input.is_empty() => Ok(expr),
        _ => Err(syntax_error(source, input)),
    }
}

/// Parse an anchored date expression
pub fn parse_date_expr(source: &str) -> Result<DateExpr> {
    if source.trim().is_empty() {
        return Err(CohortError::parse(COH0007, "Empty date expression", source));
    }

    let mut input = source;
    let raw = match date::date_expr_parser(&mut input) {
        Ok(raw) if input.is_empty() => raw,
        _ => return Err(syntax_error(source, input)),
    };

    let anchor_start = source.len() - raw.anchor_remaining;
    let anchor = match raw.anchor {
        date::RawAnchor::Date(text) => DateAnchor::Literal(
            parse_iso_date(text).ok_or_else(|| {
                CohortError::parse_at(
                    COH0005,
                    format!("Invalid date literal `{}`, expected YYYY-MM-DD", text),
                    source,
                    Span::new(anchor_start, anchor_start + text.len()),
                )
            })?,
        ),
        date::RawAnchor::Today => DateAnchor::Today,
        date::RawAnchor::IndexDate => DateAnchor::IndexDate,
        date::RawAnchor::Variable(name) => DateAnchor::Variable(Identifier::new(name)),
    };

    let offset = match raw.offset {
        None => None,
        Some(raw_offset) => {
            let start = source.len() - raw_offset.remaining;
            let invalid = |message: String| {
                CohortError::parse_at(COH0006, message, source, Span::new(start, source.len()))
            };
            let amount: i32 = raw_offset
                .amount
                .and_then(|a| a.parse().ok())
                .ok_or_else(|| invalid("Date offset needs a whole number amount".to_string()))?;
            let unit_word = raw_offset
                .unit
                .ok_or_else(|| invalid("Date offset needs a unit".to_string()))?;
            let unit = DateUnit::from_keyword(unit_word).ok_or_else(|| {
                invalid(format!(
                    "Unknown date unit `{}`, expected days, months or years",
                    unit_word
                ))
            })?;
            let amount = if raw_offset.negative { -amount } else { amount };
            Some(DateOffset::new(amount, unit))
        }
    };

    Ok(DateExpr { anchor, offset })
}

/// Strict `YYYY-MM-DD`
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split('-');
    let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || year.len() != 4 || month.len() != 2 || day.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

/// Classify a failure by what is left of the input
fn syntax_error(source: &str, rest: &str) -> CohortError {
    let trimmed = rest.trim_start();
    let offset = source.len() - trimmed.len();

    if trimmed.is_empty() {
        return CohortError::parse_at(
            COH0002,
            "Unexpected end of expression",
            source,
            Span::point(source.len()),
        );
    }

    let token: String = trimmed
        .chars()
        .take_while(|c| !c.is_whitespace())
        .collect();
    let span = Span::new(offset, offset + token.len());

    if trimmed.starts_with('\'') {
        CohortError::parse_at(COH0004, "Unterminated string literal", source, span)
    } else if token.chars().all(|c| c.is_ascii_digit()) && token.parse::<i64>().is_err() {
        CohortError::parse_at(COH0003, format!("Invalid number `{}`", token), source, span)
    } else {
        CohortError::parse_at(COH0001, format!("Unexpected token `{}`", token), source, span)
    }
}
