//! Date expression grammar
//!
//! ```text
//! date_expr := anchor (("+" | "-") amount unit)?
//! anchor    := YYYY-MM-DD | "today" | "index_date" | identifier
//! ```
//!
//! The grammar only recognises the shape. Calendar validity of literal dates
//! and of the offset is checked when the raw form is lowered to a `DateExpr`.

use crate::combinators::{
    Input, PResult, backtrack, digits, is_reserved, keyword, lit, word, ws,
};
use winnow::prelude::*;
use winnow::token::take_while;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawAnchor<'a> {
    Date(&'a str),
    Today,
    IndexDate,
    Variable(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawOffset<'a> {
    pub negative: bool,
    pub amount: Option<&'a str>,
    pub unit: Option<&'a str>,
    /// Remaining input length where the offset starts
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawDateExpr<'a> {
    pub anchor: RawAnchor<'a>,
    /// Remaining input length where the anchor starts
    pub anchor_remaining: usize,
    pub offset: Option<RawOffset<'a>>,
}

/// Digits and dashes; the calendar check happens on lowering
fn date_literal<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_digit() || c == '-').parse_next(input)
}

fn anchor<'a>(input: &mut Input<'a>) -> PResult<RawAnchor<'a>> {
    if input.starts_with(|c: char| c.is_ascii_digit()) {
        return date_literal(input).map(RawAnchor::Date);
    }
    if keyword("today")(input).is_ok() {
        return Ok(RawAnchor::Today);
    }
    if keyword("index_date")(input).is_ok() {
        return Ok(RawAnchor::IndexDate);
    }
    let checkpoint = *input;
    let name = word(input)?;
    if is_reserved(name) {
        *input = checkpoint;
        return backtrack();
    }
    Ok(RawAnchor::Variable(name))
}

fn offset<'a>(input: &mut Input<'a>) -> PResult<Option<RawOffset<'a>>> {
    let checkpoint = *input;
    ws(input)?;
    let remaining = input.len();
    let negative = if lit("-")(input).is_ok() {
        true
    } else if lit("+")(input).is_ok() {
        false
    } else {
        *input = checkpoint;
        return Ok(None);
    };
    ws(input)?;
    let amount = digits(input).ok();
    ws(input)?;
    let unit = word(input).ok();
    Ok(Some(RawOffset {
        negative,
        amount,
        unit,
        remaining,
    }))
}

pub fn date_expr_parser<'a>(input: &mut Input<'a>) -> PResult<RawDateExpr<'a>> {
    ws(input)?;
    let anchor_remaining = input.len();
    let anchor = anchor(input)?;
    let offset = offset(input)?;
    ws(input)?;
    Ok(RawDateExpr {
        anchor,
        anchor_remaining,
        offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_anchor_with_negative_offset() {
        let mut input = "ca_date - 6 months";
        let raw = date_expr_parser(&mut input).unwrap();
        assert_eq!(raw.anchor, RawAnchor::Variable("ca_date"));
        let offset = raw.offset.unwrap();
        assert!(offset.negative);
        assert_eq!(offset.amount, Some("6"));
        assert_eq!(offset.unit, Some("months"));
        assert!(input.is_empty());
    }

    #[test]
    fn test_literal_anchor_without_offset() {
        let mut input = "2015-01-01";
        let raw = date_expr_parser(&mut input).unwrap();
        assert_eq!(raw.anchor, RawAnchor::Date("2015-01-01"));
        assert_eq!(raw.offset, None);
    }

    #[test]
    fn test_keyword_anchors() {
        let mut input = "TODAY";
        assert_eq!(date_expr_parser(&mut input).unwrap().anchor, RawAnchor::Today);
        let mut input = "index_date + 1 year";
        assert_eq!(
            date_expr_parser(&mut input).unwrap().anchor,
            RawAnchor::IndexDate
        );
    }
}
