//! Shared token-level parsers

use cohortspec_ast::Literal;
use rust_decimal::Decimal;
use std::str::FromStr;
use winnow::ascii::{digit1, multispace0};
use winnow::combinator::opt;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{literal, one_of, take_while};

pub type Input<'a> = &'a str;
pub type PResult<T> = Result<T, ErrMode<ContextError>>;

/// Backtracking failure without consuming input
pub fn backtrack<T>() -> PResult<T> {
    Err(ErrMode::Backtrack(ContextError::new()))
}

/// Skip whitespace, including the newlines of multi-line predicates
pub fn ws(input: &mut Input<'_>) -> PResult<()> {
    multispace0.void().parse_next(input)
}

/// Exact punctuation
pub fn lit<'a>(token: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| literal(token).parse_next(input)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn digits<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    digit1.parse_next(input)
}

fn until_quote<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    take_while(0.., |c: char| c != '\'').parse_next(input)
}

/// Raw identifier text, keywords included
pub fn word<'a>(input: &mut Input<'a>) -> PResult<&'a str> {
    (one_of(is_ident_start), take_while(0.., is_ident_continue))
        .take()
        .parse_next(input)
}

/// Case-insensitive keyword matched on a whole word
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        let checkpoint = *input;
        match word(input) {
            Ok(w) if w.eq_ignore_ascii_case(kw) => Ok(w),
            _ => {
                *input = checkpoint;
                backtrack()
            }
        }
    }
}

/// Keyword surrounded by optional whitespace
pub fn padded_keyword<'a>(kw: &'static str) -> impl FnMut(&mut Input<'a>) -> PResult<&'a str> {
    move |input: &mut Input<'a>| {
        let checkpoint = *input;
        ws(input)?;
        match keyword(kw).parse_next(input) {
            Ok(w) => {
                ws(input)?;
                Ok(w)
            }
            Err(e) => {
                *input = checkpoint;
                Err(e)
            }
        }
    }
}

/// Words that can never name a variable
pub fn is_reserved(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "and" | "or" | "not" | "default" | "true" | "false"
    )
}

/// Integer or decimal literal
pub fn number_literal(input: &mut Input<'_>) -> PResult<Literal> {
    let text = (digits, opt((lit("."), digits))).take().parse_next(input)?;
    if text.contains('.') {
        match Decimal::from_str(text) {
            Ok(d) => Ok(Literal::Decimal(d)),
            Err(_) => backtrack(),
        }
    } else {
        match text.parse::<i64>() {
            Ok(i) => Ok(Literal::Integer(i)),
            Err(_) => backtrack(),
        }
    }
}

/// Single-quoted string; `''` escapes a quote
pub fn string_literal(input: &mut Input<'_>) -> PResult<String> {
    lit("'")(input)?;
    let mut out = String::new();
    loop {
        out.push_str(until_quote(input)?);
        if lit("''")(input).is_ok() {
            out.push('\'');
            continue;
        }
        lit("'")(input)?;
        return Ok(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_is_case_insensitive_and_whole_word() {
        let mut input = "and rest";
        assert!(keyword("AND").parse_next(&mut input).is_ok());
        assert_eq!(input, " rest");

        let mut input = "android";
        assert!(keyword("AND").parse_next(&mut input).is_err());
        assert_eq!(input, "android");
    }

    #[test]
    fn test_number_literal() {
        let mut input = "18.5)";
        assert_eq!(
            number_literal(&mut input).unwrap(),
            Literal::Decimal(Decimal::from_str("18.5").unwrap())
        );
        assert_eq!(input, ")");

        let mut input = "32844";
        assert_eq!(number_literal(&mut input).unwrap(), Literal::Integer(32844));
    }

    #[test]
    fn test_string_literal_escape() {
        let mut input = "'it''s' tail";
        assert_eq!(string_literal(&mut input).unwrap(), "it's");
        assert_eq!(input, " tail");

        let mut input = "'open";
        assert!(string_literal(&mut input).is_err());
    }
}
