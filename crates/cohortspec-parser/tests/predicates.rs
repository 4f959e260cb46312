use cohortspec_ast::{BinaryOp, DateAnchor, DateUnit, Expression, Literal, UnaryOp};
use cohortspec_diagnostics::{COH0001, COH0002, COH0003, COH0004, COH0005, COH0006, COH0007};
use cohortspec_parser::{parse_date_expr, parse_predicate};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[rstest]
#[case("registered AND (age >= 18 AND age <= 110)", "registered AND (age >= 18 AND age <= 110)")]
#[case("pa_ca", "pa_ca")]
#[case("a or b and c", "a OR b AND c")]
#[case("(a OR b) AND c", "(a OR b) AND c")]
#[case("NOT died", "NOT died")]
#[case("imd >= 0 AND imd < 32844*1/5", "imd >= 0 AND imd < 32844 * 1 / 5")]
#[case("bmi_value >= 30", "bmi_value >= 30")]
#[case("ethnicity_code = '1'", "ethnicity_code = '1'")]
#[case("care_home <> 'U'", "care_home != 'U'")]
#[case("DEFAULT", "DEFAULT")]
fn test_predicate_normalised_display(#[case] source: &str, #[case] expected: &str) {
    let expr = parse_predicate(source).unwrap();
    assert_eq!(expr.to_string(), expected);
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expr = parse_predicate("a OR b AND c").unwrap();
    let Expression::Binary(top) = expr else {
        panic!("expected binary expression");
    };
    assert_eq!(top.op, BinaryOp::Or);
    assert_eq!(*top.left, Expression::ident("a"));
}

#[test]
fn test_multiline_predicate() {
    let source = "
        registered
        AND
        (age >= 18 AND age <= 110)
    ";
    let expr = parse_predicate(source).unwrap();
    assert_eq!(expr.identifiers(), vec!["registered", "age"]);
}

#[test]
fn test_negative_literal_is_folded() {
    let expr = parse_predicate("x > -1").unwrap();
    let Expression::Binary(cmp) = expr else {
        panic!("expected comparison");
    };
    assert_eq!(*cmp.right, Expression::Literal(Literal::Integer(-1)));
}

#[test]
fn test_not_wraps_comparison() {
    let expr = parse_predicate("NOT a = 1").unwrap();
    let Expression::Unary(not) = expr else {
        panic!("expected unary");
    };
    assert_eq!(not.op, UnaryOp::Not);
}

#[test]
fn test_keyword_prefixed_identifier_is_not_a_keyword() {
    let expr = parse_predicate("order AND notable").unwrap();
    assert_eq!(expr.identifiers(), vec!["order", "notable"]);
}

#[rstest]
#[case("", COH0007)]
#[case("   ", COH0007)]
#[case("age >=", COH0002)]
#[case("(a AND b", COH0002)]
#[case("a b", COH0001)]
#[case("a = = b", COH0001)]
#[case("x = 'open", COH0004)]
#[case("x = 99999999999999999999", COH0003)]
#[case("AND a", COH0001)]
fn test_predicate_errors(#[case] source: &str, #[case] code: cohortspec_diagnostics::ErrorCode) {
    let err = parse_predicate(source).unwrap_err();
    assert_eq!(err.code(), code);
}

#[test]
fn test_error_location_points_at_token() {
    let err = parse_predicate("a AND\n  b c").unwrap_err();
    let diag = err.to_diagnostic();
    let loc = diag.location.unwrap();
    assert_eq!(loc.line, 2);
    assert_eq!(loc.column, 5);
}

#[test]
fn test_date_expr_variable_offset() {
    let expr = parse_date_expr("ca_date - 6 months").unwrap();
    assert_eq!(expr.referenced_variable(), Some("ca_date"));
    let offset = expr.offset.unwrap();
    assert_eq!(offset.amount, -6);
    assert_eq!(offset.unit, DateUnit::Months);
}

#[rstest]
#[case("2015-01-01", "2015-01-01")]
#[case("today", "today")]
#[case("index_date + 1 year", "index_date + 1 years")]
#[case("ca_date+6 months", "ca_date + 6 months")]
#[case("  died_ca_date - 30 days ", "died_ca_date - 30 days")]
fn test_date_expr_display(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(parse_date_expr(source).unwrap().to_string(), expected);
}

#[test]
fn test_date_literal_anchor() {
    let expr = parse_date_expr("2000-01-01").unwrap();
    assert!(matches!(expr.anchor, DateAnchor::Literal(_)));
    assert_eq!(expr.offset, None);
}

#[rstest]
#[case("2015-13-01", COH0005)]
#[case("2015-02-30", COH0005)]
#[case("2015", COH0005)]
#[case("ca_date - 6 fortnights", COH0006)]
#[case("ca_date - 6", COH0006)]
#[case("ca_date - months", COH0006)]
#[case("", COH0007)]
#[case("ca_date foo", COH0001)]
fn test_date_expr_errors(#[case] source: &str, #[case] code: cohortspec_diagnostics::ErrorCode) {
    assert_eq!(parse_date_expr(source).unwrap_err().code(), code);
}

#[test]
fn test_error_snapshot() {
    let err = parse_predicate("registered AND").unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"COH0002: Unexpected end of expression");
}
