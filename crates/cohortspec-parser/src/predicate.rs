//! Predicate parser using recursive descent with precedence climbing
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! or_expr        := and_expr ("OR" and_expr)*
//! and_expr       := not_expr ("AND" not_expr)*
//! not_expr       := "NOT" not_expr | comparison
//! comparison     := additive (cmp_op additive)?
//! additive       := multiplicative (("+" | "-") multiplicative)*
//! multiplicative := unary (("*" | "/") unary)*
//! unary          := "-" unary | primary
//! primary        := "(" or_expr ")" | number | string | DEFAULT | TRUE | FALSE | identifier
//! ```

use crate::combinators::{
    backtrack, is_reserved, keyword, lit, number_literal, padded_keyword, string_literal, word,
    ws, Input, PResult,
};
use cohortspec_ast::{BinaryOp, Expression, Literal, UnaryOp};

pub fn expression_parser(input: &mut Input<'_>) -> PResult<Expression> {
    ws(input)?;
    let expr = or_expression(input)?;
    ws(input)?;
    Ok(expr)
}

fn or_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = and_expression(input)?;
    while padded_keyword("or")(input).is_ok() {
        let right = and_expression(input)?;
        left = Expression::binary(left, BinaryOp::Or, right);
    }
    Ok(left)
}

fn and_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = not_expression(input)?;
    while padded_keyword("and")(input).is_ok() {
        let right = not_expression(input)?;
        left = Expression::binary(left, BinaryOp::And, right);
    }
    Ok(left)
}

fn not_expression(input: &mut Input<'_>) -> PResult<Expression> {
    if padded_keyword("not")(input).is_ok() {
        let operand = not_expression(input)?;
        return Ok(Expression::unary(UnaryOp::Not, operand));
    }
    comparison_expression(input)
}

/// Comparison operators, longest spelling first
fn comparison_operator(input: &mut Input<'_>) -> PResult<BinaryOp> {
    ws(input)?;
    let ops: [(&'static str, BinaryOp); 8] = [
        ("<=", BinaryOp::LessOrEqual),
        (">=", BinaryOp::GreaterOrEqual),
        ("!=", BinaryOp::NotEqual),
        ("<>", BinaryOp::NotEqual),
        ("==", BinaryOp::Equal),
        ("=", BinaryOp::Equal),
        ("<", BinaryOp::Less),
        (">", BinaryOp::Greater),
    ];
    for (token, op) in ops {
        if lit(token)(input).is_ok() {
            ws(input)?;
            return Ok(op);
        }
    }
    backtrack()
}

fn comparison_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let left = additive_expression(input)?;
    let checkpoint = *input;
    match comparison_operator(input) {
        Ok(op) => {
            let right = additive_expression(input)?;
            Ok(Expression::binary(left, op, right))
        }
        Err(_) => {
            *input = checkpoint;
            Ok(left)
        }
    }
}

fn additive_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = multiplicative_expression(input)?;
    loop {
        let checkpoint = *input;
        ws(input)?;
        let op = if lit("+")(input).is_ok() {
            BinaryOp::Add
        } else if lit("-")(input).is_ok() {
            BinaryOp::Subtract
        } else {
            *input = checkpoint;
            break;
        };
        ws(input)?;
        let right = multiplicative_expression(input)?;
        left = Expression::binary(left, op, right);
    }
    Ok(left)
}

fn multiplicative_expression(input: &mut Input<'_>) -> PResult<Expression> {
    let mut left = unary_expression(input)?;
    loop {
        let checkpoint = *input;
        ws(input)?;
        let op = if lit("*")(input).is_ok() {
            BinaryOp::Multiply
        } else if lit("/")(input).is_ok() {
            BinaryOp::Divide
        } else {
            *input = checkpoint;
            break;
        };
        ws(input)?;
        let right = unary_expression(input)?;
        left = Expression::binary(left, op, right);
    }
    Ok(left)
}

fn unary_expression(input: &mut Input<'_>) -> PResult<Expression> {
    ws(input)?;
    if lit("-")(input).is_ok() {
        let operand = unary_expression(input)?;
        // Fold negative numeric literals so `-1` stays a literal
        return Ok(match operand {
            Expression::Literal(Literal::Integer(i)) => Expression::Literal(Literal::Integer(-i)),
            Expression::Literal(Literal::Decimal(d)) => Expression::Literal(Literal::Decimal(-d)),
            other => Expression::unary(UnaryOp::Negate, other),
        });
    }
    primary_expression(input)
}

fn primary_expression(input: &mut Input<'_>) -> PResult<Expression> {
    ws(input)?;

    if lit("(")(input).is_ok() {
        let inner = or_expression(input)?;
        ws(input)?;
        lit(")")(input)?;
        return Ok(inner);
    }

    if input.starts_with(|c: char| c.is_ascii_digit()) {
        let checkpoint = *input;
        return match number_literal(input) {
            Ok(n) => Ok(Expression::Literal(n)),
            Err(e) => {
                *input = checkpoint;
                Err(e)
            }
        };
    }

    if input.starts_with('\'') {
        let checkpoint = *input;
        return match string_literal(input) {
            Ok(s) => Ok(Expression::string(s)),
            Err(e) => {
                *input = checkpoint;
                Err(e)
            }
        };
    }

    if keyword("default")(input).is_ok() {
        return Ok(Expression::Default);
    }
    if keyword("true")(input).is_ok() {
        return Ok(Expression::Literal(Literal::Boolean(true)));
    }
    if keyword("false")(input).is_ok() {
        return Ok(Expression::Literal(Literal::Boolean(false)));
    }

    let checkpoint = *input;
    let name = word(input)?;
    if is_reserved(name) {
        *input = checkpoint;
        return backtrack();
    }
    Ok(Expression::ident(name))
}
