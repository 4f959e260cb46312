//! Predicate expression nodes

use crate::{BinaryOp, Identifier, Literal, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A predicate or value expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Literal(Literal),
    /// Reference to a variable or record attribute
    Identifier(Identifier),
    /// The `DEFAULT` marker of a categorisation
    Default,
    Unary(UnaryOpExpr),
    Binary(BinaryOpExpr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOpExpr {
    pub op: UnaryOp,
    pub operand: Box<Expression>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOpExpr {
    pub left: Box<Expression>,
    pub op: BinaryOp,
    pub right: Box<Expression>,
}

impl Expression {
    pub fn ident(name: impl Into<String>) -> Self {
        Self::Identifier(Identifier::new(name))
    }

    pub fn integer(value: i64) -> Self {
        Self::Literal(Literal::Integer(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Literal(Literal::String(value.into()))
    }

    pub fn binary(left: Expression, op: BinaryOp, right: Expression) -> Self {
        Self::Binary(BinaryOpExpr {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn unary(op: UnaryOp, operand: Expression) -> Self {
        Self::Unary(UnaryOpExpr {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Identifiers referenced by this expression, in order of first use
    pub fn identifiers(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_identifiers(&mut names);
        names
    }

    fn collect_identifiers<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Identifier(id) => {
                if !names.contains(&id.name.as_str()) {
                    names.push(&id.name);
                }
            }
            Self::Unary(u) => u.operand.collect_identifiers(names),
            Self::Binary(b) => {
                b.left.collect_identifiers(names);
                b.right.collect_identifiers(names);
            }
            Self::Literal(_) | Self::Default => {}
        }
    }

    fn fmt_with_precedence(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{}", lit),
            Self::Identifier(id) => write!(f, "{}", id),
            Self::Default => f.write_str("DEFAULT"),
            Self::Unary(u) => {
                let own = match u.op {
                    UnaryOp::Not => 3,
                    UnaryOp::Negate => 6,
                };
                if own < parent {
                    f.write_str("(")?;
                }
                write!(f, "{}", u.op)?;
                u.operand.fmt_with_precedence(f, own)?;
                if own < parent {
                    f.write_str(")")?;
                }
                Ok(())
            }
            Self::Binary(b) => {
                let own = b.op.precedence();
                if own < parent {
                    f.write_str("(")?;
                }
                b.left.fmt_with_precedence(f, own)?;
                write!(f, " {} ", b.op)?;
                b.right.fmt_with_precedence(f, own + 1)?;
                if own < parent {
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

/// Canonical text with the minimum parentheses needed to re-parse the same tree
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_with_precedence(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn age_between() -> Expression {
        Expression::binary(
            Expression::binary(Expression::ident("age"), BinaryOp::GreaterOrEqual, Expression::integer(18)),
            BinaryOp::And,
            Expression::binary(Expression::ident("age"), BinaryOp::LessOrEqual, Expression::integer(110)),
        )
    }

    #[test]
    fn test_identifiers_are_unique_and_ordered() {
        let expr = Expression::binary(Expression::ident("pa_ca"), BinaryOp::And, age_between());
        assert_eq!(expr.identifiers(), vec!["pa_ca", "age"]);
    }

    #[test]
    fn test_display_keeps_needed_parentheses() {
        let expr = Expression::binary(
            Expression::ident("registered"),
            BinaryOp::Or,
            age_between(),
        );
        assert_eq!(expr.to_string(), "registered OR age >= 18 AND age <= 110");

        let grouped = Expression::binary(
            Expression::binary(Expression::ident("a"), BinaryOp::Or, Expression::ident("b")),
            BinaryOp::And,
            Expression::ident("c"),
        );
        assert_eq!(grouped.to_string(), "(a OR b) AND c");
    }

    #[test]
    fn test_display_not_and_strings() {
        let expr = Expression::binary(
            Expression::ident("IsPotentialCareHome"),
            BinaryOp::And,
            Expression::unary(
                UnaryOp::Not,
                Expression::binary(
                    Expression::ident("LocationRequiresNursing"),
                    BinaryOp::Equal,
                    Expression::string("Y"),
                ),
            ),
        );
        assert_eq!(
            expr.to_string(),
            "IsPotentialCareHome AND NOT LocationRequiresNursing = 'Y'"
        );
    }

    #[test]
    fn test_left_associative_division() {
        let expr = Expression::binary(
            Expression::binary(Expression::integer(32844), BinaryOp::Multiply, Expression::integer(2)),
            BinaryOp::Divide,
            Expression::integer(5),
        );
        assert_eq!(expr.to_string(), "32844 * 2 / 5");

        let right_nested = Expression::binary(
            Expression::integer(32844),
            BinaryOp::Divide,
            Expression::binary(Expression::integer(2), BinaryOp::Multiply, Expression::integer(5)),
        );
        assert_eq!(right_nested.to_string(), "32844 / (2 * 5)");
    }
}
