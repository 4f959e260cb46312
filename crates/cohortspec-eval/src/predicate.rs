//! Predicate evaluation with three-valued logic
//!
//! `AND` is false-dominant and `OR` true-dominant; every other operator
//! yields null when an operand is null. Logical operators read their operands
//! through [`Value::truthiness`], so binary flags stored as counts or strings
//! behave as they do in the study definitions.

use crate::error::{EvalError, EvalResult};
use crate::value::Value;
use chrono::NaiveDate;
use cohortspec_ast::{BinaryOp, Expression, Literal, UnaryOp};
use cohortspec_definition::CategoryTable;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::str::FromStr;

/// Names a predicate can read
pub trait Scope {
    fn lookup(&self, name: &str) -> Option<&Value>;
}

impl Scope for IndexMap<String, Value> {
    fn lookup(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}

/// Evaluate an expression to a value
pub fn evaluate(expr: &Expression, scope: &dyn Scope) -> EvalResult<Value> {
    match expr {
        Expression::Literal(lit) => Ok(literal(lit)),
        Expression::Identifier(id) => scope
            .lookup(&id.name)
            .cloned()
            .ok_or_else(|| EvalError::unresolved(&id.name)),
        Expression::Default => Ok(Value::Bool(true)),
        Expression::Unary(u) => {
            let operand = evaluate(&u.operand, scope)?;
            match u.op {
                UnaryOp::Not => Ok(operand.truthiness().map_or(Value::Null, |b| Value::Bool(!b))),
                UnaryOp::Negate => negate(operand),
            }
        }
        Expression::Binary(b) => {
            let left = evaluate(&b.left, scope)?;
            let right = evaluate(&b.right, scope)?;
            match b.op {
                BinaryOp::And => Ok(and(&left, &right)),
                BinaryOp::Or => Ok(or(&left, &right)),
                op if op.is_comparison() => comparison(op, &left, &right),
                op => arithmetic(op, &left, &right),
            }
        }
    }
}

/// Whether a predicate holds; null counts as not holding
pub fn holds(expr: &Expression, scope: &dyn Scope) -> EvalResult<bool> {
    Ok(evaluate(expr, scope)?.truthiness().unwrap_or(false))
}

/// Label of the first rule that holds, or the default label
pub fn categorise<'t>(table: &'t CategoryTable, scope: &dyn Scope) -> EvalResult<&'t str> {
    for (label, predicate) in &table.rules {
        if holds(predicate, scope)? {
            return Ok(label);
        }
    }
    Ok(&table.default_label)
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Integer(i) => Value::Integer(*i),
        Literal::Decimal(d) => Value::Decimal(*d),
        Literal::String(s) => Value::Str(s.clone()),
    }
}

/// | A     | B     | A AND B |
/// |-------|-------|---------|
/// | false | any   | false   |
/// | true  | true  | true    |
/// | true  | null  | null    |
/// | null  | null  | null    |
fn and(left: &Value, right: &Value) -> Value {
    match (left.truthiness(), right.truthiness()) {
        (Some(false), _) | (_, Some(false)) => Value::Bool(false),
        (Some(true), Some(true)) => Value::Bool(true),
        _ => Value::Null,
    }
}

fn or(left: &Value, right: &Value) -> Value {
    match (left.truthiness(), right.truthiness()) {
        (Some(true), _) | (_, Some(true)) => Value::Bool(true),
        (Some(false), Some(false)) => Value::Bool(false),
        _ => Value::Null,
    }
}

fn negate(operand: Value) -> EvalResult<Value> {
    match operand {
        Value::Null => Ok(Value::Null),
        Value::Integer(i) => i
            .checked_neg()
            .map(Value::Integer)
            .ok_or_else(|| EvalError::overflow("negation")),
        Value::Decimal(d) => Ok(Value::Decimal(-d)),
        other => Err(EvalError::type_mismatch("-", other.type_name(), other.type_name())),
    }
}

/// Numeric view of a value; binary flags count as 0 and 1
fn numeric(value: &Value) -> Option<Decimal> {
    match value {
        Value::Bool(b) => Some(Decimal::from(u8::from(*b))),
        Value::Integer(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        Value::Str(s) => Decimal::from_str(s.trim()).ok(),
        Value::Null | Value::Date(_) => None,
    }
}

/// Order two non-null values, coercing numeric-looking strings.
///
/// `None` means the values are of unrelated kinds.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Str(s)) => s.parse::<NaiveDate>().ok().map(|b| a.cmp(&b)),
        (Value::Str(s), Value::Date(b)) => s.parse::<NaiveDate>().ok().map(|a| a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => Some(numeric(left)?.cmp(&numeric(right)?)),
    }
}

fn comparison(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let Some(ordering) = compare(left, right) else {
        return match op {
            // Unrelated kinds are simply unequal
            BinaryOp::Equal => Ok(Value::Bool(false)),
            BinaryOp::NotEqual => Ok(Value::Bool(true)),
            _ => Err(EvalError::type_mismatch(op.symbol(), left.type_name(), right.type_name())),
        };
    };
    let result = match op {
        BinaryOp::Equal => ordering == Ordering::Equal,
        BinaryOp::NotEqual => ordering != Ordering::Equal,
        BinaryOp::Less => ordering == Ordering::Less,
        BinaryOp::LessOrEqual => ordering != Ordering::Greater,
        BinaryOp::Greater => ordering == Ordering::Greater,
        BinaryOp::GreaterOrEqual => ordering != Ordering::Less,
        _ => return Err(EvalError::type_mismatch(op.symbol(), left.type_name(), right.type_name())),
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let mismatch = || EvalError::type_mismatch(op.symbol(), left.type_name(), right.type_name());
    if matches!(left, Value::Str(_) | Value::Date(_)) || matches!(right, Value::Str(_) | Value::Date(_)) {
        return Err(mismatch());
    }

    if let (Some(a), Some(b)) = (integer(left), integer(right)) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide if b == 0 => return Err(EvalError::DivisionByZero),
            // Truncates toward zero
            BinaryOp::Divide => a.checked_div(b),
            _ => return Err(mismatch()),
        };
        return result
            .map(Value::Integer)
            .ok_or_else(|| EvalError::overflow(op.symbol()));
    }

    let (Some(a), Some(b)) = (numeric(left), numeric(right)) else {
        return Err(mismatch());
    };
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide if b.is_zero() => return Err(EvalError::DivisionByZero),
        BinaryOp::Divide => a.checked_div(b),
        _ => return Err(mismatch()),
    };
    result
        .map(Value::Decimal)
        .ok_or_else(|| EvalError::overflow(op.symbol()))
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}
