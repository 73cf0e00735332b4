//! Pure combinators behind the operators of the expression language.
//!
//! The evaluator and the watch bridge share these, so an expression computes
//! the same value whether it is evaluated directly or through a watch tree.
//! Null handling differs per operator and is deliberate: `+` and `-` treat a
//! missing operand as absent, arithmetic and relational operators yield null,
//! and equality never short-circuits on null.

use std::cmp::Ordering;

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{ast::BinOp, evaluator::EvalError, value::Value};

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(n) => n,
        }
    }
}

fn numeric(value: &Value) -> Option<Number> {
    match value {
        Value::Integer(n) => Some(Number::Int(*n)),
        Value::Float(n) => Some(Number::Float(*n)),
        Value::Boolean(b) => Some(Number::Int(*b as i64)),
        _ => None,
    }
}

/// Numeric view used by comparisons and loose equality; numeric strings count.
fn loose_numeric(value: &Value) -> Option<Number> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Some(Number::Int(0))
            } else {
                trimmed.parse::<f64>().ok().map(Number::Float)
            }
        }
        other => numeric(other),
    }
}

/// Apply a binary operator to two already-evaluated operands.
///
/// `&&` and `||` do not short-circuit here; both operands are already known.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add => add(left, right),
        BinOp::Subtract => subtract(left, right),
        BinOp::Multiply | BinOp::Divide | BinOp::FloorDivide | BinOp::Modulo => {
            if left.is_null() || right.is_null() {
                return Ok(Value::Null);
            }
            arithmetic(op, left, right)
        }
        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            compare(op, left, right)
        }
        BinOp::Equal => Ok(Value::Boolean(loose_equals(left, right))),
        BinOp::NotEqual => Ok(Value::Boolean(!loose_equals(left, right))),
        BinOp::And => Ok(Value::Boolean(left.is_truthy() && right.is_truthy())),
        BinOp::Or => Ok(Value::Boolean(left.is_truthy() || right.is_truthy())),
    }
}

/// String-coalescing addition.
///
/// One string operand turns the other into a string; a single null operand
/// yields the other operand; two nulls yield 0.
pub fn add(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left, right) {
        (Value::Null, Value::Null) => Ok(Value::Integer(0)),
        (Value::Null, other) | (other, Value::Null) => Ok(other.clone()),
        (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b.as_string()))),
        (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a.as_string(), b))),
        _ => arithmetic(BinOp::Add, left, right),
    }
}

/// Subtraction where a missing left operand negates the right one.
pub fn subtract(left: &Value, right: &Value) -> Result<Value, EvalError> {
    match (left.is_null(), right.is_null()) {
        (false, false) => arithmetic(BinOp::Subtract, left, right),
        (false, true) => Ok(left.clone()),
        (true, false) => arithmetic(BinOp::Subtract, &Value::Integer(0), right),
        (true, true) => Ok(Value::Integer(0)),
    }
}

fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (a, b) = match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(EvalError::TypeError(format!(
                "Cannot {} {} and {}",
                op.verb(),
                left.type_name(),
                right.type_name()
            )));
        }
    };

    Ok(match (a, b) {
        (Number::Int(a), Number::Int(b)) => integer_op(op, a, b),
        (Number::Float(a), Number::Float(b)) => float_op(op, a, b),
        (Number::Int(a), Number::Float(b)) => decimal_op(op, Decimal::from_i64(a), Decimal::from_f64(b))
            .unwrap_or_else(|| float_op(op, a as f64, b)),
        (Number::Float(a), Number::Int(b)) => decimal_op(op, Decimal::from_f64(a), Decimal::from_i64(b))
            .unwrap_or_else(|| float_op(op, a, b as f64)),
    })
}

fn integer_op(op: BinOp, a: i64, b: i64) -> Value {
    let exact = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => match a.checked_rem(b) {
            // Inexact division yields a float
            Some(0) => a.checked_div(b),
            _ => None,
        },
        BinOp::FloorDivide => a.checked_div(b).map(|q| {
            if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q }
        }),
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    };
    match exact {
        Some(n) => Value::Integer(n),
        None => float_op(op, a as f64, b as f64),
    }
}

fn float_op(op: BinOp, a: f64, b: f64) -> Value {
    match op {
        BinOp::Add => Value::Float(a + b),
        BinOp::Subtract => Value::Float(a - b),
        BinOp::Multiply => Value::Float(a * b),
        BinOp::Divide => Value::Float(a / b),
        BinOp::FloorDivide => {
            let floored = (a / b).floor();
            if floored.is_finite() && floored.abs() < i64::MAX as f64 {
                Value::Integer(floored as i64)
            } else {
                Value::Float(floored)
            }
        }
        BinOp::Modulo => Value::Float(a % b),
        _ => Value::Null,
    }
}

/// Mixed integer/float arithmetic through decimals, collapsing whole results to integers.
fn decimal_op(op: BinOp, a: Option<Decimal>, b: Option<Decimal>) -> Option<Value> {
    let (a, b) = (a?, b?);
    let rd = match op {
        BinOp::Add => a.checked_add(b)?,
        BinOp::Subtract => a.checked_sub(b)?,
        BinOp::Multiply => a.checked_mul(b)?,
        BinOp::Divide => a.checked_div(b)?,
        BinOp::FloorDivide => a.checked_div(b)?.floor(),
        BinOp::Modulo => a.checked_rem(b)?,
        _ => return None,
    };
    if rd.is_integer()
        && let Some(r) = rd.to_i64()
    {
        return Some(Value::Integer(r));
    }
    rd.to_f64().map(Value::Float)
}

/// Relational comparison; null on either side yields null.
pub fn compare(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let ordering = match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        _ => match (loose_numeric(left), loose_numeric(right)) {
            (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
            _ => {
                return Err(EvalError::TypeError(format!(
                    "Cannot compare {} {} {}",
                    left.type_name(),
                    op,
                    right.type_name()
                )));
            }
        },
    };

    // NaN compares false both ways
    let Some(ordering) = ordering else {
        return Ok(Value::Boolean(false));
    };

    Ok(Value::Boolean(match op {
        BinOp::LessThan => ordering == Ordering::Less,
        BinOp::GreaterThan => ordering == Ordering::Greater,
        BinOp::LessEqual => ordering != Ordering::Greater,
        BinOp::GreaterEqual => ordering != Ordering::Less,
        _ => false,
    }))
}

/// Loose equality: numbers compare across integer and float, numeric strings
/// and booleans coerce against numbers, shared values compare by identity.
pub fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_), _)
        | (_, Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Host(_)) => {
            left.same(right)
        }
        _ => match (loose_numeric(left), loose_numeric(right)) {
            (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
            _ => false,
        },
    }
}

pub fn not(value: &Value) -> Value {
    Value::Boolean(!value.is_truthy())
}

/// `object[key]`; a null object yields null.
pub fn keyed(object: &Value, key: &Value) -> Result<Value, EvalError> {
    if object.is_null() {
        return Ok(Value::Null);
    }
    object.get_keyed(key)
}

pub fn ternary(condition: &Value, yes: &Value, no: &Value) -> Value {
    if condition.is_truthy() { yes.clone() } else { no.clone() }
}

/// A fresh array holding `values`.
pub fn array(values: Vec<Value>) -> Value {
    Value::array(values)
}

/// A fresh object mapping `keys` to `values` positionally.
pub fn object(keys: &[String], values: Vec<Value>) -> Value {
    Value::object(keys.iter().cloned().zip(values))
}
