//! Scalar expressions evaluated per row
//!
//! Column and binding positions are resolved at plan-compile time by the
//! optimizer; evaluation is purely positional. SQL three-valued logic
//! applies: comparisons with NULL yield NULL, NaN is never equal to
//! anything including itself.

use crate::context::QueryBindings;
use crate::error::{Error, Result};
use crate::types::value::compare;
use crate::types::{Row, Value};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;

/// A compiled scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value
    Constant(Value),
    /// A column of the current input row
    Column(usize),
    /// A positional statement parameter
    Parameter(usize),
    /// A column of the row bound at a binding position (the current outer
    /// row of an enclosing nested loop)
    BoundField { position: usize, column: usize },

    Equal(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqual(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqual(Box<Expression>, Box<Expression>),

    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    IsNull(Box<Expression>),

    Add(Box<Expression>, Box<Expression>),
    Subtract(Box<Expression>, Box<Expression>),
    Multiply(Box<Expression>, Box<Expression>),
    Divide(Box<Expression>, Box<Expression>),
}

impl Expression {
    pub fn equal(left: Expression, right: Expression) -> Expression {
        Expression::Equal(Box::new(left), Box::new(right))
    }

    pub fn constant(value: Value) -> Expression {
        Expression::Constant(value)
    }

    pub fn column(index: usize) -> Expression {
        Expression::Column(index)
    }

    pub fn bound_field(position: usize, column: usize) -> Expression {
        Expression::BoundField { position, column }
    }
}

/// Evaluate an expression against an optional input row and the current
/// bindings
pub fn evaluate(expr: &Expression, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
    match expr {
        Expression::Constant(v) => Ok(v.clone()),

        Expression::Column(index) => match row {
            Some(r) => r.value(*index).cloned(),
            // A rowless evaluation context means the plan put a column
            // reference where no input row flows, not a bad index
            None => Err(Error::InvalidValue(format!(
                "column {} referenced with no input row",
                index
            ))),
        },

        Expression::Parameter(position) => bindings.value_at(*position).cloned(),

        Expression::BoundField { position, column } => {
            bindings.row_at(*position)?.value(*column).cloned()
        }

        Expression::Equal(l, r) => compare_op(l, r, row, bindings, |o| o == Ordering::Equal),
        Expression::NotEqual(l, r) => compare_op(l, r, row, bindings, |o| o != Ordering::Equal),
        Expression::LessThan(l, r) => compare_op(l, r, row, bindings, |o| o == Ordering::Less),
        Expression::LessThanOrEqual(l, r) => {
            compare_op(l, r, row, bindings, |o| o != Ordering::Greater)
        }
        Expression::GreaterThan(l, r) => {
            compare_op(l, r, row, bindings, |o| o == Ordering::Greater)
        }
        Expression::GreaterThanOrEqual(l, r) => {
            compare_op(l, r, row, bindings, |o| o != Ordering::Less)
        }

        Expression::And(l, r) => {
            let l = evaluate(l, row, bindings)?;
            let r = evaluate(r, row, bindings)?;
            three_valued_and(&l, &r)
        }

        Expression::Or(l, r) => {
            let l = evaluate(l, row, bindings)?;
            let r = evaluate(r, row, bindings)?;
            three_valued_or(&l, &r)
        }

        Expression::Not(inner) => match evaluate(inner, row, bindings)? {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(!b)),
            v => Err(type_error("BOOLEAN", &v)),
        },

        Expression::IsNull(inner) => Ok(Value::Bool(evaluate(inner, row, bindings)?.is_null())),

        Expression::Add(l, r) => numeric_op(l, r, row, bindings, NumericOp::Add),
        Expression::Subtract(l, r) => numeric_op(l, r, row, bindings, NumericOp::Subtract),
        Expression::Multiply(l, r) => numeric_op(l, r, row, bindings, NumericOp::Multiply),
        Expression::Divide(l, r) => numeric_op(l, r, row, bindings, NumericOp::Divide),
    }
}

fn compare_op(
    l: &Expression,
    r: &Expression,
    row: Option<&Row>,
    bindings: &QueryBindings,
    pred: fn(Ordering) -> bool,
) -> Result<Value> {
    let l = evaluate(l, row, bindings)?;
    let r = evaluate(r, row, bindings)?;
    // SQL semantics: any comparison with NULL returns NULL
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    // IEEE 754 semantics: comparisons involving NaN are false
    let has_nan = matches!(&l, Value::F64(f) if f.is_nan())
        || matches!(&r, Value::F64(f) if f.is_nan());
    if has_nan {
        return Ok(Value::Bool(false));
    }
    Ok(Value::Bool(pred(compare(&l, &r)?)))
}

fn three_valued_and(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Bool(false), _) | (_, Value::Bool(false)) => Ok(Value::Bool(false)),
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Bool(true), Value::Bool(true)) => Ok(Value::Bool(true)),
        (Value::Bool(_), v) | (v, _) => Err(type_error("BOOLEAN", v)),
    }
}

fn three_valued_or(l: &Value, r: &Value) -> Result<Value> {
    match (l, r) {
        (Value::Bool(true), _) | (_, Value::Bool(true)) => Ok(Value::Bool(true)),
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Bool(false), Value::Bool(false)) => Ok(Value::Bool(false)),
        (Value::Bool(_), v) | (v, _) => Err(type_error("BOOLEAN", v)),
    }
}

#[derive(Clone, Copy)]
enum NumericOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

fn numeric_op(
    l: &Expression,
    r: &Expression,
    row: Option<&Row>,
    bindings: &QueryBindings,
    op: NumericOp,
) -> Result<Value> {
    let l = evaluate(l, row, bindings)?;
    let r = evaluate(r, row, bindings)?;
    if l.is_null() || r.is_null() {
        return Ok(Value::Null);
    }
    match (&l, &r) {
        (Value::I32(_) | Value::I64(_), Value::I32(_) | Value::I64(_)) => {
            int_op(as_i64(&l), as_i64(&r), op)
        }
        (Value::F64(a), _) => float_op(*a, as_f64(&r)?, op),
        (_, Value::F64(b)) => float_op(as_f64(&l)?, *b, op),
        (Value::Decimal(a), _) => decimal_op(*a, as_decimal(&r)?, op),
        (_, Value::Decimal(b)) => decimal_op(as_decimal(&l)?, *b, op),
        _ => Err(type_error("numeric", &l)),
    }
}

fn as_i64(v: &Value) -> i64 {
    match v {
        Value::I32(i) => *i as i64,
        Value::I64(i) => *i,
        _ => unreachable!("checked by caller"),
    }
}

fn as_f64(v: &Value) -> Result<f64> {
    use rust_decimal::prelude::ToPrimitive;
    match v {
        Value::I32(i) => Ok(*i as f64),
        Value::I64(i) => Ok(*i as f64),
        Value::F64(f) => Ok(*f),
        Value::Decimal(d) => Ok(d.to_f64().unwrap_or(f64::NAN)),
        v => Err(type_error("numeric", v)),
    }
}

fn as_decimal(v: &Value) -> Result<Decimal> {
    match v {
        Value::I32(i) => Ok(Decimal::from(*i)),
        Value::I64(i) => Ok(Decimal::from(*i)),
        Value::Decimal(d) => Ok(*d),
        Value::F64(f) => Decimal::from_f64(*f)
            .ok_or_else(|| Error::InvalidValue(format!("{} is not exactly representable", f))),
        v => Err(type_error("numeric", v)),
    }
}

fn int_op(a: i64, b: i64, op: NumericOp) -> Result<Value> {
    let overflow = || Error::InvalidValue("integer overflow".into());
    match op {
        NumericOp::Add => a.checked_add(b).map(Value::I64).ok_or_else(overflow),
        NumericOp::Subtract => a.checked_sub(b).map(Value::I64).ok_or_else(overflow),
        NumericOp::Multiply => a.checked_mul(b).map(Value::I64).ok_or_else(overflow),
        NumericOp::Divide => {
            if b == 0 {
                Err(Error::InvalidValue("division by zero".into()))
            } else {
                Ok(Value::I64(a / b))
            }
        }
    }
}

fn float_op(a: f64, b: f64, op: NumericOp) -> Result<Value> {
    Ok(Value::F64(match op {
        NumericOp::Add => a + b,
        NumericOp::Subtract => a - b,
        NumericOp::Multiply => a * b,
        NumericOp::Divide => a / b,
    }))
}

fn decimal_op(a: Decimal, b: Decimal, op: NumericOp) -> Result<Value> {
    let overflow = || Error::InvalidValue("decimal overflow".into());
    match op {
        NumericOp::Add => a.checked_add(b).map(Value::Decimal).ok_or_else(overflow),
        NumericOp::Subtract => a.checked_sub(b).map(Value::Decimal).ok_or_else(overflow),
        NumericOp::Multiply => a.checked_mul(b).map(Value::Decimal).ok_or_else(overflow),
        NumericOp::Divide => a
            .checked_div(b)
            .map(Value::Decimal)
            .ok_or_else(|| Error::InvalidValue("division by zero".into())),
    }
}

fn type_error(expected: &str, found: &Value) -> Error {
    Error::TypeMismatch {
        expected: expected.into(),
        found: found
            .data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "NULL".into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(expr: &Expression) -> Result<Value> {
        evaluate(expr, None, &QueryBindings::new())
    }

    #[test]
    fn test_null_comparison_is_null() {
        let e = Expression::equal(
            Expression::Constant(Value::Null),
            Expression::Constant(Value::I64(1)),
        );
        assert_eq!(eval(&e).unwrap(), Value::Null);
    }

    #[test]
    fn test_nan_is_not_equal_to_itself() {
        let e = Expression::equal(
            Expression::Constant(Value::F64(f64::NAN)),
            Expression::Constant(Value::F64(f64::NAN)),
        );
        assert_eq!(eval(&e).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_three_valued_and() {
        assert_eq!(
            three_valued_and(&Value::Bool(false), &Value::Null).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(
            three_valued_and(&Value::Bool(true), &Value::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_column_without_input_row() {
        let e = Expression::column(0);
        assert!(matches!(eval(&e), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn test_arithmetic() {
        let e = Expression::Add(
            Box::new(Expression::Constant(Value::I32(2))),
            Box::new(Expression::Constant(Value::I64(40))),
        );
        assert_eq!(eval(&e).unwrap(), Value::I64(42));

        let e = Expression::Divide(
            Box::new(Expression::Constant(Value::I64(1))),
            Box::new(Expression::Constant(Value::I64(0))),
        );
        assert!(eval(&e).is_err());
    }

    #[test]
    fn test_bound_field() {
        use crate::types::schema::{Column, SchemaBuilder};
        use crate::types::DataType;

        let mut b = SchemaBuilder::new();
        let g = b.group("g");
        let t = b
            .table(g, "t", None, vec![Column::new("id", DataType::I64)], vec![0])
            .unwrap();
        let schema = b.build().unwrap();
        let rt = schema.row_type(t).unwrap();
        let row = Row::base(
            rt,
            vec![Value::I64(7)],
            crate::hkey::HKey::root(1, vec![Value::I64(7)]),
        );

        let mut bindings = QueryBindings::new();
        bindings.set_row(0, row);
        let e = Expression::bound_field(0, 0);
        assert_eq!(evaluate(&e, None, &bindings).unwrap(), Value::I64(7));
    }
}
