//! Expression evaluation implementation.

use crate::expression::{
    parse_expression, BinaryOperator, Evaluator, Expression, ExpressionError, ExpressionResult,
    UnaryOperator,
};
use crate::table::{Column, Table, Value};
use std::cmp::Ordering;

/// Row-wise evaluator for an expression tree over one table
pub struct ExpressionEvaluator<'a> {
    /// Columns referenced by the expression, resolved once
    columns: Vec<&'a Column>,
}

impl<'a> ExpressionEvaluator<'a> {
    /// Resolve every column the expression references.
    ///
    /// Fails with `UnknownColumn` even when the table has no rows.
    pub fn bind(table: &'a Table, expr: &Expression) -> ExpressionResult<Self> {
        let columns = expr
            .referenced_columns()
            .into_iter()
            .map(|name| {
                table.column(name).map_err(|_| ExpressionError::UnknownColumn {
                    name: name.to_string(),
                })
            })
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Evaluate an expression for the given row
    pub fn evaluate(&self, expr: &Expression, row: usize) -> ExpressionResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),

            Expression::Column(name) => self.evaluate_column(name, row),

            Expression::BinaryOp { op, left, right } => {
                let left_val = self.evaluate(left, row)?;
                let right_val = self.evaluate(right, row)?;
                evaluate_binary_op(*op, left_val, right_val)
            }

            Expression::UnaryOp { op, operand } => {
                let operand_val = self.evaluate(operand, row)?;
                evaluate_unary_op(*op, operand_val)
            }
        }
    }

    fn evaluate_column(&self, name: &str, row: usize) -> ExpressionResult<Value> {
        let column = self
            .columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| ExpressionError::UnknownColumn {
                name: name.to_string(),
            })?;
        Ok(column.get(row).cloned().unwrap_or(Value::Null))
    }
}

fn invalid_operands(op: &str, left: &Value, right: &Value) -> ExpressionError {
    ExpressionError::InvalidOperandTypes {
        operator: op.to_string(),
        left_type: left.data_type(),
        right_type: right.data_type(),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(op: BinaryOperator, left: Value, right: Value) -> ExpressionResult<Value> {
    // Handle NULL propagation for most operators
    if left.is_null() || right.is_null() {
        return Ok(match op {
            // NULL AND false = false, NULL AND true = NULL
            BinaryOperator::And => match (&left, &right) {
                (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
                _ => Value::Null,
            },
            // NULL OR true = true, NULL OR false = NULL
            BinaryOperator::Or => match (&left, &right) {
                (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
                _ => Value::Null,
            },
            // Comparisons with NULL and arithmetic on NULL are NULL
            _ => Value::Null,
        });
    }

    match op {
        BinaryOperator::Add => match (&left, &right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            _ => arithmetic(op, &left, &right, i64::checked_add, |a, b| a + b),
        },
        BinaryOperator::Sub => arithmetic(op, &left, &right, i64::checked_sub, |a, b| a - b),
        BinaryOperator::Mul => arithmetic(op, &left, &right, i64::checked_mul, |a, b| a * b),

        // True division; a zero divisor yields NULL
        BinaryOperator::Div => match (left.as_f64(), right.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Ok(Value::Null),
            (Some(a), Some(b)) => Ok(Value::Float(a / b)),
            _ => Err(invalid_operands(op.as_str(), &left, &right)),
        },

        // Result takes the sign of the divisor; a zero divisor yields NULL
        BinaryOperator::Mod => match (left.as_f64(), right.as_f64()) {
            (Some(_), Some(b)) if b == 0.0 => Ok(Value::Null),
            _ => arithmetic(op, &left, &right, floored_rem, |a, b| ((a % b) + b) % b),
        },

        BinaryOperator::Eq => Ok(Value::Boolean(left.compare(&right) == Some(Ordering::Equal))),
        BinaryOperator::Ne => Ok(Value::Boolean(left.compare(&right) != Some(Ordering::Equal))),
        BinaryOperator::Lt => compare_values(op, &left, &right, |o| o == Ordering::Less),
        BinaryOperator::Le => compare_values(op, &left, &right, |o| o != Ordering::Greater),
        BinaryOperator::Gt => compare_values(op, &left, &right, |o| o == Ordering::Greater),
        BinaryOperator::Ge => compare_values(op, &left, &right, |o| o != Ordering::Less),

        BinaryOperator::And => match (&left, &right) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a && *b)),
            _ => Err(invalid_operands(op.as_str(), &left, &right)),
        },
        BinaryOperator::Or => match (&left, &right) {
            (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(*a || *b)),
            _ => Err(invalid_operands(op.as_str(), &left, &right)),
        },
    }
}

/// Integer arithmetic stays integer (checked); anything else involving a
/// float is computed in floating point.
fn arithmetic(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> ExpressionResult<Value> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => int_op(*a, *b)
            .map(Value::Integer)
            .ok_or_else(|| ExpressionError::Overflow {
                operator: op.as_str().to_string(),
            }),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(invalid_operands(op.as_str(), left, right)),
        },
    }
}

/// Remainder carrying the sign of the divisor. `i64::MIN % -1` overflows.
fn floored_rem(a: i64, b: i64) -> Option<i64> {
    let rem = a.checked_rem(b)?;
    if rem != 0 && (rem < 0) != (b < 0) {
        rem.checked_add(b)
    } else {
        Some(rem)
    }
}

/// Ordering comparisons require comparable operand types
fn compare_values<F>(
    op: BinaryOperator,
    left: &Value,
    right: &Value,
    cmp_fn: F,
) -> ExpressionResult<Value>
where
    F: FnOnce(Ordering) -> bool,
{
    match left.compare(right) {
        Some(ordering) => Ok(Value::Boolean(cmp_fn(ordering))),
        None => Err(invalid_operands(op.as_str(), left, right)),
    }
}

/// Evaluate a unary operation
fn evaluate_unary_op(op: UnaryOperator, operand: Value) -> ExpressionResult<Value> {
    let invalid = |operand: &Value| ExpressionError::InvalidOperandTypes {
        operator: op.as_str().to_string(),
        left_type: operand.data_type(),
        right_type: None,
    };

    match op {
        UnaryOperator::Not => match operand {
            Value::Null => Ok(Value::Null),
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            other => Err(invalid(&other)),
        },

        UnaryOperator::IsNull => Ok(Value::Boolean(operand.is_null())),

        UnaryOperator::IsNotNull => Ok(Value::Boolean(!operand.is_null())),

        UnaryOperator::Plus => match operand {
            Value::Null | Value::Integer(_) | Value::Float(_) => Ok(operand),
            other => Err(invalid(&other)),
        },

        UnaryOperator::Minus => match operand {
            Value::Null => Ok(Value::Null),
            Value::Integer(n) => n
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| ExpressionError::Overflow {
                    operator: op.as_str().to_string(),
                }),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(invalid(&other)),
        },
    }
}

/// Built-in [`Evaluator`]: parses the expression text and evaluates it row by
/// row. Column names are referenced bare (`price * qty`) or backtick-quoted
/// (`` `unit price` * qty ``).
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaEvaluator;

impl FormulaEvaluator {
    pub fn new() -> Self {
        FormulaEvaluator
    }

    /// Evaluate an already parsed expression against every row of `table`
    pub fn evaluate_tree(&self, expr: &Expression, table: &Table) -> ExpressionResult<Vec<Value>> {
        let evaluator = ExpressionEvaluator::bind(table, expr)?;
        (0..table.num_rows())
            .map(|row| evaluator.evaluate(expr, row))
            .collect()
    }
}

impl Evaluator for FormulaEvaluator {
    fn evaluate(&self, expression: &str, table: &Table) -> ExpressionResult<Vec<Value>> {
        let expr = parse_expression(expression)?;
        self.evaluate_tree(&expr, table)
    }

    fn evaluate_predicate(
        &self,
        expression: &str,
        table: &Table,
    ) -> ExpressionResult<Vec<Option<bool>>> {
        self.evaluate(expression, table)?
            .into_iter()
            .map(|value| match value {
                Value::Boolean(b) => Ok(Some(b)),
                Value::Null => Ok(None),
                other => Err(ExpressionError::NotABoolean {
                    expression: expression.to_string(),
                    actual: other.data_type().unwrap_or(crate::table::DataType::Boolean),
                }),
            })
            .collect()
    }
}
