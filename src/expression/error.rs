//! Error types for expression evaluation.

use crate::table::DataType;
use std::fmt;

/// Errors that can occur while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// Expression text could not be tokenized or parsed
    Parse { expression: String, reason: String },

    /// Expression references a column the table does not have
    UnknownColumn { name: String },

    /// Invalid operand types for operator
    InvalidOperandTypes {
        operator: String,
        left_type: Option<DataType>,
        right_type: Option<DataType>,
    },

    /// Integer arithmetic overflowed
    Overflow { operator: String },

    /// A predicate produced something other than a boolean
    NotABoolean { expression: String, actual: DataType },
}

impl ExpressionError {
    pub(crate) fn parse(expression: &str, reason: impl Into<String>) -> Self {
        ExpressionError::Parse {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionError::Parse { expression, reason } => {
                write!(f, "Cannot parse expression '{}': {}", expression, reason)
            }

            ExpressionError::UnknownColumn { name } => {
                write!(f, "Unknown column: {}", name)
            }

            ExpressionError::InvalidOperandTypes {
                operator,
                left_type,
                right_type,
            } => {
                write!(
                    f,
                    "Invalid operand types for operator {}: left={:?}, right={:?}",
                    operator, left_type, right_type
                )
            }

            ExpressionError::Overflow { operator } => {
                write!(f, "Integer overflow in operator {}", operator)
            }

            ExpressionError::NotABoolean { expression, actual } => {
                write!(
                    f,
                    "Predicate '{}' produced {} values instead of booleans",
                    expression, actual
                )
            }
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
