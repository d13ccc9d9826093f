//! Error types for step construction and execution.

use crate::expression::ExpressionError;
use thiserror::Error;

/// Errors raised while validating or executing a single step.
///
/// Every variant is terminal for the pipeline run that produced it. Steps are
/// pure functions of their input, so nothing is ever retried.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Invalid step definition: {0}")]
    Validation(String),

    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Type mismatch on column {column}: expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },

    #[error("Domain not found: {domain}")]
    DomainNotFound { domain: String },

    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    #[error("Nested pipeline failed: {0}")]
    NestedPipeline(Box<PipelineError>),
}

/// Coarse classification of a [`StepError`], for callers that only need to
/// branch on the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    ColumnNotFound,
    TypeMismatch,
    DomainNotFound,
    Evaluation,
}

impl StepError {
    pub fn validation(message: impl Into<String>) -> Self {
        StepError::Validation(message.into())
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        StepError::ColumnNotFound {
            column: column.into(),
        }
    }

    pub fn evaluation(message: impl Into<String>) -> Self {
        StepError::Evaluation {
            message: message.into(),
        }
    }

    /// Nested pipeline failures report the kind of their root cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Validation(_) => ErrorKind::Validation,
            StepError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            StepError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            StepError::DomainNotFound { .. } => ErrorKind::DomainNotFound,
            StepError::Evaluation { .. } => ErrorKind::Evaluation,
            StepError::NestedPipeline(inner) => inner.source.kind(),
        }
    }
}

impl From<ExpressionError> for StepError {
    fn from(err: ExpressionError) -> Self {
        match err {
            ExpressionError::UnknownColumn { name } => StepError::ColumnNotFound { column: name },
            other => StepError::Evaluation {
                message: other.to_string(),
            },
        }
    }
}

/// Structured failure of a pipeline run: which step failed and why.
#[derive(Error, Debug)]
#[error("Step {index} ({step}) failed: {source}")]
pub struct PipelineError {
    /// Position of the failing step in the pipeline (0-based)
    pub index: usize,
    /// Name tag of the failing step
    pub step: &'static str,
    #[source]
    pub source: StepError,
}

impl PipelineError {
    pub fn new(index: usize, step: &'static str, source: StepError) -> Self {
        Self {
            index,
            step,
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Result type for step operations
pub type StepResult<T> = Result<T, StepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StepError::column_not_found("price");
        assert_eq!(err.to_string(), "Column not found: price");

        let err = StepError::TypeMismatch {
            column: "price".to_string(),
            expected: "string".to_string(),
            actual: "integer".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch on column price: expected string, got integer"
        );

        let err = PipelineError::new(2, "argmax", StepError::column_not_found("value"));
        assert_eq!(
            err.to_string(),
            "Step 2 (argmax) failed: Column not found: value"
        );
    }

    #[test]
    fn test_nested_kind_is_root_cause() {
        let inner = PipelineError::new(
            0,
            "domain",
            StepError::DomainNotFound {
                domain: "sales".to_string(),
            },
        );
        let err = StepError::NestedPipeline(Box::new(inner));
        assert_eq!(err.kind(), ErrorKind::DomainNotFound);
    }

    #[test]
    fn test_expression_error_conversion() {
        let err: StepError = ExpressionError::UnknownColumn {
            name: "x".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ColumnNotFound);

        let err: StepError = ExpressionError::Overflow {
            operator: "*".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Evaluation);
    }
}
