//! Expression evaluation for formulas and predicates.
//!
//! This module provides:
//! - The [`Evaluator`] capability steps use to compute derived columns
//! - A built-in implementation ([`FormulaEvaluator`]): lexer, parser,
//!   expression tree and row-wise evaluation
//! - Formula string helpers (literal detection, bracket cleaning)

pub mod error;
pub mod eval;
pub mod expr;
pub mod formula;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod token;

pub use error::{ExpressionError, ExpressionResult};
pub use eval::{ExpressionEvaluator, FormulaEvaluator};
pub use expr::Expression;
pub use formula::{clean_formula, is_literal_string, strip_literal_quotes};
pub use operator::{BinaryOperator, UnaryOperator};
pub use parser::parse_expression;

use crate::table::{Table, Value};

/// Computes expressions against a whole table.
///
/// Both methods return one entry per table row. Column names are referenced
/// directly inside the expression text.
pub trait Evaluator: Send + Sync {
    /// Evaluate an arithmetic or string expression
    fn evaluate(&self, expression: &str, table: &Table) -> ExpressionResult<Vec<Value>>;

    /// Evaluate a predicate; `None` marks rows where the result is NULL
    fn evaluate_predicate(
        &self,
        expression: &str,
        table: &Table,
    ) -> ExpressionResult<Vec<Option<bool>>>;
}
