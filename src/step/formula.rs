//! `formula` and `filter`: steps that delegate to the expression layer.

use crate::condition::Condition;
use crate::error::{StepError, StepResult};
use crate::expression::{clean_formula, Evaluator};
use crate::step::require_name;
use crate::table::{Column, Table};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaStep {
    pub new_column: String,
    pub formula: String,
}

impl FormulaStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("newColumn", &self.new_column)?;
        if self.formula.trim().is_empty() {
            return Err(StepError::validation("formula must not be empty"));
        }
        Ok(())
    }

    pub fn execute(&self, table: &Table, evaluator: &dyn Evaluator) -> StepResult<Table> {
        let values = evaluator.evaluate(&clean_formula(&self.formula), table)?;
        table.with_column(Column::new(self.new_column.clone(), values))
    }
}

/// A filter is either a condition tree or a boolean formula such as
/// `[price] * qty > 100`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterCondition {
    Tree(Condition),
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStep {
    pub condition: FilterCondition,
}

impl FilterStep {
    pub fn validate(&self) -> StepResult<()> {
        match &self.condition {
            FilterCondition::Tree(condition) => condition.validate(),
            FilterCondition::Expression(text) if text.trim().is_empty() => {
                Err(StepError::validation("filter expression must not be empty"))
            }
            FilterCondition::Expression(_) => Ok(()),
        }
    }

    /// Rows where the condition is NULL are dropped.
    pub fn execute(&self, table: &Table, evaluator: &dyn Evaluator) -> StepResult<Table> {
        let mask: Vec<bool> = match &self.condition {
            FilterCondition::Tree(condition) => condition.evaluate(table)?,
            FilterCondition::Expression(text) => evaluator
                .evaluate_predicate(&clean_formula(text), table)?
                .into_iter()
                .map(|keep| keep.unwrap_or(false))
                .collect(),
        };
        let rows: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(row, &keep)| keep.then_some(row))
            .collect();
        Ok(table.take_rows(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::MembershipOperator;
    use crate::expression::FormulaEvaluator;
    use crate::table::Value;

    fn sample() -> Table {
        Table::from_pairs(vec![
            ("label", vec![Value::from("a"), Value::from("b"), Value::from("c")]),
            ("unit price", vec![Value::Integer(10), Value::Null, Value::Integer(30)]),
            ("qty", vec![Value::Integer(2), Value::Integer(3), Value::Integer(4)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_formula_with_bracketed_column() {
        let step = FormulaStep {
            new_column: "total".to_string(),
            formula: "[unit price] * qty".to_string(),
        };
        let result = step.execute(&sample(), &FormulaEvaluator::new()).unwrap();
        assert_eq!(
            result.column("total").unwrap().values(),
            &[Value::Integer(20), Value::Null, Value::Integer(120)]
        );
    }

    #[test]
    fn test_formula_unknown_column() {
        let step = FormulaStep {
            new_column: "total".to_string(),
            formula: "price * qty".to_string(),
        };
        assert!(matches!(
            step.execute(&sample(), &FormulaEvaluator::new()),
            Err(StepError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_filter_condition_tree() {
        let step = FilterStep {
            condition: FilterCondition::Tree(Condition::membership(
                "label",
                MembershipOperator::In,
                vec![Value::from("a"), Value::from("c")],
            )),
        };
        let result = step.execute(&sample(), &FormulaEvaluator::new()).unwrap();
        assert_eq!(result.num_rows(), 2);
        assert_eq!(
            result.column("qty").unwrap().values(),
            &[Value::Integer(2), Value::Integer(4)]
        );
    }

    #[test]
    fn test_filter_expression_drops_nulls() {
        let step = FilterStep {
            condition: FilterCondition::Expression("[unit price] * qty > 50".to_string()),
        };
        let result = step.execute(&sample(), &FormulaEvaluator::new()).unwrap();
        assert_eq!(result.column("label").unwrap().values(), &[Value::from("c")]);
    }
}
