//! `ifthenelse`: derive a column by choosing, row by row, between two
//! branches. The `else` branch may itself be another if/then/else node,
//! which gives else-if chains of any (finite) depth.

use crate::condition::Condition;
use crate::error::StepResult;
use crate::expression::{clean_formula, is_literal_string, strip_literal_quotes, Evaluator};
use crate::step::require_name;
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};

/// A `then` value or a terminal `else` value.
///
/// Text is a double-quoted string literal (`"high"`, broadcast with the
/// quotes removed) or a formula evaluated against the table. JSON numbers,
/// booleans and null are broadcast as constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Text(String),
    Constant(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElseBranch {
    Nested(Box<IfThenElse>),
    Operand(Operand),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfThenElse {
    #[serde(rename = "if")]
    pub condition: Condition,
    pub then: Operand,
    #[serde(rename = "else")]
    pub else_value: ElseBranch,
}

impl IfThenElse {
    pub fn validate(&self) -> StepResult<()> {
        self.condition.validate()?;
        match &self.else_value {
            ElseBranch::Nested(node) => node.validate(),
            ElseBranch::Operand(_) => Ok(()),
        }
    }

    /// Resolve this node to one value per row of `table`
    pub fn resolve(&self, table: &Table, evaluator: &dyn Evaluator) -> StepResult<Vec<Value>> {
        let else_values = match &self.else_value {
            ElseBranch::Nested(node) => node.resolve(table, evaluator)?,
            ElseBranch::Operand(operand) => operand.resolve(table, evaluator)?,
        };
        let then_values = self.then.resolve(table, evaluator)?;
        let mask = self.condition.evaluate(table)?;

        Ok(mask
            .into_iter()
            .zip(then_values.into_iter().zip(else_values))
            .map(|(take_then, (then_value, else_value))| {
                if take_then {
                    then_value
                } else {
                    else_value
                }
            })
            .collect())
    }
}

impl Operand {
    fn resolve(&self, table: &Table, evaluator: &dyn Evaluator) -> StepResult<Vec<Value>> {
        let rows = table.num_rows();
        match self {
            Operand::Text(text) if is_literal_string(text) => Ok(vec![
                Value::String(strip_literal_quotes(text).to_string());
                rows
            ]),
            Operand::Text(formula) => Ok(evaluator.evaluate(&clean_formula(formula), table)?),
            Operand::Constant(value) => Ok(vec![value.clone(); rows]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IfthenelseStep {
    pub new_column: String,
    #[serde(flatten)]
    pub branch: IfThenElse,
}

impl IfthenelseStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("newColumn", &self.new_column)?;
        self.branch.validate()
    }

    pub fn execute(&self, table: &Table, evaluator: &dyn Evaluator) -> StepResult<Table> {
        let values = self.branch.resolve(table, evaluator)?;
        table.with_column(Column::new(self.new_column.clone(), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{ComparisonOperator, NullOperator};
    use crate::error::StepError;
    use crate::expression::FormulaEvaluator;

    fn table() -> Table {
        Table::from_pairs(vec![
            ("value", vec![Value::Integer(5), Value::Integer(15), Value::Null]),
            ("unit price", vec![Value::Integer(2), Value::Integer(3), Value::Integer(4)]),
        ])
        .unwrap()
    }

    fn gt(threshold: i64) -> Condition {
        Condition::comparison("value", ComparisonOperator::Gt, threshold)
    }

    #[test]
    fn test_literal_branches() {
        let step = IfthenelseStep {
            new_column: "size".to_string(),
            branch: IfThenElse {
                condition: gt(10),
                then: Operand::Text("\"high\"".to_string()),
                else_value: ElseBranch::Operand(Operand::Text("\"low\"".to_string())),
            },
        };
        let result = step.execute(&table(), &FormulaEvaluator::new()).unwrap();
        assert_eq!(
            result.column("size").unwrap().values(),
            &[Value::from("low"), Value::from("high"), Value::from("low")]
        );
    }

    #[test]
    fn test_formula_branches_and_else_if_chain() {
        let step = IfthenelseStep {
            new_column: "value".to_string(),
            branch: IfThenElse {
                condition: gt(10),
                then: Operand::Text("value * [unit price]".to_string()),
                else_value: ElseBranch::Nested(Box::new(IfThenElse {
                    condition: Condition::null_check("value", NullOperator::IsNull),
                    then: Operand::Constant(Value::Integer(0)),
                    else_value: ElseBranch::Operand(Operand::Text("value - 1".to_string())),
                })),
            },
        };
        let result = step.execute(&table(), &FormulaEvaluator::new()).unwrap();
        // Overwrites the existing column in place
        assert_eq!(result.column_names(), vec!["value", "unit price"]);
        assert_eq!(
            result.column("value").unwrap().values(),
            &[Value::Integer(4), Value::Integer(45), Value::Integer(0)]
        );
    }

    #[test]
    fn test_always_true_and_always_false() {
        let evaluator = FormulaEvaluator::new();
        let else_chain = ElseBranch::Nested(Box::new(IfThenElse {
            condition: gt(100),
            then: Operand::Text("\"huge\"".to_string()),
            else_value: ElseBranch::Operand(Operand::Text("\"small\"".to_string())),
        }));
        let node = |condition| IfThenElse {
            condition,
            then: Operand::Text("value + 1".to_string()),
            else_value: else_chain.clone(),
        };

        let always = node(Condition::null_check("unit price", NullOperator::NotNull));
        assert_eq!(
            always.resolve(&table(), &evaluator).unwrap(),
            evaluator.evaluate("value + 1", &table()).unwrap()
        );

        let never = node(Condition::null_check("unit price", NullOperator::IsNull));
        assert_eq!(
            never.resolve(&table(), &evaluator).unwrap(),
            vec![Value::from("small"); 3]
        );
    }

    #[test]
    fn test_errors_propagate() {
        let evaluator = FormulaEvaluator::new();
        let node = IfThenElse {
            condition: gt(10),
            then: Operand::Text("missing * 2".to_string()),
            else_value: ElseBranch::Operand(Operand::Constant(Value::Null)),
        };
        assert!(matches!(
            node.resolve(&table(), &evaluator),
            Err(StepError::ColumnNotFound { .. })
        ));

        let node = IfThenElse {
            condition: gt(10),
            then: Operand::Text("value +".to_string()),
            else_value: ElseBranch::Operand(Operand::Constant(Value::Null)),
        };
        assert!(matches!(
            node.resolve(&table(), &evaluator),
            Err(StepError::Evaluation { .. })
        ));
    }

    #[test]
    fn test_deserialize_nested() {
        let json = r#"{
            "newColumn": "grade",
            "if": {"column": "value", "operator": "gt", "value": 10},
            "then": "\"high\"",
            "else": {
                "if": {"column": "value", "operator": "isnull"},
                "then": 0,
                "else": "value * 2"
            }
        }"#;
        let step: IfthenelseStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.new_column, "grade");
        match &step.branch.else_value {
            ElseBranch::Nested(node) => {
                assert_eq!(node.then, Operand::Constant(Value::Integer(0)));
                assert_eq!(
                    node.else_value,
                    ElseBranch::Operand(Operand::Text("value * 2".to_string()))
                );
            }
            other => panic!("expected nested branch, got {:?}", other),
        }
    }
}
