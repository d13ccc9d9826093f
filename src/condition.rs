//! Row predicates used by `filter` and `ifthenelse` steps.
//!
//! A condition is a finite tree: `and`/`or` nodes own their children, leaves
//! test one column against a literal, a set of literals, or NULL.
//! Evaluation always produces one boolean per row; NULL cells never satisfy
//! a leaf except through `ne`, `nin` and `isnull`.

use crate::error::{StepError, StepResult};
use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOperator {
    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonOperator::Eq => ordering == Ordering::Equal,
            ComparisonOperator::Ne => ordering != Ordering::Equal,
            ComparisonOperator::Lt => ordering == Ordering::Less,
            ComparisonOperator::Le => ordering != Ordering::Greater,
            ComparisonOperator::Gt => ordering == Ordering::Greater,
            ComparisonOperator::Ge => ordering != Ordering::Less,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipOperator {
    In,
    Nin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullOperator {
    IsNull,
    NotNull,
}

/// `column <operator> value`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub value: Value,
}

/// `column in [values]` / `column not in [values]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipCondition {
    pub column: String,
    pub operator: MembershipOperator,
    pub value: Vec<Value>,
}

/// `column is null` / `column is not null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NullCondition {
    pub column: String,
    pub operator: NullOperator,
}

/// A predicate tree over table rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    And { and: Vec<Condition> },
    Or { or: Vec<Condition> },
    Comparison(ComparisonCondition),
    Membership(MembershipCondition),
    Null(NullCondition),
}

impl Condition {
    pub fn comparison(
        column: impl Into<String>,
        operator: ComparisonOperator,
        value: impl Into<Value>,
    ) -> Self {
        Condition::Comparison(ComparisonCondition {
            column: column.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn membership(
        column: impl Into<String>,
        operator: MembershipOperator,
        value: Vec<Value>,
    ) -> Self {
        Condition::Membership(MembershipCondition {
            column: column.into(),
            operator,
            value,
        })
    }

    pub fn null_check(column: impl Into<String>, operator: NullOperator) -> Self {
        Condition::Null(NullCondition {
            column: column.into(),
            operator,
        })
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And { and: conditions }
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or { or: conditions }
    }

    /// Structural checks done when the owning step is built
    pub fn validate(&self) -> StepResult<()> {
        match self {
            Condition::And { and: children } | Condition::Or { or: children } => {
                if children.len() < 2 {
                    return Err(StepError::validation(
                        "logical conditions need at least two nested conditions",
                    ));
                }
                children.iter().try_for_each(Condition::validate)
            }
            Condition::Comparison(ComparisonCondition { column, .. })
            | Condition::Membership(MembershipCondition { column, .. })
            | Condition::Null(NullCondition { column, .. }) => {
                if column.is_empty() {
                    return Err(StepError::validation("condition column must not be empty"));
                }
                Ok(())
            }
        }
    }

    /// Evaluate to one boolean per row of `table`
    pub fn evaluate(&self, table: &Table) -> StepResult<Vec<bool>> {
        match self {
            Condition::And { and } => combine(and, table, true, |acc, b| acc && b),
            Condition::Or { or } => combine(or, table, false, |acc, b| acc || b),
            Condition::Comparison(cond) => cond.evaluate(table),
            Condition::Membership(cond) => cond.evaluate(table),
            Condition::Null(cond) => {
                let column = table.column(&cond.column)?;
                Ok(column
                    .values()
                    .iter()
                    .map(|v| match cond.operator {
                        NullOperator::IsNull => v.is_null(),
                        NullOperator::NotNull => !v.is_null(),
                    })
                    .collect())
            }
        }
    }
}

/// Every child is evaluated in full, no short-circuit across children
fn combine(
    children: &[Condition],
    table: &Table,
    init: bool,
    op: fn(bool, bool) -> bool,
) -> StepResult<Vec<bool>> {
    let mut result = vec![init; table.num_rows()];
    for child in children {
        let mask = child.evaluate(table)?;
        for (acc, b) in result.iter_mut().zip(mask) {
            *acc = op(*acc, b);
        }
    }
    Ok(result)
}

fn type_mismatch(column: &str, expected: &Value, actual: &Value) -> StepError {
    let name = |v: &Value| {
        v.data_type()
            .map(|t| t.to_string())
            .unwrap_or_else(|| "null".to_string())
    };
    StepError::TypeMismatch {
        column: column.to_string(),
        expected: name(expected),
        actual: name(actual),
    }
}

impl ComparisonCondition {
    fn evaluate(&self, table: &Table) -> StepResult<Vec<bool>> {
        let column = table.column(&self.column)?;
        column
            .values()
            .iter()
            .map(|cell| {
                if cell.is_null() || self.value.is_null() {
                    return Ok(self.operator == ComparisonOperator::Ne);
                }
                cell.compare(&self.value)
                    .map(|ordering| self.operator.holds(ordering))
                    .ok_or_else(|| type_mismatch(&self.column, &self.value, cell))
            })
            .collect()
    }
}

impl MembershipCondition {
    fn evaluate(&self, table: &Table) -> StepResult<Vec<bool>> {
        let column = table.column(&self.column)?;
        let literals: Vec<&Value> = self.value.iter().filter(|v| !v.is_null()).collect();
        column
            .values()
            .iter()
            .map(|cell| {
                let found = if cell.is_null() {
                    false
                } else {
                    let mut comparable = false;
                    let mut found = false;
                    for literal in &literals {
                        if let Some(ordering) = cell.compare(literal) {
                            comparable = true;
                            found |= ordering == Ordering::Equal;
                        }
                    }
                    if !comparable && !literals.is_empty() {
                        return Err(type_mismatch(&self.column, literals[0], cell));
                    }
                    found
                };
                Ok(match self.operator {
                    MembershipOperator::In => found,
                    MembershipOperator::Nin => !found,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_pairs(vec![
            (
                "value",
                vec![Value::Integer(5), Value::Integer(15), Value::Null, Value::Float(10.0)],
            ),
            (
                "label",
                vec![Value::from("a"), Value::from("b"), Value::from("c"), Value::Null],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_comparison() {
        let table = sample();
        let gt = Condition::comparison("value", ComparisonOperator::Gt, 10);
        assert_eq!(gt.evaluate(&table).unwrap(), vec![false, true, false, false]);

        let ge = Condition::comparison("value", ComparisonOperator::Ge, 10);
        assert_eq!(ge.evaluate(&table).unwrap(), vec![false, true, false, true]);

        let ne = Condition::comparison("value", ComparisonOperator::Ne, 5);
        assert_eq!(ne.evaluate(&table).unwrap(), vec![false, true, true, true]);
    }

    #[test]
    fn test_membership() {
        let table = sample();
        let cond = Condition::membership(
            "label",
            MembershipOperator::In,
            vec![Value::from("a"), Value::from("c")],
        );
        assert_eq!(cond.evaluate(&table).unwrap(), vec![true, false, true, false]);

        let cond = Condition::membership(
            "label",
            MembershipOperator::Nin,
            vec![Value::from("a"), Value::from("c")],
        );
        assert_eq!(cond.evaluate(&table).unwrap(), vec![false, true, false, true]);
    }

    #[test]
    fn test_null_check() {
        let table = sample();
        let cond = Condition::null_check("value", NullOperator::IsNull);
        assert_eq!(cond.evaluate(&table).unwrap(), vec![false, false, true, false]);
        let cond = Condition::null_check("label", NullOperator::NotNull);
        assert_eq!(cond.evaluate(&table).unwrap(), vec![true, true, true, false]);
    }

    #[test]
    fn test_logical_combination() {
        let table = sample();
        let cond = Condition::or(vec![
            Condition::comparison("value", ComparisonOperator::Lt, 6),
            Condition::and(vec![
                Condition::null_check("label", NullOperator::IsNull),
                Condition::comparison("value", ComparisonOperator::Eq, 10),
            ]),
        ]);
        assert_eq!(cond.evaluate(&table).unwrap(), vec![true, false, false, true]);
    }

    #[test]
    fn test_errors() {
        let table = sample();
        let missing = Condition::comparison("nope", ComparisonOperator::Eq, 1);
        assert!(matches!(
            missing.evaluate(&table),
            Err(StepError::ColumnNotFound { .. })
        ));

        let mismatch = Condition::comparison("label", ComparisonOperator::Eq, 1);
        assert!(matches!(
            mismatch.evaluate(&table),
            Err(StepError::TypeMismatch { .. })
        ));

        let mismatch = Condition::membership("value", MembershipOperator::In, vec![Value::from("x")]);
        assert!(matches!(
            mismatch.evaluate(&table),
            Err(StepError::TypeMismatch { .. })
        ));

        // A failing child fails the whole tree even if another child settles the result
        let cond = Condition::or(vec![
            Condition::comparison("value", ComparisonOperator::Gt, 0),
            Condition::comparison("nope", ComparisonOperator::Eq, 1),
        ]);
        assert!(cond.evaluate(&table).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(Condition::and(vec![Condition::null_check("a", NullOperator::IsNull)])
            .validate()
            .is_err());
        assert!(Condition::comparison("", ComparisonOperator::Eq, 1)
            .validate()
            .is_err());
        assert!(Condition::or(vec![
            Condition::null_check("a", NullOperator::IsNull),
            Condition::null_check("b", NullOperator::IsNull),
        ])
        .validate()
        .is_ok());
    }

    #[test]
    fn test_deserialize_tree() {
        let json = r#"{
            "and": [
                {"column": "value", "operator": "gt", "value": 10},
                {"or": [
                    {"column": "label", "operator": "in", "value": ["a", "b"]},
                    {"column": "label", "operator": "isnull"}
                ]}
            ]
        }"#;
        let cond: Condition = serde_json::from_str(json).unwrap();
        assert_eq!(
            cond,
            Condition::and(vec![
                Condition::comparison("value", ComparisonOperator::Gt, 10),
                Condition::or(vec![
                    Condition::membership(
                        "label",
                        MembershipOperator::In,
                        vec![Value::from("a"), Value::from("b")]
                    ),
                    Condition::null_check("label", NullOperator::IsNull),
                ]),
            ])
        );
    }
}
