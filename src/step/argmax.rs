//! `argmax` / `argmin`: keep the rows holding the extreme value of a column.

use crate::error::{StepError, StepResult};
use crate::step::grouping::group_rows;
use crate::step::require_name;
use crate::table::{Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgmaxStep {
    pub column: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgminStep {
    pub column: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl ArgmaxStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        keep_extreme_rows(table, &self.column, &self.groups, Ordering::Greater)
    }
}

impl ArgminStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        keep_extreme_rows(table, &self.column, &self.groups, Ordering::Less)
    }
}

/// Keep, for every group, all rows whose `column` value equals the group's
/// extreme. `wanted` is the ordering a candidate must have against the
/// current best to replace it. NULL cells never win; a group made only of
/// NULLs contributes no rows.
fn keep_extreme_rows(
    table: &Table,
    column: &str,
    groups: &[String],
    wanted: Ordering,
) -> StepResult<Table> {
    let values = table.column(column)?.values();
    check_comparable(column, values)?;

    let mut kept = Vec::new();
    for rows in group_rows(table, groups)? {
        let mut best: Option<&Value> = None;
        for &row in &rows {
            let candidate = &values[row];
            if candidate.is_null() {
                continue;
            }
            match best {
                None => best = Some(candidate),
                Some(current) if candidate.compare(current) == Some(wanted) => {
                    best = Some(candidate)
                }
                Some(_) => {}
            }
        }
        if let Some(best) = best {
            kept.extend(
                rows.iter()
                    .copied()
                    .filter(|&row| values[row].compare(best) == Some(Ordering::Equal)),
            );
        }
    }

    Ok(table.take_rows(&kept))
}

/// Every non-null cell must be comparable with every other one
fn check_comparable(column: &str, values: &[Value]) -> StepResult<()> {
    let mut non_null = values.iter().filter(|v| !v.is_null());
    if let Some(first) = non_null.next() {
        for value in non_null {
            if first.compare(value).is_none() {
                return Err(StepError::TypeMismatch {
                    column: column.to_string(),
                    expected: first.data_type().map(|t| t.to_string()).unwrap_or_default(),
                    actual: value.data_type().map(|t| t.to_string()).unwrap_or_default(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let labels: Vec<Value> = ["label1", "label2", "label3", "label4", "label5", "label6"]
            .into_iter()
            .map(Value::from)
            .collect();
        let groups: Vec<Value> = ["group 1", "group 1", "group 1", "group 2", "group 2", "group 2"]
            .into_iter()
            .map(Value::from)
            .collect();
        let values: Vec<Value> = [13i64, 7, 20, 1, 10, 5].into_iter().map(Value::from).collect();
        Table::from_pairs(vec![("label", labels), ("group", groups), ("value", values)]).unwrap()
    }

    #[test]
    fn test_simple_argmax() {
        let step = ArgmaxStep {
            column: "value".to_string(),
            groups: vec![],
        };
        let result = step.execute(&sample()).unwrap();
        assert_eq!(result.num_rows(), 1);
        assert_eq!(
            result.row(0),
            vec![Value::from("label3"), Value::from("group 1"), Value::Integer(20)]
        );
    }

    #[test]
    fn test_argmax_with_group() {
        let step = ArgmaxStep {
            column: "value".to_string(),
            groups: vec!["group".to_string()],
        };
        let result = step.execute(&sample()).unwrap();
        let expected = Table::from_pairs(vec![
            ("label", vec![Value::from("label3"), Value::from("label5")]),
            ("group", vec![Value::from("group 1"), Value::from("group 2")]),
            ("value", vec![Value::Integer(20), Value::Integer(10)]),
        ])
        .unwrap();
        assert_eq!(result, expected);
    }

    #[test]
    fn test_argmin_with_group() {
        let step = ArgminStep {
            column: "value".to_string(),
            groups: vec!["group".to_string()],
        };
        let result = step.execute(&sample()).unwrap();
        assert_eq!(
            result.column("label").unwrap().values(),
            &[Value::from("label2"), Value::from("label4")]
        );
    }

    #[test]
    fn test_ties_are_all_kept() {
        let table = Table::from_pairs(vec![
            ("id", vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
            ("score", vec![Value::Float(2.0), Value::Integer(1), Value::Integer(2)]),
        ])
        .unwrap();
        let step = ArgmaxStep {
            column: "score".to_string(),
            groups: vec![],
        };
        let result = step.execute(&table).unwrap();
        assert_eq!(
            result.column("id").unwrap().values(),
            &[Value::Integer(1), Value::Integer(3)]
        );
    }

    #[test]
    fn test_nulls_never_win() {
        let table = Table::from_pairs(vec![
            ("g", vec![Value::from("a"), Value::from("a"), Value::from("b")]),
            ("v", vec![Value::Null, Value::Integer(3), Value::Null]),
        ])
        .unwrap();
        let step = ArgminStep {
            column: "v".to_string(),
            groups: vec!["g".to_string()],
        };
        let result = step.execute(&table).unwrap();
        assert_eq!(result.num_rows(), 1);
        assert_eq!(result.row(0), vec![Value::from("a"), Value::Integer(3)]);
    }

    #[test]
    fn test_errors() {
        let step = ArgmaxStep {
            column: "missing".to_string(),
            groups: vec![],
        };
        assert!(matches!(
            step.execute(&sample()),
            Err(StepError::ColumnNotFound { .. })
        ));

        let mixed = Table::from_pairs(vec![("v", vec![Value::Integer(1), Value::from("x")])])
            .unwrap();
        let step = ArgmaxStep {
            column: "v".to_string(),
            groups: vec![],
        };
        assert!(matches!(
            step.execute(&mixed),
            Err(StepError::TypeMismatch { .. })
        ));
    }
}
