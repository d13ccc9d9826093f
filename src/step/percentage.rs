//! `percentage`: share of each row's value in its group total.

use crate::error::StepResult;
use crate::step::grouping::group_rows;
use crate::step::{require_name, require_numeric};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentageStep {
    pub column: String,
    #[serde(default)]
    pub group: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_name: Option<String>,
}

impl PercentageStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)
    }

    /// Name of the produced column (`<column>_PCT` by default)
    pub fn output_column(&self) -> String {
        self.new_column_name
            .clone()
            .unwrap_or_else(|| format!("{}_PCT", self.column))
    }

    /// Ratios are floats in `[0, 1]` for non-negative data. NULL cells are
    /// left out of the group total and produce NULL; a group whose total is
    /// zero produces NULL for every row.
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let column = table.column(&self.column)?;
        require_numeric(column)?;

        let mut result = vec![Value::Null; table.num_rows()];
        for rows in group_rows(table, &self.group)? {
            let total: f64 = rows
                .iter()
                .filter_map(|&row| column.values()[row].as_f64())
                .sum();
            if total == 0.0 {
                continue;
            }
            for row in rows {
                if let Some(value) = column.values()[row].as_f64() {
                    result[row] = Value::Float(value / total);
                }
            }
        }

        table.with_column(Column::new(self.output_column(), result))
    }
}
