//! `cumsum`: running total of a column, restarted for every group.

use crate::error::{StepError, StepResult};
use crate::step::grouping::group_rows;
use crate::step::{require_name, require_numeric};
use crate::table::{Column, DataType, Table, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumSumStep {
    pub value_column: String,
    #[serde(default)]
    pub groupby: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column: Option<String>,
}

impl CumSumStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("valueColumn", &self.value_column)
    }

    /// Name of the produced column (`<valueColumn>_CUMSUM` by default)
    pub fn output_column(&self) -> String {
        self.new_column
            .clone()
            .unwrap_or_else(|| format!("{}_CUMSUM", self.value_column))
    }

    /// NULL cells produce NULL and leave the running total unchanged.
    /// Integer columns stay integer; any float turns the result into floats.
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let column = table.column(&self.value_column)?;
        let types = require_numeric(column)?;
        let as_float = types.contains(&DataType::Float);

        let mut result = vec![Value::Null; table.num_rows()];
        for rows in group_rows(table, &self.groupby)? {
            let mut int_total: i64 = 0;
            let mut float_total: f64 = 0.0;
            for row in rows {
                let cell = &column.values()[row];
                result[row] = match cell {
                    Value::Null => Value::Null,
                    Value::Integer(n) if !as_float => {
                        int_total = int_total.checked_add(*n).ok_or_else(|| {
                            StepError::evaluation(format!(
                                "integer overflow in running sum of '{}'",
                                self.value_column
                            ))
                        })?;
                        Value::Integer(int_total)
                    }
                    other => {
                        float_total += other.as_f64().unwrap_or(0.0);
                        Value::Float(float_total)
                    }
                };
            }
        }

        table.with_column(Column::new(self.output_column(), result))
    }
}
