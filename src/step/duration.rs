//! `duration`: elapsed time between two timestamp columns.

use crate::error::{StepError, StepResult};
use crate::step::date::timestamp_cells;
use crate::step::require_name;
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl DurationUnit {
    fn millis(&self) -> f64 {
        match self {
            DurationUnit::Seconds => 1_000.0,
            DurationUnit::Minutes => 60_000.0,
            DurationUnit::Hours => 3_600_000.0,
            DurationUnit::Days => 86_400_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStep {
    pub new_column_name: String,
    pub start_date_column: String,
    pub end_date_column: String,
    pub duration_in: DurationUnit,
}

impl DurationStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("newColumnName", &self.new_column_name)?;
        require_name("startDateColumn", &self.start_date_column)?;
        require_name("endDateColumn", &self.end_date_column)
    }

    /// `end - start` as a float in the requested unit; NULL if either side is NULL
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let start = timestamp_cells(table.column(&self.start_date_column)?)?;
        let end = timestamp_cells(table.column(&self.end_date_column)?)?;
        let unit = self.duration_in.millis();
        let values = start
            .iter()
            .zip(&end)
            .map(|(s, e)| match (s, e) {
                (Some(s), Some(e)) => e
                    .checked_sub(*s)
                    .map(|elapsed| Value::Float(elapsed as f64 / unit))
                    .ok_or_else(|| {
                        StepError::evaluation(format!(
                            "duration between {} and {} overflows",
                            s, e
                        ))
                    }),
                _ => Ok(Value::Null),
            })
            .collect::<StepResult<Vec<_>>>()?;
        table.with_column(Column::new(self.new_column_name.clone(), values))
    }
}
