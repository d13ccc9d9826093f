//! `evolution`: compare each row with the row one period earlier.

use crate::error::{StepError, StepResult};
use crate::step::date::{timestamp_cells, to_datetime};
use crate::step::{require_name, require_numeric};
use crate::table::{Column, Table, Value};
use chrono::{Days, Months};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EvolutionType {
    VsLastYear,
    VsLastMonth,
    VsLastWeek,
    VsLastDay,
}

impl EvolutionType {
    /// The timestamp one period before `ms`. Month and year steps clamp to
    /// the end of shorter months (March 31st minus a month is February 28th
    /// or 29th).
    fn previous(&self, ms: i64) -> StepResult<Option<i64>> {
        let dt = to_datetime(ms)?;
        let previous = match self {
            EvolutionType::VsLastYear => dt.checked_sub_months(Months::new(12)),
            EvolutionType::VsLastMonth => dt.checked_sub_months(Months::new(1)),
            EvolutionType::VsLastWeek => dt.checked_sub_days(Days::new(7)),
            EvolutionType::VsLastDay => dt.checked_sub_days(Days::new(1)),
        };
        Ok(previous.map(|dt| dt.timestamp_millis()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionFormat {
    /// `value - previous`
    Abs,
    /// `value / previous - 1`
    Pct,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionStep {
    pub date_col: String,
    pub value_col: String,
    pub evolution_type: EvolutionType,
    pub evolution_format: EvolutionFormat,
    /// Rows are only compared within the same values of these columns
    #[serde(default)]
    pub index_columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column: Option<String>,
}

impl EvolutionStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("dateCol", &self.date_col)?;
        require_name("valueCol", &self.value_col)?;
        for name in &self.index_columns {
            require_name("indexColumns", name)?;
        }
        if let Some(name) = &self.new_column {
            require_name("newColumn", name)?;
        }
        Ok(())
    }

    /// Output column name, `<valueCol>_EVOL_ABS` or `<valueCol>_EVOL_PCT` by default
    pub fn output_column(&self) -> String {
        self.new_column.clone().unwrap_or_else(|| {
            let suffix = match self.evolution_format {
                EvolutionFormat::Abs => "ABS",
                EvolutionFormat::Pct => "PCT",
            };
            format!("{}_EVOL_{}", self.value_col, suffix)
        })
    }

    /// Rows without a row exactly one period earlier (same index values)
    /// get NULL, as do rows where either value is NULL. Two rows sharing a
    /// date and index values are ambiguous and fail the step.
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let dates = timestamp_cells(table.column(&self.date_col)?)?;
        let value_column = table.column(&self.value_col)?;
        require_numeric(value_column)?;
        let values = value_column.values();
        let index_columns = self
            .index_columns
            .iter()
            .map(|name| table.column(name))
            .collect::<StepResult<Vec<_>>>()?;

        let key_at = |row: usize, date: i64| -> (Vec<Value>, i64) {
            let key = index_columns.iter().map(|c| c.values()[row].clone()).collect();
            (key, date)
        };

        let mut by_date: HashMap<(Vec<Value>, i64), usize> = HashMap::new();
        for (row, date) in dates.iter().enumerate() {
            if let Some(date) = date {
                if by_date.insert(key_at(row, *date), row).is_some() {
                    return Err(StepError::evaluation(format!(
                        "several rows share the date {} for the same index in '{}'",
                        Value::Timestamp(*date).render(),
                        self.date_col
                    )));
                }
            }
        }

        let mut output = Vec::with_capacity(table.num_rows());
        for (row, date) in dates.iter().enumerate() {
            let previous_row = match date {
                Some(date) => match self.evolution_type.previous(*date)? {
                    Some(previous) => by_date.get(&key_at(row, previous)).copied(),
                    None => None,
                },
                None => None,
            };
            output.push(match previous_row {
                Some(previous) => self.compare(&values[row], &values[previous]),
                None => Value::Null,
            });
        }

        table.with_column(Column::new(self.output_column(), output))
    }

    fn compare(&self, current: &Value, previous: &Value) -> Value {
        match (self.evolution_format, current, previous) {
            (EvolutionFormat::Abs, Value::Integer(a), Value::Integer(b)) => {
                match a.checked_sub(*b) {
                    Some(diff) => Value::Integer(diff),
                    None => Value::Float(*a as f64 - *b as f64),
                }
            }
            (format, _, _) => match (current.as_f64(), previous.as_f64()) {
                (Some(a), Some(b)) => match format {
                    EvolutionFormat::Abs => Value::Float(a - b),
                    EvolutionFormat::Pct if b == 0.0 => Value::Null,
                    EvolutionFormat::Pct => Value::Float(a / b - 1.0),
                },
                _ => Value::Null,
            },
        }
    }
}
