//! `aggregate`: hash aggregation over group keys.
//!
//! This module supports:
//! - Multiple grouping columns (or none, to aggregate the whole table)
//! - Several aggregations per step, each over one or more columns
//! - SUM, AVG, COUNT, MIN, MAX, FIRST and LAST, all ignoring NULLs
//! - Keeping the original granularity, broadcasting group results back to
//!   every row of the group

use crate::error::{StepError, StepResult};
use crate::step::grouping::group_rows;
use crate::step::{require_name, require_names};
use crate::table::{Column, DataType, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Supported aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    /// Sum of numeric values
    Sum,
    /// Average of numeric values, always a float
    Avg,
    /// Number of non-NULL values
    Count,
    Min,
    Max,
    /// First non-NULL value in row order
    First,
    /// Last non-NULL value in row order
    Last,
}

impl AggregateFunction {
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Avg => "avg",
            AggregateFunction::Count => "count",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::First => "first",
            AggregateFunction::Last => "last",
        }
    }

    /// SUM and AVG only accept numeric columns
    pub(crate) fn check_input(&self, column: &Column) -> StepResult<()> {
        if !matches!(self, AggregateFunction::Sum | AggregateFunction::Avg) {
            return Ok(());
        }
        match column.data_types().into_iter().find(|t| !t.is_numeric()) {
            Some(bad) => Err(StepError::TypeMismatch {
                column: column.name().to_string(),
                expected: DataType::Float.to_string(),
                actual: bad.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Aggregate the given rows of `column`
    pub(crate) fn apply(&self, column: &Column, rows: &[usize]) -> StepResult<Value> {
        let mut state = AggregateState::default();
        for &row in rows {
            state.update(&column.values()[row], *self)?;
        }
        Ok(state.finalize(*self))
    }
}

/// One aggregate function applied to `columns`, producing `newcolumns`
/// (same length, paired by position)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub columns: Vec<String>,
    pub aggfunction: AggregateFunction,
    pub newcolumns: Vec<String>,
}

impl Aggregation {
    pub(crate) fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)?;
        if self.columns.len() != self.newcolumns.len() {
            return Err(StepError::validation(format!(
                "{} aggregation has {} columns but {} new column names",
                self.aggfunction.name(),
                self.columns.len(),
                self.newcolumns.len()
            )));
        }
        self.newcolumns
            .iter()
            .try_for_each(|name| require_name("newcolumns", name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStep {
    #[serde(default)]
    pub on: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    #[serde(default)]
    pub keep_original_granularity: bool,
}

/// Running state of one aggregate over one group
#[derive(Debug, Clone, Default)]
struct AggregateState {
    count: i64,
    int_sum: Option<i64>,
    float_sum: Option<f64>,
    min: Option<Value>,
    max: Option<Value>,
    first: Option<Value>,
    last: Option<Value>,
}

impl AggregateState {
    fn update(&mut self, value: &Value, function: AggregateFunction) -> StepResult<()> {
        if value.is_null() {
            return Ok(());
        }
        self.count += 1;
        match function {
            AggregateFunction::Count => {}
            AggregateFunction::Sum | AggregateFunction::Avg => match value {
                Value::Integer(n) if self.float_sum.is_none() => {
                    let sum = self.int_sum.unwrap_or(0).checked_add(*n);
                    match sum {
                        Some(sum) => self.int_sum = Some(sum),
                        None => {
                            return Err(StepError::evaluation(format!(
                                "integer overflow in {}",
                                function.name()
                            )))
                        }
                    }
                }
                other => {
                    // Once a float shows up the sum continues in floating point
                    let carried = self.int_sum.take().map(|n| n as f64).unwrap_or(0.0);
                    let current = self.float_sum.unwrap_or(carried);
                    self.float_sum = Some(current + other.as_f64().unwrap_or(0.0));
                }
            },
            AggregateFunction::Min => {
                if self
                    .min
                    .as_ref()
                    .map_or(true, |m| value.compare(m) == Some(Ordering::Less))
                {
                    self.min = Some(value.clone());
                }
            }
            AggregateFunction::Max => {
                if self
                    .max
                    .as_ref()
                    .map_or(true, |m| value.compare(m) == Some(Ordering::Greater))
                {
                    self.max = Some(value.clone());
                }
            }
            AggregateFunction::First => {
                if self.first.is_none() {
                    self.first = Some(value.clone());
                }
            }
            AggregateFunction::Last => self.last = Some(value.clone()),
        }
        Ok(())
    }

    fn sum(&self) -> Option<Value> {
        match (self.int_sum, self.float_sum) {
            (_, Some(f)) => Some(Value::Float(f)),
            (Some(n), None) => Some(Value::Integer(n)),
            (None, None) => None,
        }
    }

    fn finalize(&self, function: AggregateFunction) -> Value {
        match function {
            AggregateFunction::Count => Value::Integer(self.count),
            AggregateFunction::Sum => self.sum().unwrap_or(Value::Null),
            AggregateFunction::Avg => match self.sum().and_then(|s| s.as_f64()) {
                Some(total) if self.count > 0 => Value::Float(total / self.count as f64),
                _ => Value::Null,
            },
            AggregateFunction::Min => self.min.clone().unwrap_or(Value::Null),
            AggregateFunction::Max => self.max.clone().unwrap_or(Value::Null),
            AggregateFunction::First => self.first.clone().unwrap_or(Value::Null),
            AggregateFunction::Last => self.last.clone().unwrap_or(Value::Null),
        }
    }
}

impl AggregateStep {
    pub fn validate(&self) -> StepResult<()> {
        for key in &self.on {
            require_name("on", key)?;
        }
        if self.aggregations.is_empty() {
            return Err(StepError::validation("aggregate needs at least one aggregation"));
        }
        self.aggregations.iter().try_for_each(Aggregation::validate)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let mut groups = group_rows(table, &self.on)?;
        if groups.is_empty() && self.on.is_empty() && !self.keep_original_granularity {
            // Aggregating an empty table without keys still yields one row
            groups.push(Vec::new());
        }

        let mut outputs: Vec<Column> = Vec::new();
        for aggregation in &self.aggregations {
            for (source, target) in aggregation.columns.iter().zip(&aggregation.newcolumns) {
                let column = table.column(source)?;
                aggregation.aggfunction.check_input(column)?;

                let per_group = groups
                    .iter()
                    .map(|rows| aggregation.aggfunction.apply(column, rows))
                    .collect::<StepResult<Vec<_>>>()?;

                let values = if self.keep_original_granularity {
                    let mut values = vec![Value::Null; table.num_rows()];
                    for (rows, result) in groups.iter().zip(&per_group) {
                        for &row in rows {
                            values[row] = result.clone();
                        }
                    }
                    values
                } else {
                    per_group
                };
                outputs.push(Column::new(target.clone(), values));
            }
        }

        if self.keep_original_granularity {
            return outputs
                .into_iter()
                .try_fold(table.clone(), |acc, column| acc.with_column(column));
        }

        let first_rows: Vec<usize> = groups
            .iter()
            .filter_map(|rows| rows.first().copied())
            .collect();
        let mut columns = Vec::with_capacity(self.on.len() + outputs.len());
        for key in &self.on {
            columns.push(table.column(key)?.take(&first_rows));
        }
        for column in outputs {
            match columns.iter().position(|c| c.name() == column.name()) {
                Some(idx) => columns[idx] = column,
                None => columns.push(column),
            }
        }
        Table::new(columns)
    }
}
