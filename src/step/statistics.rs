//! `statistics`: descriptive statistics of one numeric column.

use crate::error::{StepError, StepResult};
use crate::step::grouping::group_rows;
use crate::step::{require_name, require_numeric};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Count,
    Max,
    Min,
    Average,
    /// Population variance
    Variance,
    #[serde(rename = "standard deviation")]
    StandardDeviation,
}

impl Statistic {
    /// Also the name of the output column
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Max => "max",
            Statistic::Min => "min",
            Statistic::Average => "average",
            Statistic::Variance => "variance",
            Statistic::StandardDeviation => "standard deviation",
        }
    }

    fn compute(&self, values: &[&Value]) -> Value {
        let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
        let mean = || numbers.iter().sum::<f64>() / numbers.len() as f64;
        let variance = || {
            let mean = mean();
            numbers.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / numbers.len() as f64
        };
        let extreme = |wanted: Ordering| {
            values
                .iter()
                .copied()
                .reduce(|best, v| if v.compare(best) == Some(wanted) { v } else { best })
                .cloned()
                .unwrap_or(Value::Null)
        };
        match self {
            Statistic::Count => Value::Integer(values.len() as i64),
            _ if values.is_empty() => Value::Null,
            Statistic::Max => extreme(Ordering::Greater),
            Statistic::Min => extreme(Ordering::Less),
            Statistic::Average => Value::Float(mean()),
            Statistic::Variance => Value::Float(variance()),
            Statistic::StandardDeviation => Value::Float(variance().sqrt()),
        }
    }
}

/// The `nth` of `order` quantiles: 1 of 2 is the median, 3 of 4 the third
/// quartile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quantile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub nth: u32,
    pub order: u32,
}

impl Quantile {
    pub fn column_name(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| format!("{}-th {}-quantile", self.nth, self.order))
    }

    fn validate(&self) -> StepResult<()> {
        if self.order == 0 || self.nth > self.order {
            return Err(StepError::validation(format!(
                "quantile {} of {} is out of range",
                self.nth, self.order
            )));
        }
        Ok(())
    }

    /// Linear interpolation between the two closest ranks
    fn compute(&self, values: &[&Value]) -> Value {
        let mut sorted: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
        if sorted.is_empty() {
            return Value::Null;
        }
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let position = (sorted.len() - 1) as f64 * self.nth as f64 / self.order as f64;
        let lower = position.floor() as usize;
        let upper = position.ceil() as usize;
        let fraction = position - lower as f64;
        Value::Float(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsStep {
    pub column: String,
    #[serde(default)]
    pub groupby_columns: Vec<String>,
    #[serde(default)]
    pub statistics: Vec<Statistic>,
    #[serde(default)]
    pub quantiles: Vec<Quantile>,
}

impl StatisticsStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)?;
        for name in &self.groupby_columns {
            require_name("groupbyColumns", name)?;
        }
        if self.statistics.is_empty() && self.quantiles.is_empty() {
            return Err(StepError::validation(
                "statistics needs at least one statistic or quantile",
            ));
        }
        self.quantiles.iter().try_for_each(Quantile::validate)
    }

    /// One row per group; NULL cells are left out of every statistic
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let column = table.column(&self.column)?;
        require_numeric(column)?;
        let mut groups = group_rows(table, &self.groupby_columns)?;
        if groups.is_empty() && self.groupby_columns.is_empty() {
            groups.push(Vec::new());
        }

        let samples: Vec<Vec<&Value>> = groups
            .iter()
            .map(|rows| {
                rows.iter()
                    .map(|&row| &column.values()[row])
                    .filter(|v| !v.is_null())
                    .collect()
            })
            .collect();

        let first_rows: Vec<usize> = groups.iter().filter_map(|rows| rows.first().copied()).collect();
        let mut columns = self
            .groupby_columns
            .iter()
            .map(|name| table.column(name).map(|c| c.take(&first_rows)))
            .collect::<StepResult<Vec<_>>>()?;
        for statistic in &self.statistics {
            let values = samples.iter().map(|s| statistic.compute(s)).collect();
            columns.push(Column::new(statistic.name(), values));
        }
        for quantile in &self.quantiles {
            let values = samples.iter().map(|s| quantile.compute(s)).collect();
            columns.push(Column::new(quantile.column_name(), values));
        }
        Table::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_pairs(vec![
            (
                "kind",
                ["x", "x", "x", "x", "y", "y"]
                    .iter()
                    .map(|s| Value::from(*s))
                    .collect::<Vec<_>>(),
            ),
            (
                "value",
                vec![
                    Value::Integer(2),
                    Value::Integer(4),
                    Value::Integer(4),
                    Value::Integer(6),
                    Value::Float(1.5),
                    Value::Null,
                ],
            ),
        ])
        .unwrap()
    }

    fn all_statistics() -> Vec<Statistic> {
        vec![
            Statistic::Count,
            Statistic::Max,
            Statistic::Min,
            Statistic::Average,
            Statistic::Variance,
            Statistic::StandardDeviation,
        ]
    }

    #[test]
    fn test_grouped_statistics() {
        let step = StatisticsStep {
            column: "value".to_string(),
            groupby_columns: vec!["kind".to_string()],
            statistics: all_statistics(),
            quantiles: vec![Quantile {
                label: Some("median".to_string()),
                nth: 1,
                order: 2,
            }],
        };
        let result = step.execute(&sample()).unwrap();
        assert_eq!(
            result.column_names(),
            vec!["kind", "count", "max", "min", "average", "variance", "standard deviation", "median"]
        );
        assert_eq!(
            result.row(0),
            vec![
                Value::from("x"),
                Value::Integer(4),
                Value::Integer(6),
                Value::Integer(2),
                Value::Float(4.0),
                Value::Float(2.0),
                Value::Float(2.0f64.sqrt()),
                Value::Float(4.0),
            ]
        );
        assert_eq!(result.row(1)[1], Value::Integer(1));
        assert_eq!(result.row(1)[2], Value::Float(1.5));
    }

    #[test]
    fn test_quantiles_interpolate() {
        let step = StatisticsStep {
            column: "value".to_string(),
            groupby_columns: vec![],
            statistics: vec![],
            quantiles: vec![
                Quantile { label: None, nth: 1, order: 4 },
                Quantile { label: None, nth: 3, order: 4 },
            ],
        };
        let result = step.execute(&sample()).unwrap();
        // Sorted sample: 1.5 2 4 4 6
        assert_eq!(result.column_names(), vec!["1-th 4-quantile", "3-th 4-quantile"]);
        assert_eq!(result.row(0), vec![Value::Float(2.0), Value::Float(4.0)]);
    }

    #[test]
    fn test_statistics_on_empty_table() {
        let table = Table::from_pairs(vec![("value", Vec::<Value>::new())]).unwrap();
        let step = StatisticsStep {
            column: "value".to_string(),
            groupby_columns: vec![],
            statistics: vec![Statistic::Count, Statistic::Average],
            quantiles: vec![],
        };
        let result = step.execute(&table).unwrap();
        assert_eq!(result.row(0), vec![Value::Integer(0), Value::Null]);
    }

    #[test]
    fn test_statistics_validation() {
        let step: StatisticsStep = serde_json::from_str(
            r#"{"column": "value", "statistics": ["standard deviation"],
                "quantiles": [{"nth": 5, "order": 4}]}"#,
        )
        .unwrap();
        assert_eq!(step.statistics, vec![Statistic::StandardDeviation]);
        assert!(matches!(step.validate(), Err(StepError::Validation(_))));

        let step = StatisticsStep {
            column: "kind".to_string(),
            groupby_columns: vec![],
            statistics: vec![Statistic::Count],
            quantiles: vec![],
        };
        assert!(matches!(step.execute(&sample()), Err(StepError::TypeMismatch { .. })));
    }
}
