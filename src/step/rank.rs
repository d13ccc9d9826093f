//! `rank`: position of each row's value inside its group.

use crate::error::{StepError, StepResult};
use crate::step::grouping::group_rows;
use crate::step::require_name;
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankOrder {
    #[default]
    Asc,
    Desc,
}

/// `standard` leaves gaps after ties (1, 1, 3), `dense` does not (1, 1, 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankMethod {
    #[default]
    Standard,
    Dense,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankStep {
    pub value_col: String,
    #[serde(default)]
    pub order: RankOrder,
    #[serde(default)]
    pub method: RankMethod,
    #[serde(default)]
    pub groupby: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_column_name: Option<String>,
}

impl RankStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("valueCol", &self.value_col)
    }

    pub fn output_column(&self) -> String {
        self.new_column_name
            .clone()
            .unwrap_or_else(|| format!("{}_RANK", self.value_col))
    }

    /// Ranks start at 1 in every group. NULL cells get a NULL rank.
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let values = table.column(&self.value_col)?.values();
        let mut ranks = vec![Value::Null; table.num_rows()];

        for rows in group_rows(table, &self.groupby)? {
            let mut ranked: Vec<usize> = rows
                .into_iter()
                .filter(|&row| !values[row].is_null())
                .collect();

            let mut failure = None;
            // Stable sort keeps table order among ties
            ranked.sort_by(|&a, &b| {
                let ordering = values[a].compare(&values[b]).unwrap_or_else(|| {
                    failure.get_or_insert((a, b));
                    Ordering::Equal
                });
                match self.order {
                    RankOrder::Asc => ordering,
                    RankOrder::Desc => ordering.reverse(),
                }
            });
            if let Some((a, b)) = failure {
                return Err(StepError::TypeMismatch {
                    column: self.value_col.clone(),
                    expected: values[a]
                        .data_type()
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                    actual: values[b]
                        .data_type()
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                });
            }

            let mut rank = 0i64;
            let mut previous: Option<usize> = None;
            for (position, &row) in ranked.iter().enumerate() {
                let tied = previous
                    .map(|p| values[p].compare(&values[row]) == Some(Ordering::Equal))
                    .unwrap_or(false);
                if !tied {
                    rank = match self.method {
                        RankMethod::Standard => position as i64 + 1,
                        RankMethod::Dense => rank + 1,
                    };
                }
                ranks[row] = Value::Integer(rank);
                previous = Some(row);
            }
        }

        table.with_column(Column::new(self.output_column(), ranks))
    }
}
