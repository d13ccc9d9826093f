//! `pivot`: turn the distinct values of one column into columns.

use crate::error::StepResult;
use crate::step::aggregate::AggregateFunction;
use crate::step::grouping::group_rows;
use crate::step::{require_name, require_names};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotStep {
    /// Columns identifying an output row
    pub index: Vec<String>,
    pub column_to_pivot: String,
    pub value_column: String,
    pub agg_function: AggregateFunction,
}

impl PivotStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("index", &self.index)?;
        require_name("columnToPivot", &self.column_to_pivot)?;
        require_name("valueColumn", &self.value_column)
    }

    /// One row per distinct index, one new column per distinct non-NULL
    /// value of `column_to_pivot` (named after its text rendering, in order
    /// of first appearance). Index/value combinations that never occur are
    /// NULL.
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let pivot = table.column(&self.column_to_pivot)?;
        let values = table.column(&self.value_column)?;
        self.agg_function.check_input(values)?;
        let groups = group_rows(table, &self.index)?;

        let mut categories: Vec<&Value> = Vec::new();
        for value in pivot.values() {
            if !value.is_null() && !categories.contains(&value) {
                categories.push(value);
            }
        }

        let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(groups.len()); categories.len()];
        for rows in &groups {
            let mut by_category: HashMap<&Value, Vec<usize>> = HashMap::new();
            for &row in rows {
                by_category.entry(&pivot.values()[row]).or_default().push(row);
            }
            for (slot, category) in categories.iter().enumerate() {
                let cell = match by_category.get(category) {
                    Some(rows) => self.agg_function.apply(values, rows)?,
                    None => Value::Null,
                };
                cells[slot].push(cell);
            }
        }

        let first_rows: Vec<usize> = groups.iter().filter_map(|rows| rows.first().copied()).collect();
        let mut columns = self
            .index
            .iter()
            .map(|name| table.column(name).map(|c| c.take(&first_rows)))
            .collect::<StepResult<Vec<_>>>()?;
        columns.extend(
            categories
                .iter()
                .zip(cells)
                .map(|(category, values)| Column::new(category.render(), values)),
        );
        Table::new(columns)
    }
}
