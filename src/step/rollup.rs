//! `rollup`: aggregate at every level of a hierarchy and stack the results.

use crate::error::{StepError, StepResult};
use crate::step::aggregate::{AggregateStep, Aggregation};
use crate::step::{require_name, require_names};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};

fn default_label_col() -> String {
    "label".to_string()
}

fn default_level_col() -> String {
    "level".to_string()
}

fn default_parent_label_col() -> String {
    "parent".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupStep {
    /// Columns from the coarsest level to the finest
    pub hierarchy: Vec<String>,
    pub aggregations: Vec<Aggregation>,
    /// Extra keys kept at every level
    #[serde(default)]
    pub groupby: Vec<String>,
    #[serde(default = "default_label_col")]
    pub label_col: String,
    #[serde(default = "default_level_col")]
    pub level_col: String,
    #[serde(default = "default_parent_label_col")]
    pub parent_label_col: String,
}

impl RollupStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("hierarchy", &self.hierarchy)?;
        for name in &self.groupby {
            require_name("groupby", name)?;
        }
        require_name("labelCol", &self.label_col)?;
        require_name("levelCol", &self.level_col)?;
        require_name("parentLabelCol", &self.parent_label_col)?;
        if self.aggregations.is_empty() {
            return Err(StepError::validation("rollup needs at least one aggregation"));
        }
        self.aggregations.iter().try_for_each(Aggregation::validate)
    }

    /// Level `i` groups by `groupby` plus the first `i + 1` hierarchy
    /// columns. Rows of coarser levels come first and carry NULL in the
    /// finer hierarchy columns. Each row also gets its label (the value of
    /// its own hierarchy column), the level name (that column's name) and
    /// the label of its parent (NULL at the top level).
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let mut levels = Vec::with_capacity(self.hierarchy.len());
        for depth in 0..self.hierarchy.len() {
            let on: Vec<String> = self
                .groupby
                .iter()
                .chain(&self.hierarchy[..=depth])
                .cloned()
                .collect();
            let aggregated = AggregateStep {
                on,
                aggregations: self.aggregations.clone(),
                keep_original_granularity: false,
            }
            .execute(table)?;
            levels.push(self.annotate(aggregated, depth)?);
        }

        let mut names: Vec<String> = self.groupby.clone();
        names.extend(self.hierarchy.iter().cloned());
        for aggregation in &self.aggregations {
            names.extend(aggregation.newcolumns.iter().cloned());
        }
        names.push(self.label_col.clone());
        names.push(self.level_col.clone());
        names.push(self.parent_label_col.clone());

        let total_rows = levels.iter().map(Table::num_rows).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut values: Vec<Value> = Vec::with_capacity(total_rows);
                for level in &levels {
                    match level.column(&name) {
                        Ok(column) => values.extend_from_slice(column.values()),
                        Err(_) => values.extend(std::iter::repeat(Value::Null).take(level.num_rows())),
                    }
                }
                Column::new(name, values)
            })
            .collect();
        Table::new(columns)
    }

    fn annotate(&self, level: Table, depth: usize) -> StepResult<Table> {
        let rows = level.num_rows();
        let own = &self.hierarchy[depth];
        let label = level.column(own)?.renamed(self.label_col.clone());
        let parent = match depth.checked_sub(1) {
            Some(up) => level.column(&self.hierarchy[up])?.renamed(self.parent_label_col.clone()),
            None => Column::broadcast(self.parent_label_col.clone(), Value::Null, rows),
        };
        level
            .with_column(label)?
            .with_column(Column::broadcast(self.level_col.clone(), Value::from(own.as_str()), rows))?
            .with_column(parent)
    }
}
