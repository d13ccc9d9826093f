//! In-memory tabular data model.
//!
//! This module provides the data that flows through a pipeline:
//!
//! - **Value**: a single typed cell (or NULL)
//! - **Column**: a named, reference-counted sequence of values
//! - **Table**: an ordered set of uniquely named, equal-length columns
//!
//! Tables are immutable values. Every operation returns a new table that
//! shares the storage of the columns it did not touch.

pub mod column;
pub mod value;

pub use column::Column;
pub use value::{DataType, Value};

use crate::error::{StepError, StepResult};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Create a table, checking that names are unique and lengths agree
    pub fn new(columns: Vec<Column>) -> StepResult<Self> {
        let num_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(StepError::validation(format!(
                    "duplicate column name '{}'",
                    column.name()
                )));
            }
            if column.len() != num_rows {
                return Err(StepError::validation(format!(
                    "column '{}' has {} rows, expected {}",
                    column.name(),
                    column.len(),
                    num_rows
                )));
            }
        }
        Ok(Self { columns, num_rows })
    }

    /// Convenience constructor from `(name, values)` pairs
    pub fn from_pairs<N, I>(pairs: I) -> StepResult<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, Vec<Value>)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column(&self, name: &str) -> StepResult<&Column> {
        self.columns
            .iter()
            .find(|c| c.name() == name)
            .ok_or_else(|| StepError::column_not_found(name))
    }

    /// Values of one row, in column order
    pub fn row(&self, index: usize) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| c.get(index).cloned().unwrap_or(Value::Null))
            .collect()
    }

    /// Add a column, or replace the column of the same name in place
    pub fn with_column(&self, column: Column) -> StepResult<Table> {
        if !self.columns.is_empty() && column.len() != self.num_rows {
            return Err(StepError::validation(format!(
                "column '{}' has {} rows, table has {}",
                column.name(),
                column.len(),
                self.num_rows
            )));
        }
        let mut columns = self.columns.clone();
        match self.column_index(column.name()) {
            Some(idx) => columns[idx] = column,
            None => columns.push(column),
        }
        Table::new(columns)
    }

    pub fn without_column(&self, name: &str) -> StepResult<Table> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| StepError::column_not_found(name))?;
        let mut columns = self.columns.clone();
        columns.remove(idx);
        Ok(Table {
            columns,
            num_rows: self.num_rows,
        })
    }

    pub fn rename_column(&self, old: &str, new: &str) -> StepResult<Table> {
        let idx = self
            .column_index(old)
            .ok_or_else(|| StepError::column_not_found(old))?;
        let mut columns = self.columns.clone();
        columns[idx] = columns[idx].renamed(new);
        Table::new(columns)
    }

    /// Keep only the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> StepResult<Table> {
        let columns = names
            .iter()
            .map(|n| self.column(n.as_ref()).cloned())
            .collect::<StepResult<Vec<_>>>()?;
        if columns.is_empty() {
            return Ok(Table {
                columns,
                num_rows: self.num_rows,
            });
        }
        Table::new(columns)
    }

    /// Gather the given rows (in the given order) into a new table
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            num_rows: rows.len(),
        }
    }
}
