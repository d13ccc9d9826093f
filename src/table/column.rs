use crate::table::{DataType, Value};
use std::sync::Arc;

/// A named sequence of values.
///
/// The values live behind an `Arc`, so cloning or renaming a column shares
/// storage with the original. Steps build new vectors for the columns they
/// change and reuse the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Arc<Vec<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values: Arc::new(values),
        }
    }

    /// Build a column where every row holds `value`
    pub fn broadcast(name: impl Into<String>, value: Value, len: usize) -> Self {
        Self::new(name, vec![value; len])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    /// Same values under another name
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Arc::clone(&self.values),
        }
    }

    /// Gather the given rows into a new column
    pub fn take(&self, rows: &[usize]) -> Self {
        Self::new(
            self.name.clone(),
            rows.iter().map(|&i| self.values[i].clone()).collect(),
        )
    }

    /// Distinct data types of the non-null cells, in order of first appearance
    pub fn data_types(&self) -> Vec<DataType> {
        let mut types = Vec::new();
        for data_type in self.values.iter().filter_map(Value::data_type) {
            if !types.contains(&data_type) {
                types.push(data_type);
            }
        }
        types
    }

    /// Whether both columns point at the same storage
    pub fn shares_storage_with(&self, other: &Column) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}
