//! Row partitioning shared by the grouped steps.

use crate::error::StepResult;
use crate::table::{Table, Value};
use std::collections::HashMap;

/// Partition the rows of `table` by the values of the `keys` columns.
///
/// Groups come out in order of first appearance and rows inside a group keep
/// table order. An empty key list puts every row in a single group (no group
/// at all for an empty table). NULL is an ordinary key value.
pub fn group_rows<S: AsRef<str>>(table: &Table, keys: &[S]) -> StepResult<Vec<Vec<usize>>> {
    let key_columns = keys
        .iter()
        .map(|k| table.column(k.as_ref()))
        .collect::<StepResult<Vec<_>>>()?;

    if key_columns.is_empty() {
        return Ok(if table.num_rows() == 0 {
            Vec::new()
        } else {
            vec![(0..table.num_rows()).collect()]
        });
    }

    let mut index: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for row in 0..table.num_rows() {
        let key: Vec<Value> = key_columns
            .iter()
            .map(|c| c.values()[row].clone())
            .collect();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    Ok(groups)
}
