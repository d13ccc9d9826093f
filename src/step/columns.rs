//! Column bookkeeping steps: `rename`, `delete`, `select`, `duplicate`.

use crate::error::{StepError, StepResult};
use crate::step::{require_name, require_names};
use crate::table::Table;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameStep {
    /// `(old name, new name)` pairs, applied in order
    pub to_rename: Vec<(String, String)>,
}

impl RenameStep {
    pub fn validate(&self) -> StepResult<()> {
        if self.to_rename.is_empty() {
            return Err(StepError::validation("rename needs at least one column pair"));
        }
        for (old, new) in &self.to_rename {
            require_name("toRename", old)?;
            require_name("toRename", new)?;
        }
        Ok(())
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let mut result = table.clone();
        for (old, new) in &self.to_rename {
            // Renaming a column to itself (or a second run over already
            // renamed data) leaves the table unchanged.
            if old == new || (!result.has_column(old) && result.has_column(new)) {
                continue;
            }
            result = result.rename_column(old, new)?;
        }
        Ok(result)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStep {
    pub columns: Vec<String>,
}

impl DeleteStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        self.columns
            .iter()
            .try_fold(table.clone(), |acc, name| acc.without_column(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStep {
    pub columns: Vec<String>,
}

impl SelectStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        table.select(&self.columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateStep {
    pub column: String,
    pub new_column_name: String,
}

impl DuplicateStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)?;
        require_name("newColumnName", &self.new_column_name)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let copy = table.column(&self.column)?.renamed(self.new_column_name.clone());
        table.with_column(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn sample() -> Table {
        Table::from_pairs(vec![
            ("NAME", vec![Value::from("foo"), Value::from("bar")]),
            ("AGE", vec![Value::Integer(42), Value::Integer(43)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_rename_is_idempotent() {
        let step = RenameStep {
            to_rename: vec![("NAME".to_string(), "name".to_string())],
        };
        let once = step.execute(&sample()).unwrap();
        let twice = step.execute(&once).unwrap();
        assert_eq!(once.column_names(), vec!["name", "AGE"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_rename_missing_column() {
        let step = RenameStep {
            to_rename: vec![("nope".to_string(), "x".to_string())],
        };
        assert!(matches!(
            step.execute(&sample()),
            Err(StepError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_and_select() {
        let delete = DeleteStep {
            columns: vec!["AGE".to_string()],
        };
        assert_eq!(delete.execute(&sample()).unwrap().column_names(), vec!["NAME"]);

        let select = SelectStep {
            columns: vec!["AGE".to_string(), "NAME".to_string()],
        };
        assert_eq!(
            select.execute(&sample()).unwrap().column_names(),
            vec!["AGE", "NAME"]
        );
    }

    #[test]
    fn test_duplicate() {
        let step = DuplicateStep {
            column: "AGE".to_string(),
            new_column_name: "AGE_COPY".to_string(),
        };
        let result = step.execute(&sample()).unwrap();
        assert_eq!(
            result.column("AGE_COPY").unwrap().values(),
            result.column("AGE").unwrap().values()
        );
    }
}
