//! String-oriented steps: `concatenate`, `text`, `lowercase`, `uppercase`,
//! `replace`, `fillna`.

use crate::error::{StepError, StepResult};
use crate::step::{require_name, require_names};
use crate::table::{Column, DataType, Table, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcatenateStep {
    pub columns: Vec<String>,
    #[serde(default)]
    pub separator: String,
    pub new_column_name: String,
}

impl ConcatenateStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)?;
        require_name("newColumnName", &self.new_column_name)
    }

    /// NULL cells render as the empty string
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let columns = self
            .columns
            .iter()
            .map(|name| table.column(name))
            .collect::<StepResult<Vec<_>>>()?;
        let values = (0..table.num_rows())
            .map(|row| {
                let parts: Vec<String> = columns.iter().map(|c| c.values()[row].render()).collect();
                Value::String(parts.join(&self.separator))
            })
            .collect();
        table.with_column(Column::new(self.new_column_name.clone(), values))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStep {
    pub new_column: String,
    pub text: String,
}

impl TextStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("newColumn", &self.new_column)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        table.with_column(Column::broadcast(
            self.new_column.clone(),
            Value::String(self.text.clone()),
            table.num_rows(),
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    Lower,
    Upper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeCaseStep {
    pub column: String,
}

impl ChangeCaseStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)
    }

    /// Only string columns are accepted; NULL cells stay NULL.
    pub fn execute(&self, table: &Table, case: Case) -> StepResult<Table> {
        let column = table.column(&self.column)?;
        let values = column
            .values()
            .iter()
            .map(|value| match value {
                Value::String(s) => Ok(Value::String(match case {
                    Case::Lower => s.to_lowercase(),
                    Case::Upper => s.to_uppercase(),
                })),
                Value::Null => Ok(Value::Null),
                other => Err(StepError::TypeMismatch {
                    column: self.column.clone(),
                    expected: DataType::String.to_string(),
                    actual: other
                        .data_type()
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                }),
            })
            .collect::<StepResult<Vec<_>>>()?;
        table.with_column(Column::new(self.column.clone(), values))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceStep {
    pub search_column: String,
    /// `(old value, new value)` pairs; the first match wins
    pub to_replace: Vec<(Value, Value)>,
}

impl ReplaceStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("searchColumn", &self.search_column)?;
        if self.to_replace.is_empty() {
            return Err(StepError::validation("replace needs at least one value pair"));
        }
        Ok(())
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let column = table.column(&self.search_column)?;
        let values = column
            .values()
            .iter()
            .map(|value| {
                self.to_replace
                    .iter()
                    .find(|(old, _)| old == value)
                    .map(|(_, new)| new.clone())
                    .unwrap_or_else(|| value.clone())
            })
            .collect();
        table.with_column(Column::new(self.search_column.clone(), values))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillnaStep {
    pub columns: Vec<String>,
    pub value: Value,
}

impl FillnaStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)?;
        if self.value.is_null() {
            return Err(StepError::validation("fillna value must not be null"));
        }
        Ok(())
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let mut result = table.clone();
        for name in &self.columns {
            let column = table.column(name)?;
            if !column.values().iter().any(Value::is_null) {
                continue;
            }
            let filled = column
                .values()
                .iter()
                .map(|v| if v.is_null() { self.value.clone() } else { v.clone() })
                .collect();
            result = result.with_column(Column::new(name.clone(), filled))?;
        }
        Ok(result)
    }
}
