//! Steps that pull in other data: `domain`, `append`, `join`.
//!
//! They reach outside the current table through the [`StepContext`]
//! callbacks, either by name (a domain) or by running a nested pipeline.

use crate::error::{StepError, StepResult};
use crate::pipeline::Pipeline;
use crate::step::{require_name, StepContext};
use crate::table::{Column, Table, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a secondary table comes from: a domain name or an inline pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineSource {
    Domain(String),
    Steps(Pipeline),
}

impl PipelineSource {
    pub fn validate(&self) -> StepResult<()> {
        match self {
            PipelineSource::Domain(name) => require_name("domain", name),
            // Inline pipelines are validated when they are built
            PipelineSource::Steps(_) => Ok(()),
        }
    }

    pub fn resolve(&self, ctx: &dyn StepContext) -> StepResult<Table> {
        match self {
            PipelineSource::Domain(name) => ctx.retrieve_domain(name),
            PipelineSource::Steps(pipeline) => ctx.execute_pipeline(pipeline),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStep {
    pub domain: String,
}

impl DomainStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("domain", &self.domain)
    }

    /// The incoming table is discarded
    pub fn execute(&self, ctx: &dyn StepContext) -> StepResult<Table> {
        ctx.retrieve_domain(&self.domain)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppendStep {
    pub pipelines: Vec<PipelineSource>,
}

impl AppendStep {
    pub fn validate(&self) -> StepResult<()> {
        if self.pipelines.is_empty() {
            return Err(StepError::validation("append needs at least one pipeline"));
        }
        self.pipelines.iter().try_for_each(PipelineSource::validate)
    }

    /// Stack the current table and every appended table vertically.
    ///
    /// Columns come out in order of first appearance; tables lacking a
    /// column contribute NULLs for it.
    pub fn execute(&self, table: &Table, ctx: &dyn StepContext) -> StepResult<Table> {
        let mut tables = vec![table.clone()];
        for source in &self.pipelines {
            tables.push(source.resolve(ctx)?);
        }

        let mut names: Vec<String> = Vec::new();
        for t in &tables {
            for name in t.column_names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        let total_rows: usize = tables.iter().map(Table::num_rows).sum();
        let columns = names
            .into_iter()
            .map(|name| {
                let mut values = Vec::with_capacity(total_rows);
                for t in &tables {
                    match t.column(&name) {
                        Ok(column) => values.extend_from_slice(column.values()),
                        Err(_) => values.extend(std::iter::repeat(Value::Null).take(t.num_rows())),
                    }
                }
                Column::new(name, values)
            })
            .collect();
        Table::new(columns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    #[serde(rename = "left")]
    Left,
    #[serde(rename = "inner")]
    Inner,
    /// Left rows without any match (an anti-join)
    #[serde(rename = "left outer")]
    LeftOuter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinStep {
    pub right_pipeline: PipelineSource,
    #[serde(rename = "type")]
    pub join_type: JoinType,
    /// `(left column, right column)` key pairs
    pub on: Vec<(String, String)>,
}

impl JoinStep {
    pub fn validate(&self) -> StepResult<()> {
        self.right_pipeline.validate()?;
        if self.on.is_empty() {
            return Err(StepError::validation("join needs at least one key pair"));
        }
        for (left, right) in &self.on {
            require_name("on", left)?;
            require_name("on", right)?;
        }
        Ok(())
    }

    /// Hash join keeping left row order. NULL keys never match.
    pub fn execute(&self, table: &Table, ctx: &dyn StepContext) -> StepResult<Table> {
        let right = self.right_pipeline.resolve(ctx)?;

        let left_keys = self
            .on
            .iter()
            .map(|(l, _)| table.column(l))
            .collect::<StepResult<Vec<_>>>()?;
        let right_keys = self
            .on
            .iter()
            .map(|(_, r)| right.column(r))
            .collect::<StepResult<Vec<_>>>()?;

        let key_at = |columns: &[&Column], row: usize| -> Option<Vec<Value>> {
            let key: Vec<Value> = columns.iter().map(|c| c.values()[row].clone()).collect();
            (!key.iter().any(Value::is_null)).then_some(key)
        };

        let mut index: HashMap<Vec<Value>, Vec<usize>> = HashMap::new();
        for row in 0..right.num_rows() {
            if let Some(key) = key_at(&right_keys[..], row) {
                index.entry(key).or_default().push(row);
            }
        }

        // (left row, matching right row)
        let mut pairs: Vec<(usize, Option<usize>)> = Vec::new();
        for row in 0..table.num_rows() {
            let matches = key_at(&left_keys[..], row).and_then(|key| index.get(&key));
            match (self.join_type, matches) {
                (JoinType::LeftOuter, None) => pairs.push((row, None)),
                (JoinType::LeftOuter, Some(_)) => {}
                (_, Some(rows)) => pairs.extend(rows.iter().map(|&r| (row, Some(r)))),
                (JoinType::Left, None) => pairs.push((row, None)),
                (JoinType::Inner, None) => {}
            }
        }

        let left_rows: Vec<usize> = pairs.iter().map(|(l, _)| *l).collect();
        let mut result = table.take_rows(&left_rows);
        if self.join_type == JoinType::LeftOuter {
            return Ok(result);
        }

        for column in right.columns() {
            // A key shared under the same name on both sides is kept once
            if self.on.iter().any(|(l, r)| l == r && r == column.name()) {
                continue;
            }
            let values = pairs
                .iter()
                .map(|(_, r)| r.map_or(Value::Null, |r| column.values()[r].clone()))
                .collect();
            let mut name = column.name().to_string();
            while result.has_column(&name) {
                name.push_str("_right");
            }
            result = result.with_column(Column::new(name, values))?;
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{Evaluator, FormulaEvaluator};

    struct Domains(HashMap<String, Table>);

    impl StepContext for Domains {
        fn retrieve_domain(&self, name: &str) -> StepResult<Table> {
            self.0.get(name).cloned().ok_or_else(|| StepError::DomainNotFound {
                domain: name.to_string(),
            })
        }

        fn execute_pipeline(&self, _pipeline: &Pipeline) -> StepResult<Table> {
            Err(StepError::validation("nested pipelines are not available here"))
        }

        fn evaluator(&self) -> &dyn Evaluator {
            &FormulaEvaluator
        }
    }

    fn context() -> Domains {
        let mut domains = HashMap::new();
        domains.insert(
            "prices".to_string(),
            Table::from_pairs(vec![
                ("product", vec![Value::from("a"), Value::from("b"), Value::from("b")]),
                ("price", vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
            ])
            .unwrap(),
        );
        domains.insert(
            "more_sales".to_string(),
            Table::from_pairs(vec![
                ("product", vec![Value::from("c")]),
                ("region", vec![Value::from("EU")]),
            ])
            .unwrap(),
        );
        Domains(domains)
    }

    fn sales() -> Table {
        Table::from_pairs(vec![
            ("product", vec![Value::from("b"), Value::from("z"), Value::from("a")]),
            ("qty", vec![Value::Integer(10), Value::Integer(20), Value::Integer(30)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_domain_replaces_table() {
        let step = DomainStep {
            domain: "prices".to_string(),
        };
        let result = step.execute(&context()).unwrap();
        assert_eq!(result.column_names(), vec!["product", "price"]);

        let missing = DomainStep {
            domain: "nope".to_string(),
        };
        assert!(matches!(
            missing.execute(&context()),
            Err(StepError::DomainNotFound { .. })
        ));
    }

    #[test]
    fn test_append_fills_missing_columns() {
        let step = AppendStep {
            pipelines: vec![PipelineSource::Domain("more_sales".to_string())],
        };
        let result = step.execute(&sales(), &context()).unwrap();
        assert_eq!(result.column_names(), vec!["product", "qty", "region"]);
        assert_eq!(result.num_rows(), 4);
        assert_eq!(
            result.row(3),
            vec![Value::from("c"), Value::Null, Value::from("EU")]
        );
        assert_eq!(result.row(0), vec![Value::from("b"), Value::Integer(10), Value::Null]);
    }

    fn join(join_type: JoinType) -> Table {
        JoinStep {
            right_pipeline: PipelineSource::Domain("prices".to_string()),
            join_type,
            on: vec![("product".to_string(), "product".to_string())],
        }
        .execute(&sales(), &context())
        .unwrap()
    }

    #[test]
    fn test_inner_join() {
        let result = join(JoinType::Inner);
        assert_eq!(result.column_names(), vec!["product", "qty", "price"]);
        assert_eq!(
            result.column("price").unwrap().values(),
            &[Value::Integer(2), Value::Integer(3), Value::Integer(1)]
        );
        assert_eq!(
            result.column("qty").unwrap().values(),
            &[Value::Integer(10), Value::Integer(10), Value::Integer(30)]
        );
    }

    #[test]
    fn test_left_and_left_outer_join() {
        let result = join(JoinType::Left);
        assert_eq!(result.num_rows(), 4);
        assert_eq!(result.row(2), vec![Value::from("z"), Value::Integer(20), Value::Null]);

        let result = join(JoinType::LeftOuter);
        assert_eq!(result.column_names(), vec!["product", "qty"]);
        assert_eq!(result.row(0), vec![Value::from("z"), Value::Integer(20)]);
        assert_eq!(result.num_rows(), 1);
    }

    #[test]
    fn test_join_suffixes_clashing_columns() {
        let step = JoinStep {
            right_pipeline: PipelineSource::Domain("prices".to_string()),
            join_type: JoinType::Inner,
            on: vec![("qty".to_string(), "price".to_string())],
        };
        let table = Table::from_pairs(vec![
            ("product", vec![Value::from("x")]),
            ("qty", vec![Value::Integer(3)]),
        ])
        .unwrap();
        let result = step.execute(&table, &context()).unwrap();
        assert_eq!(
            result.column_names(),
            vec!["product", "qty", "product_right", "price"]
        );
        assert_eq!(result.row(0)[2], Value::from("b"));
    }

    #[test]
    fn test_join_suffix_skips_taken_names() {
        let step = JoinStep {
            right_pipeline: PipelineSource::Domain("prices".to_string()),
            join_type: JoinType::Inner,
            on: vec![("qty".to_string(), "price".to_string())],
        };
        let table = Table::from_pairs(vec![
            ("product", vec![Value::from("x")]),
            ("qty", vec![Value::Integer(3)]),
            ("product_right", vec![Value::from("kept")]),
        ])
        .unwrap();
        let result = step.execute(&table, &context()).unwrap();
        assert_eq!(
            result.column_names(),
            vec!["product", "qty", "product_right", "product_right_right", "price"]
        );
        assert_eq!(
            result.row(0),
            vec![
                Value::from("x"),
                Value::Integer(3),
                Value::from("kept"),
                Value::from("b"),
                Value::Integer(3),
            ]
        );
    }
}
