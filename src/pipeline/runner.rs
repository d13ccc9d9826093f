//! Step-by-step pipeline execution.
//!
//! A run is a small state machine:
//!
//! ```text
//! Idle -> Running { index: 0 } -> ... -> Running { index: n - 1 } -> Completed
//!                        \________________________/
//!                                     |
//!                                   Failed
//! ```
//!
//! [`PipelineExecution::advance`] performs exactly one transition, so a
//! caller can stop between steps. [`PipelineRunner::run`] drives a run to
//! its end.

use super::catalog::DomainRetriever;
use super::config::RunnerConfig;
use super::Pipeline;
use crate::error::{PipelineError, StepError, StepResult};
use crate::expression::{Evaluator, FormulaEvaluator};
use crate::step::StepContext;
use crate::table::Table;
use log::{debug, info, warn};
use std::sync::Arc;

/// State of one pipeline run
#[derive(Debug)]
pub enum RunState {
    /// Not started yet
    Idle,
    /// Step `index` is next, to be applied to `table`
    Running { index: usize, table: Table },
    Completed(Table),
    Failed(PipelineError),
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed(_) | RunState::Failed(_))
    }
}

/// Runs pipelines against a domain source and an expression evaluator
pub struct PipelineRunner {
    domains: Arc<dyn DomainRetriever>,
    evaluator: Arc<dyn Evaluator>,
    config: RunnerConfig,
}

impl PipelineRunner {
    /// Create a runner using the built-in formula evaluator
    pub fn new(domains: Arc<dyn DomainRetriever>) -> Self {
        Self {
            domains,
            evaluator: Arc::new(FormulaEvaluator::new()),
            config: RunnerConfig::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Prepare a run starting from an empty table
    pub fn start<'a>(&'a self, pipeline: &'a Pipeline) -> PipelineExecution<'a> {
        self.start_with(pipeline, Table::default())
    }

    /// Prepare a run starting from `input`
    pub fn start_with<'a>(&'a self, pipeline: &'a Pipeline, input: Table) -> PipelineExecution<'a> {
        PipelineExecution::new(self, pipeline, input, 0)
    }

    /// Run `pipeline` to completion, starting from an empty table
    pub fn run(&self, pipeline: &Pipeline) -> Result<Table, PipelineError> {
        self.start(pipeline).finish()
    }

    /// Run `pipeline` to completion, starting from `input`
    pub fn run_with(&self, pipeline: &Pipeline, input: Table) -> Result<Table, PipelineError> {
        self.start_with(pipeline, input).finish()
    }
}

/// One in-flight run of a pipeline
pub struct PipelineExecution<'a> {
    runner: &'a PipelineRunner,
    pipeline: &'a Pipeline,
    depth: usize,
    input: Option<Table>,
    state: RunState,
}

impl<'a> PipelineExecution<'a> {
    fn new(runner: &'a PipelineRunner, pipeline: &'a Pipeline, input: Table, depth: usize) -> Self {
        Self {
            runner,
            pipeline,
            depth,
            input: Some(input),
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Perform one transition. Terminal states are left as they are.
    pub fn advance(&mut self) -> &RunState {
        let state = std::mem::replace(&mut self.state, RunState::Idle);
        self.state = match state {
            RunState::Idle => {
                let table = self.input.take().unwrap_or_default();
                debug!(
                    "starting pipeline of {} steps at depth {}",
                    self.pipeline.len(),
                    self.depth
                );
                if self.pipeline.is_empty() {
                    RunState::Completed(table)
                } else {
                    RunState::Running { index: 0, table }
                }
            }
            RunState::Running { index, table } => self.execute_step(index, table),
            terminal => terminal,
        };

        match &self.state {
            RunState::Completed(table) => info!(
                "pipeline completed at depth {}: {} rows, {} columns",
                self.depth,
                table.num_rows(),
                table.num_columns()
            ),
            RunState::Failed(err) => warn!("pipeline failed at depth {}: {}", self.depth, err),
            _ => {}
        }
        &self.state
    }

    /// Advance until a terminal state and return its outcome
    pub fn finish(mut self) -> Result<Table, PipelineError> {
        loop {
            match std::mem::replace(&mut self.state, RunState::Idle) {
                RunState::Completed(table) => return Ok(table),
                RunState::Failed(err) => return Err(err),
                pending => {
                    self.state = pending;
                    self.advance();
                }
            }
        }
    }

    fn execute_step(&self, index: usize, table: Table) -> RunState {
        let step = &self.pipeline.steps()[index];
        let ctx = RunContext {
            runner: self.runner,
            depth: self.depth,
        };
        match step.execute(&table, &ctx) {
            Ok(output) => {
                if self.runner.config.log_tables {
                    debug!(
                        "step {} ({}) produced {} rows, columns {:?}",
                        index,
                        step.name(),
                        output.num_rows(),
                        output.column_names()
                    );
                }
                if index + 1 == self.pipeline.len() {
                    RunState::Completed(output)
                } else {
                    RunState::Running {
                        index: index + 1,
                        table: output,
                    }
                }
            }
            Err(err) => RunState::Failed(PipelineError::new(index, step.name(), err)),
        }
    }
}

/// Callbacks handed to steps while a run is in progress
struct RunContext<'a> {
    runner: &'a PipelineRunner,
    depth: usize,
}

impl StepContext for RunContext<'_> {
    fn retrieve_domain(&self, name: &str) -> StepResult<Table> {
        debug!("retrieving domain '{}'", name);
        self.runner.domains.retrieve(name)
    }

    fn execute_pipeline(&self, pipeline: &Pipeline) -> StepResult<Table> {
        if self.depth + 1 > self.runner.config.max_nesting_depth {
            return Err(StepError::validation(format!(
                "pipelines nested deeper than {} levels",
                self.runner.config.max_nesting_depth
            )));
        }
        PipelineExecution::new(self.runner, pipeline, Table::default(), self.depth + 1)
            .finish()
            .map_err(|e| StepError::NestedPipeline(Box::new(e)))
    }

    fn evaluator(&self) -> &dyn Evaluator {
        self.runner.evaluator.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline::Catalog;
    use crate::table::Value;

    fn runner() -> PipelineRunner {
        let catalog = Catalog::new();
        catalog.register(
            "sales",
            Table::from_pairs(vec![
                ("label", vec![Value::from("a"), Value::from("b"), Value::from("c")]),
                ("value", vec![Value::Integer(3), Value::Integer(1), Value::Integer(3)]),
            ])
            .unwrap(),
        );
        PipelineRunner::new(Arc::new(catalog))
    }

    fn pipeline(json: &str) -> Pipeline {
        Pipeline::from_json(json).unwrap()
    }

    #[test]
    fn test_advance_one_step_at_a_time() {
        let runner = runner();
        let pipeline = pipeline(
            r#"[{"name": "domain", "domain": "sales"}, {"name": "argmax", "column": "value"}]"#,
        );
        let mut execution = runner.start(&pipeline);
        assert!(matches!(execution.state(), RunState::Idle));
        assert!(matches!(execution.advance(), RunState::Running { index: 0, .. }));
        assert!(matches!(execution.advance(), RunState::Running { index: 1, .. }));
        match execution.advance() {
            RunState::Completed(table) => assert_eq!(table.num_rows(), 2),
            other => panic!("expected completion, got {:?}", other),
        }
        // Terminal states are sticky
        assert!(matches!(execution.advance(), RunState::Completed(_)));
    }

    #[test]
    fn test_failure_reports_step() {
        let runner = runner();
        let pipeline = pipeline(
            r#"[{"name": "domain", "domain": "sales"},
                {"name": "cumsum", "valueColumn": "label"}]"#,
        );
        let err = runner.run(&pipeline).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.step, "cumsum");
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_empty_pipeline_returns_input() {
        let runner = runner();
        let input = Table::from_pairs(vec![("x", vec![Value::Integer(1)])]).unwrap();
        let output = runner.run_with(&Pipeline::default(), input.clone()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_nested_failure_is_wrapped() {
        let runner = runner();
        let pipeline = pipeline(
            r#"[{"name": "domain", "domain": "sales"},
                {"name": "append", "pipelines": [[{"name": "domain", "domain": "missing"}]]}]"#,
        );
        let err = runner.run(&pipeline).unwrap_err();
        assert_eq!(err.index, 1);
        assert_eq!(err.kind(), ErrorKind::DomainNotFound);
        match &err.source {
            StepError::NestedPipeline(inner) => {
                assert_eq!(inner.index, 0);
                assert_eq!(inner.step, "domain");
            }
            other => panic!("expected nested failure, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_depth_limit() {
        let runner = runner().with_config(RunnerConfig {
            max_nesting_depth: 0,
            ..RunnerConfig::default()
        });
        let pipeline = pipeline(
            r#"[{"name": "append", "pipelines": [[{"name": "domain", "domain": "sales"}]]}]"#,
        );
        let err = runner.run(&pipeline).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
