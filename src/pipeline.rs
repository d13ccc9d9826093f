//! Pipelines and their execution.
//!
//! A [`Pipeline`] is an immutable, validated list of steps. It is run by a
//! [`PipelineRunner`], which threads a table through the steps in order and
//! stops at the first failure.

pub mod catalog;
pub mod config;
pub mod runner;

pub use catalog::{Catalog, DomainRetriever};
pub use config::RunnerConfig;
pub use runner::{PipelineExecution, PipelineRunner, RunState};

use crate::error::PipelineError;
use crate::step::Step;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Step>", into = "Vec<Step>")]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Build a pipeline, validating every step.
    ///
    /// The error names the first invalid step by its position.
    pub fn new(steps: Vec<Step>) -> Result<Self, PipelineError> {
        for (index, step) in steps.iter().enumerate() {
            step.validate()
                .map_err(|e| PipelineError::new(index, step.name(), e))?;
        }
        Ok(Self { steps })
    }

    /// Parse the persisted form: either `{"steps": [...]}` or a bare array.
    ///
    /// Malformed JSON and unknown step names fail with a serde error; a
    /// well-formed but invalid step fails with a [`PipelineError`] that can
    /// be recovered with `downcast_ref`.
    pub fn from_json(json: &str) -> Result<Self> {
        let document: serde_json::Value =
            serde_json::from_str(json).context("pipeline is not valid JSON")?;
        let steps = match document {
            serde_json::Value::Object(mut object) => object
                .remove("steps")
                .context("pipeline object has no \"steps\" field")?,
            other => other,
        };
        let steps: Vec<Step> =
            serde_json::from_value(steps).context("failed to decode pipeline steps")?;
        Ok(Self::new(steps)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.steps)?)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl TryFrom<Vec<Step>> for Pipeline {
    type Error = PipelineError;

    fn try_from(steps: Vec<Step>) -> Result<Self, Self::Error> {
        Pipeline::new(steps)
    }
}

impl From<Pipeline> for Vec<Step> {
    fn from(pipeline: Pipeline) -> Self {
        pipeline.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, StepError};

    #[test]
    fn test_from_json_wrapped_and_bare() {
        let wrapped = r#"{"steps": [
            {"name": "domain", "domain": "sales"},
            {"name": "argmin", "column": "value"}
        ]}"#;
        let bare = r#"[
            {"name": "domain", "domain": "sales"},
            {"name": "argmin", "column": "value"}
        ]"#;
        let a = Pipeline::from_json(wrapped).unwrap();
        let b = Pipeline::from_json(bare).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.steps()[1].name(), "argmin");
    }

    #[test]
    fn test_from_json_reports_invalid_step_index() {
        let json = r#"[
            {"name": "domain", "domain": "sales"},
            {"name": "delete", "columns": []}
        ]"#;
        let err = Pipeline::from_json(json).unwrap_err();
        let err = err.downcast_ref::<PipelineError>().unwrap();
        assert_eq!(err.index, 1);
        assert_eq!(err.step, "delete");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(matches!(err.source, StepError::Validation(_)));
    }

    #[test]
    fn test_from_json_rejects_unknown_step() {
        assert!(Pipeline::from_json(r#"[{"name": "transpose", "columns": ["a"]}]"#).is_err());
        assert!(Pipeline::from_json(r#"{"stages": []}"#).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let json = r#"[{"name":"cumsum","valueColumn":"v","groupby":["g"]},{"name":"text","newColumn":"t","text":"x"}]"#;
        let pipeline = Pipeline::from_json(json).unwrap();
        let back = Pipeline::from_json(&pipeline.to_json().unwrap()).unwrap();
        assert_eq!(pipeline, back);
    }

    #[test]
    fn test_nested_pipeline_is_validated_on_decode() {
        let json = r#"[{"name": "append", "pipelines": [[{"name": "select", "columns": []}]]}]"#;
        assert!(Pipeline::from_json(json).is_err());
    }
}
