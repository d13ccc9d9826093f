pub mod condition;
pub mod error;
pub mod expression;
pub mod pipeline;
pub mod step;
pub mod table;

pub use condition::Condition;
pub use error::{ErrorKind, PipelineError, StepError, StepResult};
pub use expression::{Evaluator, FormulaEvaluator};
pub use pipeline::{Catalog, DomainRetriever, Pipeline, PipelineRunner, RunState, RunnerConfig};
pub use step::{Step, StepContext};
pub use table::{Column, DataType, Table, Value};
