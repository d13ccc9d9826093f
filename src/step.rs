//! Pipeline steps.
//!
//! A [`Step`] is one validated, immutable transformation. The set of steps is
//! closed: the enum below is the persisted form (tagged by `"name"`) and the
//! dispatch table at the same time. Every step reads its input table and
//! builds a new one; the input is never modified.

pub mod aggregate;
pub mod argmax;
pub mod columns;
pub mod convert;
pub mod cumsum;
pub mod date;
pub mod domain;
pub mod duration;
pub mod evolution;
pub mod formula;
pub mod grouping;
pub mod ifthenelse;
pub mod percentage;
pub mod pivot;
pub mod rank;
pub mod rollup;
pub mod statistics;
pub mod text;

pub use aggregate::{AggregateFunction, AggregateStep, Aggregation};
pub use argmax::{ArgmaxStep, ArgminStep};
pub use columns::{DeleteStep, DuplicateStep, RenameStep, SelectStep};
pub use convert::{ConversionType, ConvertStep};
pub use cumsum::CumSumStep;
pub use date::{DateExtractStep, DatePart, FromdateStep};
pub use domain::{AppendStep, DomainStep, JoinStep, JoinType, PipelineSource};
pub use duration::{DurationStep, DurationUnit};
pub use evolution::{EvolutionFormat, EvolutionStep, EvolutionType};
pub use formula::{FilterCondition, FilterStep, FormulaStep};
pub use grouping::group_rows;
pub use ifthenelse::{ElseBranch, IfThenElse, IfthenelseStep, Operand};
pub use percentage::PercentageStep;
pub use pivot::PivotStep;
pub use rank::{RankMethod, RankOrder, RankStep};
pub use rollup::RollupStep;
pub use statistics::{Quantile, Statistic, StatisticsStep};
pub use text::{Case, ChangeCaseStep, ConcatenateStep, FillnaStep, ReplaceStep, TextStep};

use crate::error::{StepError, StepResult};
use crate::expression::Evaluator;
use crate::pipeline::Pipeline;
use crate::table::{Column, DataType, Table};
use serde::{Deserialize, Serialize};

/// Services a step may call back into while it runs
pub trait StepContext {
    /// Load a named source table
    fn retrieve_domain(&self, name: &str) -> StepResult<Table>;

    /// Run another pipeline and return its result
    fn execute_pipeline(&self, pipeline: &Pipeline) -> StepResult<Table>;

    fn evaluator(&self) -> &dyn Evaluator;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Step {
    Domain(DomainStep),
    Append(AppendStep),
    Join(JoinStep),
    Rename(RenameStep),
    Delete(DeleteStep),
    Select(SelectStep),
    Duplicate(DuplicateStep),
    Convert(ConvertStep),
    Concatenate(ConcatenateStep),
    Fillna(FillnaStep),
    Filter(FilterStep),
    Formula(FormulaStep),
    Text(TextStep),
    Lowercase(ChangeCaseStep),
    Uppercase(ChangeCaseStep),
    Replace(ReplaceStep),
    Aggregate(AggregateStep),
    Rank(RankStep),
    Duration(DurationStep),
    Ifthenelse(IfthenelseStep),
    Argmax(ArgmaxStep),
    Argmin(ArgminStep),
    Cumsum(CumSumStep),
    Percentage(PercentageStep),
    Fromdate(FromdateStep),
    Dateextract(DateExtractStep),
    Evolution(EvolutionStep),
    Pivot(PivotStep),
    Rollup(RollupStep),
    Statistics(StatisticsStep),
}

impl Step {
    /// The name tag, identical to the `"name"` discriminant of the persisted form
    pub fn name(&self) -> &'static str {
        match self {
            Step::Domain(_) => "domain",
            Step::Append(_) => "append",
            Step::Join(_) => "join",
            Step::Rename(_) => "rename",
            Step::Delete(_) => "delete",
            Step::Select(_) => "select",
            Step::Duplicate(_) => "duplicate",
            Step::Convert(_) => "convert",
            Step::Concatenate(_) => "concatenate",
            Step::Fillna(_) => "fillna",
            Step::Filter(_) => "filter",
            Step::Formula(_) => "formula",
            Step::Text(_) => "text",
            Step::Lowercase(_) => "lowercase",
            Step::Uppercase(_) => "uppercase",
            Step::Replace(_) => "replace",
            Step::Aggregate(_) => "aggregate",
            Step::Rank(_) => "rank",
            Step::Duration(_) => "duration",
            Step::Ifthenelse(_) => "ifthenelse",
            Step::Argmax(_) => "argmax",
            Step::Argmin(_) => "argmin",
            Step::Cumsum(_) => "cumsum",
            Step::Percentage(_) => "percentage",
            Step::Fromdate(_) => "fromdate",
            Step::Dateextract(_) => "dateextract",
            Step::Evolution(_) => "evolution",
            Step::Pivot(_) => "pivot",
            Step::Rollup(_) => "rollup",
            Step::Statistics(_) => "statistics",
        }
    }

    /// Structural checks that do not need any data
    pub fn validate(&self) -> StepResult<()> {
        match self {
            Step::Domain(step) => step.validate(),
            Step::Append(step) => step.validate(),
            Step::Join(step) => step.validate(),
            Step::Rename(step) => step.validate(),
            Step::Delete(step) => step.validate(),
            Step::Select(step) => step.validate(),
            Step::Duplicate(step) => step.validate(),
            Step::Convert(step) => step.validate(),
            Step::Concatenate(step) => step.validate(),
            Step::Fillna(step) => step.validate(),
            Step::Filter(step) => step.validate(),
            Step::Formula(step) => step.validate(),
            Step::Text(step) => step.validate(),
            Step::Lowercase(step) | Step::Uppercase(step) => step.validate(),
            Step::Replace(step) => step.validate(),
            Step::Aggregate(step) => step.validate(),
            Step::Rank(step) => step.validate(),
            Step::Duration(step) => step.validate(),
            Step::Ifthenelse(step) => step.validate(),
            Step::Argmax(step) => step.validate(),
            Step::Argmin(step) => step.validate(),
            Step::Cumsum(step) => step.validate(),
            Step::Percentage(step) => step.validate(),
            Step::Fromdate(step) => step.validate(),
            Step::Dateextract(step) => step.validate(),
            Step::Evolution(step) => step.validate(),
            Step::Pivot(step) => step.validate(),
            Step::Rollup(step) => step.validate(),
            Step::Statistics(step) => step.validate(),
        }
    }

    /// Apply the step to `table`
    pub fn execute(&self, table: &Table, ctx: &dyn StepContext) -> StepResult<Table> {
        match self {
            Step::Domain(step) => step.execute(ctx),
            Step::Append(step) => step.execute(table, ctx),
            Step::Join(step) => step.execute(table, ctx),
            Step::Rename(step) => step.execute(table),
            Step::Delete(step) => step.execute(table),
            Step::Select(step) => step.execute(table),
            Step::Duplicate(step) => step.execute(table),
            Step::Convert(step) => step.execute(table),
            Step::Concatenate(step) => step.execute(table),
            Step::Fillna(step) => step.execute(table),
            Step::Filter(step) => step.execute(table, ctx.evaluator()),
            Step::Formula(step) => step.execute(table, ctx.evaluator()),
            Step::Text(step) => step.execute(table),
            Step::Lowercase(step) => step.execute(table, Case::Lower),
            Step::Uppercase(step) => step.execute(table, Case::Upper),
            Step::Replace(step) => step.execute(table),
            Step::Aggregate(step) => step.execute(table),
            Step::Rank(step) => step.execute(table),
            Step::Duration(step) => step.execute(table),
            Step::Ifthenelse(step) => step.execute(table, ctx.evaluator()),
            Step::Argmax(step) => step.execute(table),
            Step::Argmin(step) => step.execute(table),
            Step::Cumsum(step) => step.execute(table),
            Step::Percentage(step) => step.execute(table),
            Step::Fromdate(step) => step.execute(table),
            Step::Dateextract(step) => step.execute(table),
            Step::Evolution(step) => step.execute(table),
            Step::Pivot(step) => step.execute(table),
            Step::Rollup(step) => step.execute(table),
            Step::Statistics(step) => step.execute(table),
        }
    }
}

pub(crate) fn require_name(field: &str, value: &str) -> StepResult<()> {
    if value.trim().is_empty() {
        return Err(StepError::validation(format!("'{}' must not be empty", field)));
    }
    Ok(())
}

pub(crate) fn require_names(field: &str, values: &[String]) -> StepResult<()> {
    if values.is_empty() {
        return Err(StepError::validation(format!(
            "'{}' needs at least one column",
            field
        )));
    }
    values.iter().try_for_each(|v| require_name(field, v))
}

/// Types present in a column that must hold only numbers (or NULL)
pub(crate) fn require_numeric(column: &Column) -> StepResult<Vec<DataType>> {
    let types = column.data_types();
    match types.iter().find(|t| !t.is_numeric()) {
        Some(bad) => Err(StepError::TypeMismatch {
            column: column.name().to_string(),
            expected: "number".to_string(),
            actual: bad.to_string(),
        }),
        None => Ok(types),
    }
}
