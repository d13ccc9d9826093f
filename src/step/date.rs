//! Calendar steps: `fromdate` renders timestamps as text, `dateextract`
//! pulls calendar parts out of them.
//!
//! All calendar arithmetic happens in UTC.

use crate::error::{StepError, StepResult};
use crate::step::{require_name, require_names};
use crate::table::{Column, DataType, Table, Value};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Days, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps of a column as `Option<i64>` (NULL is `None`); any other cell
/// type is a mismatch.
pub(crate) fn timestamp_cells(column: &Column) -> StepResult<Vec<Option<i64>>> {
    column
        .values()
        .iter()
        .map(|value| match value {
            Value::Timestamp(ms) => Ok(Some(*ms)),
            Value::Null => Ok(None),
            other => Err(StepError::TypeMismatch {
                column: column.name().to_string(),
                expected: DataType::Timestamp.to_string(),
                actual: other
                    .data_type()
                    .map(|t| t.to_string())
                    .unwrap_or_default(),
            }),
        })
        .collect()
}

pub(crate) fn to_datetime(ms: i64) -> StepResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StepError::evaluation(format!("timestamp {} is out of range", ms)))
}

fn midnight(date: NaiveDate) -> Option<Value> {
    date.and_hms_opt(0, 0, 0)
        .map(|ndt| Value::Timestamp(ndt.and_utc().timestamp_millis()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FromdateStep {
    pub column: String,
    /// strftime-style pattern, e.g. `%d/%m/%Y`
    pub format: String,
}

impl FromdateStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)?;
        require_name("format", &self.format)?;
        check_format(&self.format)
    }

    /// NULL cells stay NULL
    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        check_format(&self.format)?;
        let column = table.column(&self.column)?;
        let values = timestamp_cells(column)?
            .into_iter()
            .map(|cell| match cell {
                Some(ms) => Ok(Value::String(to_datetime(ms)?.format(&self.format).to_string())),
                None => Ok(Value::Null),
            })
            .collect::<StepResult<Vec<_>>>()?;
        table.with_column(Column::new(self.column.clone(), values))
    }
}

// chrono panics while rendering a pattern it could not parse
fn check_format(format: &str) -> StepResult<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(StepError::validation(format!("invalid date format '{}'", format)));
    }
    Ok(())
}

/// Calendar parts `dateextract` can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatePart {
    Year,
    Month,
    Day,
    Hour,
    Minutes,
    Seconds,
    Milliseconds,
    Quarter,
    /// Week of the year, weeks starting on Sunday (days before the first
    /// Sunday are week 0)
    Week,
    /// 1 = Sunday .. 7 = Saturday
    DayOfWeek,
    DayOfYear,
    IsoYear,
    IsoWeek,
    /// 1 = Monday .. 7 = Sunday
    IsoDayOfWeek,
    FirstDayOfYear,
    FirstDayOfMonth,
    FirstDayOfQuarter,
    /// Previous (or same) Sunday
    FirstDayOfWeek,
    /// Previous (or same) Monday
    FirstDayOfIsoWeek,
    PreviousDay,
}

impl DatePart {
    /// Extract this part from `dt`. Integer parts come out as integers, the
    /// `firstDayOf*` family and `previousDay` as midnight timestamps.
    pub fn extract(&self, dt: &DateTime<Utc>) -> Value {
        let date = dt.date_naive();
        let int = |n: u32| Value::Integer(n as i64);
        match self {
            DatePart::Year => Value::Integer(dt.year() as i64),
            DatePart::Month => int(dt.month()),
            DatePart::Day => int(dt.day()),
            DatePart::Hour => int(dt.hour()),
            DatePart::Minutes => int(dt.minute()),
            DatePart::Seconds => int(dt.second()),
            DatePart::Milliseconds => int(dt.timestamp_subsec_millis()),
            DatePart::Quarter => int((dt.month() - 1) / 3 + 1),
            DatePart::Week => int((dt.ordinal0() + 7 - dt.weekday().num_days_from_sunday()) / 7),
            DatePart::DayOfWeek => int(dt.weekday().number_from_sunday()),
            DatePart::DayOfYear => int(dt.ordinal()),
            DatePart::IsoYear => Value::Integer(dt.iso_week().year() as i64),
            DatePart::IsoWeek => int(dt.iso_week().week()),
            DatePart::IsoDayOfWeek => int(dt.weekday().number_from_monday()),
            DatePart::FirstDayOfYear => date.with_ordinal(1).and_then(midnight).unwrap_or(Value::Null),
            DatePart::FirstDayOfMonth => date.with_day(1).and_then(midnight).unwrap_or(Value::Null),
            DatePart::FirstDayOfQuarter => {
                let month = (dt.month() - 1) / 3 * 3 + 1;
                NaiveDate::from_ymd_opt(dt.year(), month, 1)
                    .and_then(midnight)
                    .unwrap_or(Value::Null)
            }
            DatePart::FirstDayOfWeek => date
                .checked_sub_days(Days::new(dt.weekday().num_days_from_sunday() as u64))
                .and_then(midnight)
                .unwrap_or(Value::Null),
            DatePart::FirstDayOfIsoWeek => date
                .checked_sub_days(Days::new(dt.weekday().num_days_from_monday() as u64))
                .and_then(midnight)
                .unwrap_or(Value::Null),
            DatePart::PreviousDay => date
                .checked_sub_days(Days::new(1))
                .and_then(midnight)
                .unwrap_or(Value::Null),
        }
    }
}

/// Extract several calendar parts at once; `dateInfo` and `newColumns` are
/// paired by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateExtractStep {
    pub column: String,
    pub date_info: Vec<DatePart>,
    pub new_columns: Vec<String>,
}

impl DateExtractStep {
    pub fn validate(&self) -> StepResult<()> {
        require_name("column", &self.column)?;
        require_names("newColumns", &self.new_columns)?;
        if self.date_info.len() != self.new_columns.len() {
            return Err(StepError::validation(format!(
                "dateextract has {} date parts but {} new column names",
                self.date_info.len(),
                self.new_columns.len()
            )));
        }
        Ok(())
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let cells = timestamp_cells(table.column(&self.column)?)?;
        let dates = cells
            .into_iter()
            .map(|cell| cell.map(to_datetime).transpose())
            .collect::<StepResult<Vec<_>>>()?;

        self.date_info
            .iter()
            .zip(&self.new_columns)
            .try_fold(table.clone(), |acc, (part, name)| {
                let values = dates
                    .iter()
                    .map(|dt| dt.as_ref().map_or(Value::Null, |dt| part.extract(dt)))
                    .collect();
                acc.with_column(Column::new(name.clone(), values))
            })
    }
}
