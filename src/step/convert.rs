//! `convert`: cast columns to another data type.
//!
//! Values that cannot be represented in the target type become NULL rather
//! than failing the step. Converting a column to the type it already has is
//! a no-op, so the step is idempotent.

use crate::error::StepResult;
use crate::step::require_names;
use crate::table::{Column, Table, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionType {
    Integer,
    Float,
    Text,
    Date,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertStep {
    pub columns: Vec<String>,
    pub data_type: ConversionType,
}

impl ConvertStep {
    pub fn validate(&self) -> StepResult<()> {
        require_names("columns", &self.columns)
    }

    pub fn execute(&self, table: &Table) -> StepResult<Table> {
        let mut result = table.clone();
        for name in &self.columns {
            let column = table.column(name)?;
            let converted = column
                .values()
                .iter()
                .map(|v| convert_value(v, self.data_type))
                .collect();
            result = result.with_column(Column::new(name.clone(), converted))?;
        }
        Ok(result)
    }
}

/// Numbers stand for nanoseconds since the epoch when converted to or from
/// dates, while [`Value::Timestamp`] itself holds milliseconds.
const NANOS_PER_MILLI: i64 = 1_000_000;

/// Text conversion keeps NULL as NULL instead of rendering it as a string.
pub fn convert_value(value: &Value, target: ConversionType) -> Value {
    match target {
        ConversionType::Integer => to_integer(value),
        ConversionType::Float => to_float(value),
        ConversionType::Text => match value {
            Value::Null => Value::Null,
            other => Value::String(other.render()),
        },
        ConversionType::Date => to_timestamp(value),
        ConversionType::Boolean => Value::Boolean(match value {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Timestamp(_) => true,
        }),
    }
}

/// Floats are truncated toward zero
fn to_integer(value: &Value) -> Value {
    let truncate = |f: f64| {
        if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            Value::Integer(f.trunc() as i64)
        } else {
            Value::Null
        }
    };
    match value {
        Value::Integer(_) | Value::Null => value.clone(),
        Value::Float(f) => truncate(*f),
        Value::Boolean(b) => Value::Integer(*b as i64),
        Value::Timestamp(ms) => ms
            .checked_mul(NANOS_PER_MILLI)
            .map(Value::Integer)
            .unwrap_or(Value::Null),
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(n) => Value::Integer(n),
                Err(_) => s.parse::<f64>().map(truncate).unwrap_or(Value::Null),
            }
        }
    }
}

fn to_float(value: &Value) -> Value {
    match value {
        Value::Float(_) | Value::Null => value.clone(),
        Value::Integer(n) => Value::Float(*n as f64),
        Value::Boolean(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
        Value::Timestamp(ms) => Value::Float(*ms as f64 * NANOS_PER_MILLI as f64),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .unwrap_or(Value::Null),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Numbers are read as nanoseconds since the epoch, strings with a small
/// set of ISO-like and US formats. Anything else becomes NULL.
fn to_timestamp(value: &Value) -> Value {
    match value {
        Value::Timestamp(_) | Value::Null => value.clone(),
        Value::Integer(ns) => Value::Timestamp(ns.div_euclid(NANOS_PER_MILLI)),
        Value::Float(f) if f.is_finite() => {
            Value::Timestamp((f / NANOS_PER_MILLI as f64).floor() as i64)
        }
        Value::String(s) => parse_timestamp(s.trim())
            .map(Value::Timestamp)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

pub fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(ndt.and_utc().timestamp_millis());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|ndt| ndt.and_utc().timestamp_millis());
        }
    }
    // A bare year means January 1st
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        let year: i32 = s.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|ndt| ndt.and_utc().timestamp_millis());
    }
    None
}
