//! Value normalization shared by every backend.
//!
//! Raw filter values arrive as loosely typed JSON (query strings only carry
//! text). They are formatted according to the field type, then shaped for the
//! operator: LIKE patterns get wildcards, list operators get a list.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

use crate::errors::ListError;
use crate::mapping::{FieldMapping, FieldType};
use crate::models::FilterOperator;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%m/%d/%Y"];

/// Loose truthiness used for boolean fields and one-sided ranges.
///
/// `null`, `false`, `0`, `""`, `"0"`, `"false"` and empty containers are
/// falsy; everything else is truthy.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => {
            !(text.is_empty() || text == "0" || text.eq_ignore_ascii_case("false"))
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// `null` or the empty string.
#[must_use]
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

/// Text rendering of a scalar, without the quotes JSON would add to strings.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Loose scalar equality: `2`, `"2"` and `2.0` are equal.
#[must_use]
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Bool(a), other) | (other, Value::Bool(a)) => *a == is_truthy(other),
        (Value::Null, other) | (other, Value::Null) => is_blank(other),
        (Value::Number(number), Value::String(text))
        | (Value::String(text), Value::Number(number)) => text
            .trim()
            .parse::<f64>()
            .is_ok_and(|parsed| number.as_f64() == Some(parsed)),
        _ => left == right,
    }
}

/// Format a raw value according to its field metadata.
///
/// Blank values and values without metadata pass through. Dates are re-rendered
/// with the configured format, booleans are coerced, text is lowercased.
///
/// # Errors
///
/// Returns [`ListError::InvalidDate`] when a date field receives something
/// that is not a recognizable date.
pub fn format_filter_value(
    field: &str,
    value: &Value,
    mapping: Option<&FieldMapping>,
) -> Result<Value, ListError> {
    let Some(mapping) = mapping else {
        return Ok(value.clone());
    };
    if is_blank(value) {
        return Ok(value.clone());
    }

    if let Value::Array(items) = value {
        return items
            .iter()
            .map(|item| format_filter_value(field, item, Some(mapping)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    let mut value = value.clone();
    if mapping.field_type.is_temporal()
        && let Some(format) = &mapping.format
    {
        value = Value::String(reformat_date(field, &value, format)?);
    }

    Ok(match (mapping.field_type, value) {
        (FieldType::Boolean, value) => Value::Bool(is_truthy(&value)),
        (_, Value::String(text)) => Value::String(text.to_lowercase()),
        (_, other) => other,
    })
}

/// Reject list values for scalar operators and format the value.
///
/// # Errors
///
/// Returns [`ListError::NonScalarValue`] or a formatting error.
pub fn normalize_scalar(
    field: &str,
    operator: FilterOperator,
    value: &Value,
    mapping: Option<&FieldMapping>,
) -> Result<Value, ListError> {
    if !operator.takes_list() && matches!(value, Value::Array(_) | Value::Object(_)) {
        return Err(ListError::NonScalarValue {
            field: field.to_string(),
        });
    }
    format_filter_value(field, value, mapping)
}

/// Format the value and shape it for `operator`.
///
/// `like`/`nlike` become `%v%`, `llike` becomes `%v` and `rlike` becomes `v%`;
/// `in`/`notIn` split comma separated text into a list and wrap scalars.
///
/// # Errors
///
/// See [`normalize_scalar`].
pub fn normalize_value(
    field: &str,
    operator: FilterOperator,
    value: &Value,
    mapping: Option<&FieldMapping>,
) -> Result<Value, ListError> {
    let value = normalize_scalar(field, operator, value, mapping)?;

    Ok(match operator {
        FilterOperator::Like | FilterOperator::NLike => {
            Value::String(format!("%{}%", value_text(&value)))
        }
        FilterOperator::LLike => Value::String(format!("%{}", value_text(&value))),
        FilterOperator::RLike => Value::String(format!("{}%", value_text(&value))),
        FilterOperator::In | FilterOperator::NotIn => match value {
            Value::Array(_) => value,
            Value::String(text) if text.contains(',') => Value::Array(
                text.split(',')
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            scalar => Value::Array(vec![scalar]),
        },
        _ => value,
    })
}

fn reformat_date(field: &str, value: &Value, format: &str) -> Result<String, ListError> {
    let invalid = || ListError::InvalidDate {
        field: field.to_string(),
        value: value_text(value),
    };

    let parsed = parse_date(value).ok_or_else(invalid)?;
    let mut rendered = String::new();
    write!(rendered, "{}", parsed.format(format)).map_err(|_| invalid())?;
    Ok(rendered)
}

fn parse_date(value: &Value) -> Option<DateTime<FixedOffset>> {
    if let Some(timestamp) = value.as_i64() {
        return DateTime::from_timestamp(timestamp, 0).map(|dt| dt.fixed_offset());
    }

    let text = value.as_str()?.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed);
    }
    if let Some(parsed) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(parsed.and_utc().fixed_offset());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|parsed| parsed.and_utc().fixed_offset())
}
