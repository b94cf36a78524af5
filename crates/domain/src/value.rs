use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tessera_core::{AppError, AppResult, RecordId};

use crate::FieldType;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";
const SHORT_TIME_FORMAT: &str = "%H:%M";

/// Typed attribute value.
///
/// Values are persisted as canonical text and cast back through the owning field's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// Any text-like value (text, string, textarea, select, email, tel).
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Decimal or number value.
    Decimal(f64),
    /// Boolean value.
    Bool(bool),
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Parsed JSON structure.
    Json(Value),
    /// Referenced record identifier.
    Relation(RecordId),
    /// Opaque file path or URL.
    File(String),
}

impl FieldValue {
    /// Casts a raw transport value to the declared field type.
    ///
    /// Strings are accepted for every scalar type and parsed with the storage rules.
    pub fn cast(field_type: FieldType, raw: &Value) -> AppResult<Self> {
        match (field_type, raw) {
            (FieldType::Json, value) => Ok(Self::Json(value.clone())),
            (_, Value::String(text)) => Self::parse_text(field_type, text),
            (FieldType::Integer, Value::Number(number)) => number
                .as_i64()
                .map(Self::Integer)
                .ok_or_else(|| mismatch(field_type, raw)),
            (FieldType::Decimal | FieldType::Number, Value::Number(number)) => number
                .as_f64()
                .filter(|value| value.is_finite())
                .map(Self::Decimal)
                .ok_or_else(|| mismatch(field_type, raw)),
            (FieldType::Bool, Value::Bool(value)) => Ok(Self::Bool(*value)),
            (FieldType::Datetime, Value::Number(number)) => number
                .as_i64()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
                .map(Self::DateTime)
                .ok_or_else(|| mismatch(field_type, raw)),
            _ => Err(mismatch(field_type, raw)),
        }
    }

    /// Restores a typed value from its persisted text form.
    pub fn from_storage(field_type: FieldType, text: &str) -> AppResult<Self> {
        match field_type {
            FieldType::Json => serde_json::from_str(text).map(Self::Json).map_err(|error| {
                AppError::TypeMismatch(format!("json value is malformed: {error}"))
            }),
            _ => Self::parse_text(field_type, text),
        }
    }

    /// Returns the canonical text persisted for this value.
    #[must_use]
    pub fn to_storage_text(&self) -> String {
        match self {
            Self::Text(value) | Self::File(value) => value.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Date(value) => value.format(DATE_FORMAT).to_string(),
            Self::Time(value) => value.format(TIME_FORMAT).to_string(),
            Self::DateTime(value) => value.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::Json(value) => value.to_string(),
            Self::Relation(value) => value.to_string(),
        }
    }

    /// Returns the JSON transport form of this value.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(value) => Value::from(*value),
            Self::Decimal(value) => Value::from(*value),
            Self::Bool(value) => Value::Bool(*value),
            Self::Json(value) => value.clone(),
            _ => Value::String(self.to_storage_text()),
        }
    }

    /// Returns the referenced record for relation values.
    #[must_use]
    pub fn as_relation(&self) -> Option<RecordId> {
        match self {
            Self::Relation(record_id) => Some(*record_id),
            _ => None,
        }
    }

    fn parse_text(field_type: FieldType, text: &str) -> AppResult<Self> {
        let raw = || Value::String(text.to_owned());
        match field_type {
            FieldType::Text | FieldType::String | FieldType::Textarea | FieldType::Select => {
                Ok(Self::Text(text.to_owned()))
            }
            FieldType::Email => is_email(text)
                .then(|| Self::Text(text.trim().to_owned()))
                .ok_or_else(|| mismatch(field_type, &raw())),
            FieldType::Tel => is_phone_number(text)
                .then(|| Self::Text(text.trim().to_owned()))
                .ok_or_else(|| mismatch(field_type, &raw())),
            FieldType::File => {
                if text.trim().is_empty() {
                    Err(mismatch(field_type, &raw()))
                } else {
                    Ok(Self::File(text.to_owned()))
                }
            }
            FieldType::Integer => text
                .trim()
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|_| mismatch(field_type, &raw())),
            FieldType::Decimal | FieldType::Number => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Self::Decimal)
                .ok_or_else(|| mismatch(field_type, &raw())),
            FieldType::Bool => match text.trim() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(mismatch(field_type, &raw())),
            },
            FieldType::Date => NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(Self::Date)
                .map_err(|_| mismatch(field_type, &raw())),
            FieldType::Time => NaiveTime::parse_from_str(text.trim(), TIME_FORMAT)
                .or_else(|_| NaiveTime::parse_from_str(text.trim(), SHORT_TIME_FORMAT))
                .map(Self::Time)
                .map_err(|_| mismatch(field_type, &raw())),
            FieldType::Datetime => DateTime::parse_from_rfc3339(text.trim())
                .map(|value| Self::DateTime(value.with_timezone(&Utc)))
                .map_err(|_| mismatch(field_type, &raw())),
            FieldType::Relation => RecordId::from_str(text)
                .map(Self::Relation)
                .map_err(|_| mismatch(field_type, &raw())),
            FieldType::Json => serde_json::from_str(text)
                .map(Self::Json)
                .map_err(|_| mismatch(field_type, &raw())),
        }
    }
}

fn mismatch(field_type: FieldType, raw: &Value) -> AppError {
    AppError::TypeMismatch(format!(
        "value {raw} cannot be cast to field type '{}'",
        field_type.as_str()
    ))
}

fn is_email(text: &str) -> bool {
    let trimmed = text.trim();
    let Some((local, domain)) = trimmed.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn is_phone_number(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().any(|character| character.is_ascii_digit())
        && trimmed.chars().all(|character| {
            character.is_ascii_digit() || matches!(character, '+' | '-' | '(' | ')' | ' ' | '.')
        })
}
