//! Turns decoded event records into rows of bound values, one value per schema column.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::database::{schema::ColumnSchema, sql_type_wrapper::BulkSqlTypeWrapper};

/// Format used when a column is filled from the event time.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One formatted row, ordered like the schema columns.
pub type FormattedRow = Vec<BulkSqlTypeWrapper>;

/// Which clock the `${time}` columns are rendered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventTimeZone {
    #[default]
    Local,
    Utc,
}

/// A decoded event as handed over by the buffering layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkEvent {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,

    pub record: Map<String, Value>,
}

impl BulkEvent {
    pub fn new(time: DateTime<Utc>, record: Map<String, Value>) -> Self {
        BulkEvent { time, record }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("Could not json encode value for column {column}: {source}")]
    JsonEncoding {
        column: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn format_event_time(time: &DateTime<Utc>, time_zone: EventTimeZone) -> String {
    match time_zone {
        EventTimeZone::Local => time.with_timezone(&Local).format(TIME_FORMAT).to_string(),
        EventTimeZone::Utc => time.format(TIME_FORMAT).to_string(),
    }
}

fn truncate_chars(s: &str, max_length: usize) -> Option<&str> {
    s.char_indices().nth(max_length).map(|(end, _)| &s[..end])
}

/// Keeps at most `max_length` characters. Non string values are returned unchanged.
pub fn truncate_value(value: &Value, max_length: usize) -> Value {
    match value {
        Value::String(s) => match truncate_chars(s, max_length) {
            Some(truncated) => Value::String(truncated.to_string()),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

/// Keeps at most `max_length` characters of a bound text value. Numbers, booleans and null
/// are bound as they are.
pub fn truncate_bound_value(value: BulkSqlTypeWrapper, max_length: usize) -> BulkSqlTypeWrapper {
    match value {
        BulkSqlTypeWrapper::Text(s) => match truncate_chars(&s, max_length) {
            Some(truncated) => BulkSqlTypeWrapper::Text(truncated.to_string()),
            None => BulkSqlTypeWrapper::Text(s),
        },
        other => other,
    }
}

/// Formats one record into a row of bound values.
///
/// Missing fields become `NULL`. A json column holding a missing field is bound as the text
/// `null`, which is what the serializer produces for it. Length limits apply to json columns
/// before encoding and to every other column after it has become its bound text.
pub fn format_record(
    schema: &ColumnSchema,
    time_zone: EventTimeZone,
    time: &DateTime<Utc>,
    record: &Map<String, Value>,
) -> Result<FormattedRow, FormatError> {
    let mut row = Vec::with_capacity(schema.len());

    for column in schema.columns() {
        if column.is_time() {
            row.push(BulkSqlTypeWrapper::Text(format_event_time(time, time_zone)));
            continue;
        }

        let raw = record.get(&column.source_key).unwrap_or(&Value::Null);

        if column.is_json {
            let value = match column.max_length {
                Some(max_length) => truncate_value(raw, max_length),
                None => raw.clone(),
            };
            let encoded = serde_json::to_string(&value).map_err(|source| {
                FormatError::JsonEncoding { column: column.name.clone(), source }
            })?;
            row.push(BulkSqlTypeWrapper::Text(encoded));
        } else {
            let value = BulkSqlTypeWrapper::from_json(raw);
            row.push(match column.max_length {
                Some(max_length) => truncate_bound_value(value, max_length),
                None => value,
            });
        }
    }

    Ok(row)
}

pub fn format_event(
    schema: &ColumnSchema,
    time_zone: EventTimeZone,
    event: &BulkEvent,
) -> Result<FormattedRow, FormatError> {
    format_record(schema, time_zone, &event.time, &event.record)
}
