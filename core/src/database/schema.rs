use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Source key substituted with the event time instead of being read from the record.
pub const TIME_PLACEHOLDER: &str = "${time}";

static CHAR_LENGTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(char|varchar)\((\d+)\)").expect("static regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub source_key: String,
    pub max_length: Option<usize>,
    pub is_json: bool,
}

impl Column {
    pub fn is_time(&self) -> bool {
        self.source_key == TIME_PLACEHOLDER
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ColumnSchemaError {
    #[error("column_names MUST be specified, but it is missing or empty")]
    MissingColumnNames,

    #[error("key_names has {1} entries but column_names has {0}, they must be the same length")]
    KeyNamesLengthMismatch(usize, usize),

    #[error("Column {0} is defined more than once")]
    DuplicateColumn(String),

    #[error("Column {0} does not exist in column_names")]
    UnknownColumn(String),
}

/// The ordered columns of the target table and how each one is filled from a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<Column>,
}

impl ColumnSchema {
    /// Builds the schema from the configured column names.
    ///
    /// `key_names` defaults to `column_names`. A column is json encoded when its source key is
    /// listed in `json_key_names`.
    pub fn new(
        column_names: &[String],
        key_names: Option<&[String]>,
        json_key_names: &[String],
    ) -> Result<Self, ColumnSchemaError> {
        if column_names.is_empty() {
            return Err(ColumnSchemaError::MissingColumnNames);
        }

        let key_names = key_names.unwrap_or(column_names);
        if key_names.len() != column_names.len() {
            return Err(ColumnSchemaError::KeyNamesLengthMismatch(
                column_names.len(),
                key_names.len(),
            ));
        }

        let mut seen = HashSet::new();
        if let Some(duplicate) = column_names.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ColumnSchemaError::DuplicateColumn(duplicate.clone()));
        }

        let columns = column_names
            .iter()
            .zip(key_names)
            .map(|(name, key)| Column {
                name: name.clone(),
                source_key: key.clone(),
                max_length: None,
                is_json: key != TIME_PLACEHOLDER && json_key_names.contains(key),
            })
            .collect();

        Ok(ColumnSchema { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn index_of(&self, column_name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == column_name)
    }

    pub fn column_name(&self, index: usize) -> &str {
        self.columns.get(index).map(|c| c.name.as_str()).unwrap_or_default()
    }

    pub fn set_max_length(
        &mut self,
        column_name: &str,
        max_length: Option<usize>,
    ) -> Result<(), ColumnSchemaError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == column_name)
            .ok_or_else(|| ColumnSchemaError::UnknownColumn(column_name.to_string()))?;
        column.max_length = max_length;
        Ok(())
    }

    /// Applies the `Field`/`Type` pairs reported by `SHOW COLUMNS FROM <table>`.
    ///
    /// Every column gets the length of its `char`/`varchar` type, or no limit when the table
    /// does not report it or reports another type.
    pub fn apply_column_types<'a, I>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields: Vec<(&str, &str)> = fields.into_iter().collect();
        for column in &mut self.columns {
            column.max_length = fields
                .iter()
                .find(|(field, _)| *field == column.name)
                .and_then(|(_, column_type)| max_length_from_column_type(column_type));
        }
    }
}

/// Parses the character limit out of a MySQL column type such as `varchar(255)`.
pub fn max_length_from_column_type(column_type: &str) -> Option<usize> {
    CHAR_LENGTH_REGEX
        .captures(column_type)
        .and_then(|caps| caps.get(2))
        .and_then(|length| length.as_str().parse().ok())
}
