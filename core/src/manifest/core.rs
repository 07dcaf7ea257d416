use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    database::{
        batch_operations::{DuplicateKeyOperation, MergeOperation, MergeSpec},
        format::EventTimeZone,
        mysql::batch_operations::BulkInsertPlan,
        schema::{ColumnSchema, ColumnSchemaError},
    },
    types::single_or_array::StringOrArray,
};

/// A `column,operation` entry, written either as `"count,+"` or as a mapping.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum DuplicateKeyOperationConfig {
    Pair(String),
    Detailed { column: String, operation: String },
}

impl DuplicateKeyOperationConfig {
    fn column_and_operation(&self) -> Result<(String, String), ValidateManifestError> {
        match self {
            DuplicateKeyOperationConfig::Pair(pair) => {
                let parts: Vec<&str> = pair.split(',').map(str::trim).collect();
                match parts.as_slice() {
                    [column, operation] if !column.is_empty() => {
                        Ok((column.to_string(), operation.to_string()))
                    }
                    _ => Err(ValidateManifestError::MalformedDuplicateKeyOperation(pair.clone())),
                }
            }
            DuplicateKeyOperationConfig::Detailed { column, operation } => {
                Ok((column.trim().to_string(), operation.trim().to_string()))
            }
        }
    }
}

/// Bulk insert settings for one table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Manifest {
    pub table: String,

    /// Columns written by the bulk insert, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_names: Option<StringOrArray>,

    /// Record keys feeding each column. `${time}` is replaced by the event time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_names: Option<StringOrArray>,

    /// Record keys whose values are stored json encoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_key_names: Option<StringOrArray>,

    #[serde(default)]
    pub aggregate_data: bool,

    /// Columns forming the aggregate key when `aggregate_data` is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate_key_list: Option<StringOrArray>,

    #[serde(default)]
    pub on_duplicate_key_update: bool,

    /// Merge operation per column, used for in-batch aggregation and for the
    /// `ON DUPLICATE KEY UPDATE` clause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_duplicate_key_operations: Option<Vec<DuplicateKeyOperationConfig>>,

    /// Column types as reported by `SHOW COLUMNS`, used to find `char`/`varchar` limits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_types: Option<BTreeMap<String, String>>,

    /// Explicit character limits, taking precedence over `column_types`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lengths: Option<BTreeMap<String, usize>>,

    #[serde(default)]
    pub timezone: EventTimeZone,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidateManifestError {
    #[error("table MUST be specified, but it is missing or empty")]
    TableMissing,

    #[error("{0}")]
    ColumnSchema(#[from] ColumnSchemaError),

    #[error("aggregate_data is enabled but aggregate_key_list is missing")]
    AggregateKeyListMissing,

    #[error("aggregate_key_list column {0} does not exist in column_names")]
    UnknownAggregateKeyColumn(String),

    #[error("on_duplicate_key_update is enabled but on_duplicate_key_operations is missing")]
    OnDuplicateKeyOperationsMissing,

    #[error("Malformed duplicate key operation '{0}', expected 'column,operation'")]
    MalformedDuplicateKeyOperation(String),

    #[error("Invalid duplicate key operation '{1}' supplied for {0}")]
    InvalidDuplicateKeyOperation(String, String),

    #[error("Duplicate key operation for column {0} is defined more than once")]
    DuplicateKeyOperationDefinedTwice(String),
}

impl Manifest {
    pub fn column_names(&self) -> Vec<String> {
        self.column_names.as_ref().map(StringOrArray::to_list).unwrap_or_default()
    }

    fn duplicate_key_operations(
        &self,
        schema: &ColumnSchema,
    ) -> Result<Vec<DuplicateKeyOperation>, ValidateManifestError> {
        let Some(configs) = &self.on_duplicate_key_operations else {
            return Ok(vec![]);
        };

        let mut seen = HashSet::new();
        let mut operations = Vec::with_capacity(configs.len());

        for config in configs {
            let (column, operation) = config.column_and_operation()?;

            let operation: MergeOperation = operation.parse().map_err(|_| {
                ValidateManifestError::InvalidDuplicateKeyOperation(column.clone(), operation)
            })?;

            let Some(column_index) = schema.index_of(&column) else {
                warn!(
                    "{} - duplicate key operation for unknown column {} skipped",
                    self.table, column
                );
                continue;
            };

            if !seen.insert(column_index) {
                return Err(ValidateManifestError::DuplicateKeyOperationDefinedTwice(column));
            }

            operations.push(DuplicateKeyOperation { column, column_index, operation });
        }

        Ok(operations)
    }

    fn aggregate_key_column_indexes(
        &self,
        schema: &ColumnSchema,
    ) -> Result<Vec<usize>, ValidateManifestError> {
        let key_columns =
            self.aggregate_key_list.as_ref().map(StringOrArray::to_list).unwrap_or_default();

        if key_columns.is_empty() {
            return Err(ValidateManifestError::AggregateKeyListMissing);
        }

        key_columns
            .into_iter()
            .map(|column| {
                schema
                    .index_of(&column)
                    .ok_or(ValidateManifestError::UnknownAggregateKeyColumn(column))
            })
            .collect()
    }

    /// Validates the settings once, before any batch is processed.
    pub fn validate(&self) -> Result<BulkInsertPlan, ValidateManifestError> {
        let table = self.table.trim();
        if table.is_empty() {
            return Err(ValidateManifestError::TableMissing);
        }

        let column_names = self.column_names();
        let key_names = self.key_names.as_ref().map(StringOrArray::to_list);
        let json_key_names =
            self.json_key_names.as_ref().map(StringOrArray::to_list).unwrap_or_default();

        let mut schema = ColumnSchema::new(&column_names, key_names.as_deref(), &json_key_names)?;

        if let Some(column_types) = &self.column_types {
            schema.apply_column_types(
                column_types.iter().map(|(field, column_type)| (field.as_str(), column_type.as_str())),
            );
        }

        if let Some(max_lengths) = &self.max_lengths {
            for (column, max_length) in max_lengths {
                schema.set_max_length(column, Some(*max_length))?;
            }
        }

        let operations = self.duplicate_key_operations(&schema)?;

        if self.on_duplicate_key_update && operations.is_empty() {
            return Err(ValidateManifestError::OnDuplicateKeyOperationsMissing);
        }

        let merge_spec = if self.aggregate_data {
            Some(MergeSpec::new(self.aggregate_key_column_indexes(&schema)?, &operations))
        } else {
            None
        };

        Ok(BulkInsertPlan {
            table: table.to_string(),
            schema,
            time_zone: self.timezone,
            merge_spec,
            on_duplicate_key_operations: self.on_duplicate_key_update.then_some(operations),
        })
    }
}
