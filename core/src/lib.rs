//! Bulk MySQL inserts for event shipping pipelines.
//!
//! Records are formatted against a [`ColumnSchema`], optionally merged by aggregate key and
//! rendered into a single `INSERT ... VALUES (...),(...)` per batch.

pub mod manifest;

mod database;
pub use database::{
    batch_operations::{
        DuplicateKeyOperation, InvalidMergeOperation, MergeError, MergeOperation, MergeSpec,
        VALID_OPERATION_SYMBOLS,
    },
    format::{
        format_event, format_event_time, format_record, truncate_bound_value, truncate_value,
        BulkEvent, EventTimeZone, FormatError, FormattedRow, TIME_FORMAT,
    },
    mysql::{
        batch_operations::{
            aggregate_rows, build_aggregate_key, build_bulk_insert,
            build_duplicate_key_set_clause, build_insert_header,
            build_on_duplicate_key_update_clause, build_values_template, AggregateState,
            BatchError, BulkInsertPlan, BulkStatement, AGGREGATE_KEY_SEPARATOR,
        },
        client::{write_bulk, BulkConnection, BulkConnector, BulkWriteError, ConnectorError},
    },
    schema::{
        max_length_from_column_type, Column, ColumnSchema, ColumnSchemaError, TIME_PLACEHOLDER,
    },
    sql_type_wrapper::{escape_string, BulkSqlTypeWrapper},
};

mod logger;
pub use logger::{setup_info_logger, setup_logger, LOG_FILTER_ENV};

mod types;
pub use types::single_or_array::StringOrArray;

// export 3rd party dependencies
pub use async_trait::async_trait;
pub use tracing::{error as mysql_bulk_error, info as mysql_bulk_info};
