use tracing::debug;

use super::{
    aggregate::aggregate_rows,
    query_builder::{build_bulk_insert, BulkStatement},
};
use crate::database::{
    batch_operations::{DuplicateKeyOperation, MergeError, MergeSpec},
    format::{format_event, BulkEvent, EventTimeZone, FormatError},
    schema::ColumnSchema,
};

#[derive(thiserror::Error, Debug)]
pub enum BatchError {
    #[error("Could not format record {index}: {source}")]
    Format {
        index: usize,
        #[source]
        source: FormatError,
    },

    #[error("{0}")]
    Merge(#[from] MergeError),
}

/// Validated, immutable description of how batches become bulk inserts.
///
/// Built once from the manifest before any batch is processed and shared read-only between
/// workers. Each call to [`BulkInsertPlan::prepare`] owns its own aggregation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkInsertPlan {
    pub table: String,
    pub schema: ColumnSchema,
    pub time_zone: EventTimeZone,
    pub merge_spec: Option<MergeSpec>,
    pub on_duplicate_key_operations: Option<Vec<DuplicateKeyOperation>>,
}

impl BulkInsertPlan {
    /// Formats, aggregates and renders one batch. Returns `None` for an empty batch.
    pub fn prepare(&self, events: &[BulkEvent]) -> Result<Option<BulkStatement>, BatchError> {
        if events.is_empty() {
            return Ok(None);
        }

        let rows = events
            .iter()
            .enumerate()
            .map(|(index, event)| {
                format_event(&self.schema, self.time_zone, event)
                    .map_err(|source| BatchError::Format { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = aggregate_rows(&self.schema, rows, self.merge_spec.as_ref())?;

        debug!("{} - {} events aggregated into {} rows", self.table, events.len(), rows.len());

        Ok(Some(build_bulk_insert(
            &self.table,
            &self.schema,
            rows,
            self.on_duplicate_key_operations.as_deref(),
        )))
    }
}
