//! MySQL batch operations: in-batch aggregation and bulk INSERT rendering.
//!
//! A batch flows through [`plan::BulkInsertPlan::prepare`]: every event is formatted into a
//! row, rows sharing an aggregate key are merged, and the result is rendered into one
//! `INSERT ... VALUES (...),(...)` with an optional `ON DUPLICATE KEY UPDATE` clause.

mod aggregate;
mod plan;
mod query_builder;

pub use aggregate::{aggregate_rows, build_aggregate_key, AggregateState, AGGREGATE_KEY_SEPARATOR};
pub use plan::{BatchError, BulkInsertPlan};
pub use query_builder::{
    build_bulk_insert, build_duplicate_key_set_clause, build_insert_header,
    build_on_duplicate_key_update_clause, build_values_template, BulkStatement,
};
