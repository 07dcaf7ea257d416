pub mod batch_operations;
pub mod format;
pub mod mysql;
pub mod schema;
pub mod sql_type_wrapper;
