//! SQL text generation for MySQL bulk inserts.
//!
//! Every value is a `?` placeholder in [`BulkStatement::sql`] and travels in
//! [`BulkStatement::params`]. [`BulkStatement::to_inline_sql`] renders the literal form.

use crate::database::{
    batch_operations::{DuplicateKeyOperation, MergeOperation},
    format::FormattedRow,
    schema::ColumnSchema,
    sql_type_wrapper::BulkSqlTypeWrapper,
};

/// A rendered bulk insert plus its bound parameters, `columns * rows` of them in row order.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkStatement {
    pub sql: String,
    pub params: Vec<BulkSqlTypeWrapper>,
    pub row_count: usize,
    header: String,
    on_duplicate_key_clause: String,
    column_count: usize,
}

impl BulkStatement {
    /// Renders every row as escaped literals, for clients that bind on the client side.
    pub fn to_inline_sql(&self) -> String {
        let groups = self
            .params
            .chunks(self.column_count.max(1))
            .map(|row| {
                let literals: Vec<String> = row.iter().map(|p| p.to_sql_literal()).collect();
                format!("({})", literals.join(","))
            })
            .collect::<Vec<_>>()
            .join(",");

        format!("{}{}{}", self.header, groups, self.on_duplicate_key_clause)
    }
}

/// Builds one placeholder group: `(?,?,?)`.
pub fn build_values_template(column_count: usize) -> String {
    format!("({})", vec!["?"; column_count].join(","))
}

/// Builds `INSERT INTO table (col1,col2) VALUES `.
pub fn build_insert_header(table_name: &str, column_names: &[&str]) -> String {
    format!("INSERT INTO {} ({}) VALUES ", table_name, column_names.join(","))
}

/// Builds the update for one column, mirroring the in-memory merge.
pub fn build_duplicate_key_set_clause(column: &str, operation: MergeOperation) -> String {
    match operation {
        MergeOperation::Overwrite => format!("{} = VALUES({})", column, column),
        operation => format!("{} = {} {} VALUES({})", column, column, operation, column),
    }
}

/// Builds ` ON DUPLICATE KEY UPDATE ...` in declaration order, or nothing for no operations.
pub fn build_on_duplicate_key_update_clause(operations: &[DuplicateKeyOperation]) -> String {
    if operations.is_empty() {
        return String::new();
    }

    let set_clauses = operations
        .iter()
        .map(|op| build_duplicate_key_set_clause(&op.column, op.operation))
        .collect::<Vec<_>>()
        .join(",");

    format!(" ON DUPLICATE KEY UPDATE {}", set_clauses)
}

/// Renders the rows into a single bulk insert.
///
/// Callers should not pass an empty row set; the resulting `VALUES` list would be empty.
pub fn build_bulk_insert(
    table_name: &str,
    schema: &ColumnSchema,
    rows: Vec<FormattedRow>,
    on_duplicate_key_operations: Option<&[DuplicateKeyOperation]>,
) -> BulkStatement {
    let values_template = build_values_template(schema.len());
    let row_count = rows.len();

    let header = build_insert_header(table_name, &schema.column_names());
    let on_duplicate_key_clause = on_duplicate_key_operations
        .map(build_on_duplicate_key_update_clause)
        .unwrap_or_default();

    let sql = format!(
        "{}{}{}",
        header,
        vec![values_template.as_str(); row_count].join(","),
        on_duplicate_key_clause
    );

    let params = rows.into_iter().flatten().collect();

    BulkStatement {
        sql,
        params,
        row_count,
        header,
        on_duplicate_key_clause,
        column_count: schema.len(),
    }
}
