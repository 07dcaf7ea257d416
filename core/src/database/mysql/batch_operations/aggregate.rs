//! In-batch aggregation of rows sharing an aggregate key.
//!
//! The first row seen for a key is the base. Later duplicates only touch the columns that have
//! a merge operation; every other column keeps the first row's value.

use indexmap::{map::Entry, IndexMap};

use crate::database::{
    batch_operations::{MergeError, MergeSpec},
    format::FormattedRow,
    schema::ColumnSchema,
    sql_type_wrapper::BulkSqlTypeWrapper,
};

pub const AGGREGATE_KEY_SEPARATOR: &str = "|";

/// Builds the composite key for a row. Null segments are empty.
pub fn build_aggregate_key(row: &[BulkSqlTypeWrapper], key_column_indexes: &[usize]) -> String {
    key_column_indexes
        .iter()
        .map(|index| row.get(*index).map(|value| value.key_segment()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(AGGREGATE_KEY_SEPARATOR)
}

/// Merged rows for one batch, keyed by aggregate key in first-seen order.
pub struct AggregateState<'a> {
    schema: &'a ColumnSchema,
    merge_spec: &'a MergeSpec,
    rows: IndexMap<String, FormattedRow>,
}

impl<'a> AggregateState<'a> {
    pub fn new(schema: &'a ColumnSchema, merge_spec: &'a MergeSpec) -> Self {
        AggregateState { schema, merge_spec, rows: IndexMap::new() }
    }

    pub fn push(&mut self, row: FormattedRow) -> Result<(), MergeError> {
        let key = build_aggregate_key(&row, &self.merge_spec.aggregate_key_column_indexes);

        let merged = match self.rows.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(row);
                return Ok(());
            }
            Entry::Occupied(entry) => entry.into_mut(),
        };

        for (index, operation) in &self.merge_spec.operations_by_column_index {
            let (Some(current), Some(incoming)) = (merged.get(*index), row.get(*index)) else {
                continue;
            };
            let value = operation.apply(self.schema.column_name(*index), current, incoming)?;
            merged[*index] = value;
        }

        Ok(())
    }

    pub fn into_rows(self) -> Vec<FormattedRow> {
        self.rows.into_values().collect()
    }
}

/// Folds duplicate rows together. Without a merge spec the rows are returned as they came.
pub fn aggregate_rows(
    schema: &ColumnSchema,
    rows: Vec<FormattedRow>,
    merge_spec: Option<&MergeSpec>,
) -> Result<Vec<FormattedRow>, MergeError> {
    let Some(merge_spec) = merge_spec else {
        return Ok(rows);
    };

    let mut state = AggregateState::new(schema, merge_spec);
    for row in rows {
        state.push(row)?;
    }

    Ok(state.into_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::batch_operations::{DuplicateKeyOperation, MergeOperation};

    fn schema(columns: &[&str]) -> ColumnSchema {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        ColumnSchema::new(&columns, None, &[]).unwrap()
    }

    fn spec(
        schema: &ColumnSchema,
        keys: &[&str],
        operations: &[(&str, MergeOperation)],
    ) -> MergeSpec {
        let key_indexes = keys.iter().map(|k| schema.index_of(k).unwrap()).collect();
        let operations: Vec<DuplicateKeyOperation> = operations
            .iter()
            .map(|(column, operation)| DuplicateKeyOperation {
                column: column.to_string(),
                column_index: schema.index_of(column).unwrap(),
                operation: *operation,
            })
            .collect();
        MergeSpec::new(key_indexes, &operations)
    }

    fn row(name: &str, count: i64) -> FormattedRow {
        vec![name.into(), BulkSqlTypeWrapper::Int(count)]
    }

    #[test]
    fn test_without_merge_spec_is_identity() {
        let schema = schema(&["name", "count"]);
        let rows = vec![row("b", 1), row("a", 2), row("b", 3)];

        let result = aggregate_rows(&schema, rows.clone(), None).unwrap();

        assert_eq!(result, rows);
    }

    #[test]
    fn test_sums_in_first_seen_key_order() {
        let schema = schema(&["name", "count"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);

        let result =
            aggregate_rows(&schema, vec![row("a", 1), row("b", 2), row("a", 3)], Some(&spec))
                .unwrap();

        assert_eq!(result, vec![row("a", 4), row("b", 2)]);
    }

    #[test]
    fn test_sum_is_independent_of_duplicate_order() {
        let schema = schema(&["name", "count", "source"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);
        let make = |count: i64, source: &str| -> FormattedRow {
            vec!["k".into(), BulkSqlTypeWrapper::Int(count), source.into()]
        };

        let forward =
            aggregate_rows(&schema, vec![make(1, "x"), make(2, "y"), make(3, "z")], Some(&spec))
                .unwrap();
        let reversed =
            aggregate_rows(&schema, vec![make(3, "z"), make(2, "y"), make(1, "x")], Some(&spec))
                .unwrap();

        // merged column agrees
        assert_eq!(forward[0][1], BulkSqlTypeWrapper::Int(6));
        assert_eq!(reversed[0][1], BulkSqlTypeWrapper::Int(6));
        // non merged column belongs to whichever row arrived first
        assert_eq!(forward[0][2], BulkSqlTypeWrapper::from("x"));
        assert_eq!(reversed[0][2], BulkSqlTypeWrapper::from("z"));
    }

    #[test]
    fn test_columns_without_operation_keep_first_value() {
        let schema = schema(&["name", "count", "note"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);

        let result = aggregate_rows(
            &schema,
            vec![
                vec!["a".into(), BulkSqlTypeWrapper::Int(1), "first".into()],
                vec!["a".into(), BulkSqlTypeWrapper::Int(1), "second".into()],
            ],
            Some(&spec),
        )
        .unwrap();

        assert_eq!(result, vec![vec!["a".into(), BulkSqlTypeWrapper::Int(2), "first".into()]]);
    }

    #[test]
    fn test_overwrite_is_last_write_wins() {
        let schema = schema(&["name", "count", "status"]);
        let spec = spec(
            &schema,
            &["name"],
            &[("count", MergeOperation::Add), ("status", MergeOperation::Overwrite)],
        );

        let result = aggregate_rows(
            &schema,
            vec![
                vec!["a".into(), BulkSqlTypeWrapper::Int(1), "open".into()],
                vec!["a".into(), BulkSqlTypeWrapper::Int(1), "pending".into()],
                vec!["a".into(), BulkSqlTypeWrapper::Int(1), "closed".into()],
            ],
            Some(&spec),
        )
        .unwrap();

        assert_eq!(result[0][2], BulkSqlTypeWrapper::from("closed"));
        assert_eq!(result[0][1], BulkSqlTypeWrapper::Int(3));
    }

    #[test]
    fn test_composite_key_with_nulls() {
        let schema = schema(&["host", "path", "hits"]);
        let spec = spec(&schema, &["host", "path"], &[("hits", MergeOperation::Add)]);

        let result = aggregate_rows(
            &schema,
            vec![
                vec!["h".into(), BulkSqlTypeWrapper::Null, BulkSqlTypeWrapper::Int(1)],
                vec!["h".into(), "/".into(), BulkSqlTypeWrapper::Int(1)],
                vec!["h".into(), BulkSqlTypeWrapper::Null, BulkSqlTypeWrapper::Int(5)],
            ],
            Some(&spec),
        )
        .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0][2], BulkSqlTypeWrapper::Int(6));
        assert_eq!(result[1][2], BulkSqlTypeWrapper::Int(1));
    }

    #[test]
    fn test_equal_stringified_keys_merge() {
        let schema = schema(&["id", "hits"]);
        let spec = spec(&schema, &["id"], &[("hits", MergeOperation::Add)]);

        // integer 1 and text "1" produce the same key segment
        let result = aggregate_rows(
            &schema,
            vec![
                vec![BulkSqlTypeWrapper::Int(1), BulkSqlTypeWrapper::Int(1)],
                vec!["1".into(), BulkSqlTypeWrapper::Int(1)],
            ],
            Some(&spec),
        )
        .unwrap();

        assert_eq!(result, vec![vec![BulkSqlTypeWrapper::Int(1), BulkSqlTypeWrapper::Int(2)]]);
    }

    #[test]
    fn test_build_aggregate_key() {
        let row: FormattedRow =
            vec!["a".into(), BulkSqlTypeWrapper::Null, BulkSqlTypeWrapper::Int(3)];
        assert_eq!(build_aggregate_key(&row, &[0, 1, 2]), "a||3");
        assert_eq!(build_aggregate_key(&row, &[2, 0]), "3|a");
    }

    #[test]
    fn test_type_mismatch_fails_the_batch() {
        let schema = schema(&["name", "count"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);

        let result = aggregate_rows(
            &schema,
            vec![row("a", 1), vec!["a".into(), "lots".into()]],
            Some(&spec),
        );

        assert_eq!(
            result,
            Err(MergeError::TypeMismatch {
                column: "count".to_string(),
                operation: MergeOperation::Add,
                current: "integer",
                incoming: "string",
            })
        );
    }

    #[test]
    fn test_state_is_scoped_per_call() {
        let schema = schema(&["name", "count"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);

        let first = aggregate_rows(&schema, vec![row("a", 1)], Some(&spec)).unwrap();
        let second = aggregate_rows(&schema, vec![row("a", 1)], Some(&spec)).unwrap();

        assert_eq!(first, vec![row("a", 1)]);
        assert_eq!(second, vec![row("a", 1)]);
    }

    #[test]
    fn test_aggregate_state_merges_in_first_seen_order() {
        let schema = schema(&["name", "count"]);
        let spec = spec(&schema, &["name"], &[("count", MergeOperation::Add)]);
        let mut state = AggregateState::new(&schema, &spec);

        state.push(row("a", 1)).unwrap();
        state.push(row("b", 1)).unwrap();
        state.push(row("a", 1)).unwrap();

        assert_eq!(state.into_rows(), vec![row("a", 2), row("b", 1)]);
    }
}
