use std::path::Path;

use mysql_bulk::manifest::yaml::{load_bulk_insert_plan, ReadManifestError};

use crate::console::{print_success_message, print_warn_message};

pub fn handle_validate_command(manifest_path: &Path) -> Result<(), ReadManifestError> {
    let plan = load_bulk_insert_plan(manifest_path)?;

    println!("table: {}", plan.table);
    for column in plan.schema.columns() {
        let mut details = vec![format!("key={}", column.source_key)];
        if let Some(max_length) = column.max_length {
            details.push(format!("max_length={}", max_length));
        }
        if column.is_json {
            details.push("json".to_string());
        }
        println!("  {} ({})", column.name, details.join(", "));
    }

    match &plan.merge_spec {
        Some(merge_spec) => {
            let key_columns: Vec<&str> = merge_spec
                .aggregate_key_column_indexes
                .iter()
                .map(|index| plan.schema.column_name(*index))
                .collect();
            println!("aggregate key: {}", key_columns.join("|"));
            if merge_spec.operations_by_column_index.is_empty() {
                print_warn_message(
                    "aggregate_data is enabled without operations, duplicates keep their first row",
                );
            }
        }
        None => println!("aggregate key: none"),
    }

    if let Some(operations) = &plan.on_duplicate_key_operations {
        for operation in operations {
            println!("on duplicate: {} {}", operation.column, operation.operation);
        }
    }

    print_success_message(&format!("{} is valid", manifest_path.display()));

    Ok(())
}
