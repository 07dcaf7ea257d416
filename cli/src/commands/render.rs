use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use mysql_bulk::{
    manifest::yaml::{load_bulk_insert_plan, ReadManifestError},
    BatchError, BulkEvent, BulkInsertPlan, BulkStatement,
};
use serde_json::Value;

use crate::console::print_success_message;

#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("{0}")]
    Manifest(#[from] ReadManifestError),

    #[error("Could not read events: {0}")]
    CouldNotReadEvents(#[from] io::Error),

    #[error("Could not parse event on line {0}: {1}")]
    InvalidEvent(usize, serde_json::Error),

    #[error("{0}")]
    Batch(#[from] BatchError),

    #[error("batch_size must be greater than 0")]
    InvalidBatchSize,
}

/// Reads one event per line, skipping blank lines.
pub fn parse_events<R: BufRead>(reader: R) -> Result<Vec<BulkEvent>, RenderError> {
    let mut events = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line)
            .map_err(|e| RenderError::InvalidEvent(index + 1, e))?;
        events.push(event);
    }

    Ok(events)
}

fn format_statement(statement: &BulkStatement, inline: bool) -> String {
    if inline {
        return format!("{};", statement.to_inline_sql());
    }

    let params: Vec<Value> = statement.params.iter().map(|p| p.to_json_value()).collect();
    format!("{};\n-- params: {}", statement.sql, Value::Array(params))
}

pub fn render_batches(
    plan: &BulkInsertPlan,
    events: &[BulkEvent],
    batch_size: usize,
    inline: bool,
) -> Result<Vec<String>, RenderError> {
    if batch_size == 0 {
        return Err(RenderError::InvalidBatchSize);
    }

    let mut rendered = Vec::new();
    for batch in events.chunks(batch_size) {
        if let Some(statement) = plan.prepare(batch)? {
            rendered.push(format_statement(&statement, inline));
        }
    }

    Ok(rendered)
}

pub fn handle_render_command(
    manifest_path: &Path,
    events_path: &str,
    inline: bool,
    batch_size: usize,
) -> Result<(), RenderError> {
    let plan = load_bulk_insert_plan(manifest_path)?;

    let events = if events_path == "-" {
        parse_events(io::stdin().lock())?
    } else {
        parse_events(BufReader::new(File::open(events_path)?))?
    };

    let statements = render_batches(&plan, &events, batch_size, inline)?;
    for statement in &statements {
        println!("{}", statement);
    }

    print_success_message(&format!(
        "Rendered {} events into {} statements",
        events.len(),
        statements.len()
    ));

    Ok(())
}
