//! Run results → human/json string formatting.
//!
//! Two modes:
//! - **Human** (default): one block per relationship, one line per record
//! - **JSON** (`--json`): `serde_json::to_string_pretty`

use flowstage_core::{attr, Record};
use flowstage_stage::RunReport;

/// Output formatting mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Records queued on one relationship, with their content.
pub struct RelationshipOutput {
    pub name: String,
    pub records: Vec<(Record, Vec<u8>)>,
}

/// Format the queued output and run summary.
pub fn format_run(outputs: &[RelationshipOutput], report: &RunReport, mode: OutputMode) -> String {
    match mode {
        OutputMode::Human => format_human(outputs, report),
        OutputMode::Json => format_json(outputs, report),
    }
}

/// Format a fatal error.
pub fn format_error(err: &dyn std::error::Error, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => serde_json::to_string_pretty(&serde_json::json!({
            "error": err.to_string()
        }))
        .unwrap_or_else(|_| format!("{{\"error\": \"{}\"}}", err)),
        OutputMode::Human => format!("(error) {}", err),
    }
}

fn display_name(record: &Record) -> &str {
    record.attribute(attr::FILENAME).unwrap_or_else(|| record.uuid())
}

fn format_human(outputs: &[RelationshipOutput], report: &RunReport) -> String {
    let mut lines = Vec::new();
    for output in outputs {
        lines.push(format!("{} ({})", output.name, output.records.len()));
        for (record, content) in &output.records {
            let mut line = format!("  {}  {} bytes", display_name(record), content.len());
            if let Some(message) = record.attribute(attr::ERROR_MESSAGE) {
                line.push_str(&format!("  error: {}", message));
            } else {
                line.push_str(&format!("  {:?}", String::from_utf8_lossy(content)));
            }
            lines.push(line);
        }
    }
    lines.push(format!(
        "{} invocations, {} records received, {} failed",
        report.invocations,
        report.received(),
        report.errors.len()
    ));
    for err in &report.errors {
        lines.push(format!("(error) {}", err));
    }
    lines.join("\n")
}

fn record_json(record: &Record, content: &[u8]) -> serde_json::Value {
    serde_json::json!({
        "uuid": record.uuid(),
        "attributes": record.attributes(),
        "size": record.size(),
        "content": String::from_utf8_lossy(content),
    })
}

fn format_json(outputs: &[RelationshipOutput], report: &RunReport) -> String {
    let relationships: serde_json::Map<String, serde_json::Value> = outputs
        .iter()
        .map(|o| {
            let records = o
                .records
                .iter()
                .map(|(record, content)| record_json(record, content))
                .collect();
            (o.name.clone(), serde_json::Value::Array(records))
        })
        .collect();
    let value = serde_json::json!({
        "relationships": relationships,
        "invocations": report.invocations,
        "received": report.received(),
        "errors": report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|e| format_error(&e, OutputMode::Json))
}
