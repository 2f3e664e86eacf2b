use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::history::VisitRecord;

/// Fixed module identifier stamped on every report record.
pub const MODULE: &str = "safari_history";
/// Fixed event tag stamped on every report record.
pub const EVENT: &str = "safari_history";

const HEADERS: &[&str] = &["Timestamp", "Module", "Event", "Data"];

/// One serialized report row per visit.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRecord {
    pub timestamp: String,
    pub module: String,
    pub event: String,
    pub data: String,
}

/// Serialize one visit into the fixed report shape.
pub fn serialize_visit(record: &VisitRecord) -> ReportRecord {
    ReportRecord {
        timestamp: record.iso_timestamp.clone(),
        module: MODULE.to_string(),
        event: EVENT.to_string(),
        data: format!(
            "Safari visit to {} (ID: {}, Visit ID: {})",
            record.url, record.id, record.visit_id
        ),
    }
}

/// Write visit report rows to a CSV file.
pub fn write_csv(records: &[VisitRecord], output_path: &Path) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    // Ensure parent directory exists
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record(HEADERS)?;
    for record in records {
        let row = serialize_visit(record);
        wtr.write_record([&row.timestamp, &row.module, &row.event, &row.data])?;
    }

    wtr.flush()?;
    Ok(records.len())
}

/// Write visit report rows to stdout as CSV.
pub fn write_csv_stdout(records: &[VisitRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let stdout = std::io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    wtr.write_record(HEADERS)?;
    for record in records {
        let row = serialize_visit(record);
        wtr.write_record([&row.timestamp, &row.module, &row.event, &row.data])?;
    }

    wtr.flush()?;
    Ok(records.len())
}

/// Write visit report rows to a JSON array file.
pub fn write_json(records: &[VisitRecord], output_path: &Path) -> Result<usize> {
    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let rows: Vec<ReportRecord> = records.iter().map(serialize_visit).collect();
    let file = std::fs::File::create(output_path)
        .with_context(|| format!("Failed to create output file: {}", output_path.display()))?;
    serde_json::to_writer_pretty(file, &rows)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))?;
    Ok(rows.len())
}
