//! Result rendering: fixed-width ASCII tables and ordered JSON.
//!
//! The formatter only turns records into text. It never filters, never
//! reorders fields, and never touches the executor.

use crate::error::FormatError;
use crate::record::ResultRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{}'", other)),
        }
    }
}

/// Render records in the requested format. `fallback_columns` supplies
/// headers for an empty result (the command's column projection); it is
/// ignored when records are present.
pub fn format_records(
    records: &[ResultRecord],
    format: OutputFormat,
    fallback_columns: &[&str],
) -> Result<String, FormatError> {
    check_homogeneous(records)?;
    match format {
        OutputFormat::Table => Ok(render_table(records, fallback_columns)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(records).map_err(|e| FormatError::Json(e.to_string()))
        }
    }
}

/// Every record must carry the same field names in the same order.
fn check_homogeneous(records: &[ResultRecord]) -> Result<(), FormatError> {
    let Some(first) = records.first() else {
        return Ok(());
    };
    let expected = first.field_names();
    for (index, record) in records.iter().enumerate().skip(1) {
        let found = record.field_names();
        if found != expected {
            return Err(FormatError::Heterogeneous {
                index,
                expected: expected.join(", "),
                found: found.join(", "),
            });
        }
    }
    Ok(())
}

/// Header row plus one row per record. Exactly `records.len() + 1` lines
/// when non-empty; header-only when empty (if columns are known).
fn render_table(records: &[ResultRecord], fallback_columns: &[&str]) -> String {
    let columns: Vec<String> = match records.first() {
        Some(first) => first.field_names().iter().map(|s| s.to_string()).collect(),
        None => fallback_columns.iter().map(|s| s.to_string()).collect(),
    };
    if columns.is_empty() {
        return String::new();
    }

    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    let cells: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let text = record
                        .get(col)
                        .map(|v| v.display())
                        .unwrap_or_else(|| "N/A".to_string());
                    widths[i] = widths[i].max(text.len());
                    text
                })
                .collect()
        })
        .collect();

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(render_row(&columns, &widths));
    for row in &cells {
        lines.push(render_row(row, &widths));
    }
    lines.join("\n")
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut out = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            out.push_str("  ");
        }
        if i + 1 == cells.len() {
            out.push_str(cell);
        } else {
            out.push_str(&format!("{:width$}", cell, width = widths[i]));
        }
    }
    out
}
