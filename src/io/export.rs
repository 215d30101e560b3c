//! Export the forecast timeline to CSV or JSON.
//!
//! The export is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::TimelineRecord;
use crate::error::{AppError, EXIT_USAGE};

/// Write the timeline as CSV; missing values are empty cells.
pub fn write_timeline_csv(path: &Path, rows: &[TimelineRecord]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, rows).map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export CSV: {e}")))
}

fn write_csv<W: Write>(out: &mut W, rows: &[TimelineRecord]) -> std::io::Result<()> {
    writeln!(out, "date,actual,sarima,xgboost")?;
    for r in rows {
        writeln!(
            out,
            "{},{},{},{}",
            r.date,
            cell(r.actual),
            cell(r.timeseries),
            cell(r.regression)
        )?;
    }
    Ok(())
}

fn cell(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_default()
}

/// Write any serializable payload as pretty JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to create export JSON '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, value)
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export JSON: {e}")))?;
    writeln!(out).map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(EXIT_USAGE, format!("Failed to write export JSON: {e}")))
}
