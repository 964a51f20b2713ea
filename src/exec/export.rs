//! CSV export: stream a report through fixed-size pages so the full
//! result set is never held in memory.
//!
//! The export reuses the report's deterministic ORDER BY, so consecutive
//! pages partition the result without overlap.

use std::io::Write;

use crate::compile::{compile_report_query, CompileOptions, Page};
use crate::model::{Dataset, Report};

use super::{convert_cell, selected_columns, Cell, ExecError, Executor};

/// Rows fetched per round trip.
const PAGE_SIZE: u64 = 1000;

/// Export the full report (no pagination, row_limit still honoured) as
/// CSV into `writer`.
pub async fn export_csv<W: Write>(
    dataset: &Dataset,
    report: &Report,
    opts: CompileOptions,
    executor: &dyn Executor,
    writer: W,
) -> Result<u64, ExecError> {
    let columns = selected_columns(dataset, report);
    let mut csv = csv::Writer::from_writer(writer);

    csv.write_record(columns.iter().map(|(c, _)| c.title.as_str()))
        .map_err(io_error)?;

    let mut written: u64 = 0;
    let mut offset: u64 = 0;

    loop {
        // The report's row cap bounds the whole export, not each page.
        let page_limit = match report.row_limit {
            Some(cap) => PAGE_SIZE.min(cap.saturating_sub(written)),
            None => PAGE_SIZE,
        };
        if page_limit == 0 {
            break;
        }

        let page = Page {
            offset,
            limit: page_limit,
        };
        let stmt = compile_report_query(dataset, report, Some(page), opts)?;
        let output = executor.query(&stmt).await?;
        let fetched = output.rows.len() as u64;

        for row in output.rows {
            let mut record = Vec::with_capacity(columns.len());
            for (idx, (column, _)) in columns.iter().enumerate() {
                let raw = row.get(idx).cloned().unwrap_or(serde_json::Value::Null);
                let cell = convert_cell(&raw, column.data_type).unwrap_or(Cell::Null);
                record.push(cell_to_field(&cell));
            }
            csv.write_record(&record).map_err(io_error)?;
            written += 1;
        }

        if fetched < page_limit {
            break;
        }
        offset += fetched;
    }

    csv.flush()
        .map_err(|e| ExecError::Connection(format!("export write failed: {}", e)))?;
    Ok(written)
}

fn cell_to_field(cell: &Cell) -> String {
    match cell {
        Cell::Null => String::new(),
        Cell::Bool(b) => b.to_string(),
        Cell::Int(n) => n.to_string(),
        Cell::Float(f) => f.to_string(),
        Cell::Text(s) => s.clone(),
        Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        Cell::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
    }
}

fn io_error(e: csv::Error) -> ExecError {
    ExecError::Connection(format!("export write failed: {}", e))
}
