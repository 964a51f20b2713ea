//! Report execution: run compiled statements against a target database
//! and shape raw rows into a typed result envelope.
//!
//! The engine talks to the database through the [`Executor`] trait so the
//! production worker client and in-memory test fakes are interchangeable.
//! Executions are independent and cancellable: a caller deadline aborts
//! the call, sends a best-effort cancel to the executor and surfaces
//! [`ExecError::Timeout`] instead of blocking.

pub mod export;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::compile::{
    compile_count_query, compile_report_query, CompileError, CompileOptions, Page,
};
use crate::model::{DataType, Dataset, DatasetColumn, FilterType, Report, SourceKind};
use crate::sql::Statement;
use crate::worker::WorkerError;

// =============================================================================
// Executor seam
// =============================================================================

/// Raw query output as it comes off the wire: column names plus rows of
/// JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Something that can run a parameterized statement against a target
/// database. Implemented by the worker client; tests substitute an
/// in-memory fake.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn query(&self, statement: &Statement) -> Result<QueryOutput, ExecError>;

    /// Best-effort cancellation of the in-flight call. Must propagate to
    /// the underlying driver, not merely stop consuming results.
    async fn cancel(&self);
}

// =============================================================================
// Errors
// =============================================================================

/// Execution failures, split so callers can choose between a
/// "fix your report" and a "try again" prompt.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("report failed to compile")]
    Compile(#[from] CompileError),

    #[error("could not connect to the target database: {0}")]
    Connection(String),

    #[error("query exceeded the {0:?} deadline")]
    Timeout(Duration),

    #[error("value in column '{column}' row {row} is not a valid {expected:?}")]
    ValueConversion {
        column: String,
        row: usize,
        expected: DataType,
    },

    #[error("database driver error")]
    Driver(#[from] WorkerError),
}

impl ExecError {
    /// User-correctable: the report or its data definitions are wrong.
    pub fn is_user_error(&self) -> bool {
        matches!(self, ExecError::Compile(_) | ExecError::ValueConversion { .. })
    }

    /// Operational and worth retrying at the caller's discretion.
    /// Nothing is retried internally.
    pub fn is_retriable(&self) -> bool {
        match self {
            ExecError::Connection(_) | ExecError::Timeout(_) => true,
            ExecError::Driver(err) => err.is_retriable(),
            _ => false,
        }
    }
}

// =============================================================================
// Result envelope
// =============================================================================

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Presentation metadata for one result column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub column_id: Uuid,
    pub title: String,
    pub data_type: DataType,
    /// Display format (date or currency) inherited from the dataset.
    pub format: Option<String>,
    pub width: Option<u32>,
    pub link_template: Option<String>,
}

/// A per-cell conversion failure that did not abort the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionIssue {
    pub column: String,
    pub row: usize,
    pub expected: DataType,
}

/// The complete, shaped result of a report execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<Cell>>,
    /// Row count under the report's WHERE/GROUP BY, ignoring pagination.
    pub total: u64,
    /// Conversion failures on non-key columns; the affected cells are null.
    pub conversion_issues: Vec<ConversionIssue>,
}

// =============================================================================
// Report execution
// =============================================================================

/// Execute a report: data query, count query, type shaping and lookup
/// substitution. `deadline` bounds the whole database conversation.
pub async fn run_report(
    dataset: &Dataset,
    report: &Report,
    page: Option<Page>,
    opts: CompileOptions,
    executor: &dyn Executor,
    deadline: Option<Duration>,
) -> Result<ResultEnvelope, ExecError> {
    let data_stmt = compile_report_query(dataset, report, page, opts)?;

    let work = async {
        let output = executor.query(&data_stmt).await?;

        let total = if dataset.source_kind == SourceKind::Proc {
            // Proc results cannot be wrapped in COUNT(*); the page we got
            // is the whole result.
            output.rows.len() as u64
        } else {
            let count_stmt = compile_count_query(dataset, report, opts)?;
            let count_out = executor.query(&count_stmt).await?;
            extract_count(&count_out)
        };

        Ok::<(QueryOutput, u64), ExecError>((output, total))
    };

    let (output, total) = match deadline {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(result) => result?,
            Err(_) => {
                executor.cancel().await;
                return Err(ExecError::Timeout(limit));
            }
        },
        None => work.await?,
    };

    shape(dataset, report, executor, output, total).await
}

/// Columns of the report in selection order, param columns excluded.
pub fn selected_columns<'a>(
    dataset: &'a Dataset,
    report: &'a Report,
) -> Vec<(&'a DatasetColumn, Option<u32>)> {
    report
        .selection
        .iter()
        .filter_map(|sel| {
            dataset
                .column(sel.column_id)
                .filter(|c| !c.is_param)
                .map(|c| (c, sel.width))
        })
        .collect()
}

async fn shape(
    dataset: &Dataset,
    report: &Report,
    executor: &dyn Executor,
    output: QueryOutput,
    total: u64,
) -> Result<ResultEnvelope, ExecError> {
    let columns = selected_columns(dataset, report);

    let meta: Vec<ColumnMeta> = columns
        .iter()
        .map(|(c, width)| ColumnMeta {
            column_id: c.id,
            title: c.title.clone(),
            data_type: c.data_type,
            format: display_format(dataset, c),
            width: *width,
            link_template: c.link_template.clone(),
        })
        .collect();

    let lookups = resolve_lookups(&columns, executor).await?;

    let mut issues = vec![];
    let mut rows = Vec::with_capacity(output.rows.len());

    for (row_idx, raw_row) in output.rows.into_iter().enumerate() {
        let mut row = Vec::with_capacity(columns.len());
        for (col_idx, (column, _)) in columns.iter().enumerate() {
            let raw = raw_row.get(col_idx).cloned().unwrap_or(serde_json::Value::Null);
            let cell = match convert_cell(&raw, column.data_type) {
                Ok(cell) => cell,
                Err(()) => {
                    let is_key = report.is_grouped_by(column.id)
                        || report.sort_column_id == Some(column.id);
                    if is_key {
                        // A broken grouping/sort key poisons pagination;
                        // abort rather than return misleading pages.
                        return Err(ExecError::ValueConversion {
                            column: column.title.clone(),
                            row: row_idx,
                            expected: column.data_type,
                        });
                    }
                    issues.push(ConversionIssue {
                        column: column.title.clone(),
                        row: row_idx,
                        expected: column.data_type,
                    });
                    Cell::Null
                }
            };

            let cell = substitute_lookup(&lookups, column.id, cell);
            row.push(cell);
        }
        rows.push(row);
    }

    Ok(ResultEnvelope {
        columns: meta,
        rows,
        total,
        conversion_issues: issues,
    })
}

fn display_format(dataset: &Dataset, column: &DatasetColumn) -> Option<String> {
    match column.data_type {
        DataType::Date | DataType::DateTime => dataset.date_format.clone(),
        DataType::Currency => dataset.currency_format.clone(),
        _ => None,
    }
}

fn extract_count(output: &QueryOutput) -> u64 {
    output
        .rows
        .first()
        .and_then(|row| row.first())
        .and_then(|v| v.as_u64())
        .unwrap_or(0)
}

// -----------------------------------------------------------------------------
// Lookup substitution
// -----------------------------------------------------------------------------

/// Run each Select-type column's lookup query once and build a
/// value-to-label map per column.
async fn resolve_lookups(
    columns: &[(&DatasetColumn, Option<u32>)],
    executor: &dyn Executor,
) -> Result<HashMap<Uuid, HashMap<String, String>>, ExecError> {
    let mut lookups = HashMap::new();

    for (column, _) in columns {
        if column.filter_type != FilterType::Select {
            continue;
        }
        let Some(query) = &column.lookup_query else {
            continue;
        };

        // Admin-trusted fragment, no parameters.
        let stmt = Statement::new(query.as_str().to_string(), vec![]);
        let output = executor.query(&stmt).await?;

        let mut map = HashMap::new();
        for row in &output.rows {
            let (Some(value), Some(label)) = (row.first(), row.get(1)) else {
                continue;
            };
            map.insert(json_to_display(value), json_to_display(label));
        }
        lookups.insert(column.id, map);
    }

    Ok(lookups)
}

fn substitute_lookup(
    lookups: &HashMap<Uuid, HashMap<String, String>>,
    column_id: Uuid,
    cell: Cell,
) -> Cell {
    let Some(map) = lookups.get(&column_id) else {
        return cell;
    };
    let key = match &cell {
        Cell::Text(s) => s.clone(),
        Cell::Int(n) => n.to_string(),
        _ => return cell,
    };
    match map.get(&key) {
        Some(label) => Cell::Text(label.clone()),
        None => cell,
    }
}

fn json_to_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// -----------------------------------------------------------------------------
// Cell conversion
// -----------------------------------------------------------------------------

/// Convert one wire value to a typed cell. `Err(())` means the value does
/// not fit the declared type; the caller decides whether that is fatal.
pub(crate) fn convert_cell(value: &serde_json::Value, data_type: DataType) -> Result<Cell, ()> {
    use serde_json::Value;

    if value.is_null() {
        return Ok(Cell::Null);
    }

    match data_type {
        DataType::Text => Ok(Cell::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        DataType::Integer => match value {
            Value::Number(n) => n.as_i64().map(Cell::Int).ok_or(()),
            Value::String(s) => s.parse::<i64>().map(Cell::Int).map_err(|_| ()),
            _ => Err(()),
        },
        DataType::Float | DataType::Currency => match value {
            Value::Number(n) => n.as_f64().map(Cell::Float).ok_or(()),
            Value::String(s) => s.parse::<f64>().map(Cell::Float).map_err(|_| ()),
            _ => Err(()),
        },
        DataType::Boolean => match value {
            Value::Bool(b) => Ok(Cell::Bool(*b)),
            Value::Number(n) => Ok(Cell::Bool(n.as_i64() == Some(1))),
            _ => Err(()),
        },
        DataType::Date => match value {
            Value::String(s) => parse_wire_date(s).map(Cell::Date).ok_or(()),
            _ => Err(()),
        },
        DataType::DateTime => match value {
            Value::String(s) => parse_wire_datetime(s).map(Cell::DateTime).ok_or(()),
            _ => Err(()),
        },
    }
}

pub(crate) fn parse_wire_date(s: &str) -> Option<NaiveDate> {
    // Drivers may send a full timestamp for date columns; take the date part.
    let date_part = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_wire_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .ok()
        .or_else(|| parse_wire_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}
