//! Chart aggregation: execute each range's report query, bucket rows by
//! the X date column engine-side, and merge all ranges onto one shared
//! tick axis.
//!
//! Ranges fan out as concurrent queries and fan in with
//! `try_join_all`: the first failure aborts the whole chart and the
//! error names the failing range. All ranges of a chart share the first
//! range's bucket interval.

pub mod bucket;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::compile::{compile_chart_query, CompileError, CompileOptions};
use crate::exec::{ExecError, Executor};
use crate::model::{Aggregator, Chart, ChartRange, Dataset, DateInterval, ModelError, Report};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("chart range {range} failed to compile")]
    Compile {
        range: Uuid,
        #[source]
        source: CompileError,
    },

    #[error("chart range {range} failed to execute")]
    Exec {
        range: Uuid,
        #[source]
        source: ExecError,
    },

    #[error("chart range {range}: {reason}")]
    Data { range: Uuid, reason: String },

    #[error("invalid chart")]
    Model(#[from] ModelError),
}

// =============================================================================
// Inputs / outputs
// =============================================================================

/// Everything needed to run one range: its definitions plus the executor
/// for the dataset's target database.
pub struct RangeJob<'a> {
    pub range: &'a ChartRange,
    pub dataset: &'a Dataset,
    pub report: &'a Report,
    pub opts: CompileOptions,
    pub executor: &'a dyn Executor,
}

/// One plotted series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSeries {
    pub range_id: Uuid,
    pub label: String,
    pub color: Option<String>,
    pub points: Vec<(NaiveDate, f64)>,
}

/// The merged chart result, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub interval: DateInterval,
    /// Canonical X ticks, defined by the first range's buckets.
    pub ticks: Vec<NaiveDate>,
    pub series: Vec<RangeSeries>,
}

// =============================================================================
// Chart execution
// =============================================================================

/// Execute all ranges of a chart concurrently and merge the results.
///
/// `jobs` must contain one entry per chart range; they are processed in
/// range display order regardless of the order given.
pub async fn chart_data(chart: &Chart, mut jobs: Vec<RangeJob<'_>>) -> Result<ChartSeries, ChartError> {
    chart.validate()?;
    jobs.sort_by_key(|j| j.range.position);

    // The first range's interval governs the whole chart.
    let interval = jobs
        .first()
        .map(|j| j.range.interval)
        .ok_or(ModelError::ChartWithoutRanges { chart: chart.id })?;

    let buckets = try_join_all(jobs.iter().map(|job| run_range(job, interval))).await?;

    // Global domain bounds across all ranges, for gap filling.
    let domain_min = buckets.iter().filter_map(|b| b.keys().next()).min().copied();
    let domain_max = buckets.iter().filter_map(|b| b.keys().last()).max().copied();

    let mut filled: Vec<BTreeMap<NaiveDate, f64>> = vec![];
    for (job, mut range_buckets) in jobs.iter().zip(buckets) {
        if job.range.fill_date_gaps {
            if let (Some(min), Some(max)) = (domain_min, domain_max) {
                for tick in bucket::domain(min, max, interval) {
                    range_buckets.entry(tick).or_insert(0.0);
                }
            }
        }
        filled.push(range_buckets);
    }

    // First range defines the ticks; later ranges match by exact bucket
    // start and drop anything off-axis. No interpolation.
    let ticks: Vec<NaiveDate> = filled
        .first()
        .map(|b| b.keys().copied().collect())
        .unwrap_or_default();

    let mut series = vec![];
    for (idx, (job, range_buckets)) in jobs.iter().zip(filled).enumerate() {
        let points: Vec<(NaiveDate, f64)> = if idx == 0 {
            range_buckets.into_iter().collect()
        } else {
            range_buckets
                .into_iter()
                .filter(|(tick, _)| ticks.binary_search(tick).is_ok())
                .collect()
        };

        series.push(RangeSeries {
            range_id: job.range.id,
            label: range_label(job),
            color: job.range.color.clone(),
            points,
        });
    }

    Ok(ChartSeries {
        interval,
        ticks,
        series,
    })
}

fn range_label(job: &RangeJob<'_>) -> String {
    job.dataset
        .column(job.range.y_column_id)
        .map(|c| c.title.clone())
        .unwrap_or_else(|| job.report.name.clone())
}

/// Compile, execute and bucket one range.
async fn run_range(
    job: &RangeJob<'_>,
    interval: DateInterval,
) -> Result<BTreeMap<NaiveDate, f64>, ChartError> {
    let range_id = job.range.id;

    let stmt = compile_chart_query(
        job.dataset,
        job.report,
        job.range.x_column_id,
        job.range.y_column_id,
        job.opts,
    )
    .map_err(|source| ChartError::Compile {
        range: range_id,
        source,
    })?;

    let output = job
        .executor
        .query(&stmt)
        .await
        .map_err(|source| ChartError::Exec {
            range: range_id,
            source,
        })?;

    let mut accs: BTreeMap<NaiveDate, Acc> = BTreeMap::new();

    for (row_idx, row) in output.rows.iter().enumerate() {
        let x_raw = row.first().unwrap_or(&serde_json::Value::Null);
        let date = parse_x(x_raw).ok_or_else(|| ChartError::Data {
            range: range_id,
            reason: format!("row {}: X value {} is not a date", row_idx, x_raw),
        })?;

        let y = parse_y(row.get(1).unwrap_or(&serde_json::Value::Null)).map_err(|()| {
            ChartError::Data {
                range: range_id,
                reason: format!("row {}: Y value is not numeric", row_idx),
            }
        })?;

        let tick = bucket::bucket_start(date, interval);
        accs.entry(tick).or_default().fold(y);
    }

    Ok(accs
        .into_iter()
        .map(|(tick, acc)| (tick, acc.finish(job.range.aggregator)))
        .collect())
}

fn parse_x(value: &serde_json::Value) -> Option<NaiveDate> {
    match value {
        serde_json::Value::String(s) => crate::exec::parse_wire_date(s),
        _ => None,
    }
}

/// `Ok(None)` for SQL NULL (row ignored except by Count semantics).
fn parse_y(value: &serde_json::Value) -> Result<Option<f64>, ()> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Number(n) => n.as_f64().map(Some).ok_or(()),
        serde_json::Value::String(s) => s.parse::<f64>().map(Some).map_err(|_| ()),
        _ => Err(()),
    }
}

/// Streaming fold over one bucket's Y values.
#[derive(Debug, Default)]
struct Acc {
    sum: f64,
    count: u64,
    min: Option<f64>,
    max: Option<f64>,
}

impl Acc {
    fn fold(&mut self, y: Option<f64>) {
        // NULL Y values are not counted, matching COUNT(col) semantics.
        let Some(y) = y else { return };
        self.sum += y;
        self.count += 1;
        self.min = Some(self.min.map_or(y, |m| m.min(y)));
        self.max = Some(self.max.map_or(y, |m| m.max(y)));
    }

    fn finish(&self, aggregator: Aggregator) -> f64 {
        match aggregator {
            Aggregator::Sum => self.sum,
            Aggregator::Count => self.count as f64,
            Aggregator::Avg => {
                if self.count == 0 {
                    0.0
                } else {
                    self.sum / self.count as f64
                }
            }
            Aggregator::Min => self.min.unwrap_or(0.0),
            Aggregator::Max => self.max.unwrap_or(0.0),
        }
    }
}
