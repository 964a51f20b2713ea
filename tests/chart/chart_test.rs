//! Integration tests for chart aggregation: bucketing, multi-range
//! merging, gap filling and error surfacing.

#[path = "../common/mod.rs"]
mod common;

use chrono::NaiveDate;
use common::{column_id, orders_dataset, output, pg, report_for, FakeExecutor};
use quarry::chart::{chart_data, ChartError, RangeJob};
use quarry::model::{
    Aggregator, Chart, ChartKind, ChartRange, Dataset, DateInterval, ModelError, Report,
};
use serde_json::json;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn range(
    chart_id: Uuid,
    report: &Report,
    dataset: &Dataset,
    aggregator: Aggregator,
    interval: DateInterval,
    position: u32,
) -> ChartRange {
    ChartRange {
        id: Uuid::new_v4(),
        chart_id,
        report_id: report.id,
        x_column_id: column_id(dataset, "Placed"),
        y_column_id: column_id(dataset, "Total"),
        aggregator,
        interval,
        fill_date_gaps: false,
        color: None,
        position,
    }
}

fn chart(ranges: Vec<ChartRange>) -> Chart {
    let chart_id = ranges
        .first()
        .map(|r| r.chart_id)
        .unwrap_or_else(Uuid::new_v4);
    Chart {
        id: chart_id,
        owner_id: Uuid::new_v4(),
        name: "Revenue".into(),
        kind: ChartKind::Line,
        ranges,
    }
}

fn xy_rows(points: &[(&str, f64)]) -> Vec<Vec<serde_json::Value>> {
    points.iter().map(|(x, y)| vec![json!(x), json!(y)]).collect()
}

// ============================================================================
// Bucketing and aggregation
// ============================================================================

#[tokio::test]
async fn test_daily_buckets_sum_same_day_rows() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let r = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 0);
    let chart = chart(vec![r.clone()]);

    let executor = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-01", 10.0), ("2024-03-01", 5.0), ("2024-03-02", 2.0)]),
    )]);

    let result = chart_data(
        &chart,
        vec![RangeJob {
            range: &r,
            dataset: &dataset,
            report: &report,
            opts: pg(),
            executor: &executor,
        }],
    )
    .await
    .unwrap();

    assert_eq!(result.interval, DateInterval::Day);
    assert_eq!(result.ticks, vec![date(2024, 3, 1), date(2024, 3, 2)]);
    assert_eq!(
        result.series[0].points,
        vec![(date(2024, 3, 1), 15.0), (date(2024, 3, 2), 2.0)]
    );
    assert_eq!(result.series[0].label, "Total");
}

#[tokio::test]
async fn test_weekly_buckets_start_on_monday() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let r = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Week, 0);
    let chart = chart(vec![r.clone()]);

    // Wed 2024-03-13 and Fri 2024-03-15 share the week of Mon 2024-03-11;
    // Mon 2024-03-18 opens the next one.
    let executor = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-13", 3.0), ("2024-03-15", 4.0), ("2024-03-18", 1.0)]),
    )]);

    let result = chart_data(
        &chart,
        vec![RangeJob {
            range: &r,
            dataset: &dataset,
            report: &report,
            opts: pg(),
            executor: &executor,
        }],
    )
    .await
    .unwrap();

    assert_eq!(
        result.series[0].points,
        vec![(date(2024, 3, 11), 7.0), (date(2024, 3, 18), 1.0)]
    );
}

#[tokio::test]
async fn test_avg_aggregator_ignores_null_y() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let r = range(chart_id, &report, &dataset, Aggregator::Avg, DateInterval::Day, 0);
    let chart = chart(vec![r.clone()]);

    let executor = FakeExecutor::new(vec![output(
        &["x", "y"],
        vec![
            vec![json!("2024-03-01"), json!(10.0)],
            vec![json!("2024-03-01"), json!(20.0)],
            vec![json!("2024-03-01"), serde_json::Value::Null],
        ],
    )]);

    let result = chart_data(
        &chart,
        vec![RangeJob {
            range: &r,
            dataset: &dataset,
            report: &report,
            opts: pg(),
            executor: &executor,
        }],
    )
    .await
    .unwrap();

    // NULL Y rows do not enter the average
    assert_eq!(result.series[0].points, vec![(date(2024, 3, 1), 15.0)]);
}

// ============================================================================
// Multi-range merging
// ============================================================================

#[tokio::test]
async fn test_first_range_defines_ticks_and_later_ranges_align() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let first = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 0);
    let second = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 1);
    let chart = chart(vec![first.clone(), second.clone()]);

    let exec_first = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-01", 1.0), ("2024-03-02", 2.0), ("2024-03-03", 3.0)]),
    )]);
    let exec_second = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-01", 9.0), ("2024-03-03", 7.0)]),
    )]);

    // Jobs given out of order; range position decides.
    let result = chart_data(
        &chart,
        vec![
            RangeJob {
                range: &second,
                dataset: &dataset,
                report: &report,
                opts: pg(),
                executor: &exec_second,
            },
            RangeJob {
                range: &first,
                dataset: &dataset,
                report: &report,
                opts: pg(),
                executor: &exec_first,
            },
        ],
    )
    .await
    .unwrap();

    assert_eq!(
        result.ticks,
        vec![date(2024, 3, 1), date(2024, 3, 2), date(2024, 3, 3)]
    );
    assert_eq!(result.series[0].range_id, first.id);
    assert_eq!(result.series[1].range_id, second.id);
    // No gap filling: the second range keeps only its own two buckets.
    assert_eq!(
        result.series[1].points,
        vec![(date(2024, 3, 1), 9.0), (date(2024, 3, 3), 7.0)]
    );
}

#[tokio::test]
async fn test_fill_date_gaps_inserts_zero_buckets() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let first = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 0);
    let mut second = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 1);
    second.fill_date_gaps = true;
    let chart = chart(vec![first.clone(), second.clone()]);

    let exec_first = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-01", 1.0), ("2024-03-02", 2.0), ("2024-03-03", 3.0)]),
    )]);
    let exec_second = FakeExecutor::new(vec![output(
        &["x", "y"],
        xy_rows(&[("2024-03-01", 9.0), ("2024-03-03", 7.0)]),
    )]);

    let result = chart_data(
        &chart,
        vec![
            RangeJob {
                range: &first,
                dataset: &dataset,
                report: &report,
                opts: pg(),
                executor: &exec_first,
            },
            RangeJob {
                range: &second,
                dataset: &dataset,
                report: &report,
                opts: pg(),
                executor: &exec_second,
            },
        ],
    )
    .await
    .unwrap();

    // The gap day is synthesized with a zero value.
    assert_eq!(
        result.series[1].points,
        vec![
            (date(2024, 3, 1), 9.0),
            (date(2024, 3, 2), 0.0),
            (date(2024, 3, 3), 7.0),
        ]
    );
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_chart_without_ranges_is_rejected() {
    let chart = chart(vec![]);
    let err = chart_data(&chart, vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        ChartError::Model(ModelError::ChartWithoutRanges { .. })
    ));
}

#[tokio::test]
async fn test_non_date_x_value_is_a_data_error() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let chart_id = Uuid::new_v4();
    let r = range(chart_id, &report, &dataset, Aggregator::Sum, DateInterval::Day, 0);
    let chart = chart(vec![r.clone()]);

    let executor = FakeExecutor::new(vec![output(
        &["x", "y"],
        vec![vec![json!("not a date"), json!(1.0)]],
    )]);

    let err = chart_data(
        &chart,
        vec![RangeJob {
            range: &r,
            dataset: &dataset,
            report: &report,
            opts: pg(),
            executor: &executor,
        }],
    )
    .await
    .unwrap_err();

    match err {
        ChartError::Data { range: failed, .. } => assert_eq!(failed, r.id),
        other => panic!("expected data error, got {:?}", other),
    }
}
