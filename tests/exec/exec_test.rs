//! Integration tests for report execution: result shaping, counting,
//! lookup substitution, deadlines and CSV export.

#[path = "../common/mod.rs"]
mod common;

use std::time::Duration;

use chrono::NaiveDate;
use common::{
    add_status_lookup, column, column_id, orders_dataset, output, pg, report_for, FakeExecutor,
};
use quarry::compile::Page;
use quarry::exec::export::export_csv;
use quarry::exec::{run_report, Cell, ExecError};
use quarry::model::{DataType, Dataset, FilterType, SourceKind};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_run_report_shapes_rows_and_counts() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    // One data page plus a count result
    let executor = FakeExecutor::new(vec![
        output(
            &["Total", "Name", "Placed", "Open"],
            vec![
                vec![json!(19.5), json!("Acme"), json!("2024-03-07"), json!(true)],
                vec![json!(7.0), json!("Globex"), json!("2024-03-08"), json!(false)],
            ],
        ),
        output(&["count"], vec![vec![json!(42)]]),
    ]);

    let envelope = run_report(&dataset, &report, None, pg(), &executor, None)
        .await
        .unwrap();

    assert_eq!(envelope.total, 42);
    assert_eq!(envelope.rows.len(), 2);
    assert_eq!(envelope.rows[0][0], Cell::Float(19.5));
    assert_eq!(envelope.rows[0][1], Cell::Text("Acme".into()));
    assert_eq!(
        envelope.rows[0][2],
        Cell::Date(NaiveDate::from_ymd_opt(2024, 3, 7).unwrap())
    );
    assert_eq!(envelope.rows[1][3], Cell::Bool(false));
    assert!(envelope.conversion_issues.is_empty());

    let titles: Vec<&str> = envelope.columns.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, vec!["Total", "Name", "Placed", "Open"]);

    // Data query first, count query second
    let sql = executor.recorded_sql();
    assert_eq!(sql.len(), 2);
    assert!(sql[0].starts_with("SELECT \"Orders\".\"Total\""));
    assert!(sql[1].starts_with("SELECT COUNT(*)"));
}

#[tokio::test]
async fn test_proc_total_is_materialized_row_count() {
    let id = Uuid::new_v4();
    let dataset = Dataset {
        id,
        name: "Monthly Sales".into(),
        database_id: Uuid::new_v4(),
        source: "monthly_sales".into(),
        source_kind: SourceKind::Proc,
        conditions: None,
        date_format: None,
        currency_format: None,
        columns: vec![column(id, "Total", "Total", DataType::Currency, FilterType::Numeric)],
        joins: vec![],
        roles: vec![],
    };
    let report = report_for(&dataset);

    let executor = FakeExecutor::new(vec![output(
        &["Total"],
        vec![vec![json!(1.0)], vec![json!(2.0)], vec![json!(3.0)]],
    )]);

    let envelope = run_report(&dataset, &report, None, pg(), &executor, None)
        .await
        .unwrap();

    assert_eq!(envelope.total, 3);
    // No COUNT(*) round trip for procs
    assert_eq!(executor.recorded_sql().len(), 1);
}

#[tokio::test]
async fn test_deadline_cancels_and_reports_timeout() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let executor =
        FakeExecutor::new(vec![output(&[], vec![])]).with_delay(Duration::from_secs(5));

    let err = run_report(
        &dataset,
        &report,
        None,
        pg(),
        &executor,
        Some(Duration::from_millis(20)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExecError::Timeout(_)));
    assert!(err.is_retriable());
    assert!(executor.was_cancelled());
}

#[tokio::test]
async fn test_bad_cell_on_plain_column_becomes_null_issue() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let executor = FakeExecutor::new(vec![
        output(
            &["Total", "Name", "Placed", "Open"],
            vec![vec![json!("not-a-number"), json!("Acme"), json!("2024-03-07"), json!(true)]],
        ),
        output(&["count"], vec![vec![json!(1)]]),
    ]);

    let envelope = run_report(&dataset, &report, None, pg(), &executor, None)
        .await
        .unwrap();

    assert_eq!(envelope.rows[0][0], Cell::Null);
    assert_eq!(envelope.conversion_issues.len(), 1);
    assert_eq!(envelope.conversion_issues[0].column, "Total");
    assert_eq!(envelope.conversion_issues[0].row, 0);
}

#[tokio::test]
async fn test_bad_cell_on_sort_key_aborts() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.sort_column_id = Some(column_id(&dataset, "Total"));

    let executor = FakeExecutor::new(vec![
        output(
            &["Total", "Name", "Placed", "Open"],
            vec![vec![json!("broken"), json!("Acme"), json!("2024-03-07"), json!(true)]],
        ),
        output(&["count"], vec![vec![json!(1)]]),
    ]);

    let err = run_report(&dataset, &report, None, pg(), &executor, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExecError::ValueConversion { .. }));
    assert!(err.is_user_error());
}

#[tokio::test]
async fn test_lookup_substitution_replaces_values_with_labels() {
    let mut dataset = orders_dataset();
    let status_id = add_status_lookup(&mut dataset);
    let mut report = report_for(&dataset);
    report.selection.retain(|s| s.column_id == status_id);
    report.sort_column_id = None;

    let executor = FakeExecutor::new(vec![
        // data: raw status ids
        output(&["Status"], vec![vec![json!(1)], vec![json!(2)], vec![json!(9)]]),
        // count
        output(&["count"], vec![vec![json!(3)]]),
        // lookup query result: (value, label)
        output(
            &["Id", "Label"],
            vec![
                vec![json!(1), json!("Open")],
                vec![json!(2), json!("Shipped")],
            ],
        ),
    ]);

    let envelope = run_report(&dataset, &report, None, pg(), &executor, None)
        .await
        .unwrap();

    assert_eq!(envelope.rows[0][0], Cell::Text("Open".into()));
    assert_eq!(envelope.rows[1][0], Cell::Text("Shipped".into()));
    // Unmapped values pass through untouched
    assert_eq!(envelope.rows[2][0], Cell::Int(9));

    let sql = executor.recorded_sql();
    assert!(sql.iter().any(|s| s == "SELECT Id, Label FROM OrderStatuses"));
}

#[tokio::test]
async fn test_pagination_passes_through() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let executor = FakeExecutor::new(vec![
        output(&["Total", "Name", "Placed", "Open"], vec![]),
        output(&["count"], vec![vec![json!(500)]]),
    ]);

    let page = Page {
        offset: 100,
        limit: 50,
    };
    let envelope = run_report(&dataset, &report, Some(page), pg(), &executor, None)
        .await
        .unwrap();

    assert_eq!(envelope.total, 500);
    let sql = executor.recorded_sql();
    assert!(sql[0].contains("LIMIT 50"));
    assert!(sql[0].contains("OFFSET 100"));
    // The count query ignores the page
    assert!(!sql[1].contains("LIMIT"));
}

// ============================================================================
// CSV export
// ============================================================================

#[tokio::test]
async fn test_export_csv_writes_header_and_rows() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let total_id = column_id(&dataset, "Total");
    let name_id = column_id(&dataset, "Name");
    report
        .selection
        .retain(|s| s.column_id == total_id || s.column_id == name_id);

    let executor = FakeExecutor::new(vec![output(
        &["Total", "Name"],
        vec![
            vec![json!(19.5), json!("Acme")],
            vec![json!(7.0), serde_json::Value::Null],
        ],
    )]);

    let mut buf: Vec<u8> = vec![];
    let written = export_csv(&dataset, &report, pg(), &executor, &mut buf)
        .await
        .unwrap();

    assert_eq!(written, 2);
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Total,Name");
    assert_eq!(lines[1], "19.5,Acme");
    assert_eq!(lines[2], "7,");

    // Short first page ends the loop after one round trip
    assert_eq!(executor.recorded_sql().len(), 1);
}

#[tokio::test]
async fn test_export_csv_pages_until_short_page() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let total_id = column_id(&dataset, "Total");
    report.selection.retain(|s| s.column_id == total_id);

    // First page exactly full (1000 rows), second page short
    let full: Vec<Vec<serde_json::Value>> = (0..1000).map(|i| vec![json!(i)]).collect();
    let executor = FakeExecutor::new(vec![
        output(&["Total"], full),
        output(&["Total"], vec![vec![json!(1000)]]),
    ]);

    let mut buf: Vec<u8> = vec![];
    let written = export_csv(&dataset, &report, pg(), &executor, &mut buf)
        .await
        .unwrap();

    assert_eq!(written, 1001);
    let sql = executor.recorded_sql();
    assert_eq!(sql.len(), 2);
    assert!(!sql[0].contains("OFFSET"));
    assert!(sql[1].contains("OFFSET 1000"));
}

#[tokio::test]
async fn test_export_stops_at_row_limit() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let total_id = column_id(&dataset, "Total");
    report.selection.retain(|s| s.column_id == total_id);
    report.row_limit = Some(1000);

    // The backend holds more rows than the cap allows.
    let full: Vec<Vec<serde_json::Value>> = (0..1000).map(|i| vec![json!(i)]).collect();
    let extra: Vec<Vec<serde_json::Value>> = (0..500).map(|i| vec![json!(i)]).collect();
    let executor = FakeExecutor::new(vec![output(&["Total"], full), output(&["Total"], extra)]);

    let mut buf: Vec<u8> = vec![];
    let written = export_csv(&dataset, &report, pg(), &executor, &mut buf)
        .await
        .unwrap();

    assert_eq!(written, 1000);
    // The cap is exhausted after one full page; no second round trip.
    assert_eq!(executor.recorded_sql().len(), 1);
}

#[tokio::test]
async fn test_export_row_limit_shrinks_final_page() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let total_id = column_id(&dataset, "Total");
    report.selection.retain(|s| s.column_id == total_id);
    report.row_limit = Some(1500);

    let full: Vec<Vec<serde_json::Value>> = (0..1000).map(|i| vec![json!(i)]).collect();
    let tail: Vec<Vec<serde_json::Value>> = (0..500).map(|i| vec![json!(i)]).collect();
    let executor = FakeExecutor::new(vec![output(&["Total"], full), output(&["Total"], tail)]);

    let mut buf: Vec<u8> = vec![];
    let written = export_csv(&dataset, &report, pg(), &executor, &mut buf)
        .await
        .unwrap();

    assert_eq!(written, 1500);
    let sql = executor.recorded_sql();
    assert_eq!(sql.len(), 2);
    assert!(sql[1].contains("LIMIT 500"));
    assert!(sql[1].contains("OFFSET 1000"));
}
