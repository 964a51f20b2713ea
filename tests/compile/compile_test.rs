//! Integration tests for report compilation: selection, joins, derived
//! columns, procs and per-dialect SQL output.

#[path = "../common/mod.rs"]
mod common;

use common::{column, column_id, orders_dataset, pg, report_for, tsql};
use quarry::compile::{
    compile_chart_query, compile_export_query, compile_report_query, CompileError, CompileOptions,
    Page,
};
use quarry::model::{
    DataType, Dataset, FilterOperator, FilterType, ReportFilter, SourceKind, SqlFragment,
};
use quarry::sql::{Dialect, ParamValue};
use uuid::Uuid;

// ============================================================================
// Basic compilation
// ============================================================================

#[test]
fn test_join_filter_scenario() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Total"),
        operator: FilterOperator::Gte,
        criteria: vec!["100".into()],
        interval: None,
        position: 0,
    });

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();

    assert!(stmt.sql.contains("\"Orders\".\"Total\" AS \"Total\""));
    assert!(stmt.sql.contains("\"Customers\".\"Name\" AS \"Name\""));
    assert_eq!(stmt.sql.matches("LEFT JOIN").count(), 1);
    assert!(stmt
        .sql
        .contains("ON \"Orders\".\"CustomerId\" = \"Customers\".\"Id\""));
    assert!(stmt.sql.contains("\"Orders\".\"Total\" >= $1"));
    assert_eq!(stmt.params, vec![ParamValue::Float(100.0)]);
}

#[test]
fn test_selection_order_is_preserved() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.selection.reverse();

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    let open = stmt.sql.find("AS \"Open\"").unwrap();
    let total = stmt.sql.find("AS \"Total\"").unwrap();
    assert!(open < total, "reversed selection must emit Open first: {}", stmt.sql);
}

#[test]
fn test_derived_column_wrapped_in_parens() {
    let mut dataset = orders_dataset();
    let mut margin = column(
        dataset.id,
        "Margin",
        "unused",
        DataType::Currency,
        FilterType::Numeric,
    );
    margin.column_name = None;
    margin.derived = Some(SqlFragment::new("Orders.Total - Orders.Cost"));
    dataset.columns.push(margin);

    let report = report_for(&dataset);
    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert!(stmt.sql.contains("(Orders.Total - Orders.Cost) AS \"Margin\""));
}

#[test]
fn test_dataset_conditions_precede_filters() {
    let mut dataset = orders_dataset();
    dataset.conditions = Some(SqlFragment::new("Orders.Deleted = 0"));
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Name"),
        operator: FilterOperator::Eq,
        criteria: vec!["Acme".into()],
        interval: None,
        position: 0,
    });

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    let cond = stmt.sql.find("(Orders.Deleted = 0)").unwrap();
    let filt = stmt.sql.find("\"Customers\".\"Name\" = $1").unwrap();
    assert!(cond < filt);
}

#[test]
fn test_empty_selection_rejected() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.selection.clear();
    report.sort_column_id = None;

    let err = compile_report_query(&dataset, &report, None, pg()).unwrap_err();
    assert!(matches!(err, CompileError::ColumnResolution { .. }));
}

#[test]
fn test_unknown_column_reference_is_a_resolution_error() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: Uuid::new_v4(),
        operator: FilterOperator::Eq,
        criteria: vec!["x".into()],
        interval: None,
        position: 0,
    });

    let err = compile_report_query(&dataset, &report, None, pg()).unwrap_err();
    assert!(matches!(err, CompileError::ColumnResolution { .. }));

    // A structurally broken report is still a model error.
    let mut foreign = report_for(&dataset);
    foreign.dataset_id = Uuid::new_v4();
    let err = compile_report_query(&dataset, &foreign, None, pg()).unwrap_err();
    assert!(matches!(err, CompileError::InvalidModel(_)));
}

#[test]
fn test_identical_inputs_compile_identically() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Placed"),
        operator: FilterOperator::Gte,
        criteria: vec!["2024-01-01".into()],
        interval: None,
        position: 0,
    });

    let a = compile_report_query(&dataset, &report, None, pg()).unwrap();
    let b = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert_eq!(a, b);
}

// ============================================================================
// Dialect differences
// ============================================================================

#[test]
fn test_mysql_uses_backticks_and_positional_placeholders() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Total"),
        operator: FilterOperator::Lt,
        criteria: vec!["10".into()],
        interval: None,
        position: 0,
    });

    let opts = CompileOptions {
        dialect: Dialect::MySql,
        supports_offset: true,
    };
    let stmt = compile_report_query(&dataset, &report, None, opts).unwrap();
    assert!(stmt.sql.contains("`Orders`.`Total` < ?"));
    assert!(!stmt.sql.contains("$1"));
}

#[test]
fn test_tsql_uses_brackets_and_named_placeholders() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Total"),
        operator: FilterOperator::Lt,
        criteria: vec!["10".into()],
        interval: None,
        position: 0,
    });

    let stmt = compile_report_query(&dataset, &report, None, tsql()).unwrap();
    assert!(stmt.sql.contains("[Orders].[Total] < @p1"));
}

// ============================================================================
// Proc sources
// ============================================================================

fn proc_dataset() -> Dataset {
    let id = Uuid::new_v4();
    let mut from_col = column(id, "FromDate", "from_date", DataType::Date, FilterType::Date);
    from_col.is_param = true;
    let mut to_col = column(id, "ToDate", "to_date", DataType::Date, FilterType::Date);
    to_col.is_param = true;
    Dataset {
        id,
        name: "Monthly Sales".into(),
        database_id: Uuid::new_v4(),
        source: "monthly_sales".into(),
        source_kind: SourceKind::Proc,
        conditions: None,
        date_format: None,
        currency_format: None,
        columns: vec![
            from_col,
            to_col,
            column(id, "Total", "Total", DataType::Currency, FilterType::Numeric),
        ],
        joins: vec![],
        roles: vec![],
    }
}

#[test]
fn test_proc_tsql_named_arguments() {
    let dataset = proc_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "FromDate"),
        operator: FilterOperator::Eq,
        criteria: vec!["2024-01-01".into()],
        interval: None,
        position: 0,
    });

    let stmt = compile_report_query(&dataset, &report, None, tsql()).unwrap();
    assert_eq!(
        stmt.sql,
        "EXEC [monthly_sales] @from_date = @p1, @to_date = @p2"
    );
    assert_eq!(stmt.params.len(), 2);
    assert_eq!(stmt.params[1], ParamValue::Null);
}

#[test]
fn test_proc_ansi_call() {
    let dataset = proc_dataset();
    let report = report_for(&dataset);

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert_eq!(stmt.sql, "CALL \"monthly_sales\"($1, $2)");
    // No filters bound: both arguments are NULL
    assert_eq!(stmt.params, vec![ParamValue::Null, ParamValue::Null]);
}

// ============================================================================
// Export / chart statements
// ============================================================================

#[test]
fn test_export_query_keeps_order_drops_pagination() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let stmt = compile_export_query(&dataset, &report, pg()).unwrap();
    assert!(stmt.sql.contains("ORDER BY"));
    assert!(!stmt.sql.contains("LIMIT"));
    assert!(!stmt.sql.contains("OFFSET"));
}

#[test]
fn test_chart_query_selects_x_y_and_guards_null_x() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let stmt = compile_chart_query(
        &dataset,
        &report,
        column_id(&dataset, "Placed"),
        column_id(&dataset, "Total"),
        pg(),
    )
    .unwrap();

    assert!(stmt.sql.contains("\"Orders\".\"PlacedAt\" AS \"x\""));
    assert!(stmt.sql.contains("\"Orders\".\"Total\" AS \"y\""));
    assert!(stmt.sql.contains("\"Orders\".\"PlacedAt\" IS NOT NULL"));
    assert!(!stmt.sql.contains("ORDER BY"));
    assert!(!stmt.sql.contains("LIMIT"));
}

#[test]
fn test_chart_query_applies_report_filters() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.filters.push(ReportFilter {
        id: Uuid::new_v4(),
        report_id: report.id,
        column_id: column_id(&dataset, "Name"),
        operator: FilterOperator::Eq,
        criteria: vec!["Acme".into()],
        interval: None,
        position: 0,
    });

    let stmt = compile_chart_query(
        &dataset,
        &report,
        column_id(&dataset, "Placed"),
        column_id(&dataset, "Total"),
        pg(),
    )
    .unwrap();

    assert!(stmt.sql.contains("\"Customers\".\"Name\" = $1"));
    assert_eq!(stmt.params, vec![ParamValue::String("Acme".into())]);
}
