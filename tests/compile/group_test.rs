//! Integration tests for grouped reports: aggregation of non-group
//! columns, GROUP BY ordering and sorting on aggregates.

#[path = "../common/mod.rs"]
mod common;

use common::{column_id, orders_dataset, pg, report_for};
use quarry::compile::{compile_count_query, compile_report_query, CompileError};
use quarry::model::{Aggregator, ReportGroup, SortDirection};
use uuid::Uuid;

fn group(report_id: Uuid, column_id: Uuid, position: u32) -> ReportGroup {
    ReportGroup {
        id: Uuid::new_v4(),
        report_id,
        column_id,
        position,
    }
}

#[test]
fn test_non_group_columns_are_aggregated() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let name_id = column_id(&dataset, "Name");
    let total_id = column_id(&dataset, "Total");

    report.selection.retain(|s| s.column_id == name_id || s.column_id == total_id);
    for sel in &mut report.selection {
        if sel.column_id == total_id {
            sel.aggregator = Some(Aggregator::Sum);
        }
    }
    report.groups.push(group(report.id, name_id, 0));

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert!(stmt.sql.contains("SUM(\"Orders\".\"Total\") AS \"Total\""));
    assert!(stmt.sql.contains("\"Customers\".\"Name\" AS \"Name\""));
    assert!(stmt.sql.contains("GROUP BY \"Customers\".\"Name\""));
}

#[test]
fn test_each_aggregator_emits_its_function() {
    let dataset = orders_dataset();
    let name_id = column_id(&dataset, "Name");
    let total_id = column_id(&dataset, "Total");

    for (agg, func) in [
        (Aggregator::Sum, "SUM"),
        (Aggregator::Avg, "AVG"),
        (Aggregator::Count, "COUNT"),
        (Aggregator::Min, "MIN"),
        (Aggregator::Max, "MAX"),
    ] {
        let mut report = report_for(&dataset);
        report.selection.retain(|s| s.column_id == name_id || s.column_id == total_id);
        for sel in &mut report.selection {
            if sel.column_id == total_id {
                sel.aggregator = Some(agg);
            }
        }
        report.groups.push(group(report.id, name_id, 0));

        let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
        assert!(
            stmt.sql.contains(&format!("{}(\"Orders\".\"Total\")", func)),
            "{:?}: {}",
            agg,
            stmt.sql
        );
    }
}

#[test]
fn test_group_columns_keep_display_order() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let name_id = column_id(&dataset, "Name");
    let placed_id = column_id(&dataset, "Placed");

    report
        .selection
        .retain(|s| s.column_id == name_id || s.column_id == placed_id);
    // Groups pushed out of order; position decides.
    report.groups.push(group(report.id, placed_id, 1));
    report.groups.push(group(report.id, name_id, 0));

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    let clause_start = stmt.sql.find("GROUP BY").unwrap();
    let clause = &stmt.sql[clause_start..];
    let name_pos = clause.find("\"Customers\".\"Name\"").unwrap();
    let placed_pos = clause.find("\"Orders\".\"PlacedAt\"").unwrap();
    assert!(name_pos < placed_pos, "{}", clause);
}

#[test]
fn test_missing_aggregator_fails() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let name_id = column_id(&dataset, "Name");
    report.groups.push(group(report.id, name_id, 0));

    // Total / Placed / Open are selected but carry no aggregator
    let err = compile_report_query(&dataset, &report, None, pg()).unwrap_err();
    assert!(matches!(err, CompileError::MissingAggregator { .. }));
}

#[test]
fn test_sort_on_aggregated_column() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let name_id = column_id(&dataset, "Name");
    let total_id = column_id(&dataset, "Total");

    report.selection.retain(|s| s.column_id == name_id || s.column_id == total_id);
    for sel in &mut report.selection {
        if sel.column_id == total_id {
            sel.aggregator = Some(Aggregator::Sum);
        }
    }
    report.groups.push(group(report.id, name_id, 0));
    report.sort_column_id = Some(total_id);
    report.sort_dir = SortDirection::Desc;

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert!(stmt.sql.contains("ORDER BY SUM(\"Orders\".\"Total\") DESC"));
}

#[test]
fn test_grouped_count_counts_groups() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    let name_id = column_id(&dataset, "Name");
    let total_id = column_id(&dataset, "Total");

    report.selection.retain(|s| s.column_id == name_id || s.column_id == total_id);
    for sel in &mut report.selection {
        if sel.column_id == total_id {
            sel.aggregator = Some(Aggregator::Sum);
        }
    }
    report.groups.push(group(report.id, name_id, 0));

    let stmt = compile_count_query(&dataset, &report, pg()).unwrap();
    assert!(stmt.sql.starts_with("SELECT COUNT(*)"));
    // GROUP BY stays inside the subquery so the count is group rows
    assert!(stmt.sql.contains("GROUP BY \"Customers\".\"Name\""));
    assert!(stmt.sql.contains(") AS \"sub\""));
}
