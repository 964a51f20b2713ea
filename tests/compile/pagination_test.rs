//! Integration tests for pagination: native LIMIT/OFFSET, T-SQL
//! OFFSET FETCH, the report row cap, and ROW_NUMBER emulation for
//! targets without native OFFSET.

#[path = "../common/mod.rs"]
mod common;

use common::{orders_dataset, pg, report_for, tsql, tsql_no_offset};
use quarry::compile::{compile_report_query, CompileOptions, Page};
use quarry::sql::Dialect;

#[test]
fn test_postgres_native_pagination() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let page = Page {
        offset: 50,
        limit: 25,
    };

    let stmt = compile_report_query(&dataset, &report, Some(page), pg()).unwrap();
    assert!(stmt.sql.contains("LIMIT 25"));
    assert!(stmt.sql.contains("OFFSET 50"));
    assert!(stmt.sql.contains("ORDER BY"), "paged queries must sort: {}", stmt.sql);
}

#[test]
fn test_tsql_native_pagination() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let page = Page {
        offset: 50,
        limit: 25,
    };

    let stmt = compile_report_query(&dataset, &report, Some(page), tsql()).unwrap();
    assert!(stmt.sql.contains("OFFSET 50 ROWS"));
    assert!(stmt.sql.contains("FETCH NEXT 25 ROWS ONLY"));
}

#[test]
fn test_mysql_native_pagination() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let page = Page {
        offset: 10,
        limit: 5,
    };
    let opts = CompileOptions {
        dialect: Dialect::MySql,
        supports_offset: true,
    };

    let stmt = compile_report_query(&dataset, &report, Some(page), opts).unwrap();
    assert!(stmt.sql.contains("LIMIT 5 OFFSET 10"));
}

#[test]
fn test_row_limit_caps_page_limit() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.row_limit = Some(10);
    let page = Page {
        offset: 0,
        limit: 100,
    };

    let stmt = compile_report_query(&dataset, &report, Some(page), pg()).unwrap();
    assert!(stmt.sql.contains("LIMIT 10"));
    assert!(!stmt.sql.contains("LIMIT 100"));
}

#[test]
fn test_row_limit_applies_without_page() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.row_limit = Some(500);

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert!(stmt.sql.contains("LIMIT 500"));
    assert!(!stmt.sql.contains("OFFSET"));
}

#[test]
fn test_no_page_no_cap_means_no_pagination() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);

    let stmt = compile_report_query(&dataset, &report, None, pg()).unwrap();
    assert!(!stmt.sql.contains("LIMIT"));
    assert!(!stmt.sql.contains("OFFSET"));
}

// ============================================================================
// ROW_NUMBER emulation
// ============================================================================

#[test]
fn test_emulated_pagination_band() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let page = Page {
        offset: 50,
        limit: 25,
    };

    let stmt = compile_report_query(&dataset, &report, Some(page), tsql_no_offset()).unwrap();
    assert!(stmt.sql.contains("ROW_NUMBER() OVER (ORDER BY [Orders].[Total] ASC)"));
    assert!(stmt.sql.contains("[_rn] > 50"));
    assert!(stmt.sql.contains("[_rn] <= 75"));
    assert!(stmt.sql.contains("ORDER BY [_rn]"));
    assert!(!stmt.sql.contains("FETCH NEXT"));
    assert!(!stmt.sql.contains("OFFSET 50"));
}

#[test]
fn test_emulation_covers_limit_only() {
    let dataset = orders_dataset();
    let mut report = report_for(&dataset);
    report.row_limit = Some(100);

    let stmt = compile_report_query(&dataset, &report, None, tsql_no_offset()).unwrap();
    // A bare cap still needs the wrap: FETCH requires OFFSET support.
    assert!(stmt.sql.contains("ROW_NUMBER() OVER"));
    assert!(stmt.sql.contains("[_rn] > 0"));
    assert!(stmt.sql.contains("[_rn] <= 100"));
}

#[test]
fn test_emulated_and_native_return_same_params() {
    let dataset = orders_dataset();
    let report = report_for(&dataset);
    let page = Page {
        offset: 50,
        limit: 25,
    };

    let native = compile_report_query(&dataset, &report, Some(page), tsql()).unwrap();
    let emulated = compile_report_query(&dataset, &report, Some(page), tsql_no_offset()).unwrap();
    // The band bounds are literals, not parameters
    assert_eq!(native.params, emulated.params);
}
