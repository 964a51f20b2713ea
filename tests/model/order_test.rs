//! Integration tests for display-order maintenance across the real
//! ordered model types (filters, groups, chart ranges).

use quarry::model::order::{next_position, remove_and_reindex, reindex};
use quarry::model::{
    Aggregator, ChartRange, DateInterval, FilterOperator, ReportFilter, ReportGroup,
};
use uuid::Uuid;

fn filter(report_id: Uuid, position: u32) -> ReportFilter {
    ReportFilter {
        id: Uuid::new_v4(),
        report_id,
        column_id: Uuid::new_v4(),
        operator: FilterOperator::Eq,
        criteria: vec!["x".into()],
        interval: None,
        position,
    }
}

fn group(report_id: Uuid, position: u32) -> ReportGroup {
    ReportGroup {
        id: Uuid::new_v4(),
        report_id,
        column_id: Uuid::new_v4(),
        position,
    }
}

fn chart_range(chart_id: Uuid, position: u32) -> ChartRange {
    ChartRange {
        id: Uuid::new_v4(),
        chart_id,
        report_id: Uuid::new_v4(),
        x_column_id: Uuid::new_v4(),
        y_column_id: Uuid::new_v4(),
        aggregator: Aggregator::Sum,
        interval: DateInterval::Day,
        fill_date_gaps: false,
        color: None,
        position,
    }
}

#[test]
fn test_filters_reindex_preserves_relative_order() {
    let report_id = Uuid::new_v4();
    let mut filters = vec![filter(report_id, 5), filter(report_id, 1), filter(report_id, 9)];
    let middle = filters[0].id;

    reindex(&mut filters);

    let positions: Vec<u32> = filters.iter().map(|f| f.position).collect();
    assert_eq!(positions, [0, 1, 2]);
    // Position 5 lands between 1 and 9.
    assert_eq!(filters[1].id, middle);
}

#[test]
fn test_group_removal_recompacts_siblings() {
    let report_id = Uuid::new_v4();
    let mut groups = vec![group(report_id, 0), group(report_id, 1), group(report_id, 2)];
    let victim = groups[0].id;
    let survivor = groups[1].id;

    let removed = remove_and_reindex(&mut groups, victim, |g| g.id).unwrap();
    assert_eq!(removed.id, victim);

    let positions: Vec<u32> = groups.iter().map(|g| g.position).collect();
    assert_eq!(positions, [0, 1]);
    assert_eq!(groups[0].id, survivor);
}

#[test]
fn test_removing_unknown_id_leaves_ranges_untouched() {
    let chart_id = Uuid::new_v4();
    let mut ranges = vec![chart_range(chart_id, 0), chart_range(chart_id, 1)];

    assert!(remove_and_reindex(&mut ranges, Uuid::new_v4(), |r| r.id).is_none());
    assert_eq!(ranges.len(), 2);
    let positions: Vec<u32> = ranges.iter().map(|r| r.position).collect();
    assert_eq!(positions, [0, 1]);
}

#[test]
fn test_next_position_appends_densely() {
    let chart_id = Uuid::new_v4();
    let mut ranges: Vec<ChartRange> = vec![];
    assert_eq!(next_position(&ranges), 0);

    ranges.push(chart_range(chart_id, next_position(&ranges)));
    ranges.push(chart_range(chart_id, next_position(&ranges)));
    assert_eq!(ranges[1].position, 1);

    let victim = ranges[0].id;
    remove_and_reindex(&mut ranges, victim, |r| r.id);
    assert_eq!(next_position(&ranges), 1);
}
