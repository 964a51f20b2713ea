//! Report definitions: an end user's selection of dataset columns with
//! filters, groupings, sort and pagination settings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dataset::Dataset;
use super::order::Ordered;
use super::types::{Aggregator, DateInterval, FilterOperator, OperatorArity, SortDirection};
use super::ModelError;

/// An end-user report over one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub dataset_id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Hard cap on returned rows, applied on top of pagination.
    pub row_limit: Option<u64>,
    /// Selected columns in display order.
    pub selection: Vec<SelectedColumn>,
    pub filters: Vec<ReportFilter>,
    pub groups: Vec<ReportGroup>,
    pub sort_column_id: Option<Uuid>,
    pub sort_dir: SortDirection,
}

impl Report {
    /// Filters in ascending display order.
    pub fn ordered_filters(&self) -> Vec<&ReportFilter> {
        let mut filters: Vec<&ReportFilter> = self.filters.iter().collect();
        filters.sort_by_key(|f| f.position);
        filters
    }

    /// Groups in ascending display order.
    pub fn ordered_groups(&self) -> Vec<&ReportGroup> {
        let mut groups: Vec<&ReportGroup> = self.groups.iter().collect();
        groups.sort_by_key(|g| g.position);
        groups
    }

    /// Whether the given column id is a grouping column.
    pub fn is_grouped_by(&self, column_id: Uuid) -> bool {
        self.groups.iter().any(|g| g.column_id == column_id)
    }

    /// Validate that every referenced column belongs to the report's dataset.
    pub fn validate_against(&self, dataset: &Dataset) -> Result<(), ModelError> {
        if self.dataset_id != dataset.id {
            return Err(ModelError::DatasetMismatch {
                report: self.id,
                dataset: dataset.id,
            });
        }

        let check = |column_id: Uuid| -> Result<(), ModelError> {
            if dataset.column(column_id).is_none() {
                return Err(ModelError::UnknownColumnRef {
                    report: self.id,
                    column: column_id,
                });
            }
            Ok(())
        };

        for sel in &self.selection {
            check(sel.column_id)?;
        }
        for filter in &self.filters {
            check(filter.column_id)?;
        }
        for group in &self.groups {
            check(group.column_id)?;
        }
        if let Some(sort_id) = self.sort_column_id {
            check(sort_id)?;
        }

        Ok(())
    }
}

/// One selected column of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedColumn {
    pub column_id: Uuid,
    /// Aggregator applied when the report has groupings and this column
    /// is not itself a grouping column.
    pub aggregator: Option<Aggregator>,
    /// Display/export width hint, passed through to column metadata.
    pub width: Option<u32>,
}

/// One filter predicate of a report.
///
/// Criteria are the raw values the user typed; the compiler parses them
/// against the target column's declared data type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportFilter {
    pub id: Uuid,
    pub report_id: Uuid,
    pub column_id: Uuid,
    pub operator: FilterOperator,
    /// Zero, one, two or more values depending on the operator.
    pub criteria: Vec<String>,
    /// Bucket unit for the `DateInterval` operator, unused otherwise.
    pub interval: Option<DateInterval>,
    /// Dense 0-based display order among the report's filters.
    pub position: u32,
}

impl ReportFilter {
    /// Check criteria count against the operator's arity.
    pub fn arity_ok(&self) -> bool {
        match self.operator.arity() {
            OperatorArity::None => self.criteria.is_empty(),
            OperatorArity::One => self.criteria.len() == 1,
            OperatorArity::Two => self.criteria.len() == 2,
            OperatorArity::OneOrMore => !self.criteria.is_empty(),
        }
    }
}

impl Ordered for ReportFilter {
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

/// One grouping column of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportGroup {
    pub id: Uuid,
    pub report_id: Uuid,
    pub column_id: Uuid,
    /// Dense 0-based display order among the report's groups.
    pub position: u32,
}

impl Ordered for ReportGroup {
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}
