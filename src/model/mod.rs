//! Metadata model: datasets, reports and charts.
//!
//! These entities live in the application's own metadata store (see
//! [`crate::store`]) and describe *how* to query administrator-configured
//! target databases. They are treated as immutable snapshots once a
//! compilation starts.

pub mod chart;
pub mod dataset;
pub mod order;
pub mod report;
pub mod types;

pub use chart::{Chart, ChartRange};
pub use dataset::{Dataset, DatasetColumn, DatasetJoin, JoinKey};
pub use order::Ordered;
pub use report::{Report, ReportFilter, ReportGroup, SelectedColumn};
pub use types::{
    Aggregator, ChartKind, DataType, DateInterval, FilterOperator, FilterType, JoinKind,
    OperatorArity, SortDirection, SourceKind, SqlFragment,
};

use thiserror::Error;
use uuid::Uuid;

/// Structural validation failures on model entities.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("dataset {dataset} has an empty primary source")]
    EmptySource { dataset: Uuid },

    #[error("dataset {dataset} is a proc source and cannot carry conditions")]
    ProcWithConditions { dataset: Uuid },

    #[error("dataset {dataset} is a proc source and cannot carry joins")]
    ProcWithJoins { dataset: Uuid },

    #[error("column {column} has neither a physical name nor a derived expression")]
    UnboundColumn { column: Uuid },

    #[error("join {join} has no key pairs")]
    JoinWithoutKeys { join: Uuid },

    #[error("child {child} does not belong to parent {parent}")]
    ForeignChild { parent: Uuid, child: Uuid },

    #[error("report {report} does not belong to dataset {dataset}")]
    DatasetMismatch { report: Uuid, dataset: Uuid },

    #[error("report {report} references unknown column {column}")]
    UnknownColumnRef { report: Uuid, column: Uuid },

    #[error("chart {chart} has no ranges")]
    ChartWithoutRanges { chart: Uuid },
}
