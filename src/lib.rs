//! # Quarry
//!
//! An embeddable ad-hoc reporting and charting engine.
//!
//! Administrators define datasets (a primary table or stored procedure,
//! joins, typed columns) over target databases; end users compose
//! reports and charts on top of them without writing SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │       Metadata (datasets, reports, charts, configs)      │
//! │                     [model] + [store]                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile]
//! ┌─────────────────────────────────────────────────────────┐
//! │        Parameterized SQL (multi-dialect, via [sql])      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [exec] / [chart]
//! ┌─────────────────────────────────────────────────────────┐
//! │      Driver worker process (NDJSON stdio, [worker])      │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │    Typed result envelopes, CSV export, chart series      │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`engine::Engine`] is the facade tying the layers together; every
//! layer is also usable on its own.

pub mod catalog;
pub mod chart;
pub mod compile;
pub mod config;
pub mod engine;
pub mod exec;
pub mod model;
pub mod sql;
pub mod store;
pub mod worker;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::catalog::{ColumnCandidate, Introspector, SourceEntry};
    pub use crate::chart::{ChartSeries, RangeJob, RangeSeries};
    pub use crate::compile::{
        compile_chart_query, compile_count_query, compile_export_query, compile_report_query,
        CompileError, CompileOptions, Page,
    };
    pub use crate::config::{DatabaseConfig, Driver};
    pub use crate::engine::{Engine, EngineError, ExecutorProvider, WorkerProvider};
    pub use crate::exec::{
        run_report, Cell, ColumnMeta, ExecError, Executor, QueryOutput, ResultEnvelope,
    };
    pub use crate::model::{
        Aggregator, Chart, ChartKind, ChartRange, DataType, Dataset, DatasetColumn, DatasetJoin,
        DateInterval, FilterOperator, FilterType, JoinKind, Report, ReportFilter, ReportGroup,
        SelectedColumn, SortDirection, SourceKind, SqlFragment,
    };
    pub use crate::sql::{Dialect, ParamValue, SqlDialect, Statement};
    pub use crate::store::{MemoryStore, MetadataStore, StoreError};
    pub use crate::worker::{WorkerClient, WorkerError, WorkerExecutor};
}

// Also export the most-used types at the crate root
pub use compile::{CompileOptions, Page};
pub use engine::Engine;
pub use exec::{ExecError, ResultEnvelope};
pub use model::{Chart, Dataset, Report};
pub use sql::{Dialect, ParamValue, Statement};
