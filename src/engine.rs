//! The engine facade: one entry point per user-facing operation.
//!
//! Callers hand over entity ids and a role set; the engine loads the
//! snapshots from the metadata store, enforces dataset access, provisions
//! an executor for the right target database and delegates to the
//! compiler, the executor layer or the chart engine.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{self, CatalogError, ColumnCandidate, Introspector, SourceEntry, WorkerIntrospector};
use crate::chart::{self, ChartError, ChartSeries, RangeJob};
use crate::compile::{compile_report_query, CompileError, CompileOptions, Page};
use crate::config::DatabaseConfig;
use crate::exec::export::export_csv;
use crate::exec::{run_report, ExecError, Executor, ResultEnvelope};
use crate::model::{ChartRange, Dataset, Report};
use crate::sql::Statement;
use crate::store::{MetadataStore, StoreError};
use crate::worker::protocol::ConnectionParams;
use crate::worker::{WorkerClient, WorkerError, WorkerExecutor};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("access to dataset {dataset} denied")]
    AccessDenied { dataset: Uuid },

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

// =============================================================================
// Executor provisioning
// =============================================================================

/// Supplies executors and introspectors for target databases. The
/// production provider spawns one worker process and routes every
/// database through it; tests substitute fakes.
#[async_trait]
pub trait ExecutorProvider: Send + Sync {
    async fn executor_for(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn Executor>, WorkerError>;

    async fn introspector_for(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn Introspector>, WorkerError>;
}

/// [`ExecutorProvider`] over a shared worker process.
pub struct WorkerProvider {
    client: Arc<WorkerClient>,
}

impl WorkerProvider {
    pub fn new(client: Arc<WorkerClient>) -> Self {
        Self { client }
    }

    fn connection(config: &DatabaseConfig) -> ConnectionParams {
        config.connection_params()
    }
}

#[async_trait]
impl ExecutorProvider for WorkerProvider {
    async fn executor_for(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn Executor>, WorkerError> {
        Ok(Arc::new(WorkerExecutor::new(
            self.client.clone(),
            Self::connection(config),
        )))
    }

    async fn introspector_for(
        &self,
        config: &DatabaseConfig,
    ) -> Result<Arc<dyn Introspector>, WorkerError> {
        Ok(Arc::new(WorkerIntrospector::new(
            self.client.clone(),
            Self::connection(config),
        )))
    }
}

// =============================================================================
// Engine
// =============================================================================

pub struct Engine {
    store: Arc<dyn MetadataStore>,
    provider: Arc<dyn ExecutorProvider>,
    /// Default deadline applied to report executions.
    deadline: Option<Duration>,
}

impl Engine {
    pub fn new(store: Arc<dyn MetadataStore>, provider: Arc<dyn ExecutorProvider>) -> Self {
        Self {
            store,
            provider,
            deadline: None,
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Compile a report's data query without executing it.
    pub async fn compile_report(
        &self,
        report_id: Uuid,
        page: Option<Page>,
        roles: &[String],
    ) -> Result<Statement, EngineError> {
        let (dataset, report, config) = self.load_report(report_id, roles).await?;
        Ok(compile_report_query(
            &dataset,
            &report,
            page,
            config.compile_options(),
        )?)
    }

    /// Execute a report and return the shaped result envelope.
    pub async fn execute_report(
        &self,
        report_id: Uuid,
        page: Option<Page>,
        roles: &[String],
    ) -> Result<ResultEnvelope, EngineError> {
        let (dataset, report, config) = self.load_report(report_id, roles).await?;
        let executor = self.provider.executor_for(&config).await?;
        Ok(run_report(
            &dataset,
            &report,
            page,
            config.compile_options(),
            executor.as_ref(),
            self.deadline,
        )
        .await?)
    }

    /// Stream a report's full result set as CSV into `writer`.
    /// Returns the number of data rows written.
    pub async fn export_report<W: Write + Send>(
        &self,
        report_id: Uuid,
        roles: &[String],
        writer: W,
    ) -> Result<u64, EngineError> {
        let (dataset, report, config) = self.load_report(report_id, roles).await?;
        let executor = self.provider.executor_for(&config).await?;
        Ok(export_csv(
            &dataset,
            &report,
            config.compile_options(),
            executor.as_ref(),
            writer,
        )
        .await?)
    }

    /// Execute every range of a chart and merge onto one tick axis.
    pub async fn chart_data(
        &self,
        chart_id: Uuid,
        roles: &[String],
    ) -> Result<ChartSeries, EngineError> {
        let chart = self.store.get_chart(chart_id).await?;

        let mut loaded = Vec::with_capacity(chart.ranges.len());
        for range in chart.ordered_ranges() {
            let (dataset, report, config) = self.load_report(range.report_id, roles).await?;
            let executor = self.provider.executor_for(&config).await?;
            loaded.push(LoadedRange {
                range: range.clone(),
                dataset,
                report,
                opts: config.compile_options(),
                executor,
            });
        }

        let jobs: Vec<RangeJob<'_>> = loaded
            .iter()
            .map(|l| RangeJob {
                range: &l.range,
                dataset: &l.dataset,
                report: &l.report,
                opts: l.opts,
                executor: l.executor.as_ref(),
            })
            .collect();

        Ok(chart::chart_data(&chart, jobs).await?)
    }

    /// List the tables, views and procs of a configured target database.
    pub async fn source_list(&self, database_id: Uuid) -> Result<Vec<SourceEntry>, EngineError> {
        let config = self.store.get_database(database_id).await?;
        let introspector = self.provider.introspector_for(&config).await?;
        Ok(catalog::source_list(introspector.as_ref()).await?)
    }

    /// Import column candidates for a dataset's primary source.
    pub async fn import_schema(
        &self,
        dataset_id: Uuid,
    ) -> Result<Vec<ColumnCandidate>, EngineError> {
        let dataset = self.store.get_dataset(dataset_id).await?;
        let config = self.store.get_database(dataset.database_id).await?;
        let introspector = self.provider.introspector_for(&config).await?;
        Ok(catalog::import_columns(introspector.as_ref(), &dataset).await?)
    }

    /// Load a report with its dataset and database config, enforcing
    /// dataset access for the caller's roles.
    async fn load_report(
        &self,
        report_id: Uuid,
        roles: &[String],
    ) -> Result<(Dataset, Report, DatabaseConfig), EngineError> {
        let report = self.store.get_report(report_id).await?;
        let dataset = self.store.get_dataset(report.dataset_id).await?;
        if !dataset.accessible_by(roles) {
            return Err(EngineError::AccessDenied {
                dataset: dataset.id,
            });
        }
        let config = self.store.get_database(dataset.database_id).await?;
        Ok((dataset, report, config))
    }
}

struct LoadedRange {
    range: ChartRange,
    dataset: Dataset,
    report: Report,
    opts: CompileOptions,
    executor: Arc<dyn Executor>,
}
