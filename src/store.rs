//! Metadata persistence: datasets, reports, charts and database
//! configurations.
//!
//! The engine reads entities as immutable snapshots and writes them back
//! whole; the store owns referential integrity. Deletes cascade: removing
//! a dataset removes its reports, removing a report removes the chart
//! ranges built on it, and surviving siblings are recompacted in the same
//! mutation so readers never observe a hole.
//!
//! [`MemoryStore`] is the bundled implementation, suitable for embedding
//! and for tests. A database-backed store implements the same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::model::order::reindex;
use crate::model::{Chart, Dataset, ModelError, Report};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: Uuid },

    #[error("dataset {dataset} references unknown database {database}")]
    UnknownDatabase { dataset: Uuid, database: Uuid },

    #[error("report {report} references unknown dataset {dataset}")]
    UnknownDataset { report: Uuid, dataset: Uuid },

    #[error("chart {chart} references unknown report {report}")]
    UnknownReport { chart: Uuid, report: Uuid },

    #[error(transparent)]
    Invalid(#[from] ModelError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: Uuid) -> Self {
        StoreError::NotFound { kind, id }
    }
}

// =============================================================================
// Store trait
// =============================================================================

/// Persistence seam for the engine's metadata entities.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn get_database(&self, id: Uuid) -> Result<DatabaseConfig, StoreError>;
    async fn save_database(&self, config: DatabaseConfig) -> Result<(), StoreError>;
    async fn list_databases(&self) -> Result<Vec<DatabaseConfig>, StoreError>;

    async fn get_dataset(&self, id: Uuid) -> Result<Dataset, StoreError>;
    async fn save_dataset(&self, dataset: Dataset) -> Result<(), StoreError>;
    /// Delete a dataset together with its reports and any chart ranges
    /// built on those reports.
    async fn delete_dataset(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list_datasets(&self) -> Result<Vec<Dataset>, StoreError>;

    async fn get_report(&self, id: Uuid) -> Result<Report, StoreError>;
    async fn save_report(&self, report: Report) -> Result<(), StoreError>;
    /// Delete a report together with any chart ranges built on it.
    async fn delete_report(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list_reports(&self, dataset_id: Uuid) -> Result<Vec<Report>, StoreError>;

    async fn get_chart(&self, id: Uuid) -> Result<Chart, StoreError>;
    async fn save_chart(&self, chart: Chart) -> Result<(), StoreError>;
    async fn delete_chart(&self, id: Uuid) -> Result<(), StoreError>;
    async fn list_charts(&self, owner_id: Uuid) -> Result<Vec<Chart>, StoreError>;
}

// =============================================================================
// In-memory store
// =============================================================================

#[derive(Default)]
struct Inner {
    databases: HashMap<Uuid, DatabaseConfig>,
    datasets: HashMap<Uuid, Dataset>,
    reports: HashMap<Uuid, Report>,
    charts: HashMap<Uuid, Chart>,
}

impl Inner {
    /// Remove chart ranges referencing any of the given reports and
    /// recompact each touched chart. Charts left without ranges are
    /// dropped; there is nothing to plot.
    fn prune_ranges(&mut self, report_ids: &[Uuid]) {
        let mut emptied = Vec::new();
        for chart in self.charts.values_mut() {
            let before = chart.ranges.len();
            chart.ranges.retain(|r| !report_ids.contains(&r.report_id));
            if chart.ranges.len() != before {
                reindex(&mut chart.ranges);
            }
            if chart.ranges.is_empty() {
                emptied.push(chart.id);
            }
        }
        for id in emptied {
            self.charts.remove(&id);
        }
    }
}

/// In-memory [`MetadataStore`] behind a single async mutex. Every
/// operation, cascades included, runs under one lock acquisition.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryStore {
    async fn get_database(&self, id: Uuid) -> Result<DatabaseConfig, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .databases
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("database", id))
    }

    async fn save_database(&self, config: DatabaseConfig) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.databases.insert(config.id, config);
        Ok(())
    }

    async fn list_databases(&self) -> Result<Vec<DatabaseConfig>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<_> = inner.databases.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get_dataset(&self, id: Uuid) -> Result<Dataset, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .datasets
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("dataset", id))
    }

    async fn save_dataset(&self, dataset: Dataset) -> Result<(), StoreError> {
        dataset.validate()?;
        let mut inner = self.inner.lock().await;
        if !inner.databases.contains_key(&dataset.database_id) {
            return Err(StoreError::UnknownDatabase {
                dataset: dataset.id,
                database: dataset.database_id,
            });
        }
        inner.datasets.insert(dataset.id, dataset);
        Ok(())
    }

    async fn delete_dataset(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.datasets.remove(&id).is_none() {
            return Err(StoreError::not_found("dataset", id));
        }
        let report_ids: Vec<Uuid> = inner
            .reports
            .values()
            .filter(|r| r.dataset_id == id)
            .map(|r| r.id)
            .collect();
        for report_id in &report_ids {
            inner.reports.remove(report_id);
        }
        inner.prune_ranges(&report_ids);
        Ok(())
    }

    async fn list_datasets(&self) -> Result<Vec<Dataset>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<_> = inner.datasets.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get_report(&self, id: Uuid) -> Result<Report, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .reports
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("report", id))
    }

    async fn save_report(&self, report: Report) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let dataset = inner.datasets.get(&report.dataset_id).ok_or({
            StoreError::UnknownDataset {
                report: report.id,
                dataset: report.dataset_id,
            }
        })?;
        report.validate_against(dataset)?;
        inner.reports.insert(report.id, report);
        Ok(())
    }

    async fn delete_report(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.reports.remove(&id).is_none() {
            return Err(StoreError::not_found("report", id));
        }
        inner.prune_ranges(&[id]);
        Ok(())
    }

    async fn list_reports(&self, dataset_id: Uuid) -> Result<Vec<Report>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<_> = inner
            .reports
            .values()
            .filter(|r| r.dataset_id == dataset_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get_chart(&self, id: Uuid) -> Result<Chart, StoreError> {
        let inner = self.inner.lock().await;
        inner
            .charts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("chart", id))
    }

    async fn save_chart(&self, chart: Chart) -> Result<(), StoreError> {
        chart.validate()?;
        let mut inner = self.inner.lock().await;
        for range in &chart.ranges {
            if !inner.reports.contains_key(&range.report_id) {
                return Err(StoreError::UnknownReport {
                    chart: chart.id,
                    report: range.report_id,
                });
            }
        }
        inner.charts.insert(chart.id, chart);
        Ok(())
    }

    async fn delete_chart(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        if inner.charts.remove(&id).is_none() {
            return Err(StoreError::not_found("chart", id));
        }
        Ok(())
    }

    async fn list_charts(&self, owner_id: Uuid) -> Result<Vec<Chart>, StoreError> {
        let inner = self.inner.lock().await;
        let mut out: Vec<_> = inner
            .charts
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }
}
