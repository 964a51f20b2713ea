//! Schema catalog: discover what a target database offers.
//!
//! Administrators build datasets by importing a source's columns rather
//! than typing them in. The catalog lists tables/views/procs, reads
//! column (or proc parameter) metadata through the worker and maps the
//! driver's type names onto the engine's data types. Import produces
//! candidates for the admin UI to accept; nothing is persisted here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{DataType, Dataset, FilterType, SourceKind};
use crate::worker::protocol::{ColumnInfo, ConnectionParams, ProcParamInfo, SourceInfo};
use crate::worker::{WorkerClient, WorkerError};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("schema introspection failed")]
    Worker(#[from] WorkerError),
}

// =============================================================================
// Introspection seam
// =============================================================================

/// Read-only schema access to one target database. Implemented over the
/// worker; tests substitute a fixture.
#[async_trait]
pub trait Introspector: Send + Sync {
    async fn list_sources(&self) -> Result<Vec<SourceInfo>, WorkerError>;
    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, WorkerError>;
    async fn get_proc_params(&self, proc: &str) -> Result<Vec<ProcParamInfo>, WorkerError>;
}

/// [`Introspector`] backed by the worker process.
pub struct WorkerIntrospector {
    client: std::sync::Arc<WorkerClient>,
    connection: ConnectionParams,
}

impl WorkerIntrospector {
    pub fn new(client: std::sync::Arc<WorkerClient>, connection: ConnectionParams) -> Self {
        Self { client, connection }
    }
}

#[async_trait]
impl Introspector for WorkerIntrospector {
    async fn list_sources(&self) -> Result<Vec<SourceInfo>, WorkerError> {
        Ok(self
            .client
            .list_sources(&self.connection, None)
            .await?
            .sources)
    }

    async fn get_columns(&self, table: &str) -> Result<Vec<ColumnInfo>, WorkerError> {
        Ok(self
            .client
            .get_columns(&self.connection, table, None)
            .await?
            .columns)
    }

    async fn get_proc_params(&self, proc: &str) -> Result<Vec<ProcParamInfo>, WorkerError> {
        Ok(self
            .client
            .get_proc_params(&self.connection, proc, None)
            .await?
            .params)
    }
}

// =============================================================================
// Catalog operations
// =============================================================================

/// One selectable source of the target database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: String,
    pub kind: SourceKind,
    pub schema: Option<String>,
}

/// A column (or proc parameter) proposed for inclusion in a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCandidate {
    /// Physical column or parameter name.
    pub name: String,
    /// Suggested display title (the name as-is; admins rename freely).
    pub title: String,
    pub data_type: DataType,
    pub filter_type: FilterType,
    pub is_param: bool,
}

/// List the target database's tables, views and procs.
pub async fn source_list(introspector: &dyn Introspector) -> Result<Vec<SourceEntry>, CatalogError> {
    let sources = introspector.list_sources().await?;
    Ok(sources
        .into_iter()
        .map(|s| SourceEntry {
            kind: if s.kind.eq_ignore_ascii_case("proc") {
                SourceKind::Proc
            } else {
                // views behave like tables for querying
                SourceKind::Table
            },
            name: s.name,
            schema: s.schema,
        })
        .collect())
}

/// Import the columns of a dataset's primary source.
///
/// Table sources yield their physical columns; proc sources yield input
/// parameters, flagged `is_param`. Already-present columns are the
/// caller's concern - every candidate is returned.
pub async fn import_columns(
    introspector: &dyn Introspector,
    dataset: &Dataset,
) -> Result<Vec<ColumnCandidate>, CatalogError> {
    let candidates = match dataset.source_kind {
        SourceKind::Table => introspector
            .get_columns(&dataset.source)
            .await?
            .into_iter()
            .map(|c| {
                let data_type = map_type_name(&c.type_name);
                ColumnCandidate {
                    title: c.name.clone(),
                    name: c.name,
                    data_type,
                    filter_type: FilterType::default_for(data_type),
                    is_param: false,
                }
            })
            .collect(),
        SourceKind::Proc => introspector
            .get_proc_params(&dataset.source)
            .await?
            .into_iter()
            .map(|p| {
                let data_type = map_type_name(&p.type_name);
                let name = p.name.trim_start_matches('@').to_string();
                ColumnCandidate {
                    title: name.clone(),
                    name,
                    data_type,
                    filter_type: FilterType::default_for(data_type),
                    is_param: true,
                }
            })
            .collect(),
    };
    Ok(candidates)
}

/// Map a driver-reported type name to an engine data type.
///
/// Matching is loose: drivers report names like `numeric(10,2)` or
/// `character varying`. Unknown types fall back to Text, which is always
/// safe to display.
pub fn map_type_name(type_name: &str) -> DataType {
    let t = type_name.to_ascii_lowercase();

    if t.contains("money") {
        return DataType::Currency;
    }
    if t.contains("bool") || t == "bit" {
        return DataType::Boolean;
    }
    if t.contains("timestamp") || t.contains("datetime") {
        return DataType::DateTime;
    }
    if t.contains("date") {
        return DataType::Date;
    }
    if t.contains("int") || t == "serial" || t == "bigserial" {
        return DataType::Integer;
    }
    if t.contains("decimal")
        || t.contains("numeric")
        || t.contains("float")
        || t.contains("real")
        || t.contains("double")
    {
        return DataType::Float;
    }
    DataType::Text
}
