//! Dataset definitions: the administrator-configured shape of a queryable
//! source (primary table or proc, joins, typed columns).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::order::Ordered;
use super::types::{DataType, FilterType, JoinKind, SourceKind, SqlFragment};
use super::ModelError;

/// An administrator-defined queryable view over a target database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    pub name: String,
    /// The target database this dataset queries (see `config::DatabaseConfig`).
    pub database_id: Uuid,
    /// Primary table name or stored procedure name.
    pub source: String,
    pub source_kind: SourceKind,
    /// Dataset-level WHERE fragment, ANDed before report filters.
    /// Administrator-trusted raw SQL.
    pub conditions: Option<SqlFragment>,
    /// Display format for date values, passed through to column metadata.
    pub date_format: Option<String>,
    /// Display format for currency values.
    pub currency_format: Option<String>,
    pub columns: Vec<DatasetColumn>,
    pub joins: Vec<DatasetJoin>,
    /// Role names authorized to query this dataset. Empty means unrestricted.
    pub roles: Vec<String>,
}

impl Dataset {
    /// Look up a column by id.
    pub fn column(&self, id: Uuid) -> Option<&DatasetColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Joins in ascending display order.
    pub fn ordered_joins(&self) -> Vec<&DatasetJoin> {
        let mut joins: Vec<&DatasetJoin> = self.joins.iter().collect();
        joins.sort_by_key(|j| j.position);
        joins
    }

    /// Validate structural invariants.
    ///
    /// Proc sources cannot carry conditions or joins: the procedure body
    /// owns its own FROM and WHERE.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.source.trim().is_empty() {
            return Err(ModelError::EmptySource { dataset: self.id });
        }

        if self.source_kind == SourceKind::Proc {
            if self.conditions.is_some() {
                return Err(ModelError::ProcWithConditions { dataset: self.id });
            }
            if !self.joins.is_empty() {
                return Err(ModelError::ProcWithJoins { dataset: self.id });
            }
        }

        for col in &self.columns {
            if col.dataset_id != self.id {
                return Err(ModelError::ForeignChild {
                    parent: self.id,
                    child: col.id,
                });
            }
            col.validate()?;
        }

        for join in &self.joins {
            if join.dataset_id != self.id {
                return Err(ModelError::ForeignChild {
                    parent: self.id,
                    child: join.id,
                });
            }
            if join.keys.is_empty() {
                return Err(ModelError::JoinWithoutKeys { join: join.id });
            }
        }

        Ok(())
    }

    /// Whether the given role set may query this dataset.
    pub fn accessible_by(&self, roles: &[String]) -> bool {
        self.roles.is_empty() || self.roles.iter().any(|r| roles.contains(r))
    }
}

/// A typed column of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetColumn {
    pub id: Uuid,
    pub dataset_id: Uuid,
    /// Display name shown to end users.
    pub title: String,
    /// Physical column name, possibly table-qualified (`Orders.Total`).
    pub column_name: Option<String>,
    /// Derived SQL expression; takes precedence over `column_name`.
    /// Administrator-trusted raw SQL.
    pub derived: Option<SqlFragment>,
    pub data_type: DataType,
    pub filter_type: FilterType,
    /// Procedure input parameter: usable as a filter, never selected.
    pub is_param: bool,
    /// Query producing (value, label) pairs for Select-type filters.
    /// Administrator-trusted raw SQL.
    pub lookup_query: Option<SqlFragment>,
    /// Hyperlink template for the presentation layer, e.g.
    /// `/orders/{value}`. Carried through column metadata untouched.
    pub link_template: Option<String>,
}

impl DatasetColumn {
    /// Exactly one of {column_name, derived} must drive SQL generation.
    pub fn validate(&self) -> Result<(), ModelError> {
        let has_name = self
            .column_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty());
        let has_derived = self
            .derived
            .as_ref()
            .is_some_and(|d| !d.as_str().trim().is_empty());
        if !has_name && !has_derived {
            return Err(ModelError::UnboundColumn { column: self.id });
        }
        Ok(())
    }
}

/// One key pair of a join's ON clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinKey {
    /// Column on the primary-source side, possibly table-qualified.
    pub left: String,
    /// Column on the joined table's side.
    pub right: String,
}

/// A join from the dataset's primary table to another table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetJoin {
    pub id: Uuid,
    pub dataset_id: Uuid,
    /// Target table name.
    pub table: String,
    pub kind: JoinKind,
    pub keys: Vec<JoinKey>,
    /// Dense 0-based display order among the dataset's joins.
    pub position: u32,
}

impl Ordered for DatasetJoin {
    fn position(&self) -> u32 {
        self.position
    }
    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}
