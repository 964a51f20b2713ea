//! Shared model vocabulary: data types, filter classification, aggregation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a dataset column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Integer,
    Float,
    Currency,
    Date,
    DateTime,
    Boolean,
}

impl DataType {
    /// Whether values of this type carry a calendar date component.
    pub fn is_temporal(&self) -> bool {
        matches!(self, DataType::Date | DataType::DateTime)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Integer | DataType::Float | DataType::Currency
        )
    }
}

/// How a column may be filtered. Drives operator compatibility checks
/// and the filter widget an admin UI would render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Text,
    Numeric,
    Date,
    Boolean,
    /// Discrete values backed by a lookup query.
    Select,
}

impl FilterType {
    /// Default filter classification for a data type, used by schema import.
    pub fn default_for(data_type: DataType) -> FilterType {
        match data_type {
            DataType::Text => FilterType::Text,
            DataType::Integer | DataType::Float | DataType::Currency => FilterType::Numeric,
            DataType::Date | DataType::DateTime => FilterType::Date,
            DataType::Boolean => FilterType::Boolean,
        }
    }
}

/// Filter predicate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Substring match (Text only). The engine wraps the value in `%`.
    Like,
    /// Two-ended range, inclusive (Numeric / Date).
    Between,
    /// Half-open `[start, end)` range derived from an anchor date plus an
    /// interval unit (Date only).
    DateInterval,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    /// Number of criteria values this operator consumes: 0, 1 or 2.
    /// `Eq` accepts 1..n (multi-value becomes `IN`).
    pub fn arity(&self) -> OperatorArity {
        match self {
            FilterOperator::IsNull | FilterOperator::IsNotNull => OperatorArity::None,
            FilterOperator::Eq => OperatorArity::OneOrMore,
            FilterOperator::Between => OperatorArity::Two,
            FilterOperator::DateInterval => OperatorArity::One,
            _ => OperatorArity::One,
        }
    }

    /// Whether this operator is valid against the given filter type.
    pub fn compatible_with(&self, filter_type: FilterType) -> bool {
        use FilterOperator::*;
        use FilterType::*;
        match self {
            IsNull | IsNotNull => true,
            Eq | Ne => true,
            Like => filter_type == Text,
            Lt | Lte | Gt | Gte => matches!(filter_type, Numeric | Date),
            Between => matches!(filter_type, Numeric | Date),
            DateInterval => filter_type == Date,
        }
    }
}

/// Criteria-count requirement of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorArity {
    None,
    One,
    Two,
    OneOrMore,
}

/// Aggregation function applied to a selected column in grouped reports
/// and to chart Y values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl Aggregator {
    /// SQL function name.
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "SUM",
            Aggregator::Avg => "AVG",
            Aggregator::Count => "COUNT",
            Aggregator::Min => "MIN",
            Aggregator::Max => "MAX",
        }
    }
}

/// Fixed time-bucket width for charting and date-interval filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateInterval {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Join kind for dataset joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

/// What a dataset's primary source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Table,
    Proc,
}

/// Visual kind of a chart. Does not affect data shaping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Bar,
    Area,
}

/// Report sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Administrator-authored raw SQL fragment.
///
/// This is the trust boundary of the whole engine: fragments (derived
/// column expressions, dataset conditions, lookup queries) are emitted
/// into generated SQL verbatim. They must only ever be written by
/// administrators. End-user filter values never become fragments; they
/// bind as statement parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SqlFragment(pub String);

impl SqlFragment {
    pub fn new(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
