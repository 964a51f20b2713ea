//! Protocol types for worker communication.
//!
//! The worker is an external driver process; requests and responses are
//! newline-delimited JSON envelopes correlated by request id.

use serde::{Deserialize, Serialize};

// ============================================================================
// Request/Response Envelope
// ============================================================================

/// Request envelope sent to the worker.
#[derive(Debug, Clone, Serialize)]
pub struct RequestEnvelope {
    /// Unique request ID for correlation.
    pub id: String,
    /// Method name (e.g., "metadata.list_sources").
    pub method: String,
    /// Method-specific parameters.
    pub params: serde_json::Value,
}

/// Response envelope received from the worker.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseEnvelope {
    /// Request ID this response corresponds to.
    pub id: String,
    /// Whether the request succeeded.
    pub success: bool,
    /// Result data (present if success = true).
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    /// Error information (present if success = false).
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

/// Error information in a failed response.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorInfo {
    /// Error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Connection Parameters (included in all requests)
// ============================================================================

/// Database connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionParams {
    /// Database driver name (e.g., "postgres", "mssql").
    pub driver: String,
    /// Driver-specific connection string.
    pub connection_string: String,
}

// ============================================================================
// Method names
// ============================================================================

pub mod methods {
    pub const LIST_SOURCES: &str = "metadata.list_sources";
    pub const GET_COLUMNS: &str = "metadata.get_columns";
    pub const GET_PROC_PARAMS: &str = "metadata.get_proc_params";
    pub const EXECUTE_QUERY: &str = "query.execute";
    pub const CANCEL_QUERY: &str = "query.cancel";
}

// ============================================================================
// Metadata requests
// ============================================================================

/// Parameters for `metadata.list_sources`.
#[derive(Debug, Clone, Serialize)]
pub struct ListSourcesParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Schema to list from (optional, uses default if empty).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// One queryable source of the target database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceInfo {
    pub name: String,
    /// "table", "view" or "proc".
    pub kind: String,
    #[serde(default)]
    pub schema: Option<String>,
}

/// Response for `metadata.list_sources`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSourcesResponse {
    pub sources: Vec<SourceInfo>,
}

/// Parameters for `metadata.get_columns`.
#[derive(Debug, Clone, Serialize)]
pub struct GetColumnsParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Table or view name.
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// One physical column as reported by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    /// Driver-reported type name (e.g., "varchar", "numeric(10,2)").
    pub type_name: String,
    #[serde(default)]
    pub nullable: bool,
}

/// Response for `metadata.get_columns`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetColumnsResponse {
    pub columns: Vec<ColumnInfo>,
}

/// Parameters for `metadata.get_proc_params`.
#[derive(Debug, Clone, Serialize)]
pub struct GetProcParamsParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Stored procedure name.
    pub proc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// One input parameter of a stored procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcParamInfo {
    pub name: String,
    pub type_name: String,
}

/// Response for `metadata.get_proc_params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetProcParamsResponse {
    pub params: Vec<ProcParamInfo>,
}

// ============================================================================
// Query execution
// ============================================================================

/// Parameters for `query.execute`.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// SQL text with dialect-appropriate placeholders.
    pub sql: String,
    /// Positional parameter values.
    pub args: Vec<serde_json::Value>,
    /// Caller-generated id for `query.cancel`.
    pub query_id: String,
}

/// Response for `query.execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteQueryResponse {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Parameters for `query.cancel`.
#[derive(Debug, Clone, Serialize)]
pub struct CancelQueryParams {
    #[serde(flatten)]
    pub connection: ConnectionParams,
    pub query_id: String,
}

/// Response for `query.cancel`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelQueryResponse {
    #[serde(default)]
    pub cancelled: bool,
}
