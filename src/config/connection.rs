//! Target database configuration.
//!
//! Each dataset queries one administrator-configured target database,
//! distinct from the application's own metadata store. A configuration
//! carries the SQL dialect and the `supports_offset` capability flag the
//! compiler depends on - capabilities are configured, never autodetected.
//!
//! Supports configuration via environment variables:
//! - `QUARRY_DB_DRIVER`: Database driver (mssql, postgres, mysql, duckdb)
//! - `QUARRY_DB_HOST`: Database server hostname (or file path for DuckDB)
//! - `QUARRY_DB_NAME`: Database name
//! - `QUARRY_DB_PORT`: Port (optional, uses driver default)
//! - `QUARRY_DB_USER` / `QUARRY_DB_PASSWORD`: Credentials (optional)

use std::env;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sql::Dialect;
use crate::worker::protocol::ConnectionParams;

/// Error type for connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported driver: {0}. Supported: mssql, postgres, mysql, duckdb")]
    UnsupportedDriver(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Supported database drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    /// Microsoft SQL Server
    MsSql,
    /// PostgreSQL
    Postgres,
    /// MySQL / MariaDB
    MySql,
    /// DuckDB (file or in-memory)
    DuckDb,
}

impl Driver {
    /// Parse driver from string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "mssql" | "sqlserver" | "sql_server" => Ok(Driver::MsSql),
            "postgres" | "postgresql" | "pg" => Ok(Driver::Postgres),
            "mysql" | "mariadb" => Ok(Driver::MySql),
            "duckdb" | "duck" => Ok(Driver::DuckDb),
            other => Err(ConfigError::UnsupportedDriver(other.to_string())),
        }
    }

    /// Get the driver name for the worker.
    pub fn as_str(&self) -> &'static str {
        match self {
            Driver::MsSql => "mssql",
            Driver::Postgres => "postgres",
            Driver::MySql => "mysql",
            Driver::DuckDb => "duckdb",
        }
    }

    /// The SQL dialect this driver speaks.
    pub fn dialect(&self) -> Dialect {
        match self {
            Driver::MsSql => Dialect::TSql,
            Driver::Postgres => Dialect::Postgres,
            Driver::MySql => Dialect::MySql,
            Driver::DuckDb => Dialect::DuckDb,
        }
    }

    /// Get the default port for this driver.
    pub fn default_port(&self) -> u16 {
        match self {
            Driver::MsSql => 1433,
            Driver::Postgres => 5432,
            Driver::MySql => 3306,
            Driver::DuckDb => 0, // Not applicable
        }
    }
}

/// One administrator-configured target database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub id: Uuid,
    /// Display name shown to administrators.
    pub name: String,
    /// Database driver.
    pub driver: Driver,
    /// Server hostname (or file path for DuckDB).
    pub host: String,
    /// Database name.
    pub database: String,
    /// Port (optional).
    pub port: Option<u16>,
    /// Use Windows trusted connection (SQL Server).
    pub trusted_connection: bool,
    /// Username (if not using trusted connection).
    pub username: Option<String>,
    /// Password (if not using trusted connection).
    pub password: Option<String>,
    /// Whether the target evaluates OFFSET natively. Old SQL Server
    /// versions do not; the compiler then emulates with ROW_NUMBER.
    pub supports_offset: bool,
}

impl DatabaseConfig {
    /// Create a config for SQL Server with trusted connection.
    pub fn mssql_trusted(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            driver: Driver::MsSql,
            host: host.into(),
            database: database.into(),
            port: None,
            trusted_connection: true,
            username: None,
            password: None,
            supports_offset: true,
        }
    }

    /// Create a config for DuckDB.
    pub fn duckdb(path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            driver: Driver::DuckDb,
            host: path.into(), // For DuckDB, "host" is the file path
            database: String::new(),
            port: None,
            trusted_connection: false,
            username: None,
            password: None,
            supports_offset: true,
        }
    }

    /// Load configuration from `QUARRY_DB_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let driver_str = env::var("QUARRY_DB_DRIVER")
            .map_err(|_| ConfigError::MissingEnvVar("QUARRY_DB_DRIVER".to_string()))?;
        let driver = Driver::parse(&driver_str)?;

        let host = env::var("QUARRY_DB_HOST")
            .map_err(|_| ConfigError::MissingEnvVar("QUARRY_DB_HOST".to_string()))?;

        // Database name is required except for DuckDB
        let database = match driver {
            Driver::DuckDb => env::var("QUARRY_DB_NAME").unwrap_or_default(),
            _ => env::var("QUARRY_DB_NAME")
                .map_err(|_| ConfigError::MissingEnvVar("QUARRY_DB_NAME".to_string()))?,
        };

        let port = env::var("QUARRY_DB_PORT").ok().and_then(|p| p.parse().ok());
        let username = env::var("QUARRY_DB_USER").ok();
        let password = env::var("QUARRY_DB_PASSWORD").ok();

        // Trusted connection when no credentials given (SQL Server only)
        let trusted_connection = driver == Driver::MsSql && username.is_none();

        let supports_offset = env::var("QUARRY_DB_SUPPORTS_OFFSET")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        Ok(Self {
            id: Uuid::new_v4(),
            name: database.clone(),
            driver,
            host,
            database,
            port,
            trusted_connection,
            username,
            password,
            supports_offset,
        })
    }

    /// The SQL dialect the compiler should target.
    pub fn dialect(&self) -> Dialect {
        self.driver.dialect()
    }

    /// Build the connection string for the worker.
    pub fn to_connection_string(&self) -> String {
        match self.driver {
            Driver::MsSql => self.build_url("sqlserver"),
            Driver::Postgres => self.build_url("postgres"),
            Driver::MySql => self.build_url("mysql"),
            Driver::DuckDb => self.build_duckdb_connection_string(),
        }
    }

    fn build_url(&self, scheme: &str) -> String {
        let authority = match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        };

        let mut params = vec![format!("database={}", self.database)];
        if self.trusted_connection {
            params.push("trusted_connection=true".to_string());
        } else if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            params.push(format!("user id={}", user));
            params.push(format!("password={}", pass));
        }

        format!("{}://{}?{}", scheme, authority, params.join("&"))
    }

    fn build_duckdb_connection_string(&self) -> String {
        // For DuckDB the connection string is just the file path,
        // or ":memory:" for an in-memory database
        if self.host.is_empty() || self.host == ":memory:" {
            ":memory:".to_string()
        } else {
            self.host.clone()
        }
    }

    /// Worker-protocol connection parameters.
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            driver: self.driver.as_str().to_string(),
            connection_string: self.to_connection_string(),
        }
    }

    /// Compilation settings derived from this configuration.
    pub fn compile_options(&self) -> crate::compile::CompileOptions {
        crate::compile::CompileOptions {
            dialect: self.dialect(),
            supports_offset: self.supports_offset,
        }
    }
}
