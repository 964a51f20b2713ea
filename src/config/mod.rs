//! Configuration for administrator-registered target databases.

mod connection;

pub use connection::{ConfigError, DatabaseConfig, Driver};
