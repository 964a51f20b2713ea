//! PostgreSQL dialect.
//!
//! Close to ANSI:
//! - Double quote identifier quoting
//! - `$n` numbered parameter placeholders
//! - LIMIT ... OFFSET ... pagination
//! - true/false boolean literals
//! - CALL for stored procedures

use super::helpers;
use super::SqlDialect;

/// PostgreSQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    fn format_placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_postgres(name)
    }
}
