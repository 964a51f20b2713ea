//! SQL generation module.
//!
//! This module provides a type-safe SQL builder that generates multi-dialect,
//! parameterized SQL. It includes:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`statement`] - Parameterized statements (SQL text + bound values)
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod statement;
pub mod token;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    col, count_star, lit_int, param, raw_sql, row_number, star, sum, table_col, BinaryOperator,
    Expr, ExprExt, Literal, SortDir, UnaryOperator, WindowOrderBy,
};
pub use query::{
    AliasExt, FromClause, Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, TableRef,
};
pub use statement::{ParamValue, Statement};
pub use token::{Token, TokenStream};
