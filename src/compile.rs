//! Query compiler: dataset + report definitions in, parameterized
//! statements out.
//!
//! Compilation is pure and fail-fast: no I/O, no side effects, and the
//! first unresolvable column, incompatible filter or missing aggregator
//! aborts with an error naming the offending entity. Identical inputs
//! always produce identical SQL text and parameter order.
//!
//! End-user values never enter SQL text. Every criteria value binds as a
//! parameter; only administrator-trusted `SqlFragment`s (derived
//! expressions, dataset conditions) are emitted verbatim.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use uuid::Uuid;

use crate::chart::bucket;
use crate::model::{
    Aggregator, DataType, Dataset, DatasetColumn, FilterOperator, JoinKind, ModelError, Report,
    ReportFilter, SortDirection, SourceKind,
};
use crate::sql::{
    col, param, raw_sql, AliasExt, Dialect, Expr, ExprExt, JoinType, OrderByExpr, ParamValue,
    Query, SelectExpr, SqlDialect, Statement, TableRef, Token,
};

/// Pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// Target-specific compilation settings, taken from the dataset's
/// `DatabaseConfig`.
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    pub dialect: Dialect,
    /// Whether the target evaluates OFFSET natively. Configured per
    /// database, never autodetected. When false, pagination is emulated
    /// with ROW_NUMBER.
    pub supports_offset: bool,
}

/// Compile-time failures. All are user-correctable and never reach the
/// target database.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("cannot resolve column {column} ('{name}')")]
    ColumnResolution { column: Uuid, name: String },

    #[error("invalid filter {filter} on '{column}': {reason}")]
    InvalidFilter {
        filter: Uuid,
        column: String,
        reason: String,
    },

    #[error("column '{title}' must carry an aggregator in a grouped report")]
    MissingAggregator { column: Uuid, title: String },

    #[error("invalid model")]
    InvalidModel(#[from] ModelError),
}

/// Compile the report's data statement: selection, filters, groups,
/// sort and pagination.
pub fn compile_report_query(
    dataset: &Dataset,
    report: &Report,
    page: Option<Page>,
    opts: CompileOptions,
) -> Result<Statement, CompileError> {
    Compiler::new(dataset, report, opts).data_statement(page)
}

/// Compile the matching total-count statement: same FROM/WHERE/GROUP BY,
/// wrapped in `SELECT COUNT(*)`, no ORDER BY, no pagination.
pub fn compile_count_query(
    dataset: &Dataset,
    report: &Report,
    opts: CompileOptions,
) -> Result<Statement, CompileError> {
    Compiler::new(dataset, report, opts).count_statement()
}

/// Compile the export statement: the data statement without pagination.
/// ORDER BY is kept so page-streamed export reads a stable sequence.
pub fn compile_export_query(
    dataset: &Dataset,
    report: &Report,
    opts: CompileOptions,
) -> Result<Statement, CompileError> {
    Compiler::new(dataset, report, opts).data_statement(None)
}

/// Compile a chart range's statement: only the X and Y columns, with the
/// report's filters, unpaginated and unsorted. Bucketing and aggregation
/// happen engine-side (see [`crate::chart`]).
pub fn compile_chart_query(
    dataset: &Dataset,
    report: &Report,
    x_column_id: Uuid,
    y_column_id: Uuid,
    opts: CompileOptions,
) -> Result<Statement, CompileError> {
    Compiler::new(dataset, report, opts).chart_statement(x_column_id, y_column_id)
}

// =============================================================================
// Compiler
// =============================================================================

struct Compiler<'a> {
    dataset: &'a Dataset,
    report: &'a Report,
    opts: CompileOptions,
    params: Vec<ParamValue>,
}

impl<'a> Compiler<'a> {
    fn new(dataset: &'a Dataset, report: &'a Report, opts: CompileOptions) -> Self {
        Self {
            dataset,
            report,
            opts,
            params: vec![],
        }
    }

    /// Append a parameter and return the placeholder expression bound
    /// to its position.
    fn bind(&mut self, value: ParamValue) -> Expr {
        let index = self.params.len();
        self.params.push(value);
        param(index)
    }

    fn validate(&self) -> Result<(), CompileError> {
        self.dataset.validate()?;
        self.report
            .validate_against(self.dataset)
            .map_err(|err| match err {
                // A dangling column reference is a resolution failure,
                // not a malformed model.
                ModelError::UnknownColumnRef { column, .. } => CompileError::ColumnResolution {
                    column,
                    name: "<unknown>".into(),
                },
                other => CompileError::InvalidModel(other),
            })?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Statements
    // -------------------------------------------------------------------------

    fn data_statement(mut self, page: Option<Page>) -> Result<Statement, CompileError> {
        self.validate()?;

        if self.dataset.source_kind == SourceKind::Proc {
            return self.proc_statement();
        }

        let mut query = self.base_query()?;
        let order = self.order_by()?;

        let limit = match (page, self.report.row_limit) {
            (Some(p), Some(cap)) => Some(p.limit.min(cap)),
            (Some(p), None) => Some(p.limit),
            (None, cap) => cap,
        };
        let offset = page.map(|p| p.offset).unwrap_or(0);

        if !self.opts.supports_offset && (offset > 0 || limit.is_some()) {
            // Target cannot evaluate OFFSET natively; emulate with a
            // ROW_NUMBER band over the sorted inner query.
            query = query.order_by(order).wrap_row_number_page(
                "_rn",
                limit.unwrap_or(u64::MAX / 2),
                offset,
            );
        } else {
            query = query.order_by(order);
            if let Some(limit) = limit {
                query = query.limit(limit);
            }
            if offset > 0 {
                query = query.offset(offset);
            }
        }

        Ok(self.finish(query))
    }

    fn count_statement(mut self) -> Result<Statement, CompileError> {
        self.validate()?;

        if self.dataset.source_kind == SourceKind::Proc {
            // Proc row counts cannot be wrapped; the executor counts the
            // materialized result instead.
            return self.proc_statement();
        }

        let query = self.base_query()?.wrap_count("sub");
        Ok(self.finish(query))
    }

    fn chart_statement(
        mut self,
        x_column_id: Uuid,
        y_column_id: Uuid,
    ) -> Result<Statement, CompileError> {
        self.validate()?;

        let x = self.resolve_column_id(x_column_id)?;
        let y = self.resolve_column_id(y_column_id)?;
        let x_expr = self.column_expr(x);
        let y_expr = self.column_expr(y);

        let mut query = Query::new()
            .select(vec![x_expr.alias("x"), y_expr.alias("y")])
            .from(self.from_table())
            // Rows without an X value cannot be bucketed.
            .filter(self.column_expr(x).is_not_null());

        query = self.apply_joins(query);
        query = self.apply_conditions(query);
        query = self.apply_filters(query)?;

        Ok(self.finish(query))
    }

    /// Dialect-specific procedure invocation, binding `is_param` columns
    /// from equality filters. Parameters without a matching filter bind
    /// NULL so the argument list always matches the proc signature.
    fn proc_statement(self) -> Result<Statement, CompileError> {
        let mut params: Vec<ParamValue> = vec![];
        let mut args: Vec<(String, Token)> = vec![];

        for column in self.dataset.columns.iter().filter(|c| c.is_param) {
            let name = column
                .column_name
                .clone()
                .unwrap_or_else(|| column.title.clone());

            let value = match self.equality_filter_for(column.id) {
                Some(filter) => {
                    parse_value(column, &filter.criteria[0]).map_err(|reason| {
                        CompileError::InvalidFilter {
                            filter: filter.id,
                            column: column.title.clone(),
                            reason,
                        }
                    })?
                }
                None => ParamValue::Null,
            };

            let index = params.len();
            params.push(value);
            args.push((name, Token::Placeholder(index)));
        }

        let ts = self
            .opts
            .dialect
            .emit_proc_call(&self.dataset.source, &args);
        Ok(Statement::new(ts.serialize(self.opts.dialect), params))
    }

    fn equality_filter_for(&self, column_id: Uuid) -> Option<&ReportFilter> {
        self.report.filters.iter().find(|f| {
            f.column_id == column_id
                && f.operator == FilterOperator::Eq
                && f.criteria.len() == 1
        })
    }

    // -------------------------------------------------------------------------
    // Query assembly
    // -------------------------------------------------------------------------

    /// SELECT / FROM / JOIN / WHERE / GROUP BY, shared by the data,
    /// count and export statements.
    fn base_query(&mut self) -> Result<Query, CompileError> {
        let select = self.select_list()?;

        let mut query = Query::new().select(select).from(self.from_table());
        query = self.apply_joins(query);
        query = self.apply_conditions(query);
        query = self.apply_filters(query)?;
        query = self.apply_groups(query)?;

        Ok(query)
    }

    fn from_table(&self) -> TableRef {
        TableRef::new(&self.dataset.source)
    }

    fn apply_joins(&self, mut query: Query) -> Query {
        for join in self.dataset.ordered_joins() {
            let mut on: Option<Expr> = None;
            for key in &join.keys {
                let pair = self
                    .qualified(&key.left, &self.dataset.source)
                    .eq(self.qualified(&key.right, &join.table));
                on = Some(match on {
                    Some(existing) => existing.and(pair),
                    None => pair,
                });
            }
            // validate() guarantees at least one key pair
            if let Some(on) = on {
                let kind = match join.kind {
                    JoinKind::Inner => JoinType::Inner,
                    JoinKind::Left => JoinType::Left,
                    JoinKind::Right => JoinType::Right,
                };
                query = query.join(kind, TableRef::new(&join.table), on);
            }
        }
        query
    }

    fn apply_conditions(&self, query: Query) -> Query {
        match &self.dataset.conditions {
            Some(fragment) => query.filter(raw_sql(fragment.as_str()).paren()),
            None => query,
        }
    }

    fn apply_filters(&mut self, mut query: Query) -> Result<Query, CompileError> {
        let filters = self.report.ordered_filters();
        for filter in filters {
            let column = self.resolve_column_id(filter.column_id)?;
            if self.dataset.source_kind == SourceKind::Table && column.is_param {
                // Param columns only bind proc arguments.
                continue;
            }
            let predicate = self.filter_predicate(filter, column)?;
            query = query.filter(predicate);
        }
        Ok(query)
    }

    fn apply_groups(&mut self, mut query: Query) -> Result<Query, CompileError> {
        if self.report.groups.is_empty() {
            return Ok(query);
        }
        let mut group_exprs = vec![];
        for group in self.report.ordered_groups() {
            let column = self.resolve_column_id(group.column_id)?;
            group_exprs.push(self.column_expr(column));
        }
        query = query.group_by(group_exprs);
        Ok(query)
    }

    /// Resolve the selection into SELECT expressions, aggregating
    /// non-grouping columns when the report is grouped.
    fn select_list(&mut self) -> Result<Vec<SelectExpr>, CompileError> {
        let grouped = !self.report.groups.is_empty();
        let mut select = vec![];

        for sel in &self.report.selection {
            let column = self.resolve_column_id(sel.column_id)?;
            if column.is_param {
                // Never selected; only usable as a proc argument / filter.
                continue;
            }

            let expr = self.column_expr(column);
            let expr = if grouped && !self.report.is_grouped_by(column.id) {
                let aggregator =
                    sel.aggregator
                        .ok_or_else(|| CompileError::MissingAggregator {
                            column: column.id,
                            title: column.title.clone(),
                        })?;
                apply_aggregator(aggregator, expr)
            } else {
                expr
            };

            select.push(expr.alias(&column.title));
        }

        if select.is_empty() {
            return Err(CompileError::ColumnResolution {
                column: self.report.id,
                name: "<empty selection>".into(),
            });
        }

        Ok(select)
    }

    /// ORDER BY from the report's sort column, defaulting to the first
    /// selected column ascending so pagination stays deterministic.
    fn order_by(&mut self) -> Result<Vec<OrderByExpr>, CompileError> {
        let grouped = !self.report.groups.is_empty();

        let (column_id, dir) = match self.report.sort_column_id {
            Some(id) => (id, self.report.sort_dir),
            None => {
                let first = self
                    .report
                    .selection
                    .iter()
                    .find(|s| {
                        self.dataset
                            .column(s.column_id)
                            .is_some_and(|c| !c.is_param)
                    })
                    .map(|s| s.column_id);
                match first {
                    Some(id) => (id, SortDirection::Asc),
                    None => return Ok(vec![]),
                }
            }
        };

        let column = self.resolve_column_id(column_id)?;
        let mut expr = self.column_expr(column);

        if grouped && !self.report.is_grouped_by(column.id) {
            let aggregator = self
                .report
                .selection
                .iter()
                .find(|s| s.column_id == column.id)
                .and_then(|s| s.aggregator)
                .ok_or_else(|| CompileError::MissingAggregator {
                    column: column.id,
                    title: column.title.clone(),
                })?;
            expr = apply_aggregator(aggregator, expr);
        }

        Ok(vec![match dir {
            SortDirection::Asc => OrderByExpr::asc(expr),
            SortDirection::Desc => OrderByExpr::desc(expr),
        }])
    }

    // -------------------------------------------------------------------------
    // Column resolution
    // -------------------------------------------------------------------------

    fn resolve_column_id(&self, id: Uuid) -> Result<&'a DatasetColumn, CompileError> {
        self.dataset
            .column(id)
            .ok_or_else(|| CompileError::ColumnResolution {
                column: id,
                name: "<unknown>".into(),
            })
    }

    /// The SQL expression a column contributes: its derived fragment
    /// (verbatim, admin-trusted) or its physical name.
    fn column_expr(&self, column: &DatasetColumn) -> Expr {
        if let Some(derived) = &column.derived {
            return raw_sql(derived.as_str()).paren();
        }
        match &column.column_name {
            Some(name) => self.qualified(name, &self.dataset.source),
            // validate() rejects columns with neither
            None => col(&column.title),
        }
    }

    /// Parse `Table.Column` into a qualified reference; bare names are
    /// qualified with the default table.
    fn qualified(&self, name: &str, default_table: &str) -> Expr {
        match name.split_once('.') {
            Some((table, column)) => crate::sql::table_col(table, column),
            None => crate::sql::table_col(default_table, name),
        }
    }

    // -------------------------------------------------------------------------
    // Filter predicates
    // -------------------------------------------------------------------------

    fn filter_predicate(
        &mut self,
        filter: &ReportFilter,
        column: &DatasetColumn,
    ) -> Result<Expr, CompileError> {
        let invalid = |reason: String| CompileError::InvalidFilter {
            filter: filter.id,
            column: column.title.clone(),
            reason,
        };

        if !filter.operator.compatible_with(column.filter_type) {
            return Err(invalid(format!(
                "operator {:?} is not valid for filter type {:?}",
                filter.operator, column.filter_type
            )));
        }
        if !filter.arity_ok() {
            return Err(invalid(format!(
                "operator {:?} got {} criteria value(s)",
                filter.operator,
                filter.criteria.len()
            )));
        }

        let target = self.column_expr(column);

        let predicate = match filter.operator {
            FilterOperator::IsNull => target.is_null(),
            FilterOperator::IsNotNull => target.is_not_null(),

            FilterOperator::Eq => {
                if filter.criteria.len() == 1 {
                    let value = parse_value(column, &filter.criteria[0])
                        .map_err(&invalid)?;
                    target.eq(self.bind(value))
                } else {
                    let mut values = vec![];
                    for raw in &filter.criteria {
                        let value = parse_value(column, raw).map_err(&invalid)?;
                        values.push(self.bind(value));
                    }
                    Expr::In {
                        expr: Box::new(target),
                        values,
                        negated: false,
                    }
                }
            }

            FilterOperator::Ne => {
                let value = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                target.ne(self.bind(value))
            }
            FilterOperator::Lt => {
                let value = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                target.lt(self.bind(value))
            }
            FilterOperator::Lte => {
                let value = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                target.lte(self.bind(value))
            }
            FilterOperator::Gt => {
                let value = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                target.gt(self.bind(value))
            }
            FilterOperator::Gte => {
                let value = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                target.gte(self.bind(value))
            }

            FilterOperator::Like => {
                let needle = format!("%{}%", filter.criteria[0]);
                target.like(self.bind(ParamValue::String(needle)))
            }

            FilterOperator::Between => {
                let low = parse_value(column, &filter.criteria[0]).map_err(&invalid)?;
                let high = parse_value(column, &filter.criteria[1]).map_err(&invalid)?;
                let low = self.bind(low);
                let high = self.bind(high);
                Expr::Between {
                    expr: Box::new(target),
                    low: Box::new(low),
                    high: Box::new(high),
                    negated: false,
                }
            }

            FilterOperator::DateInterval => {
                let interval = filter
                    .interval
                    .ok_or_else(|| invalid("date_interval filter needs an interval unit".into()))?;
                let anchor = parse_date(&filter.criteria[0]).map_err(&invalid)?;
                // Half-open [start, end): start of the anchor's bucket up
                // to the start of the next one.
                let start = bucket::bucket_start(anchor, interval);
                let end = bucket::advance(start, interval);
                let (start, end) = if column.data_type == DataType::DateTime {
                    (
                        ParamValue::DateTime(start.and_hms_opt(0, 0, 0).unwrap_or_default()),
                        ParamValue::DateTime(end.and_hms_opt(0, 0, 0).unwrap_or_default()),
                    )
                } else {
                    (ParamValue::Date(start), ParamValue::Date(end))
                };
                let start = self.bind(start);
                let end = self.bind(end);
                target.clone().gte(start).and(target.lt(end)).paren()
            }
        };

        Ok(predicate)
    }

    fn finish(self, query: Query) -> Statement {
        let tokens = query.to_tokens_for_dialect(self.opts.dialect);
        debug_assert_eq!(tokens.placeholder_count(), self.params.len());
        Statement::new(tokens.serialize(self.opts.dialect), self.params)
    }
}

fn apply_aggregator(aggregator: Aggregator, expr: Expr) -> Expr {
    Expr::Function {
        name: aggregator.function_name().into(),
        args: vec![expr],
        distinct: false,
    }
}

// =============================================================================
// Criteria parsing
// =============================================================================

/// Parse one raw criteria string against the column's declared type.
fn parse_value(column: &DatasetColumn, raw: &str) -> Result<ParamValue, String> {
    let raw = raw.trim();
    match column.data_type {
        DataType::Text => Ok(ParamValue::String(raw.into())),
        DataType::Integer => raw
            .parse::<i64>()
            .map(ParamValue::Int)
            .map_err(|_| format!("'{}' is not an integer", raw)),
        DataType::Float | DataType::Currency => raw
            .parse::<f64>()
            .map(ParamValue::Float)
            .map_err(|_| format!("'{}' is not a number", raw)),
        DataType::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(ParamValue::Bool(true)),
            "false" | "0" | "no" => Ok(ParamValue::Bool(false)),
            _ => Err(format!("'{}' is not a boolean", raw)),
        },
        DataType::Date => parse_date(raw).map(ParamValue::Date),
        DataType::DateTime => parse_datetime(raw).map(ParamValue::DateTime),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not a date (expected YYYY-MM-DD)", raw))
}

fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| parse_date(raw).map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default()))
        .map_err(|_| format!("'{}' is not a timestamp", raw))
}
