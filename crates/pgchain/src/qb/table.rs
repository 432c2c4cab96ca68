//! Per-query session state and statement assembly.

use crate::condition::{self, ConditionError, Op, Triple};
use crate::config::{MalformedConditionPolicy, UnfilteredWritePolicy};
use crate::error::{ChainError, ChainResult};
use crate::ident::Ident;
use crate::qb::Database;
use crate::qb::param::{Binder, Clause, Compiled};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Sort direction for [`TableQuery::order_by`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for Direction {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(ChainError::validation(format!(
                "invalid sort direction {s:?}: expected ASC or DESC"
            ))),
        }
    }
}

/// Aggregate function for the scalar terminal operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Aggregate {
    pub fn as_sql(self) -> &'static str {
        match self {
            Aggregate::Count => "COUNT",
            Aggregate::Sum => "SUM",
            Aggregate::Avg => "AVG",
            Aggregate::Min => "MIN",
            Aggregate::Max => "MAX",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Aggregate::Count => "count",
            Aggregate::Sum => "sum",
            Aggregate::Avg => "avg",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        }
    }
}

/// A statement ready to run: the named form (for logs and tests) plus its compiled form.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltStatement {
    /// Operation name: `select`, `insert`, `update`, `delete`, `count`, ...
    pub tag: &'static str,
    /// SQL with `:name` placeholders.
    pub named_sql: String,
    pub compiled: Compiled,
}

/// Error recorded by a fluent call and reported by the terminal operation.
#[derive(Debug, Clone)]
enum Deferred {
    Validation(String),
    Condition(ConditionError),
}

impl From<Deferred> for ChainError {
    fn from(deferred: Deferred) -> Self {
        match deferred {
            Deferred::Validation(message) => ChainError::Validation(message),
            Deferred::Condition(err) => ChainError::Condition(err),
        }
    }
}

fn ident(raw: &str, what: &str) -> Result<Ident, Deferred> {
    Ident::sanitized(raw).map_err(|err| match err {
        ChainError::Validation(message) => {
            Deferred::Validation(format!("invalid {what} {raw:?}: {message}"))
        }
        other => Deferred::Validation(other.to_string()),
    })
}

/// One logical query against one table.
///
/// Created by [`Database::from`]. Fluent methods take the session by value and return
/// it; terminal operations (see `execute.rs`) consume it.
///
/// ```ignore
/// let adults = db
///     .from("users")
///     .filter("age >= 18, status = active")
///     .order_by([("name", Direction::Asc)])
///     .limit(20, Some(2))
///     .select_all(&[])
///     .await?;
/// ```
#[derive(Debug)]
pub struct TableQuery<'a, C> {
    pub(crate) db: &'a Database<C>,
    table: Option<Ident>,
    where_sql: String,
    group_by: String,
    order_by: String,
    limit: String,
    offset: String,
    primary_key: Option<Ident>,
    allow_unfiltered: Option<bool>,
    binder: Binder,
    error: Option<Deferred>,
}

impl<C> Clone for TableQuery<'_, C> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            table: self.table.clone(),
            where_sql: self.where_sql.clone(),
            group_by: self.group_by.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit.clone(),
            offset: self.offset.clone(),
            primary_key: self.primary_key.clone(),
            allow_unfiltered: self.allow_unfiltered,
            binder: self.binder.clone(),
            error: self.error.clone(),
        }
    }
}

impl<'a, C> TableQuery<'a, C> {
    pub(crate) fn new(db: &'a Database<C>, table: &str) -> Self {
        let mut query = Self {
            db,
            table: None,
            where_sql: String::new(),
            group_by: String::new(),
            order_by: String::new(),
            limit: String::new(),
            offset: String::new(),
            primary_key: None,
            allow_unfiltered: None,
            binder: Binder::new(),
            error: None,
        };
        match ident(table, "table name") {
            Ok(table) => query.table = Some(table),
            Err(err) => query.fail(err),
        }
        query
    }

    fn fail(&mut self, err: Deferred) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Start a new logical query against `table`. Every fragment and binding is reset.
    pub fn from(self, table: &str) -> Self {
        Self::new(self.db, table)
    }

    /// Set the WHERE clause from a condition string such as `"age >= 18, status = active"`.
    ///
    /// Predicates are AND-conjoined. Calling this again replaces the previous clause and
    /// its bindings.
    pub fn filter(mut self, condition: &str) -> Self {
        self.binder.remove_clause(Clause::Where);
        self.where_sql.clear();

        let triples = match self.parse_condition(condition) {
            Ok(triples) => triples,
            Err(err) => {
                self.fail(Deferred::Condition(err));
                return self;
            }
        };

        let mut predicates = Vec::with_capacity(triples.len());
        for triple in triples {
            match self.render_predicate(&triple) {
                Ok(predicate) => predicates.push(predicate),
                Err(err) => {
                    self.binder.remove_clause(Clause::Where);
                    self.fail(err);
                    return self;
                }
            }
        }
        self.where_sql = format!(" WHERE {}", predicates.join(" AND "));
        self
    }

    fn parse_condition(&self, condition: &str) -> Result<Vec<Triple>, ConditionError> {
        match self.db.config().malformed_conditions {
            MalformedConditionPolicy::Reject => condition::parse(condition),
            MalformedConditionPolicy::Skip => {
                let parsed = condition::parse_lenient(condition)?;
                for skipped in &parsed.skipped {
                    tracing::warn!(
                        target: "pgchain.condition",
                        fragment = %skipped.fragment,
                        error = %skipped.error,
                        "skipping malformed condition fragment"
                    );
                }
                if parsed.triples.is_empty() {
                    return Err(ConditionError::NothingAccepted {
                        skipped: parsed.skipped.len(),
                    });
                }
                Ok(parsed.triples)
            }
        }
    }

    fn render_predicate(&mut self, triple: &Triple) -> Result<String, Deferred> {
        let column = ident(&triple.column, "column")?;
        let value = Value::from_literal(&triple.value);
        let predicate = match (triple.op, &value) {
            (Op::Eq, Value::Null) => format!("{} IS NULL", column.to_sql()),
            (Op::Ne | Op::LtGt, Value::Null) => format!("{} IS NOT NULL", column.to_sql()),
            (op, _) => {
                let seed = column.placeholder_seed();
                let name = self.binder.register(Clause::Where, &seed, value);
                format!("{} {} {}", column.to_sql(), op.as_sql(), name)
            }
        };
        Ok(predicate)
    }

    /// `GROUP BY c1, c2, ...`. An empty list clears the clause.
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        match column_list(columns) {
            Ok(list) if list.is_empty() => self.group_by.clear(),
            Ok(list) => self.group_by = format!(" GROUP BY {list}"),
            Err(err) => self.fail(err),
        }
        self
    }

    /// `ORDER BY c1 DIR1, c2 DIR2, ...`, in iteration order. An empty list clears the clause.
    pub fn order_by<K, I>(mut self, columns: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Direction)>,
    {
        let mut terms = Vec::new();
        for (column, direction) in columns {
            match ident(column.as_ref(), "column") {
                Ok(column) => terms.push(format!("{} {}", column.to_sql(), direction)),
                Err(err) => {
                    self.fail(err);
                    return self;
                }
            }
        }
        if terms.is_empty() {
            self.order_by.clear();
        } else {
            self.order_by = format!(" ORDER BY {}", terms.join(", "));
        }
        self
    }

    /// `LIMIT count`. With `page > 1`, also `OFFSET (page - 1) * count`.
    pub fn limit(mut self, count: u64, page: Option<u64>) -> Self {
        self.limit = format!(" LIMIT {count}");
        match page {
            Some(page) if page > 1 => self.offset((page - 1).saturating_mul(count)),
            _ => self,
        }
    }

    /// `OFFSET rows`. Later calls override earlier ones.
    pub fn offset(mut self, rows: u64) -> Self {
        self.offset = format!(" OFFSET {rows}");
        self
    }

    /// Column returned by [`TableQuery::insert`]. Defaults to `id`.
    pub fn primary_key(mut self, column: &str) -> Self {
        match ident(column, "primary key") {
            Ok(column) => self.primary_key = Some(column),
            Err(err) => self.fail(err),
        }
        self
    }

    /// Allow (or forbid) UPDATE/DELETE without a WHERE clause for this session only.
    pub fn allow_unfiltered(mut self, allow: bool) -> Self {
        self.allow_unfiltered = Some(allow);
        self
    }

    /// Bindings accumulated so far, in accumulation order.
    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    fn check(&self) -> ChainResult<&Ident> {
        if let Some(err) = &self.error {
            return Err(err.clone().into());
        }
        self.table
            .as_ref()
            .ok_or_else(|| ChainError::validation("no target table"))
    }

    fn finish(
        tag: &'static str,
        named_sql: String,
        binder: &Binder,
    ) -> ChainResult<BuiltStatement> {
        let compiled = binder.compile(&named_sql)?;
        Ok(BuiltStatement {
            tag,
            named_sql,
            compiled,
        })
    }

    /// `SELECT <cols|*> FROM t WHERE... GROUP BY... ORDER BY... LIMIT... OFFSET...`
    pub fn select_statement(&self, columns: &[&str]) -> ChainResult<BuiltStatement> {
        let table = self.check()?;
        let columns = column_list(columns)?;
        let columns = if columns.is_empty() { "*".to_string() } else { columns };
        let sql = format!(
            "SELECT {columns} FROM {}{}{}{}{}{}",
            table.to_sql(),
            self.where_sql,
            self.group_by,
            self.order_by,
            self.limit,
            self.offset
        );
        Self::finish("select", sql, &self.binder)
    }

    /// [`TableQuery::select_statement`] plus `LIMIT 1`, unless the session already has a
    /// LIMIT.
    pub fn select_one_statement(&self, columns: &[&str]) -> ChainResult<BuiltStatement> {
        if self.limit.is_empty() {
            self.clone().limit(1, None).select_statement(columns)
        } else {
            self.select_statement(columns)
        }
    }

    /// `INSERT INTO t (cols) VALUES (:col, ...) RETURNING "<primary key>"`
    pub fn insert_statement(&self, values: &[(String, Value)]) -> ChainResult<BuiltStatement> {
        let table = self.check()?;
        if values.is_empty() {
            return Err(ChainError::validation("insert requires at least one column"));
        }

        let mut binder = self.binder.clone();
        let mut columns = Vec::with_capacity(values.len());
        let mut placeholders = Vec::with_capacity(values.len());
        for (column, value) in values {
            let column = ident(column, "column")?;
            placeholders.push(binder.register(
                Clause::Insert,
                &column.placeholder_seed(),
                value.clone(),
            ));
            columns.push(column.to_sql());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table.to_sql(),
            columns.join(", "),
            placeholders.join(", "),
            self.primary_key_sql()
        );
        Self::finish("insert", sql, &binder)
    }

    fn primary_key_sql(&self) -> String {
        self.primary_key
            .as_ref()
            .map_or_else(|| "\"id\"".to_string(), Ident::to_sql)
    }

    /// `UPDATE t SET "col" = :col_set, ... WHERE...`
    ///
    /// GROUP BY / ORDER BY / LIMIT / OFFSET move into a `ctid` sub-select, the PostgreSQL
    /// way of bounding an UPDATE.
    pub fn update_statement(&self, values: &[(String, Value)]) -> ChainResult<BuiltStatement> {
        let table = self.check()?;
        if values.is_empty() {
            return Err(ChainError::validation("update requires at least one column"));
        }
        self.guard_unfiltered("update", table)?;

        let mut binder = self.binder.clone();
        let mut sets = Vec::with_capacity(values.len());
        for (column, value) in values {
            let column = ident(column, "column")?;
            let name = binder.register(Clause::Set, &column.placeholder_seed(), value.clone());
            sets.push(format!("{} = {}", column.to_sql(), name));
        }

        let sql = format!(
            "UPDATE {} SET {}{}",
            table.to_sql(),
            sets.join(", "),
            self.write_filter(table)
        );
        Self::finish("update", sql, &binder)
    }

    /// `DELETE FROM t WHERE...`, bounded the same way as [`TableQuery::update_statement`].
    pub fn delete_statement(&self) -> ChainResult<BuiltStatement> {
        let table = self.check()?;
        self.guard_unfiltered("delete", table)?;
        let sql = format!("DELETE FROM {}{}", table.to_sql(), self.write_filter(table));
        Self::finish("delete", sql, &self.binder)
    }

    fn write_filter(&self, table: &Ident) -> String {
        let bounded = !(self.group_by.is_empty()
            && self.order_by.is_empty()
            && self.limit.is_empty()
            && self.offset.is_empty());
        if !bounded {
            return self.where_sql.clone();
        }
        format!(
            " WHERE ctid IN (SELECT ctid FROM {}{}{}{}{}{})",
            table.to_sql(),
            self.where_sql,
            self.group_by,
            self.order_by,
            self.limit,
            self.offset
        )
    }

    fn guard_unfiltered(&self, op: &str, table: &Ident) -> ChainResult<()> {
        if !self.where_sql.is_empty() {
            return Ok(());
        }
        let allowed = self
            .allow_unfiltered
            .unwrap_or(self.db.config().unfiltered_writes == UnfilteredWritePolicy::Allow);
        if !allowed {
            return Err(ChainError::validation(format!(
                "{op} on {} without a WHERE clause is not allowed (use allow_unfiltered(true))",
                table.to_sql()
            )));
        }
        tracing::warn!(
            target: "pgchain.guard",
            op,
            table = %table.to_sql(),
            "running {op} without a WHERE clause"
        );
        Ok(())
    }

    /// `SELECT OP(column) AS total FROM t WHERE... GROUP BY...`. `None` means `*`.
    pub fn aggregate_statement(
        &self,
        aggregate: Aggregate,
        column: Option<&str>,
    ) -> ChainResult<BuiltStatement> {
        let table = self.check()?;
        let column = match column {
            None => "*".to_string(),
            Some(column) => ident(column, "column")?.to_sql(),
        };
        let sql = format!(
            "SELECT {}({column}) AS total FROM {}{}{}",
            aggregate.as_sql(),
            table.to_sql(),
            self.where_sql,
            self.group_by
        );
        Self::finish(aggregate.tag(), sql, &self.binder)
    }
}

/// Sanitize and quote `c1, c2, ...`. A lone `*` entry is kept as-is.
fn column_list(columns: &[&str]) -> Result<String, Deferred> {
    let mut out = Vec::with_capacity(columns.len());
    for &column in columns {
        if column.trim() == "*" {
            out.push("*".to_string());
        } else {
            out.push(ident(column, "column")?.to_sql());
        }
    }
    Ok(out.join(", "))
}
