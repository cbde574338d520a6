//! SQLite-backed [`DataSource`] implementation.
//!
//! # How It Works
//!
//! [`SqliteSelect`] is a mutable SELECT builder over a [`SqlitePool`].
//! Configuration calls accumulate rendered SQL fragments and bind values;
//! `count` and `fetch` assemble the final statement and run it. The builder
//! methods are infallible by contract, so a problem discovered while
//! rendering (a malformed identifier, a join without a condition, a
//! malformed BETWEEN operand) is stored and surfaced as the error of the
//! next `count` or `fetch` call instead. Only the first such problem is
//! kept.
//!
//! Filter operands arrive as uninterpreted text and are bound as text;
//! SQLite's column affinity resolves the comparison type at execution time.

use indexmap::IndexMap;
use pageable_core::{DataSource, Driver, FilterMap, JoinType, Relation, Sort};
use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use tracing::debug;

use crate::decode::row_to_map;
use crate::error::{Error, Result};
use crate::sql::{condition_sql, order_by_sql, quote_path, validate_identifier};

/// A decoded result row: column name to JSON value, in SELECT order.
pub type Row = IndexMap<String, JsonValue>;

/// An operator-supplied static predicate, AND-combined into the WHERE
/// clause.
///
/// The SQL fragment uses `$1`-based placeholders numbered relative to the
/// fragment itself; they are renumbered when the filter is attached to a
/// query that already carries binds.
#[derive(Debug, Clone)]
pub struct SqlFilter {
   sql: String,
   binds: Vec<JsonValue>,
}

impl SqlFilter {
   /// A predicate fragment, e.g. `"status" = $1`.
   pub fn new(sql: impl Into<String>) -> Self {
      Self {
         sql: sql.into(),
         binds: Vec::new(),
      }
   }

   /// Append a bind value for the next placeholder in the fragment.
   pub fn bind(mut self, value: impl Into<JsonValue>) -> Self {
      self.binds.push(value.into());
      self
   }
}

/// Build problems held back until execution. `sqlx::Error` is not `Clone`,
/// so the builder keeps this reduced form instead.
#[derive(Debug, Clone)]
enum BuildError {
   InvalidIdentifier(String),
   MissingJoinCondition(String),
   InvalidBetweenOperand(String),
}

impl From<BuildError> for Error {
   fn from(value: BuildError) -> Self {
      match value {
         BuildError::InvalidIdentifier(name) => Error::InvalidIdentifier { name },
         BuildError::MissingJoinCondition(property) => Error::MissingJoinCondition { property },
         BuildError::InvalidBetweenOperand(field) => Error::InvalidBetweenOperand { field },
      }
   }
}

/// A SELECT query against one SQLite table, with optional joins.
#[derive(Clone)]
pub struct SqliteSelect {
   pool: SqlitePool,
   table: String,
   alias: Option<String>,
   columns: Vec<String>,
   joined_columns: Vec<String>,
   joins: Vec<String>,
   conditions: Vec<String>,
   binds: Vec<JsonValue>,
   order_by: Option<String>,
   limit: Option<u64>,
   offset: Option<u64>,
   build_error: Option<BuildError>,
}

impl SqliteSelect {
   /// A query over `table`, selecting all columns until configured
   /// otherwise.
   pub fn new(pool: SqlitePool, table: impl Into<String>) -> Self {
      let table = table.into();
      let mut select = Self {
         pool,
         table,
         alias: None,
         columns: Vec::new(),
         joined_columns: Vec::new(),
         joins: Vec::new(),
         conditions: Vec::new(),
         binds: Vec::new(),
         order_by: None,
         limit: None,
         offset: None,
         build_error: None,
      };
      if let Err(err) = validate_identifier(&select.table) {
         select.defer(err);
      }
      select
   }

   /// Record a build problem, keeping only the first.
   fn defer(&mut self, err: Error) {
      if self.build_error.is_some() {
         return;
      }
      self.build_error = Some(match err {
         Error::InvalidIdentifier { name } => BuildError::InvalidIdentifier(name),
         Error::MissingJoinCondition { property } => BuildError::MissingJoinCondition(property),
         Error::InvalidBetweenOperand { field } => BuildError::InvalidBetweenOperand(field),
         // Builder rendering only produces the variants above.
         other => {
            debug!(error = %other, "unexpected build-time error");
            BuildError::InvalidIdentifier(other.to_string())
         }
      });
   }

   fn base_alias(&self) -> &str {
      self.alias.as_deref().unwrap_or(&self.table)
   }

   fn from_sql(&self) -> String {
      match &self.alias {
         Some(alias) => format!("{} AS {}", quote_path(&self.table), quote_path(alias)),
         None => quote_path(&self.table),
      }
   }

   fn projection_sql(&self) -> String {
      let mut parts = Vec::new();
      if self.columns.is_empty() {
         if self.joins.is_empty() {
            parts.push("*".to_string());
         } else {
            parts.push(format!("{}.*", quote_path(self.base_alias())));
         }
      } else {
         parts.extend(self.columns.iter().cloned());
      }
      parts.extend(self.joined_columns.iter().cloned());
      parts.join(", ")
   }

   fn where_sql(&self) -> String {
      if self.conditions.is_empty() {
         String::new()
      } else {
         format!(" WHERE {}", self.conditions.join(" AND "))
      }
   }

   fn join_sql(&self) -> String {
      self
         .joins
         .iter()
         .map(|j| format!(" {}", j))
         .collect::<String>()
   }

   /// The statement run by [`DataSource::count`]. Ordering and paging are
   /// irrelevant to the count and omitted.
   fn count_sql(&self) -> String {
      format!(
         "SELECT COUNT(*) FROM {}{}{}",
         self.from_sql(),
         self.join_sql(),
         self.where_sql()
      )
   }

   /// The statement run by [`DataSource::fetch`].
   fn fetch_sql(&self) -> String {
      let mut sql = format!(
         "SELECT {} FROM {}{}{}",
         self.projection_sql(),
         self.from_sql(),
         self.join_sql(),
         self.where_sql()
      );
      if let Some(order_by) = &self.order_by {
         sql.push(' ');
         sql.push_str(order_by);
      }
      if let Some(limit) = self.limit {
         sql.push_str(&format!(" LIMIT {}", limit));
      }
      if let Some(offset) = self.offset {
         // SQLite requires LIMIT before OFFSET; -1 means unbounded.
         if self.limit.is_none() {
            sql.push_str(" LIMIT -1");
         }
         sql.push_str(&format!(" OFFSET {}", offset));
      }
      sql
   }

   async fn run_count(&self) -> Result<u64> {
      if let Some(err) = &self.build_error {
         return Err(err.clone().into());
      }

      let sql = self.count_sql();
      debug!(sql = %sql, "counting rows");

      let mut query = sqlx::query_scalar::<_, i64>(&sql);
      for value in &self.binds {
         query = bind_scalar(query, value);
      }
      let total = query.fetch_one(&self.pool).await?;
      Ok(u64::try_from(total).unwrap_or(0))
   }

   async fn run_fetch(&self) -> Result<Vec<Row>> {
      if let Some(err) = &self.build_error {
         return Err(err.clone().into());
      }

      let sql = self.fetch_sql();
      debug!(sql = %sql, "fetching rows");

      let mut query = sqlx::query(&sql);
      for value in &self.binds {
         query = bind_value(query, value);
      }
      let rows = query.fetch_all(&self.pool).await?;
      rows.iter().map(row_to_map).collect()
   }
}

impl DataSource for SqliteSelect {
   type Row = Row;
   type Filter = SqlFilter;
   type Error = Error;

   fn driver(&self) -> Driver {
      Driver::Sqlite
   }

   fn table_alias(&mut self, alias: &str) {
      if let Err(err) = validate_identifier(alias) {
         self.defer(err);
         return;
      }
      self.alias = Some(alias.to_string());
   }

   fn select(&mut self, columns: &[String]) {
      for column in columns {
         match validate_identifier(column) {
            Ok(()) => self.columns.push(quote_path(column)),
            Err(err) => self.defer(err),
         }
      }
   }

   fn join(&mut self, relation: &Relation) {
      let alias = relation.effective_alias().to_string();
      let table = relation
         .property
         .rsplit('.')
         .next()
         .unwrap_or(&relation.property)
         .to_string();
      if let Err(err) = validate_identifier(&table).and_then(|()| validate_identifier(&alias)) {
         self.defer(err);
         return;
      }
      let Some(condition) = &relation.condition else {
         self.defer(Error::MissingJoinCondition {
            property: relation.property.clone(),
         });
         return;
      };

      let keyword = match relation.join_type {
         JoinType::Inner => "JOIN",
         JoinType::Left => "LEFT JOIN",
      };
      self.joins.push(format!(
         "{} {} AS {} ON {}",
         keyword,
         quote_path(&table),
         quote_path(&alias),
         condition
      ));
      if relation.and_select {
         self.joined_columns.push(format!("{}.*", quote_path(&alias)));
      }
   }

   fn and_filter(&mut self, filter: &Self::Filter) {
      let sql = shift_placeholders(&filter.sql, self.binds.len());
      self.conditions.push(format!("({})", sql));
      self.binds.extend(filter.binds.iter().cloned());
   }

   fn and_conditions(&mut self, filter: &FilterMap) {
      for (field, conditions) in filter {
         for condition in conditions {
            match condition_sql(field, condition, self.binds.len() + 1) {
               Ok((sql, binds)) => {
                  self.conditions.push(sql);
                  self.binds.extend(binds);
               }
               Err(err) => self.defer(err),
            }
         }
      }
   }

   fn order_by(&mut self, sort_by: &[Sort]) {
      match order_by_sql(sort_by) {
         Ok(sql) => self.order_by = Some(sql),
         Err(err) => self.defer(err),
      }
   }

   fn limit(&mut self, limit: u64) {
      self.limit = Some(limit);
   }

   fn offset(&mut self, offset: u64) {
      self.offset = Some(offset);
   }

   fn clone_query(&self) -> Self {
      self.clone()
   }

   async fn count(&self) -> Result<u64> {
      self.run_count().await
   }

   async fn fetch(&self) -> Result<Vec<Row>> {
      self.run_fetch().await
   }
}

/// Renumber `$N` placeholders in a fragment by `offset`.
fn shift_placeholders(sql: &str, offset: usize) -> String {
   if offset == 0 {
      return sql.to_string();
   }

   let mut out = String::with_capacity(sql.len());
   let mut chars = sql.chars().peekable();
   while let Some(ch) = chars.next() {
      if ch != '$' {
         out.push(ch);
         continue;
      }
      let mut digits = String::new();
      while let Some(d) = chars.peek().filter(|c| c.is_ascii_digit()) {
         digits.push(*d);
         chars.next();
      }
      match digits.parse::<usize>() {
         Ok(n) => out.push_str(&format!("${}", n + offset)),
         Err(_) => {
            out.push('$');
            out.push_str(&digits);
         }
      }
   }
   out
}

type SqliteQuery<'q> =
   sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;
type SqliteScalar<'q> =
   sqlx::query::QueryScalar<'q, sqlx::Sqlite, i64, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_value<'q>(query: SqliteQuery<'q>, value: &JsonValue) -> SqliteQuery<'q> {
   match value {
      JsonValue::Null => query.bind(Option::<String>::None),
      JsonValue::Bool(b) => query.bind(*b),
      JsonValue::Number(n) => {
         if let Some(i) = n.as_i64() {
            query.bind(i)
         } else {
            query.bind(n.as_f64().unwrap_or(0.0))
         }
      }
      JsonValue::String(s) => query.bind(s.clone()),
      other => query.bind(other.to_string()),
   }
}

fn bind_scalar<'q>(query: SqliteScalar<'q>, value: &JsonValue) -> SqliteScalar<'q> {
   match value {
      JsonValue::Null => query.bind(Option::<String>::None),
      JsonValue::Bool(b) => query.bind(*b),
      JsonValue::Number(n) => {
         if let Some(i) = n.as_i64() {
            query.bind(i)
         } else {
            query.bind(n.as_f64().unwrap_or(0.0))
         }
      }
      JsonValue::String(s) => query.bind(s.clone()),
      other => query.bind(other.to_string()),
   }
}
