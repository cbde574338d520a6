//! The abstract queryable data source consumed by the page factory.
//!
//! Backends implement [`DataSource`] as a strictly mutable builder: each
//! configuration call mutates the receiver in place, and `limit`/`offset`
//! are last-write-wins. `clone_query` snapshots the query before paging is
//! applied so the count and the row fetch run over the same logical query.
//!
//! Backends identify themselves through the closed [`Driver`] enum instead
//! of any form of runtime type inspection.

use std::future::Future;

use serde::Serialize;

use crate::filter::FilterMap;
use crate::sort::Sort;

/// Closed set of backend identifiers, supplied by the data source at
/// construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Driver {
   /// SQLite (via sqlx)
   Sqlite,
   /// PostgreSQL
   Postgres,
   /// MySQL / MariaDB
   Mysql,
}

impl Driver {
   /// Lowercase name, suitable for log fields.
   pub fn as_str(self) -> &'static str {
      match self {
         Driver::Sqlite => "sqlite",
         Driver::Postgres => "postgres",
         Driver::Mysql => "mysql",
      }
   }
}

/// How a relation is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum JoinType {
   /// Inner join — rows without a match are excluded
   #[default]
   Inner,
   /// Left join — rows without a match are kept
   Left,
}

/// One relation to join into the query.
#[derive(Debug, Clone)]
pub struct Relation {
   /// Relation path, e.g. `authors` or `posts.author`
   pub property: String,
   /// Join flavor
   pub join_type: JoinType,
   /// Alias for the joined relation; defaults to the last path segment
   pub alias: Option<String>,
   /// Join condition in the backend's own predicate dialect, passed through
   /// opaquely; whether it may be omitted is backend-defined
   pub condition: Option<String>,
   /// Eagerly fetch the joined relation's columns into the result rows
   pub and_select: bool,
}

impl Relation {
   /// An inner join on `property`.
   pub fn inner(property: impl Into<String>) -> Self {
      Self {
         property: property.into(),
         join_type: JoinType::Inner,
         alias: None,
         condition: None,
         and_select: false,
      }
   }

   /// A left join on `property`.
   pub fn left(property: impl Into<String>) -> Self {
      Self {
         join_type: JoinType::Left,
         ..Self::inner(property)
      }
   }

   /// Override the join alias.
   pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
      self.alias = Some(alias.into());
      self
   }

   /// Supply an explicit join condition.
   pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
      self.condition = Some(condition.into());
      self
   }

   /// Eagerly fetch the joined columns.
   pub fn and_select(mut self) -> Self {
      self.and_select = true;
      self
   }

   /// The effective alias: the explicit one, or the last segment of the
   /// relation path.
   pub fn effective_alias(&self) -> &str {
      self
         .alias
         .as_deref()
         .unwrap_or_else(|| self.property.rsplit('.').next().unwrap_or(&self.property))
   }
}

/// An abstract queryable data source.
///
/// The page factory drives this interface in a fixed order: projection and
/// joins, static filter, parsed filter conditions, count, clone, explicit
/// limit, ordering, paging, fetch. Implementations translate each call into
/// their own query representation; errors raised while executing `count` or
/// `fetch` propagate to the caller unmodified.
pub trait DataSource {
   /// One result row.
   type Row: Send + 'static;

   /// Operator-supplied static filter in the backend's own representation,
   /// AND-combined with everything else.
   type Filter;

   /// Error type surfaced by `count` and `fetch`.
   type Error: std::error::Error + Send + Sync + 'static;

   /// Which backend this source talks to.
   fn driver(&self) -> Driver;

   /// Alias the root table.
   fn table_alias(&mut self, alias: &str);

   /// Project an explicit column list. When never called, all columns are
   /// selected.
   fn select(&mut self, columns: &[String]);

   /// Join a relation.
   fn join(&mut self, relation: &Relation);

   /// AND in the operator-supplied static filter.
   fn and_filter(&mut self, filter: &Self::Filter);

   /// AND in parsed filter conditions. Operand typing is resolved against
   /// the schema at execution time; mismatches surface as `Self::Error`.
   fn and_conditions(&mut self, filter: &FilterMap);

   /// Order by the given clauses, primary key first, honoring explicit null
   /// placement where present.
   fn order_by(&mut self, sort_by: &[Sort]);

   /// Cap the number of fetched rows. Last write wins.
   fn limit(&mut self, limit: u64);

   /// Skip rows before fetching. Last write wins.
   fn offset(&mut self, offset: u64);

   /// Snapshot the query as configured so far.
   fn clone_query(&self) -> Self
   where
      Self: Sized;

   /// Count the rows matching the query, ignoring limit/offset/ordering.
   fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;

   /// Fetch the matching rows, preserving the backend's result order.
   fn fetch(&self) -> impl Future<Output = Result<Vec<Self::Row>, Self::Error>> + Send;
}
