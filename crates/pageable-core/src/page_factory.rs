//! The page factory: executes a canonical list query against a data source
//! and assembles the response envelope.
//!
//! # How it works
//!
//! The factory drives the [`DataSource`] builder in a fixed order:
//! projection and joins, the endpoint's static filter, the parsed filter
//! conditions, a count of all matching rows, then — on a snapshot of that
//! query — the explicit-limit clamp, the sortable allow-list, paging, and
//! the row fetch. The count and the fetch are two separate reads; under
//! concurrent writes they may observe different states of the store, which
//! is an accepted tradeoff rather than a bug.
//!
//! Near the end of the result set the requested page size is reduced by the
//! shortfall (`offset + size - total`) so the final page never asks the
//! backend for rows past the end.

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::query::PageQuery;
use crate::response::Paginated;
use crate::source::{DataSource, Relation};

/// Per-endpoint execution configuration, consumed by one
/// [`PageFactory::create`] run.
pub struct PageFactoryConfig<S: DataSource> {
   /// Explicit column projection; `None` selects all columns
   pub select: Option<Vec<String>>,
   /// Allow-list of sortable properties; `None` allows everything
   pub sortable: Option<Vec<String>>,
   /// Relations to join, in order
   pub relations: Vec<Relation>,
   /// Static filter AND-combined with the client's conditions
   pub filter: Option<S::Filter>,
   /// Alias for the root table
   pub alias: Option<String>,
}

impl<S: DataSource> Default for PageFactoryConfig<S> {
   fn default() -> Self {
      Self {
         select: None,
         sortable: None,
         relations: Vec::new(),
         filter: None,
         alias: None,
      }
   }
}

type RowMapper<R, T> = Box<dyn Fn(R) -> BoxFuture<'static, T> + Send + Sync>;

/// Builds one page of results from a [`PageQuery`] and a [`DataSource`].
///
/// The factory is a consuming builder: `config`, `map`, and `map_async`
/// each take `self` and return the factory, and `create` finishes it.
pub struct PageFactory<S: DataSource, T = <S as DataSource>::Row> {
   query: PageQuery,
   source: S,
   config: PageFactoryConfig<S>,
   mapper: RowMapper<S::Row, T>,
}

impl<S: DataSource> PageFactory<S, S::Row> {
   /// Create a factory that returns rows unmapped.
   pub fn new(query: PageQuery, source: S) -> Self {
      Self {
         query,
         source,
         config: PageFactoryConfig::default(),
         mapper: Box::new(|row| std::future::ready(row).boxed()),
      }
   }
}

impl<S: DataSource, T: Send + 'static> PageFactory<S, T> {
   /// Attach the endpoint configuration.
   pub fn config(mut self, config: PageFactoryConfig<S>) -> Self {
      self.config = config;
      self
   }

   /// Map each fetched row through `mapper`, preserving fetch order.
   pub fn map<U, F>(self, mapper: F) -> PageFactory<S, U>
   where
      U: Send + 'static,
      F: Fn(S::Row) -> U + Send + Sync + 'static,
   {
      self.map_async(move |row| std::future::ready(mapper(row)))
   }

   /// Map each fetched row through an async `mapper`. Rows are mapped one at
   /// a time, in fetch order.
   pub fn map_async<U, F, Fut>(self, mapper: F) -> PageFactory<S, U>
   where
      U: Send + 'static,
      F: Fn(S::Row) -> Fut + Send + Sync + 'static,
      Fut: Future<Output = U> + Send + 'static,
   {
      PageFactory {
         query: self.query,
         source: self.source,
         config: self.config,
         mapper: Box::new(move |row| mapper(row).boxed()),
      }
   }

   /// Execute the query and assemble the paginated response.
   ///
   /// Errors raised by the data source (unknown fields, operand type
   /// mismatches, connection failures) propagate unmodified. The count and
   /// the row fetch are not transactionally consistent with each other.
   pub async fn create(self) -> Result<Paginated<T>, S::Error> {
      let mut query = self.query;
      let mut source = self.source;
      tracing::debug!(driver = source.driver().as_str(), "building list query");

      if let Some(alias) = &self.config.alias {
         source.table_alias(alias);
      }
      if let Some(columns) = &self.config.select {
         source.select(columns);
      }
      for relation in &self.config.relations {
         source.join(relation);
      }
      if let Some(filter) = &self.config.filter {
         source.and_filter(filter);
      }
      if !query.filter.is_empty() {
         source.and_conditions(&query.filter);
      }

      let mut total_items = source.count().await?;

      // Snapshot the filtered query; paging below only touches the clone.
      let mut source = source.clone_query();

      if let Some(limit) = query.limit {
         source.limit(limit);
         total_items = total_items.min(limit);
      }

      if let Some(sortable) = &self.config.sortable {
         query
            .sort_by
            .retain(|sort| sortable.iter().any(|field| field == &sort.property));
      }
      if !query.sort_by.is_empty() {
         source.order_by(&query.sort_by);
      }

      if query.unpaged {
         query.current_page = 1;
         query.offset = 0;
         query.items_per_page = total_items;
      } else {
         let shortfall = (query.offset + query.items_per_page).saturating_sub(total_items);
         let applied_size = query.items_per_page.saturating_sub(shortfall);
         tracing::debug!(
            offset = query.offset,
            applied_size,
            total_items,
            "applying page window"
         );
         source.offset(query.offset);
         source.limit(applied_size);
      }

      let rows = source.fetch().await?;

      let mut data = Vec::with_capacity(rows.len());
      for row in rows {
         data.push((self.mapper)(row).await);
      }

      Ok(Paginated::assemble(data, &query, total_items))
   }
}

#[cfg(test)]
mod tests {
   use std::convert::Infallible;
   use std::sync::{Arc, Mutex};

   use serde_json::{Value as JsonValue, json};
   use url::Url;

   use super::*;
   use crate::filter::FilterMap;
   use crate::query::{PageQuery, PageQueryOptions, RawQuery};
   use crate::sort::Sort;
   use crate::source::Driver;

   /// Records every builder call and replays canned count/fetch results,
   /// standing in for a real backend.
   #[derive(Debug, Default, Clone)]
   struct Recording {
      selected: Option<Vec<String>>,
      alias: Option<String>,
      joins: Vec<String>,
      static_filters: Vec<String>,
      conditions: Vec<FilterMap>,
      order_by: Option<Vec<Sort>>,
      limit: Option<u64>,
      offset: Option<u64>,
   }

   #[derive(Clone)]
   struct MockSource {
      count: u64,
      rows: Vec<JsonValue>,
      recording: Arc<Mutex<Recording>>,
   }

   impl MockSource {
      fn new(count: u64, rows: Vec<JsonValue>) -> Self {
         Self {
            count,
            rows,
            recording: Arc::new(Mutex::new(Recording::default())),
         }
      }

      fn recorded(&self) -> Recording {
         self.recording.lock().unwrap().clone()
      }
   }

   impl DataSource for MockSource {
      type Row = JsonValue;
      type Filter = String;
      type Error = Infallible;

      fn driver(&self) -> Driver {
         Driver::Sqlite
      }

      fn table_alias(&mut self, alias: &str) {
         self.recording.lock().unwrap().alias = Some(alias.to_string());
      }

      fn select(&mut self, columns: &[String]) {
         self.recording.lock().unwrap().selected = Some(columns.to_vec());
      }

      fn join(&mut self, relation: &Relation) {
         self
            .recording
            .lock()
            .unwrap()
            .joins
            .push(format!("{}->{}", relation.property, relation.effective_alias()));
      }

      fn and_filter(&mut self, filter: &String) {
         self.recording.lock().unwrap().static_filters.push(filter.clone());
      }

      fn and_conditions(&mut self, filter: &FilterMap) {
         self.recording.lock().unwrap().conditions.push(filter.clone());
      }

      fn order_by(&mut self, sort_by: &[Sort]) {
         self.recording.lock().unwrap().order_by = Some(sort_by.to_vec());
      }

      fn limit(&mut self, limit: u64) {
         self.recording.lock().unwrap().limit = Some(limit);
      }

      fn offset(&mut self, offset: u64) {
         self.recording.lock().unwrap().offset = Some(offset);
      }

      fn clone_query(&self) -> Self {
         // Shares the recording so tests can observe post-snapshot calls.
         self.clone()
      }

      async fn count(&self) -> Result<u64, Infallible> {
         Ok(self.count)
      }

      async fn fetch(&self) -> Result<Vec<JsonValue>, Infallible> {
         let recording = self.recording.lock().unwrap();
         let offset = recording.offset.unwrap_or(0) as usize;
         let limit = recording.limit.map_or(self.rows.len(), |l| l as usize);
         Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
      }
   }

   fn rows(n: u64) -> Vec<JsonValue> {
      (1..=n).map(|id| json!({ "id": id })).collect()
   }

   fn query_from(pairs: &[(&str, &str)], options: &PageQueryOptions) -> PageQuery {
      let raw = RawQuery::from_pairs(pairs.iter().map(|(k, v)| (*k, *v)));
      PageQuery::parse(&raw, options, None)
   }

   // ─── page windows ───

   #[tokio::test]
   async fn applies_offset_and_page_size() {
      let source = MockSource::new(20, rows(20));
      let query = query_from(&[("page", "2"), ("limit", "5")], &PageQueryOptions::default());

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      let recorded = source.recorded();
      assert_eq!(recorded.offset, Some(5));
      assert_eq!(recorded.limit, Some(5));
      assert_eq!(page.meta.total_items, 20);
      assert_eq!(page.meta.total_pages, 4);
      assert_eq!(page.data.len(), 5);
      assert_eq!(page.data[0], json!({ "id": 6 }));
   }

   #[tokio::test]
   async fn last_page_is_shrunk_by_the_shortfall() {
      // 22 rows, page 3 of size 10: only 2 rows remain past offset 20.
      let source = MockSource::new(22, rows(22));
      let query = query_from(&[("page", "3")], &PageQueryOptions::default());

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      let recorded = source.recorded();
      assert_eq!(recorded.offset, Some(20));
      assert_eq!(recorded.limit, Some(2));
      assert_eq!(page.data.len(), 2);
   }

   #[tokio::test]
   async fn page_past_the_end_fetches_zero_rows() {
      let source = MockSource::new(20, rows(20));
      let query = query_from(&[("page", "5"), ("limit", "5")], &PageQueryOptions::default());

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      assert_eq!(source.recorded().limit, Some(0));
      assert!(page.data.is_empty());
      assert_eq!(page.meta.total_pages, 4);
   }

   // ─── explicit limit ───

   #[tokio::test]
   async fn explicit_limit_caps_the_total_and_the_final_page() {
      let source = MockSource::new(20, rows(20));
      let options = PageQueryOptions {
         limit: Some(15),
         ..Default::default()
      };
      let query = query_from(&[("page", "2")], &options);

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      // 15 total capped; second page of 10 runs past the cap, so 5 rows.
      let recorded = source.recorded();
      assert_eq!(recorded.offset, Some(10));
      assert_eq!(recorded.limit, Some(5));
      assert_eq!(page.meta.total_items, 15);
      assert_eq!(page.meta.total_pages, 2);
      assert_eq!(page.data.len(), 5);
   }

   // ─── unpaged ───

   #[tokio::test]
   async fn unpaged_resets_paging_and_reports_the_total_as_size() {
      let source = MockSource::new(13, rows(13));
      let options = PageQueryOptions {
         enable_unpaged: true,
         ..Default::default()
      };
      let query = query_from(&[("unpaged", "true"), ("page", "3")], &options);

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      let recorded = source.recorded();
      assert_eq!(recorded.offset, None);
      assert_eq!(recorded.limit, None);
      assert_eq!(page.data.len(), 13);
      assert_eq!(page.meta.current_page, 1);
      assert_eq!(page.meta.offset, 0);
      assert_eq!(page.meta.items_per_page, 13);
      assert_eq!(page.meta.total_pages, 1);
   }

   #[tokio::test]
   async fn unpaged_disabled_by_the_endpoint_behaves_as_paged() {
      let source = MockSource::new(13, rows(13));
      let query = query_from(&[("unpaged", "true")], &PageQueryOptions::default());

      let page = PageFactory::new(query, source.clone()).create().await.unwrap();

      assert_eq!(source.recorded().limit, Some(10));
      assert_eq!(page.data.len(), 10);
      assert!(!page.meta.unpaged);
   }

   // ─── configuration ───

   #[tokio::test]
   async fn config_is_forwarded_to_the_source() {
      let source = MockSource::new(0, vec![]);
      let query = query_from(&[("filter[id]", "$gte:2")], &PageQueryOptions::default());

      let config = PageFactoryConfig {
         select: Some(vec!["id".into(), "name".into()]),
         relations: vec![
            Relation::inner("a"),
            Relation::left("b.c").with_alias("cAlias"),
         ],
         filter: Some("status = 'active'".to_string()),
         alias: Some("t".into()),
         ..Default::default()
      };

      PageFactory::new(query, source.clone())
         .config(config)
         .create()
         .await
         .unwrap();

      let recorded = source.recorded();
      assert_eq!(recorded.alias.as_deref(), Some("t"));
      assert_eq!(recorded.selected, Some(vec!["id".to_string(), "name".to_string()]));
      assert_eq!(recorded.joins, vec!["a->a", "b.c->cAlias"]);
      assert_eq!(recorded.static_filters, vec!["status = 'active'"]);
      assert_eq!(recorded.conditions.len(), 1);
   }

   #[tokio::test]
   async fn sortable_allow_list_filters_the_sort_clauses() {
      let source = MockSource::new(5, rows(5));
      let query = query_from(
         &[
            ("sortBy", "property[id];direction[asc];nulls-first[true];"),
            ("sortBy", "property[name];direction[desc];"),
            ("sortBy", "property[secret];direction[asc];"),
         ],
         &PageQueryOptions::default(),
      );

      let config = PageFactoryConfig {
         sortable: Some(vec!["id".into(), "name".into()]),
         ..Default::default()
      };
      let page = PageFactory::new(query, source.clone())
         .config(config)
         .create()
         .await
         .unwrap();

      assert_eq!(
         source.recorded().order_by,
         Some(vec![Sort::asc("id").nulls_first(true), Sort::desc("name")])
      );
      // The filtered sequence is also what the metadata reports.
      assert_eq!(page.meta.sort_by.len(), 2);
   }

   #[tokio::test]
   async fn all_sorts_filtered_out_skips_ordering() {
      let source = MockSource::new(5, rows(5));
      let query = query_from(
         &[("sortBy", "property[secret];direction[asc];")],
         &PageQueryOptions::default(),
      );

      let config = PageFactoryConfig {
         sortable: Some(vec!["id".into()]),
         ..Default::default()
      };
      PageFactory::new(query, source.clone())
         .config(config)
         .create()
         .await
         .unwrap();

      assert_eq!(source.recorded().order_by, None);
   }

   // ─── mapping ───

   #[tokio::test]
   async fn sync_mapper_transforms_rows_in_order() {
      let source = MockSource::new(3, rows(3));
      let query = query_from(&[], &PageQueryOptions::default());

      let page = PageFactory::new(query, source)
         .map(|row| row["id"].as_u64().unwrap() * 10)
         .create()
         .await
         .unwrap();

      assert_eq!(page.data, vec![10, 20, 30]);
   }

   #[tokio::test]
   async fn async_mapper_preserves_fetch_order() {
      let source = MockSource::new(3, rows(3));
      let query = query_from(&[], &PageQueryOptions::default());

      let page = PageFactory::new(query, source)
         .map_async(|row| async move {
            tokio::task::yield_now().await;
            format!("row-{}", row["id"])
         })
         .create()
         .await
         .unwrap();

      assert_eq!(page.data, vec!["row-1", "row-2", "row-3"]);
   }

   // ─── envelope ───

   #[tokio::test]
   async fn envelope_links_reflect_the_request_url() {
      let url = Url::parse("http://localhost:3000/test?verbose=yes&page=2&limit=5").unwrap();
      let raw = RawQuery::from_url(&url);
      let query = PageQuery::parse(&raw, &PageQueryOptions::default(), Some(url));
      let source = MockSource::new(25, rows(25));

      let page = PageFactory::new(query, source).create().await.unwrap();

      assert_eq!(page.meta.current_page, 2);
      assert_eq!(page.meta.total_pages, 5);
      let next = page.links.next.unwrap();
      assert!(next.contains("verbose=yes"));
      assert!(next.contains("page=3"));
      assert!(next.contains("limit=5"));
   }
}
