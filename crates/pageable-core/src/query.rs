//! Canonical list-query construction from raw query parameters.
//!
//! The merge runs in three tiers, each validated field by field:
//!
//! 1. Library defaults (page 1, size 10, paged, no sort, no filter).
//! 2. Endpoint defaults from [`PageQueryOptions::defaults`].
//! 3. Raw query values.
//!
//! A field that fails validation at any tier silently keeps the value from
//! the tier below — one malformed query parameter never fails the whole
//! request. The derived offset is the only field never accepted from input.

use indexmap::IndexMap;
use serde::Serialize;
use url::Url;

use crate::coerce::{self, MAX_EXACT_INTEGER};
use crate::filter::{DEFAULT_OPERAND_SEPARATOR, FilterMap, parse_filter_values};
use crate::sort::{Sort, parse_sort_params};

/// Library default for `page` when absent or invalid.
pub const DEFAULT_CURRENT_PAGE: u64 = 1;

/// Library default for `limit` (page size) when absent or invalid.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Default upper bound on the page size. Endpoints can raise, lower, or
/// disable it via [`PageQueryOptions::max_size`].
pub const DEFAULT_MAX_SIZE: u64 = 100;

/// One raw query value: a single string or repeated occurrences of the same
/// key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
   /// Key appeared once
   Single(String),
   /// Key appeared multiple times, in order
   Many(Vec<String>),
}

impl RawValue {
   /// The value when the key appeared exactly once; repeated keys yield
   /// `None` for parameters that only make sense as scalars.
   fn as_single(&self) -> Option<&str> {
      match self {
         RawValue::Single(value) => Some(value),
         RawValue::Many(_) => None,
      }
   }

   /// All occurrences, in order.
   fn values(&self) -> Vec<String> {
      match self {
         RawValue::Single(value) => vec![value.clone()],
         RawValue::Many(values) => values.clone(),
      }
   }
}

/// Raw query parameters as handed over by the framework adapter.
///
/// Preserves both the order of keys and the order of repeated occurrences of
/// the same key, which matters for sort precedence and AND-combined filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawQuery {
   params: IndexMap<String, RawValue>,
}

impl RawQuery {
   /// An empty query.
   pub fn new() -> Self {
      Self::default()
   }

   /// Append one key/value pair. A repeated key is promoted to
   /// [`RawValue::Many`].
   pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
      let key = key.into();
      let value = value.into();
      if let Some(slot) = self.params.get_mut(&key) {
         match std::mem::replace(slot, RawValue::Many(Vec::new())) {
            RawValue::Single(first) => *slot = RawValue::Many(vec![first, value]),
            RawValue::Many(mut values) => {
               values.push(value);
               *slot = RawValue::Many(values);
            }
         }
      } else {
         self.params.insert(key, RawValue::Single(value));
      }
   }

   /// Build from decoded key/value pairs, e.g. a framework's query map.
   pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
   where
      K: Into<String>,
      V: Into<String>,
   {
      let mut raw = Self::new();
      for (key, value) in pairs {
         raw.append(key, value);
      }
      raw
   }

   /// Build from the query string of a request URL.
   pub fn from_url(url: &Url) -> Self {
      Self::from_pairs(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
   }

   fn get(&self, key: &str) -> Option<&RawValue> {
      self.params.get(key)
   }

   /// All `filter[field]` entries, in order of first appearance.
   fn filter_entries(&self) -> impl Iterator<Item = (&str, Vec<String>)> {
      self.params.iter().filter_map(|(key, value)| {
         let field = key.strip_prefix("filter[")?.strip_suffix(']')?;
         if field.is_empty() {
            return None;
         }
         Some((field, value.values()))
      })
   }
}

/// Typed per-endpoint default values, applied below raw query values and
/// above library defaults. Each field is validated individually; an invalid
/// field falls back to the library default without affecting the others.
#[derive(Debug, Clone)]
pub struct PageQueryDefaults {
   /// Default page number (validated: ≥ 1, exact-integer range)
   pub current_page: u64,
   /// Default page size (validated: ≥ 1, ≤ max size, exact-integer range)
   pub items_per_page: u64,
   /// Default paging mode
   pub unpaged: bool,
   /// Default sort clauses, used when the query carries no `sortBy`
   pub sort_by: Vec<Sort>,
}

impl Default for PageQueryDefaults {
   fn default() -> Self {
      Self {
         current_page: DEFAULT_CURRENT_PAGE,
         items_per_page: DEFAULT_PAGE_SIZE,
         unpaged: false,
         sort_by: Vec::new(),
      }
   }
}

/// Per-endpoint parsing configuration.
///
/// Constructed once per endpoint, treated as immutable static configuration
/// thereafter.
#[derive(Debug, Clone)]
pub struct PageQueryOptions {
   /// Honor the `limit` query parameter. When false, clients cannot change
   /// the page size. Default: true
   pub enable_size: bool,

   /// Honor the `sortBy` query parameter. When false, requested sorts are
   /// ignored at parse time and the canonical query reports an empty sort.
   /// Default: true
   pub enable_sort: bool,

   /// Honor the `unpaged` query parameter. Default: false
   pub enable_unpaged: bool,

   /// Upper bound for the page size; `None` disables the bound entirely.
   /// Default: `Some(100)`
   pub max_size: Option<u64>,

   /// Hard cap on the total number of rows the endpoint will ever return,
   /// across all pages. Operator-supplied only — never read from the query.
   pub limit: Option<u64>,

   /// Separator between a filter operator token and its operand.
   /// Default: `:`
   pub operand_separator: String,

   /// Default values applied beneath the raw query.
   pub defaults: PageQueryDefaults,
}

impl Default for PageQueryOptions {
   fn default() -> Self {
      Self {
         enable_size: true,
         enable_sort: true,
         enable_unpaged: false,
         max_size: Some(DEFAULT_MAX_SIZE),
         limit: None,
         operand_separator: DEFAULT_OPERAND_SEPARATOR.to_string(),
         defaults: PageQueryDefaults::default(),
      }
   }
}

/// The canonical, fully-defaulted list query consumed by the page factory.
///
/// Invariant: `offset == (current_page - 1) * items_per_page` whenever not
/// unpaged, and the product fits the exact-integer range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
   /// 1-based page number
   pub current_page: u64,
   /// Rows per page
   pub items_per_page: u64,
   /// Derived row offset, never accepted from input
   pub offset: u64,
   /// Operator-supplied hard cap on total rows (see [`PageQueryOptions::limit`])
   #[serde(skip_serializing_if = "Option::is_none")]
   pub limit: Option<u64>,
   /// Whether paging is bypassed and all matching rows returned
   pub unpaged: bool,
   /// Ordered sort clauses (primary first)
   pub sort_by: Vec<Sort>,
   /// Parsed filter conditions per field
   pub filter: FilterMap,
   /// Operand separator this query was parsed with
   #[serde(skip)]
   pub operand_separator: String,
   /// Absolute request URL, used for navigation links
   #[serde(skip)]
   pub url: Option<Url>,
}

impl PageQuery {
   /// Parse raw query parameters into a canonical query.
   ///
   /// This function cannot fail: every malformed or out-of-range input
   /// degrades to the nearest valid default, per field.
   pub fn parse(raw: &RawQuery, options: &PageQueryOptions, url: Option<Url>) -> Self {
      let max_size = options.max_size.unwrap_or(MAX_EXACT_INTEGER);

      // Tier 2: endpoint defaults over library defaults, field by field.
      let mut current_page = coerce::in_range(options.defaults.current_page, 1, MAX_EXACT_INTEGER)
         .unwrap_or_else(|| {
            tracing::debug!(
               value = options.defaults.current_page,
               "ignoring out-of-range default page"
            );
            DEFAULT_CURRENT_PAGE
         });
      let mut items_per_page = coerce::in_range(options.defaults.items_per_page, 1, max_size)
         .unwrap_or_else(|| {
            tracing::debug!(
               value = options.defaults.items_per_page,
               "ignoring out-of-range default page size"
            );
            DEFAULT_PAGE_SIZE
         });
      let mut unpaged = options.defaults.unpaged;
      let mut sort_by = options.defaults.sort_by.clone();

      // Tier 3: raw query values, each kept only if it validates.
      if let Some(value) = raw.get("page").and_then(RawValue::as_single) {
         match coerce::positive_int(value) {
            Some(page) => current_page = page,
            None => tracing::debug!(value, "ignoring invalid page parameter"),
         }
      }

      if options.enable_size
         && let Some(value) = raw.get("limit").and_then(RawValue::as_single)
      {
         match coerce::bounded_int(value, 1, max_size) {
            Some(size) => items_per_page = size,
            None => tracing::debug!(value, "ignoring invalid limit parameter"),
         }
      }

      if options.enable_unpaged
         && let Some(value) = raw.get("unpaged").and_then(RawValue::as_single)
      {
         match coerce::boolean(value) {
            Some(flag) => unpaged = flag,
            None => tracing::debug!(value, "ignoring invalid unpaged parameter"),
         }
      }

      if options.enable_sort
         && let Some(value) = raw.get("sortBy")
      {
         // Presence of any sortBy parameter replaces the default sort, even
         // when every clause turns out malformed.
         sort_by = parse_sort_params(&value.values());
      }

      let mut filter = FilterMap::new();
      for (field, values) in raw.filter_entries() {
         filter.insert(
            field.to_string(),
            parse_filter_values(&values, &options.operand_separator),
         );
      }

      // Clamp the merged size to the endpoint maximum.
      if items_per_page > max_size {
         items_per_page = max_size;
      }

      // Derive the offset; when the product leaves the exact-integer range
      // the whole pagination pair resets to library defaults.
      let offset = match checked_offset(current_page, items_per_page) {
         Some(offset) => offset,
         None => {
            tracing::debug!(
               current_page,
               items_per_page,
               "derived offset exceeds the exact-integer range; resetting pagination"
            );
            current_page = DEFAULT_CURRENT_PAGE;
            items_per_page = DEFAULT_PAGE_SIZE.min(max_size);
            checked_offset(current_page, items_per_page).unwrap_or(0)
         }
      };

      let limit = options
         .limit
         .and_then(|limit| coerce::in_range(limit, 1, MAX_EXACT_INTEGER));

      Self {
         current_page,
         items_per_page,
         offset,
         limit,
         unpaged,
         sort_by,
         filter,
         operand_separator: options.operand_separator.clone(),
         url,
      }
   }
}

fn checked_offset(current_page: u64, items_per_page: u64) -> Option<u64> {
   let offset = (current_page - 1).checked_mul(items_per_page)?;
   coerce::in_range(offset, 0, MAX_EXACT_INTEGER)
}
