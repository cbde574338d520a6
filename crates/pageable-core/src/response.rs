//! The paginated response envelope: rows, metadata, and navigation links.
//!
//! Links reuse the original request URL and overwrite only its `page` and
//! `limit` query parameters; every other parameter (filters, sorts, custom
//! flags) carries over untouched. When there are no pages at all, or no
//! request URL was provided, the links object is empty.

use serde::Serialize;
use url::Url;

use crate::filter::FilterMap;
use crate::query::PageQuery;
use crate::sort::Sort;

/// A page of results plus paging metadata and navigation links.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
   /// The rows on this page, in fetch order
   pub data: Vec<T>,
   /// Paging metadata
   pub meta: PageMeta,
   /// Navigation links; empty when there are no pages
   pub links: PageLinks,
}

/// Paging metadata echoed back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
   /// 1-based page number
   pub current_page: u64,
   /// Row offset of the first row on this page
   pub offset: u64,
   /// Requested page size (total item count when unpaged)
   pub items_per_page: u64,
   /// Whether paging was bypassed
   pub unpaged: bool,
   /// Total number of pages
   pub total_pages: u64,
   /// Total matching rows (after any explicit-limit clamp)
   pub total_items: u64,
   /// The sort clauses that were applied
   pub sort_by: Vec<Sort>,
   /// The filter conditions that were applied
   pub filter: FilterMap,
}

/// First/previous/current/next/last navigation links.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLinks {
   #[serde(skip_serializing_if = "Option::is_none")]
   pub first: Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub previous: Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub current: Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub next: Option<String>,
   #[serde(skip_serializing_if = "Option::is_none")]
   pub last: Option<String>,
}

impl<T> Paginated<T> {
   /// Assemble the envelope for an executed query.
   pub fn assemble(data: Vec<T>, query: &PageQuery, total_items: u64) -> Self {
      let total_pages = total_pages(total_items, query.items_per_page);
      Self {
         data,
         meta: PageMeta {
            current_page: query.current_page,
            offset: query.offset,
            items_per_page: query.items_per_page,
            unpaged: query.unpaged,
            total_pages,
            total_items,
            sort_by: query.sort_by.clone(),
            filter: query.filter.clone(),
         },
         links: build_links(query, total_pages),
      }
   }
}

/// `ceil(total_items / items_per_page)`, with zero totals yielding zero
/// pages. `items_per_page` can only be zero in the unpaged-empty case, which
/// the zero-total guard already covers.
fn total_pages(total_items: u64, items_per_page: u64) -> u64 {
   if total_items == 0 || items_per_page == 0 {
      0
   } else {
      total_items.div_ceil(items_per_page)
   }
}

fn build_links(query: &PageQuery, total_pages: u64) -> PageLinks {
   let Some(url) = &query.url else {
      return PageLinks::default();
   };
   if total_pages == 0 {
      return PageLinks::default();
   }

   let current_page = query.current_page;
   let previous = (current_page > 1).then(|| page_link(url, query, current_page - 1));
   let next = (current_page < total_pages).then(|| page_link(url, query, current_page + 1));

   PageLinks {
      first: Some(page_link(url, query, 1)),
      previous,
      current: Some(page_link(url, query, current_page)),
      next,
      last: Some(page_link(url, query, total_pages)),
   }
}

/// Rebuild the request URL pointing at `page`, preserving all query
/// parameters other than `page` and `limit`.
fn page_link(url: &Url, query: &PageQuery, page: u64) -> String {
   let retained: Vec<(String, String)> = url
      .query_pairs()
      .filter(|(key, _)| key != "page" && key != "limit")
      .map(|(key, value)| (key.into_owned(), value.into_owned()))
      .collect();

   // The size is reported on links except for unpaged responses without an
   // explicit cap, where it equals the volatile total count.
   let include_limit = !query.unpaged || query.limit.is_some();

   let mut link = url.clone();
   {
      let mut pairs = link.query_pairs_mut();
      pairs.clear();
      for (key, value) in &retained {
         pairs.append_pair(key, value);
      }
      pairs.append_pair("page", &page.to_string());
      if include_limit {
         pairs.append_pair("limit", &query.items_per_page.to_string());
      }
   }
   link.to_string()
}
