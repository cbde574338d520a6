//! # pageable-core
//!
//! Backend-neutral pagination, sorting, and filtering for HTTP list
//! endpoints: turns an untyped bag of query parameters into a validated
//! canonical query, runs it against an abstract data source, and assembles
//! a uniform response envelope with navigation links.
//!
//! ## Core Types
//!
//! - **[`RawQuery`]**: ordered multimap of raw query parameters, fed in by a
//!   thin framework adapter
//! - **[`PageQuery`]**: the canonical, fully-defaulted list query
//! - **[`PageQueryOptions`]**: per-endpoint parsing configuration (enable
//!   flags, max size, explicit limit, operand separator, typed defaults)
//! - **[`PageFactory`]**: executes a query against a [`DataSource`] and
//!   builds the [`Paginated`] envelope
//! - **[`DataSource`]**: the abstract queryable collaborator backends
//!   implement
//!
//! ## Validation policy
//!
//! Parsing never fails. Library defaults, endpoint defaults, and raw query
//! values merge in that order, each field validated individually; a
//! malformed value silently keeps the value from the tier below. The only
//! errors this crate surfaces are the data source's own execution errors,
//! which pass through unmodified.

mod coerce;
mod filter;
mod page_factory;
mod query;
mod response;
mod sort;
mod source;

pub use coerce::MAX_EXACT_INTEGER;
pub use filter::{
   DEFAULT_OPERAND_SEPARATOR, FilterCondition, FilterMap, FilterOperator, parse_filter_value,
   parse_filter_values,
};
pub use page_factory::{PageFactory, PageFactoryConfig};
pub use query::{
   DEFAULT_CURRENT_PAGE, DEFAULT_MAX_SIZE, DEFAULT_PAGE_SIZE, PageQuery, PageQueryDefaults,
   PageQueryOptions, RawQuery, RawValue,
};
pub use response::{PageLinks, PageMeta, Paginated};
pub use sort::{Sort, SortDirection, parse_sort_params};
pub use source::{DataSource, Driver, JoinType, Relation};

// Re-exported so adapters and backends agree on the URL type.
pub use url::Url;
