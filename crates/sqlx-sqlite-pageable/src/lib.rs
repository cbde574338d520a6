//! SQLite backend for `pageable-core`, built on sqlx.
//!
//! # How It Works
//!
//! [`SqliteSelect`] implements the [`DataSource`] builder over a
//! [`sqlx::SqlitePool`]: the page factory's configuration calls are
//! rendered into SQL fragments with `$N` placeholders, and `count`/`fetch`
//! assemble and run the final statements. Result rows come back as
//! [`Row`] maps of column name to JSON value, so callers get serializable
//! pages without writing row types.
//!
//! ```no_run
//! use sqlx_sqlite_pageable::{PageFactory, PageQuery, PageQueryOptions, RawQuery, SqliteSelect, Url};
//!
//! # async fn example(pool: sqlx::SqlitePool) -> Result<(), Box<dyn std::error::Error>> {
//! let url = Url::parse("https://api.example.com/posts?page=2&limit=10&sortBy=property[id];direction[desc];")?;
//! let raw = RawQuery::from_url(&url);
//! let query = PageQuery::parse(&raw, &PageQueryOptions::default(), Some(url));
//! let source = SqliteSelect::new(pool, "posts");
//! let page = PageFactory::new(query, source).create().await?;
//! println!("{}", serde_json::to_string(&page)?);
//! # Ok(())
//! # }
//! ```

mod decode;
mod error;
mod select;
mod sql;

pub use error::{Error, Result};
pub use select::{Row, SqlFilter, SqliteSelect};

pub use pageable_core::{
   DataSource, Driver, FilterCondition, FilterMap, FilterOperator, JoinType, PageFactory,
   PageFactoryConfig, PageLinks, PageMeta, PageQuery, PageQueryDefaults, PageQueryOptions,
   Paginated, RawQuery, Relation, Sort, SortDirection, Url,
};
