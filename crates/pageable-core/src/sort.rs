//! Sort mini-language parsing and the `Sort` clause type.
//!
//! A sort token is a semicolon-separated list of `key[value]` segments:
//!
//! ```text
//! property[id];direction[desc];nulls-first[true];
//! ```
//!
//! `property` is required and may contain any characters other than `[`,
//! `]`, and `;` — dots, spaces, and symbols are all legal, so no identifier
//! restriction is applied here (the backend validates identifiers at
//! execution time). `direction` is matched case-insensitively and an
//! unrecognized direction drops that clause only. `nulls-first` is parsed as
//! a strict boolean; when absent or invalid the field stays unset so the
//! backend can apply its own default null placement.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coerce;

/// Sort direction for a single clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
   /// Ascending order (smallest first)
   Asc,
   /// Descending order (largest first)
   Desc,
}

impl SortDirection {
   /// Parse a direction token, case-insensitively. Only `asc` and `desc`
   /// are recognized.
   pub fn parse(token: &str) -> Option<Self> {
      if token.eq_ignore_ascii_case("asc") {
         Some(SortDirection::Asc)
      } else if token.eq_ignore_ascii_case("desc") {
         Some(SortDirection::Desc)
      } else {
         None
      }
   }
}

impl fmt::Display for SortDirection {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      match self {
         SortDirection::Asc => write!(f, "asc"),
         SortDirection::Desc => write!(f, "desc"),
      }
   }
}

/// One sort clause. Position within the owning sequence defines sort-key
/// precedence (first clause is the primary key).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sort {
   /// Property to sort by, as supplied by the client
   pub property: String,
   /// Sort direction for this clause
   pub direction: SortDirection,
   /// Explicit null placement; `None` leaves it to the backend convention
   #[serde(skip_serializing_if = "Option::is_none")]
   pub nulls_first: Option<bool>,
}

impl Sort {
   /// Create an ascending sort clause with backend-default null placement.
   pub fn asc(property: impl Into<String>) -> Self {
      Self {
         property: property.into(),
         direction: SortDirection::Asc,
         nulls_first: None,
      }
   }

   /// Create a descending sort clause with backend-default null placement.
   pub fn desc(property: impl Into<String>) -> Self {
      Self {
         property: property.into(),
         direction: SortDirection::Desc,
         nulls_first: None,
      }
   }

   /// Set explicit null placement for this clause.
   pub fn nulls_first(mut self, nulls_first: bool) -> Self {
      self.nulls_first = Some(nulls_first);
      self
   }
}

impl fmt::Display for Sort {
   /// Render the clause back into mini-language form, such that parsing the
   /// output yields an equal clause.
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "property[{}];direction[{}];", self.property, self.direction)?;
      if let Some(nulls_first) = self.nulls_first {
         write!(f, "nulls-first[{}];", nulls_first)?;
      }
      Ok(())
   }
}

/// Parse a sequence of sort tokens into an ordered list of clauses.
///
/// Malformed tokens are skipped individually; the relative order of valid
/// clauses matches their order of appearance across all tokens.
pub fn parse_sort_params(tokens: &[String]) -> Vec<Sort> {
   tokens
      .iter()
      .filter_map(|token| {
         let sort = parse_sort_token(token);
         if sort.is_none() {
            tracing::debug!(token, "dropping malformed sort token");
         }
         sort
      })
      .collect()
}

/// Parse a single `key[value];…` token into a clause, or `None` when the
/// token is malformed (missing property or unrecognized direction).
fn parse_sort_token(token: &str) -> Option<Sort> {
   let mut property: Option<&str> = None;
   let mut direction: Option<SortDirection> = None;
   let mut nulls_first: Option<bool> = None;

   for segment in token.split(';') {
      let segment = segment.trim();
      if segment.is_empty() {
         continue;
      }
      let Some((key, value)) = split_segment(segment) else {
         continue;
      };
      match key {
         "property" if !value.is_empty() => property = Some(value),
         "direction" => {
            // An unrecognized direction token invalidates the whole clause.
            direction = Some(SortDirection::parse(value)?);
         }
         // Absent or invalid nulls-first stays unset rather than defaulting,
         // so the backend's own null placement convention applies.
         "nulls-first" => nulls_first = coerce::boolean(value),
         _ => {}
      }
   }

   Some(Sort {
      property: property?.to_string(),
      direction: direction.unwrap_or(SortDirection::Asc),
      nulls_first,
   })
}

/// Split one `key[value]` segment. The value may contain anything except
/// the closing bracket terminator; `None` when the shape doesn't match.
fn split_segment(segment: &str) -> Option<(&str, &str)> {
   let open = segment.find('[')?;
   let rest = &segment[open + 1..];
   if !rest.ends_with(']') {
      return None;
   }
   Some((&segment[..open], &rest[..rest.len() - 1]))
}
