//! Filter value parsing and the closed operator set.
//!
//! Filters arrive as `filter[field]=value` query parameters. Each raw value
//! is split once on the configured operand separator (default `:`); when the
//! left part is a known operator token the right part becomes its operand,
//! otherwise the whole raw value is an equality operand. Repeating the same
//! field combines its conditions with logical AND.
//!
//! The separator is configurable per endpoint so that values which
//! legitimately contain `:` (ISO datetimes, URIs) can still be filtered on:
//! `filter[updatedAt]=$lt@@@2024-01-01T00:00:00Z` with separator `@@@`.
//!
//! Operand contents are never validated against the underlying schema here;
//! that is the data source's job at execution time.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default separator between an operator token and its operand.
pub const DEFAULT_OPERAND_SEPARATOR: &str = ":";

/// The closed set of comparison operators shared by the parser and every
/// backend. Serialized as the wire tokens (`$eq`, `$gte`, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOperator {
   /// Equality (also the implied operator when no token prefix is present)
   #[serde(rename = "$eq")]
   Eq,
   /// Inequality
   #[serde(rename = "$ne")]
   Ne,
   /// Greater than
   #[serde(rename = "$gt")]
   Gt,
   /// Greater than or equal
   #[serde(rename = "$gte")]
   Gte,
   /// Less than
   #[serde(rename = "$lt")]
   Lt,
   /// Less than or equal
   #[serde(rename = "$lte")]
   Lte,
   /// Membership in a comma-separated set
   #[serde(rename = "$in")]
   In,
   /// Non-membership in a comma-separated set
   #[serde(rename = "$nin")]
   NotIn,
   /// Pattern match; the operand is used as the match pattern verbatim
   #[serde(rename = "$like")]
   Like,
   /// Range check; the operand is two comma-separated bounds
   #[serde(rename = "$btw")]
   Between,
   /// Null check; takes no operand
   #[serde(rename = "$null")]
   Null,
   /// Non-null check; takes no operand
   #[serde(rename = "$notnull")]
   NotNull,
}

impl FilterOperator {
   /// The wire token for this operator.
   pub fn token(self) -> &'static str {
      match self {
         FilterOperator::Eq => "$eq",
         FilterOperator::Ne => "$ne",
         FilterOperator::Gt => "$gt",
         FilterOperator::Gte => "$gte",
         FilterOperator::Lt => "$lt",
         FilterOperator::Lte => "$lte",
         FilterOperator::In => "$in",
         FilterOperator::NotIn => "$nin",
         FilterOperator::Like => "$like",
         FilterOperator::Between => "$btw",
         FilterOperator::Null => "$null",
         FilterOperator::NotNull => "$notnull",
      }
   }

   /// Look up an operator by its wire token.
   pub fn from_token(token: &str) -> Option<Self> {
      match token {
         "$eq" => Some(FilterOperator::Eq),
         "$ne" => Some(FilterOperator::Ne),
         "$gt" => Some(FilterOperator::Gt),
         "$gte" => Some(FilterOperator::Gte),
         "$lt" => Some(FilterOperator::Lt),
         "$lte" => Some(FilterOperator::Lte),
         "$in" => Some(FilterOperator::In),
         "$nin" => Some(FilterOperator::NotIn),
         "$like" => Some(FilterOperator::Like),
         "$btw" => Some(FilterOperator::Between),
         "$null" => Some(FilterOperator::Null),
         "$notnull" => Some(FilterOperator::NotNull),
         _ => None,
      }
   }

   /// Whether this operator carries an operand. `$null` and `$notnull`
   /// don't.
   pub fn takes_operand(self) -> bool {
      !matches!(self, FilterOperator::Null | FilterOperator::NotNull)
   }
}

/// One parsed filter condition: an operator and its raw operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCondition {
   /// The comparison operator
   pub operator: FilterOperator,
   /// Raw operand, uninterpreted; empty for zero-operand operators
   pub operand: String,
}

impl FilterCondition {
   /// Build a condition from operator and operand.
   pub fn new(operator: FilterOperator, operand: impl Into<String>) -> Self {
      Self {
         operator,
         operand: operand.into(),
      }
   }
}

/// Field name → AND-combined conditions, in order of appearance.
/// An empty map is the legal "no filtering" state.
pub type FilterMap = IndexMap<String, Vec<FilterCondition>>;

/// Parse one raw filter value into a condition.
///
/// Splits once on the first occurrence of `separator`. When the left part is
/// a known operator token it is used with the right part as operand;
/// otherwise the entire raw value becomes an equality operand. The
/// zero-operand operators `$null`/`$notnull` are also recognized without a
/// trailing separator.
pub fn parse_filter_value(raw: &str, separator: &str) -> FilterCondition {
   if let Some((head, tail)) = raw.split_once(separator)
      && let Some(operator) = FilterOperator::from_token(head)
   {
      let operand = if operator.takes_operand() { tail } else { "" };
      return FilterCondition::new(operator, operand);
   }
   if let Some(operator) = FilterOperator::from_token(raw)
      && !operator.takes_operand()
   {
      return FilterCondition::new(operator, "");
   }
   FilterCondition::new(FilterOperator::Eq, raw)
}

/// Parse all raw values for one field (repeated query keys yield multiple
/// AND-combined conditions).
pub fn parse_filter_values(raws: &[String], separator: &str) -> Vec<FilterCondition> {
   raws.iter().map(|raw| parse_filter_value(raw, separator)).collect()
}
