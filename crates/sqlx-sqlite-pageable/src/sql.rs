//! SQL fragment generation: identifier quoting, filter-operator
//! translation, and ORDER BY assembly.
//!
//! All values are bound as `$N` placeholders; `next_param` arguments carry
//! the number of binds already present on the statement so fragment
//! placeholders never collide with earlier ones. Identifiers are validated
//! before interpolation and double-quoted segment by segment, so a
//! qualified name like `t.id` renders as `"t"."id"`.

use pageable_core::{FilterCondition, FilterOperator, Sort, SortDirection};
use serde_json::Value as JsonValue;

use crate::error::{Error, Result};

/// Validate that an identifier is safe for SQL interpolation.
///
/// Accepts names matching `[a-zA-Z_][a-zA-Z0-9_.]*`, which covers plain
/// column names, qualified names (e.g., `table.column`), and underscored
/// identifiers.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
   let invalid = || Error::InvalidIdentifier {
      name: name.to_string(),
   };

   let mut chars = name.chars();
   let first = chars.next().ok_or_else(invalid)?;
   if !first.is_ascii_alphabetic() && first != '_' {
      return Err(invalid());
   }

   for ch in chars {
      if !ch.is_ascii_alphanumeric() && ch != '_' && ch != '.' {
         return Err(invalid());
      }
   }

   Ok(())
}

/// Quote an identifier path with double-quote identifiers, one segment at a
/// time: `t.id` becomes `"t"."id"`.
pub(crate) fn quote_path(name: &str) -> String {
   name
      .split('.')
      .map(|segment| format!("\"{}\"", segment.replace('"', "\"\"")))
      .collect::<Vec<_>>()
      .join(".")
}

/// Build the ORDER BY clause for a sort sequence, with explicit null
/// placement when a clause requests it.
pub(crate) fn order_by_sql(sort_by: &[Sort]) -> Result<String> {
   let mut parts = Vec::with_capacity(sort_by.len());
   for sort in sort_by {
      validate_identifier(&sort.property)?;
      let direction = match sort.direction {
         SortDirection::Asc => "ASC",
         SortDirection::Desc => "DESC",
      };
      let nulls = match sort.nulls_first {
         Some(true) => " NULLS FIRST",
         Some(false) => " NULLS LAST",
         None => "",
      };
      parts.push(format!("{} {}{}", quote_path(&sort.property), direction, nulls));
   }
   Ok(format!("ORDER BY {}", parts.join(", ")))
}

/// Translate one filter condition into a SQL fragment plus its bind values.
///
/// `next_param` is the 1-based number of the first placeholder this
/// fragment may use. Operands are bound as text and left to SQLite's type
/// affinity; a mismatch against the schema surfaces from the database, not
/// from here.
pub(crate) fn condition_sql(
   field: &str,
   condition: &FilterCondition,
   next_param: usize,
) -> Result<(String, Vec<JsonValue>)> {
   validate_identifier(field)?;
   let column = quote_path(field);
   let operand = condition.operand.as_str();

   let simple = |op: &str| {
      (
         format!("{} {} ${}", column, op, next_param),
         vec![JsonValue::String(operand.to_string())],
      )
   };

   let listed = |keyword: &str| {
      let values: Vec<&str> = operand.split(',').collect();
      let placeholders: Vec<String> = (0..values.len())
         .map(|i| format!("${}", next_param + i))
         .collect();
      let binds = values
         .iter()
         .map(|v| JsonValue::String(v.to_string()))
         .collect();
      (
         format!("{} {} ({})", column, keyword, placeholders.join(", ")),
         binds,
      )
   };

   Ok(match condition.operator {
      FilterOperator::Eq => simple("="),
      FilterOperator::Ne => simple("<>"),
      FilterOperator::Gt => simple(">"),
      FilterOperator::Gte => simple(">="),
      FilterOperator::Lt => simple("<"),
      FilterOperator::Lte => simple("<="),
      FilterOperator::Like => simple("LIKE"),
      FilterOperator::In => listed("IN"),
      FilterOperator::NotIn => listed("NOT IN"),
      FilterOperator::Between => {
         let bounds: Vec<&str> = operand.split(',').collect();
         let [low, high] = bounds.as_slice() else {
            return Err(Error::InvalidBetweenOperand {
               field: field.to_string(),
            });
         };
         (
            format!("{} BETWEEN ${} AND ${}", column, next_param, next_param + 1),
            vec![
               JsonValue::String(low.to_string()),
               JsonValue::String(high.to_string()),
            ],
         )
      }
      FilterOperator::Null => (format!("{} IS NULL", column), vec![]),
      FilterOperator::NotNull => (format!("{} IS NOT NULL", column), vec![]),
   })
}

#[cfg(test)]
mod tests {
   use super::*;
   use serde_json::json;

   fn condition(operator: FilterOperator, operand: &str) -> FilterCondition {
      FilterCondition::new(operator, operand)
   }

   // ─── validate_identifier ───

   #[test]
   fn identifier_valid_simple() {
      assert!(validate_identifier("id").is_ok());
      assert!(validate_identifier("_private").is_ok());
      assert!(validate_identifier("col_123").is_ok());
   }

   #[test]
   fn identifier_valid_qualified() {
      assert!(validate_identifier("posts.id").is_ok());
      assert!(validate_identifier("schema.table.column").is_ok());
   }

   #[test]
   fn identifier_rejects_injection() {
      assert!(validate_identifier("").is_err());
      assert!(validate_identifier("id; DROP TABLE posts --").is_err());
      assert!(validate_identifier("id)--").is_err());
      assert!(validate_identifier("1bad").is_err());
      assert!(validate_identifier("col name").is_err());
   }

   // ─── quote_path ───

   #[test]
   fn quote_path_simple() {
      assert_eq!(quote_path("id"), r#""id""#);
   }

   #[test]
   fn quote_path_qualified() {
      assert_eq!(quote_path("t.id"), r#""t"."id""#);
   }

   // ─── order_by_sql ───

   #[test]
   fn order_by_mixed_directions_and_null_placement() {
      let sql = order_by_sql(&[
         Sort::desc("description").nulls_first(true),
         Sort::asc("id"),
         Sort::desc("t.score").nulls_first(false),
      ])
      .unwrap();
      assert_eq!(
         sql,
         r#"ORDER BY "description" DESC NULLS FIRST, "id" ASC, "t"."score" DESC NULLS LAST"#
      );
   }

   #[test]
   fn order_by_rejects_invalid_property() {
      assert!(order_by_sql(&[Sort::asc("id; DROP TABLE posts --")]).is_err());
   }

   // ─── condition_sql ───

   #[test]
   fn equality_condition() {
      let (sql, binds) = condition_sql("id", &condition(FilterOperator::Eq, "4"), 1).unwrap();
      assert_eq!(sql, r#""id" = $1"#);
      assert_eq!(binds, vec![json!("4")]);
   }

   #[test]
   fn comparison_conditions_respect_param_offset() {
      let (sql, binds) = condition_sql("id", &condition(FilterOperator::Lte, "4"), 3).unwrap();
      assert_eq!(sql, r#""id" <= $3"#);
      assert_eq!(binds, vec![json!("4")]);
   }

   #[test]
   fn in_condition_expands_comma_separated_operands() {
      let (sql, binds) = condition_sql("id", &condition(FilterOperator::In, "1,2,3"), 2).unwrap();
      assert_eq!(sql, r#""id" IN ($2, $3, $4)"#);
      assert_eq!(binds, vec![json!("1"), json!("2"), json!("3")]);
   }

   #[test]
   fn not_in_condition() {
      let (sql, binds) = condition_sql("id", &condition(FilterOperator::NotIn, "1,2"), 1).unwrap();
      assert_eq!(sql, r#""id" NOT IN ($1, $2)"#);
      assert_eq!(binds, vec![json!("1"), json!("2")]);
   }

   #[test]
   fn between_condition_requires_two_bounds() {
      let (sql, binds) = condition_sql("id", &condition(FilterOperator::Between, "2,4"), 1).unwrap();
      assert_eq!(sql, r#""id" BETWEEN $1 AND $2"#);
      assert_eq!(binds, vec![json!("2"), json!("4")]);

      assert!(condition_sql("id", &condition(FilterOperator::Between, "2"), 1).is_err());
      assert!(condition_sql("id", &condition(FilterOperator::Between, "1,2,3"), 1).is_err());
   }

   #[test]
   fn null_conditions_bind_nothing() {
      let (sql, binds) = condition_sql("description", &condition(FilterOperator::Null, ""), 1).unwrap();
      assert_eq!(sql, r#""description" IS NULL"#);
      assert!(binds.is_empty());

      let (sql, _) = condition_sql("description", &condition(FilterOperator::NotNull, ""), 1).unwrap();
      assert_eq!(sql, r#""description" IS NOT NULL"#);
   }

   #[test]
   fn qualified_field_names_are_quoted_per_segment() {
      let (sql, _) = condition_sql("t.id", &condition(FilterOperator::Gt, "1"), 1).unwrap();
      assert_eq!(sql, r#""t"."id" > $1"#);
   }

   #[test]
   fn malformed_field_name_is_rejected() {
      let err = condition_sql("id; --", &condition(FilterOperator::Eq, "4"), 1).unwrap_err();
      assert_eq!(err.error_code(), "INVALID_IDENTIFIER");
   }
}
