//! Decoding of SQLite rows into JSON maps.
//!
//! Columns are decoded by declared type name. SQLite stores only five
//! storage classes, but sqlx reports declared names for typed columns
//! (`BOOLEAN`, `DATETIME`, ...), so those are matched as well. BLOBs are
//! encoded as standard base64 so every value round-trips through JSON.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use sqlx::sqlite::{SqliteRow, SqliteValueRef};
use sqlx::{Column, Decode, Row, Sqlite, TypeInfo, ValueRef};

use crate::error::{Error, Result};

/// Decode one row into a column-name to JSON-value map, preserving SELECT
/// order.
pub(crate) fn row_to_map(row: &SqliteRow) -> Result<IndexMap<String, JsonValue>> {
   let mut map = IndexMap::default();
   for (i, column) in row.columns().iter().enumerate() {
      let value = row.try_get_raw(i)?;
      map.insert(column.name().to_string(), to_json(value)?);
   }
   Ok(map)
}

/// Decode one SQLite value into JSON.
fn to_json(value: SqliteValueRef<'_>) -> Result<JsonValue> {
   if value.is_null() {
      return Ok(JsonValue::Null);
   }

   let type_name = value.type_info().name().to_uppercase();
   match type_name.as_str() {
      "NULL" => Ok(JsonValue::Null),
      "INTEGER" | "INT" | "INT4" | "INT8" | "BIGINT" | "NUMERIC" => {
         let n = decode_as::<i64>(value)?;
         Ok(JsonValue::from(n))
      }
      "REAL" | "FLOAT" | "DOUBLE" => {
         let n = decode_as::<f64>(value)?;
         // JSON has no representation for non-finite floats.
         Ok(serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null))
      }
      "TEXT" | "VARCHAR" | "DATE" | "DATETIME" | "TIME" => {
         let s = decode_as::<String>(value)?;
         Ok(JsonValue::String(s))
      }
      "BLOB" => {
         let bytes = decode_as::<Vec<u8>>(value)?;
         Ok(JsonValue::String(BASE64.encode(bytes)))
      }
      "BOOLEAN" | "BOOL" => {
         let b = decode_as::<bool>(value)?;
         Ok(JsonValue::Bool(b))
      }
      other => Err(Error::UnsupportedDatatype(other.to_string())),
   }
}

fn decode_as<'r, T: Decode<'r, Sqlite>>(value: SqliteValueRef<'r>) -> Result<T> {
   T::decode(value).map_err(|err| Error::Decode(err.to_string()))
}
