/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the SQLite data source.
///
/// These are execution-time errors only: query parsing upstream never
/// fails, and builder calls on [`crate::SqliteSelect`] defer their first
/// error until `count` or `fetch` runs.
#[derive(Debug, thiserror::Error)]
pub enum Error {
   /// Error from SQLx operations.
   #[error(transparent)]
   Sqlx(#[from] sqlx::Error),

   /// Identifier (column, table, or alias) containing characters that are
   /// not safe for SQL interpolation.
   ///
   /// Identifiers must match `[a-zA-Z_][a-zA-Z0-9_.]*` (letters, digits,
   /// underscores, and dots for qualified names like `table.column`).
   #[error("invalid identifier '{name}': must match [a-zA-Z_][a-zA-Z0-9_.]*")]
   InvalidIdentifier { name: String },

   /// Relation joined without a join condition. SQL joins cannot derive
   /// their ON clause from a relation path alone.
   #[error("relation '{property}' has no join condition")]
   MissingJoinCondition { property: String },

   /// `$btw` filter whose operand is not exactly two comma-separated
   /// values.
   #[error("between filter on '{field}' requires exactly two comma-separated operands")]
   InvalidBetweenOperand { field: String },

   /// SQLite value that cannot be mapped to JSON.
   #[error("unsupported datatype: {0}")]
   UnsupportedDatatype(String),

   /// Row value failed to decode as its declared type.
   #[error("decode error: {0}")]
   Decode(String),
}

impl Error {
   /// Extract a structured error code from the error type.
   ///
   /// This provides machine-readable error codes for error handling.
   pub fn error_code(&self) -> String {
      match self {
         Error::Sqlx(e) => {
            if let Some(code) = e.as_database_error().and_then(|db_err| db_err.code()) {
               return format!("SQLITE_{}", code);
            }
            "SQLX_ERROR".to_string()
         }
         Error::InvalidIdentifier { .. } => "INVALID_IDENTIFIER".to_string(),
         Error::MissingJoinCondition { .. } => "MISSING_JOIN_CONDITION".to_string(),
         Error::InvalidBetweenOperand { .. } => "INVALID_BETWEEN_OPERAND".to_string(),
         Error::UnsupportedDatatype(_) => "UNSUPPORTED_DATATYPE".to_string(),
         Error::Decode(_) => "DECODE_ERROR".to_string(),
      }
   }
}
