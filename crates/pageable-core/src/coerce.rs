//! Lenient coercion of raw query-string values into typed candidates.
//!
//! Every function here returns `Option`: a malformed or out-of-range value
//! coerces to `None` and the caller falls back to its default. Nothing in
//! this module can fail loudly — that is the contract the query parser is
//! built on.

/// Largest integer that survives a round trip through a JSON number.
///
/// Page numbers, sizes, and derived offsets are serialized into the response
/// envelope as JSON numbers, so anything above 2^53 - 1 would silently lose
/// precision on the client. Values beyond this bound are treated as invalid.
pub const MAX_EXACT_INTEGER: u64 = (1 << 53) - 1;

/// Parse a base-10 positive integer from a raw query value.
///
/// Rejects non-numeric input, zero, negative numbers, fractions, and values
/// above [`MAX_EXACT_INTEGER`]. Returns `None` on any failure.
pub fn positive_int(raw: &str) -> Option<u64> {
   let value: u64 = raw.parse().ok()?;
   in_range(value, 1, MAX_EXACT_INTEGER)
}

/// Parse a base-10 integer and check it against caller-supplied bounds.
///
/// `max` is additionally capped at [`MAX_EXACT_INTEGER`].
pub fn bounded_int(raw: &str, min: u64, max: u64) -> Option<u64> {
   let value: u64 = raw.parse().ok()?;
   in_range(value, min, max.min(MAX_EXACT_INTEGER))
}

/// Check an already-typed integer against bounds, yielding `None` when out
/// of range. Used for validating caller-supplied defaults field by field.
pub fn in_range(value: u64, min: u64, max: u64) -> Option<u64> {
   if value >= min && value <= max {
      Some(value)
   } else {
      None
   }
}

/// Parse a boolean query value.
///
/// Only the literal tokens `true` and `false` are accepted, case-sensitive.
/// Anything else (including `1`, `0`, `TRUE`) is invalid.
pub fn boolean(raw: &str) -> Option<bool> {
   match raw {
      "true" => Some(true),
      "false" => Some(false),
      _ => None,
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   // ─── positive_int ───

   #[test]
   fn positive_int_accepts_plain_numbers() {
      assert_eq!(positive_int("1"), Some(1));
      assert_eq!(positive_int("42"), Some(42));
      assert_eq!(positive_int(&MAX_EXACT_INTEGER.to_string()), Some(MAX_EXACT_INTEGER));
   }

   #[test]
   fn positive_int_rejects_zero_and_negative() {
      assert_eq!(positive_int("0"), None);
      assert_eq!(positive_int("-1"), None);
      assert_eq!(positive_int("-20"), None);
   }

   #[test]
   fn positive_int_rejects_non_numeric() {
      assert_eq!(positive_int(""), None);
      assert_eq!(positive_int("abc"), None);
      assert_eq!(positive_int("1abc"), None);
      assert_eq!(positive_int(" 1"), None);
   }

   #[test]
   fn positive_int_rejects_fractions() {
      assert_eq!(positive_int("1.5"), None);
      assert_eq!(positive_int("9.87654321"), None);
   }

   #[test]
   fn positive_int_rejects_values_past_exact_integer_range() {
      let too_big = (MAX_EXACT_INTEGER + 1).to_string();
      assert_eq!(positive_int(&too_big), None);
      assert_eq!(positive_int("99999999999999999999999999"), None);
   }

   // ─── bounded_int ───

   #[test]
   fn bounded_int_enforces_caller_bounds() {
      assert_eq!(bounded_int("5", 1, 100), Some(5));
      assert_eq!(bounded_int("101", 1, 100), None);
      assert_eq!(bounded_int("0", 1, 100), None);
   }

   #[test]
   fn bounded_int_caps_max_at_exact_integer_range() {
      let too_big = (MAX_EXACT_INTEGER + 1).to_string();
      assert_eq!(bounded_int(&too_big, 1, u64::MAX), None);
   }

   // ─── boolean ───

   #[test]
   fn boolean_accepts_only_exact_literals() {
      assert_eq!(boolean("true"), Some(true));
      assert_eq!(boolean("false"), Some(false));
      assert_eq!(boolean("TRUE"), None);
      assert_eq!(boolean("1"), None);
      assert_eq!(boolean("abc"), None);
      assert_eq!(boolean(""), None);
   }
}
