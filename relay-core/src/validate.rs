//! Form-input validation for creating and editing queries.
//!
//! Validation rejects bad input before a Query is ever built; nothing past
//! this point range-checks these fields again.

use crate::constants::{MAX_INTERVAL, MAX_NAME_LENGTH, MAX_URL_LENGTH, MIN_INTERVAL};
use crate::error::ValidationError;

/// Validated create/edit input for a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQueryInput {
    pub name: String,
    pub request: String,
    pub refresh_interval: u32,
}

/// Validate owner form input for a query.
///
/// Name must be 1..=115 characters, request URL 1..=2000 characters, and the
/// refresh interval in `[15, 2_505_600)` seconds (upper bound exclusive).
pub fn validate_query_input(
    name: &str,
    request: &str,
    refresh_interval: i64,
) -> Result<ValidatedQueryInput, ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "name".into(),
        });
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: "name".into(),
            len: name.chars().count(),
            max: MAX_NAME_LENGTH,
        });
    }

    if request.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: "request".into(),
        });
    }
    if request.chars().count() > MAX_URL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "request".into(),
            len: request.chars().count(),
            max: MAX_URL_LENGTH,
        });
    }

    if refresh_interval < i64::from(MIN_INTERVAL) || refresh_interval >= i64::from(MAX_INTERVAL) {
        return Err(ValidationError::OutOfRange {
            field: "refresh_interval".into(),
            value: refresh_interval,
            min: i64::from(MIN_INTERVAL),
            max: i64::from(MAX_INTERVAL),
        });
    }

    Ok(ValidatedQueryInput {
        name: name.to_string(),
        request: request.to_string(),
        refresh_interval: refresh_interval as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_accepts_boundary_values() {
        assert!(validate_query_input(&"n".repeat(115), "https://o/d", 15).is_ok());
        assert!(validate_query_input("n", &"u".repeat(2000), 2_505_599).is_ok());
    }

    #[test]
    fn test_rejects_name_of_length_116() {
        let result = validate_query_input(&"n".repeat(116), "https://o/d", 60);
        assert!(matches!(result, Err(ValidationError::TooLong { .. })));
    }

    #[test]
    fn test_rejects_interval_14_accepts_15() {
        assert!(matches!(
            validate_query_input("n", "https://o/d", 14),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_query_input("n", "https://o/d", 15).is_ok());
    }

    #[test]
    fn test_rejects_interval_at_upper_bound() {
        assert!(validate_query_input("n", "https://o/d", 2_505_600).is_err());
    }

    #[test]
    fn test_rejects_empty_fields() {
        assert!(matches!(
            validate_query_input("", "https://o/d", 60),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
        assert!(matches!(
            validate_query_input("n", "", 60),
            Err(ValidationError::RequiredFieldMissing { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_interval_validation_matches_range(interval in -10_000i64..3_000_000) {
            let ok = validate_query_input("n", "https://o/d", interval).is_ok();
            prop_assert_eq!(ok, (15..2_505_600).contains(&interval));
        }
    }
}
