//! Range Checks for Tunable Values

use crate::error::ValidationError;

/// Validate that a value lies inside `[min, max]`
pub fn validate_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value < min || value > max {
        Err(ValidationError::OutOfRange { field, value, min, max })
    } else {
        Ok(())
    }
}

/// Validate that a value is finite and strictly positive
pub fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite(field));
    }
    if value <= 0.0 {
        Err(ValidationError::NotPositive { field, value })
    } else {
        Ok(())
    }
}

/// Validate that a value is finite and at least `min`
pub fn validate_min(field: &'static str, value: f64, min: f64) -> Result<(), ValidationError> {
    validate_range(field, value, min, f64::MAX)
}

/// Validate a fraction in `[0, 1]`
pub fn validate_fraction(field: &'static str, value: f64) -> Result<(), ValidationError> {
    validate_range(field, value, 0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range() {
        assert!(validate_range("ear", 0.15, 0.0, 1.0).is_ok());
        assert!(validate_range("ear", 0.0, 0.0, 1.0).is_ok());
        assert_eq!(
            validate_range("ear", 1.5, 0.0, 1.0),
            Err(ValidationError::OutOfRange { field: "ear", value: 1.5, min: 0.0, max: 1.0 })
        );
        assert_eq!(validate_range("ear", f64::NAN, 0.0, 1.0), Err(ValidationError::NotFinite("ear")));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            validate_positive("window", f64::NAN).unwrap_err().to_string(),
            "window is not a finite number"
        );
        assert_eq!(
            validate_positive("window", -1.0).unwrap_err().to_string(),
            "window must be positive, got -1"
        );
    }

    #[test]
    fn test_positive() {
        assert!(validate_positive("window", 60.0).is_ok());
        assert!(validate_positive("window", 0.0).is_err());
        assert!(validate_positive("window", -5.0).is_err());
        assert!(validate_positive("window", f64::INFINITY).is_err());
    }

    #[test]
    fn test_min_and_fraction() {
        assert!(validate_min("debounce", 0.0, 0.0).is_ok());
        assert!(validate_min("debounce", -0.1, 0.0).is_err());
        assert!(validate_fraction("coverage", 0.5).is_ok());
        assert!(validate_fraction("coverage", 1.01).is_err());
    }
}
