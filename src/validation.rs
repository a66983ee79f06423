// Custom validation functions for domain-specific rules

use validator::ValidationError;

/// Validates that a price is positive
pub fn validate_positive_price(price: f64) -> Result<(), ValidationError> {
    if price <= 0.0 || !price.is_finite() {
        Err(ValidationError::new("price_must_be_positive"))
    } else {
        Ok(())
    }
}

/// Validates that a discount is below the full price
pub fn validate_discount_below_price(
    discount: Option<f64>,
    price: f64,
) -> Result<(), ValidationError> {
    match discount {
        Some(d) if d >= price => Err(ValidationError::new("discount_not_below_price")),
        Some(d) if d < 0.0 => Err(ValidationError::new("discount_negative")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_must_be_positive() {
        assert!(validate_positive_price(499.0).is_ok());
        assert!(validate_positive_price(0.0).is_err());
        assert!(validate_positive_price(-1.0).is_err());
        assert!(validate_positive_price(f64::NAN).is_err());
    }

    #[test]
    fn test_discount_below_price() {
        assert!(validate_discount_below_price(None, 100.0).is_ok());
        assert!(validate_discount_below_price(Some(50.0), 100.0).is_ok());
        assert!(validate_discount_below_price(Some(100.0), 100.0).is_err());
        assert!(validate_discount_below_price(Some(150.0), 100.0).is_err());
        assert!(validate_discount_below_price(Some(-5.0), 100.0).is_err());
    }
}
