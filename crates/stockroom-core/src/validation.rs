//! # Validation Module
//!
//! Barcode checksum and input validation utilities for Stockroom.
//!
//! ## Two Kinds of Checks
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  EAN-13 checksum        is_valid_ean13() -> bool                        │
//! │  ──────────────────     A bad scan is a frequent, expected outcome.     │
//! │                         Callers branch on it, nothing is raised.        │
//! │                                                                         │
//! │  Field validation       validate_*() -> ValidationResult<()>            │
//! │  ──────────────────     Manual entry / scan-seeded drafts before they   │
//! │                         reach the hosted data store.                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{is_valid_ean13, validate_product_code};
//!
//! assert!(is_valid_ean13("0000000000000"));
//! assert!(!is_valid_ean13("4006381333930"));
//! assert!(validate_product_code("MATE-01").is_ok());
//! ```

use crate::error::ValidationError;
use crate::EAN13_LENGTH;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_CODE_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 200;

// =============================================================================
// EAN-13
// =============================================================================

/// Computes the EAN-13 check digit for the first twelve digits of a code.
///
/// ## Algorithm
/// ```text
/// digits:  4  0  0  6  3  8  1  3  3  3  9  3
/// weight:  1  3  1  3  1  3  1  3  1  3  1  3
/// sum = 89          check = (10 - 89 % 10) % 10 = 1
/// ```
///
/// Returns `None` unless `first12` is exactly twelve ASCII digits.
pub fn ean13_check_digit(first12: &str) -> Option<u8> {
    let bytes = first12.as_bytes();
    if bytes.len() != EAN13_LENGTH - 1 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }

    let sum: u32 = bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();

    Some(((10 - sum % 10) % 10) as u8)
}

/// Checks whether `code` is a valid EAN-13.
///
/// ## Rules
/// - Exactly 13 ASCII decimal digits (no trimming, leading zeros kept)
/// - 13th digit equals [`ean13_check_digit`] of the first twelve
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::is_valid_ean13;
///
/// assert!(is_valid_ean13("4006381333931"));
/// assert!(!is_valid_ean13(" 4006381333931"));
/// assert!(!is_valid_ean13("400638133393"));
/// ```
pub fn is_valid_ean13(code: &str) -> bool {
    let bytes = code.as_bytes();
    if bytes.len() != EAN13_LENGTH || !bytes.iter().all(u8::is_ascii_digit) {
        return false;
    }

    match ean13_check_digit(&code[..EAN13_LENGTH - 1]) {
        Some(check) => check == bytes[EAN13_LENGTH - 1] - b'0',
        None => false,
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code (business key).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, digits, hyphens, underscores, dots
pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > MAX_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: MAX_CODE_LEN,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a product description.
pub fn validate_description(description: &str) -> ValidationResult<()> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a price: finite and non-negative. Zero is allowed.
pub fn validate_price(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates the quantity of a stock movement. Must be non-zero.
pub fn validate_movement_quantity(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: "must not be zero".to_string(),
        });
    }

    Ok(())
}

/// Validates a conversion multiplier (exchange rate, import factor).
pub fn validate_multiplier(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }

    if value <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
