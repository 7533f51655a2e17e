//! # Input Validation
//!
//! Field checks run by the API before anything reaches the store. Serde
//! has already enforced the JSON shape; these enforce the values. SQLite
//! CHECK and UNIQUE constraints stay in place as the last line behind them.
//!
//! ```text
//! request JSON ─► serde shape ─► validate_* (here) ─► ownership ─► transaction
//!                      │               │                  │
//!                     400             400                404
//! ```
//!
//! Phones are accepted in local form (`0803 123 4567`) and stored in
//! international form (`+2348031234567`) via [`normalize_phone_number`].

use crate::error::ValidationError;
use crate::loyalty::MAX_POINTS_PER_UNIT;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Default country code prepended to local phone numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "+234";

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required display name (product, customer, business).
///
/// ## Rules
/// - Must not be blank
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a search query and returns it trimmed.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "search".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates an optional email address.
///
/// Only the shape `local@domain.tld` is checked; deliverability is not.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Validates a barcode: 1-64 characters, no whitespace.
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if barcode.is_empty() {
        return Err(ValidationError::Required {
            field: "barcode".to_string(),
        });
    }

    if barcode.len() > 64 {
        return Err(ValidationError::TooLong {
            field: "barcode".to_string(),
            max: 64,
        });
    }

    if barcode.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Phone Numbers
// =============================================================================

/// Normalises a phone number to international form.
///
/// ## Steps
/// ```text
/// "0803 123-4567"
///      │  strip spaces and dashes
///      ▼
/// "08031234567"
///      │  strip leading zeros
///      ▼
/// "8031234567"
///      │  no '+' → prefix country code
///      ▼
/// "+2348031234567"
/// ```
///
/// ## Example
/// ```rust
/// use stockconnect_core::validation::normalize_phone_number;
///
/// assert_eq!(normalize_phone_number("0803 123 4567", "+234"), "+2348031234567");
/// assert_eq!(normalize_phone_number("+44 20-7946-0958", "+234"), "+442079460958");
/// ```
pub fn normalize_phone_number(phone: &str, country_code: &str) -> String {
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let cleaned = cleaned.trim_start_matches('0');

    if cleaned.starts_with('+') {
        cleaned.to_string()
    } else {
        format!("{}{}", country_code, cleaned)
    }
}

/// Validates an international phone number: `+` then 10-15 digits, the
/// first non-zero. Spaces and dashes are ignored.
pub fn validate_phone_number(phone: &str) -> ValidationResult<()> {
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    let digits = cleaned.strip_prefix('+').unwrap_or("");
    let valid = (10..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must be + followed by 10 to 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number as typed by a user (local or international).
///
/// Accepts anything that normalises to a valid international number.
pub fn validate_contact_phone(phone: &str, country_code: &str) -> ValidationResult<()> {
    if phone.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "phone".to_string(),
        });
    }
    validate_phone_number(&normalize_phone_number(phone, country_code))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a manual stock adjustment: any non-zero delta.
pub fn validate_stock_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::InvalidFormat {
            field: "quantity".to_string(),
            reason: "adjustment must not be zero".to_string(),
        });
    }

    Ok(())
}

/// Validates a stored stock figure (initial quantity, reorder threshold).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates an amount that must be strictly positive (unit price, total).
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a price or cost; zero is allowed.
pub fn validate_price(field: &str, amount: Money) -> ValidationResult<()> {
    validate_non_negative(field, amount.cents())
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: i64) -> ValidationResult<()> {
    if !(0..=10_000).contains(&bps) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Validates a loyalty rate: 0 (falls back to the default) up to
/// MAX_POINTS_PER_UNIT.
pub fn validate_points_per_unit(points: i64) -> ValidationResult<()> {
    if !(0..=MAX_POINTS_PER_UNIT).contains(&points) {
        return Err(ValidationError::OutOfRange {
            field: "loyaltyPointsPerUnit".to_string(),
            min: 0,
            max: MAX_POINTS_PER_UNIT,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines on an order: at least one, at most
/// MAX_ORDER_LINES.
pub fn validate_order_lines(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if count > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

/// Clamps a list page size into `1..=max`, defaulting when absent.
pub fn page_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Indomie Chicken 70g").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(201)).is_err());
    }

    #[test]
    fn test_normalize_phone_number() {
        assert_eq!(normalize_phone_number("08031234567", "+234"), "+2348031234567");
        assert_eq!(normalize_phone_number("0803-123-4567", "+234"), "+2348031234567");
        assert_eq!(normalize_phone_number("+2348031234567", "+234"), "+2348031234567");
        assert_eq!(normalize_phone_number("00 7911 123456", "+44"), "+447911123456");
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+2348031234567").is_ok());
        assert!(validate_phone_number("+234 803-123-4567").is_ok());
        assert!(validate_phone_number("08031234567").is_err());
        assert!(validate_phone_number("+0123456789").is_err());
        assert!(validate_phone_number("+123").is_err());

        assert!(validate_contact_phone("0803 123 4567", DEFAULT_COUNTRY_CODE).is_ok());
        assert!(validate_contact_phone("", DEFAULT_COUNTRY_CODE).is_err());
        assert!(validate_contact_phone("12", DEFAULT_COUNTRY_CODE).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_positive_amount("unitPrice", Money::from_cents(1)).is_ok());
        assert!(validate_positive_amount("unitPrice", Money::zero()).is_err());
        assert!(validate_price("costPrice", Money::zero()).is_ok());
        assert!(validate_price("costPrice", Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_points_per_unit() {
        assert!(validate_points_per_unit(0).is_ok());
        assert!(validate_points_per_unit(MAX_POINTS_PER_UNIT).is_ok());

        assert!(validate_points_per_unit(-1).is_err());
        assert!(validate_points_per_unit(MAX_POINTS_PER_UNIT + 1).is_err());
        assert!(validate_points_per_unit(i64::MAX).is_err());
    }

    #[test]
    fn test_validate_order_lines() {
        assert!(validate_order_lines(1).is_ok());
        assert!(validate_order_lines(0).is_err());
        assert!(validate_order_lines(MAX_ORDER_LINES + 1).is_err());
    }

    #[test]
    fn test_validate_email_and_barcode() {
        assert!(validate_email("ada@shop.ng").is_ok());
        assert!(validate_email("ada@shop").is_err());
        assert!(validate_email("@shop.ng").is_err());

        assert!(validate_barcode("5449000000996").is_ok());
        assert!(validate_barcode("54 49").is_err());
    }

    #[test]
    fn test_misc_numeric() {
        assert!(validate_stock_delta(-3).is_ok());
        assert!(validate_stock_delta(0).is_err());
        assert!(validate_tax_rate_bps(750).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
        assert_eq!(page_limit(None, 50, 200), 50);
        assert_eq!(page_limit(Some(0), 50, 200), 1);
        assert_eq!(page_limit(Some(1_000), 50, 200), 200);
    }
}
