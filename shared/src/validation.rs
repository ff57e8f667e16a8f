//! Validation helpers for back-office input

use rust_decimal::Decimal;

/// Validate a phone number: digits with optional `+`, spaces, dashes and parentheses
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
    {
        return Err("Phone number contains invalid characters");
    }

    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

/// Largest amount a `NUMERIC(12, 2)` price column holds
pub fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

pub fn validate_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Price cannot be negative");
    }
    if price > max_price() {
        return Err("Price cannot exceed 9999999999.99");
    }
    Ok(())
}

pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

pub fn validate_threshold(threshold: i32) -> Result<(), &'static str> {
    if threshold < 0 {
        return Err("Minimum threshold cannot be negative");
    }
    Ok(())
}

/// A direct adjustment must change something
pub fn validate_adjustment(adjustment: i32) -> Result<(), &'static str> {
    if adjustment == 0 {
        return Err("Adjustment must be non-zero");
    }
    Ok(())
}
