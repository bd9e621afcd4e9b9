//! Validation utilities for the Inventory Management System
//!
//! Field-level checks shared by the movement factory and the backend
//! services. All helpers return `Result<(), &'static str>`; the backend maps
//! failures onto its error taxonomy.

use rust_decimal::Decimal;

/// Maximum length for a movement reference
pub const MAX_REFERENCE_LEN: usize = 100;

/// Maximum length for movement notes
pub const MAX_NOTES_LEN: usize = 500;

// ============================================================================
// Ledger Validations
// ============================================================================

/// Validate a movement quantity (strictly positive; direction is encoded by
/// the movement type, never by sign)
pub fn validate_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be greater than 0");
    }
    Ok(())
}

/// Validate a unit price (zero is allowed for donations and write-offs)
pub fn validate_unit_price(unit_price: Decimal) -> Result<(), &'static str> {
    if unit_price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    Ok(())
}

/// Validate a movement reference (required, at most 100 characters)
pub fn validate_reference(reference: &str) -> Result<(), &'static str> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err("Reference is required");
    }
    if reference.chars().count() > MAX_REFERENCE_LEN {
        return Err("Reference must not exceed 100 characters");
    }
    Ok(())
}

/// Validate optional movement notes (at most 500 characters)
pub fn validate_notes(notes: Option<&str>) -> Result<(), &'static str> {
    if let Some(notes) = notes {
        if notes.trim().chars().count() > MAX_NOTES_LEN {
            return Err("Notes must not exceed 500 characters");
        }
    }
    Ok(())
}

// ============================================================================
// Catalog Validations
// ============================================================================

/// Validate a product SKU (required, at most 50 characters, alphanumeric
/// with dashes)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    let sku = sku.trim();
    if sku.is_empty() {
        return Err("SKU is required");
    }
    if sku.chars().count() > 50 {
        return Err("SKU must not exceed 50 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("SKU must be alphanumeric (dashes and underscores allowed)");
    }
    Ok(())
}

/// Validate a required display name (at most 200 characters)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > 200 {
        return Err("Name must not exceed 200 characters");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-5).is_err());
    }

    #[test]
    fn unit_price_allows_zero() {
        assert!(validate_unit_price(Decimal::ZERO).is_ok());
        assert!(validate_unit_price(Decimal::from(-1)).is_err());
    }

    #[test]
    fn reference_required_and_bounded() {
        assert!(validate_reference("PO-2024-0001").is_ok());
        assert!(validate_reference("   ").is_err());
        assert!(validate_reference(&"x".repeat(101)).is_err());
    }

    #[test]
    fn notes_optional_but_bounded() {
        assert!(validate_notes(None).is_ok());
        assert!(validate_notes(Some("damaged in transit")).is_ok());
        assert!(validate_notes(Some(&"x".repeat(501))).is_err());
    }

    #[test]
    fn sku_format() {
        assert!(validate_sku("WID-001").is_ok());
        assert!(validate_sku("").is_err());
        assert!(validate_sku("has space").is_err());
    }
}
