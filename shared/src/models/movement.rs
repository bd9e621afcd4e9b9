//! Stock movement ledger model
//!
//! Movements are the only source of truth for stock levels. A movement is
//! written once and never mutated afterwards, with a single exception: the
//! soft-delete flag. Current stock for a (product, warehouse) pair is always
//! derived by replaying the ledger with [`project_stock`]; any cache layered
//! on top must stay provably equivalent to replaying the full log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::validation::{
    validate_notes, validate_quantity, validate_reference, validate_unit_price,
};

/// Movement types in the stock ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Stock in (purchase or inward correction)
    Entry,
    /// Stock out (sale or manual exit)
    Exit,
    /// Stock moved between two warehouses in one record
    Transfer,
    /// Manual downward correction, justification required
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entry => "entry",
            MovementType::Exit => "exit",
            MovementType::Transfer => "transfer",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry" => Ok(MovementType::Entry),
            "exit" => Ok(MovementType::Exit),
            "transfer" => Ok(MovementType::Transfer),
            "adjustment" => Ok(MovementType::Adjustment),
            _ => Err("Unknown movement type"),
        }
    }
}

/// Direction of a manual stock adjustment
///
/// The replay rule signs a movement by its type alone, so a stored
/// `Adjustment` always subtracts. Callers must state the direction of a
/// correction explicitly; inward corrections are recorded as `Entry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    In,
    Out,
}

/// Rejected movement construction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct MovementError {
    pub field: &'static str,
    pub message: &'static str,
}

impl MovementError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// A validated, not-yet-persisted ledger entry
///
/// Constructed only through the factory methods below, which enforce every
/// ledger invariant up front. Construction has no side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMovement {
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub reference: String,
    pub notes: Option<String>,
}

impl NewMovement {
    /// Stock entering a warehouse (purchase or inward correction)
    pub fn entry(
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        reference: &str,
        notes: Option<&str>,
    ) -> Result<Self, MovementError> {
        Self::validate_common(quantity, unit_price, reference, notes)?;

        Ok(Self {
            movement_type: MovementType::Entry,
            product_id,
            warehouse_id,
            destination_warehouse_id: None,
            quantity,
            unit_price,
            reference: reference.trim().to_string(),
            notes: trimmed(notes),
        })
    }

    /// Stock leaving a warehouse (sale or manual exit)
    pub fn exit(
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        reference: &str,
        notes: Option<&str>,
    ) -> Result<Self, MovementError> {
        Self::validate_common(quantity, unit_price, reference, notes)?;

        Ok(Self {
            movement_type: MovementType::Exit,
            product_id,
            warehouse_id,
            destination_warehouse_id: None,
            quantity,
            unit_price,
            reference: reference.trim().to_string(),
            notes: trimmed(notes),
        })
    }

    /// Stock moved between two warehouses; one record carries both the
    /// source debit and the destination credit
    pub fn transfer(
        product_id: Uuid,
        source_warehouse_id: Uuid,
        destination_warehouse_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        reference: &str,
        notes: Option<&str>,
    ) -> Result<Self, MovementError> {
        Self::validate_common(quantity, unit_price, reference, notes)?;

        if source_warehouse_id == destination_warehouse_id {
            return Err(MovementError::new(
                "destination_warehouse_id",
                "Source and destination warehouses must be different",
            ));
        }

        Ok(Self {
            movement_type: MovementType::Transfer,
            product_id,
            warehouse_id: source_warehouse_id,
            destination_warehouse_id: Some(destination_warehouse_id),
            quantity,
            unit_price,
            reference: reference.trim().to_string(),
            notes: trimmed(notes),
        })
    }

    /// Manual downward correction; notes are mandatory as justification
    pub fn adjustment(
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        unit_price: Decimal,
        reference: &str,
        notes: &str,
    ) -> Result<Self, MovementError> {
        Self::validate_common(quantity, unit_price, reference, Some(notes))?;

        if notes.trim().is_empty() {
            return Err(MovementError::new(
                "notes",
                "Notes are required for adjustments",
            ));
        }

        Ok(Self {
            movement_type: MovementType::Adjustment,
            product_id,
            warehouse_id,
            destination_warehouse_id: None,
            quantity,
            unit_price,
            reference: reference.trim().to_string(),
            notes: Some(notes.trim().to_string()),
        })
    }

    pub fn total_amount(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_price
    }

    fn validate_common(
        quantity: i32,
        unit_price: Decimal,
        reference: &str,
        notes: Option<&str>,
    ) -> Result<(), MovementError> {
        validate_quantity(quantity).map_err(|m| MovementError::new("quantity", m))?;
        validate_unit_price(unit_price).map_err(|m| MovementError::new("unit_price", m))?;
        validate_reference(reference).map_err(|m| MovementError::new("reference", m))?;
        validate_notes(notes).map_err(|m| MovementError::new("notes", m))?;
        Ok(())
    }
}

fn trimmed(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// A persisted ledger entry as exposed over the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub movement_type: MovementType,
    pub product_id: Uuid,
    pub warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub reference: String,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}

/// The slice of a movement that the stock projection needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockLine {
    pub movement_type: MovementType,
    pub warehouse_id: Uuid,
    pub destination_warehouse_id: Option<Uuid>,
    pub quantity: i32,
}

impl From<&NewMovement> for StockLine {
    fn from(m: &NewMovement) -> Self {
        Self {
            movement_type: m.movement_type,
            warehouse_id: m.warehouse_id,
            destination_warehouse_id: m.destination_warehouse_id,
            quantity: m.quantity,
        }
    }
}

impl From<&StockMovement> for StockLine {
    fn from(m: &StockMovement) -> Self {
        Self {
            movement_type: m.movement_type,
            warehouse_id: m.warehouse_id,
            destination_warehouse_id: m.destination_warehouse_id,
            quantity: m.quantity,
        }
    }
}

/// Signed contribution of one ledger line to the stock of `warehouse_id`
///
/// Replay rule: when the warehouse is the movement's source, `Entry` credits
/// and every other type debits. A `Transfer` additionally credits its
/// destination warehouse, so stock arriving by transfer is visible when
/// projecting the receiving side.
pub fn signed_quantity(line: &StockLine, warehouse_id: Uuid) -> i64 {
    let quantity = i64::from(line.quantity);
    let mut delta = 0;

    if line.warehouse_id == warehouse_id {
        delta += match line.movement_type {
            MovementType::Entry => quantity,
            MovementType::Exit | MovementType::Transfer | MovementType::Adjustment => -quantity,
        };
    }

    if line.movement_type == MovementType::Transfer
        && line.destination_warehouse_id == Some(warehouse_id)
    {
        delta += quantity;
    }

    delta
}

/// Current stock for a warehouse, derived by folding ledger lines
///
/// Callers pass the non-soft-deleted movements of a single product; lines
/// that do not touch `warehouse_id` contribute zero. This log replay is the
/// correctness baseline for every stock figure in the system.
pub fn project_stock<'a, I>(warehouse_id: Uuid, lines: I) -> i64
where
    I: IntoIterator<Item = &'a StockLine>,
{
    lines
        .into_iter()
        .map(|line| signed_quantity(line, warehouse_id))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid() -> Uuid {
        Uuid::new_v4()
    }

    #[test]
    fn entry_factory_validates_inputs() {
        let p = pid();
        let w = pid();
        assert!(NewMovement::entry(p, w, 10, Decimal::ONE, "PO-1", None).is_ok());
        assert!(NewMovement::entry(p, w, 0, Decimal::ONE, "PO-1", None).is_err());
        assert!(NewMovement::entry(p, w, 10, Decimal::from(-1), "PO-1", None).is_err());
        assert!(NewMovement::entry(p, w, 10, Decimal::ONE, "  ", None).is_err());
    }

    #[test]
    fn transfer_rejects_same_warehouse() {
        let p = pid();
        let w = pid();
        let err = NewMovement::transfer(p, w, w, 5, Decimal::ONE, "TR-1", None).unwrap_err();
        assert_eq!(err.field, "destination_warehouse_id");
    }

    #[test]
    fn adjustment_requires_notes() {
        let p = pid();
        let w = pid();
        assert!(NewMovement::adjustment(p, w, 3, Decimal::ZERO, "ADJ-1", "  ").is_err());
        let m = NewMovement::adjustment(p, w, 3, Decimal::ZERO, "ADJ-1", " shrinkage ").unwrap();
        assert_eq!(m.notes.as_deref(), Some("shrinkage"));
    }

    #[test]
    fn reference_and_notes_are_trimmed() {
        let m = NewMovement::exit(pid(), pid(), 2, Decimal::ONE, "  SO-9  ", Some("  ")).unwrap();
        assert_eq!(m.reference, "SO-9");
        assert_eq!(m.notes, None);
    }

    #[test]
    fn signed_quantity_follows_replay_rule() {
        let w = pid();
        let other = pid();
        let entry = StockLine {
            movement_type: MovementType::Entry,
            warehouse_id: w,
            destination_warehouse_id: None,
            quantity: 10,
        };
        let exit = StockLine {
            movement_type: MovementType::Exit,
            ..entry
        };
        let adjustment = StockLine {
            movement_type: MovementType::Adjustment,
            ..entry
        };
        assert_eq!(signed_quantity(&entry, w), 10);
        assert_eq!(signed_quantity(&exit, w), -10);
        assert_eq!(signed_quantity(&adjustment, w), -10);
        assert_eq!(signed_quantity(&entry, other), 0);
    }

    #[test]
    fn transfer_debits_source_and_credits_destination() {
        let source = pid();
        let destination = pid();
        let transfer = StockLine {
            movement_type: MovementType::Transfer,
            warehouse_id: source,
            destination_warehouse_id: Some(destination),
            quantity: 7,
        };
        assert_eq!(signed_quantity(&transfer, source), -7);
        assert_eq!(signed_quantity(&transfer, destination), 7);
        assert_eq!(signed_quantity(&transfer, pid()), 0);
    }

    #[test]
    fn project_stock_sums_lines() {
        let w = pid();
        let lines = vec![
            StockLine {
                movement_type: MovementType::Entry,
                warehouse_id: w,
                destination_warehouse_id: None,
                quantity: 20,
            },
            StockLine {
                movement_type: MovementType::Exit,
                warehouse_id: w,
                destination_warehouse_id: None,
                quantity: 5,
            },
        ];
        assert_eq!(project_stock(w, &lines), 15);
    }
}
