//! Stock movement ledger tests
//!
//! Covers movement construction, the replay rule, transfer crediting, and
//! the ledger-as-truth properties of stock projection.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::models::{
    project_stock, signed_quantity, MovementType, NewMovement, StockLine, StockMovement,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(movement: &NewMovement) -> StockLine {
    StockLine::from(movement)
}

// ============================================================================
// Unit Tests
// ============================================================================

mod unit_tests {
    use super::*;

    /// Purchase then sales then transfer, checked at each step
    #[test]
    fn ledger_scenario_matches_expected_stock() {
        let product = Uuid::new_v4();
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();

        let mut lines: Vec<StockLine> = Vec::new();

        // Purchase 20 into A
        let purchase =
            NewMovement::entry(product, warehouse_a, 20, dec("10.00"), "PO-1001", None).unwrap();
        lines.push(line(&purchase));
        assert_eq!(project_stock(warehouse_a, &lines), 20);

        // Sell 5 from A
        let sale =
            NewMovement::exit(product, warehouse_a, 5, dec("15.00"), "SO-2001", None).unwrap();
        lines.push(line(&sale));
        assert_eq!(project_stock(warehouse_a, &lines), 15);

        // Transfer 10 from A to B
        let transfer = NewMovement::transfer(
            product,
            warehouse_a,
            warehouse_b,
            10,
            dec("10.00"),
            "TR-3001",
            None,
        )
        .unwrap();
        lines.push(line(&transfer));
        assert_eq!(project_stock(warehouse_a, &lines), 5);
        assert_eq!(project_stock(warehouse_b, &lines), 10);

        // A sale of 10 from A must fail the sufficiency check
        let available = project_stock(warehouse_a, &lines);
        assert!(available < 10);
        assert_eq!(available, 5);
    }

    /// A transfer debits its source and credits its destination by the same
    /// amount, so it conserves total stock across warehouses
    #[test]
    fn transfer_conserves_total_stock() {
        let product = Uuid::new_v4();
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();

        let purchase =
            NewMovement::entry(product, warehouse_a, 30, dec("8.00"), "PO-1", None).unwrap();
        let transfer =
            NewMovement::transfer(product, warehouse_a, warehouse_b, 12, dec("8.00"), "TR-1", None)
                .unwrap();
        let lines = vec![line(&purchase), line(&transfer)];

        let at_a = project_stock(warehouse_a, &lines);
        let at_b = project_stock(warehouse_b, &lines);
        assert_eq!(at_a, 18);
        assert_eq!(at_b, 12);
        assert_eq!(at_a + at_b, 30);
    }

    /// A warehouse uninvolved in any movement projects to zero
    #[test]
    fn uninvolved_warehouse_projects_to_zero() {
        let product = Uuid::new_v4();
        let warehouse_a = Uuid::new_v4();
        let warehouse_b = Uuid::new_v4();
        let warehouse_c = Uuid::new_v4();

        let purchase =
            NewMovement::entry(product, warehouse_a, 10, dec("5.00"), "PO-1", None).unwrap();
        let transfer =
            NewMovement::transfer(product, warehouse_a, warehouse_b, 4, dec("5.00"), "TR-1", None)
                .unwrap();
        let lines = vec![line(&purchase), line(&transfer)];

        assert_eq!(project_stock(warehouse_c, &lines), 0);
    }

    /// Stored adjustments subtract
    #[test]
    fn adjustment_movements_subtract() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let purchase =
            NewMovement::entry(product, warehouse, 10, dec("5.00"), "PO-1", None).unwrap();
        let shrinkage = NewMovement::adjustment(
            product,
            warehouse,
            3,
            dec("5.00"),
            "ADJ-1",
            "Damaged in storage",
        )
        .unwrap();
        let lines = vec![line(&purchase), line(&shrinkage)];

        assert_eq!(project_stock(warehouse, &lines), 7);
    }

    /// Appending the same movement twice moves stock twice; the ledger has
    /// no idempotence
    #[test]
    fn duplicate_movements_both_count() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let purchase =
            NewMovement::entry(product, warehouse, 10, dec("5.00"), "PO-1", None).unwrap();
        let lines = vec![line(&purchase), line(&purchase)];

        assert_eq!(project_stock(warehouse, &lines), 20);
    }

    /// The projection can go negative when replayed movements outrun supply;
    /// the guard against that lives in the processors, not the fold
    #[test]
    fn projection_itself_allows_negative_stock() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let sale = NewMovement::exit(product, warehouse, 5, dec("5.00"), "SO-1", None).unwrap();
        let lines = vec![line(&sale)];

        assert_eq!(project_stock(warehouse, &lines), -5);
    }

    /// A persisted movement folds exactly like the draft it was created from
    #[test]
    fn persisted_movement_projects_like_its_draft() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let draft =
            NewMovement::entry(product, warehouse, 7, dec("3.50"), "PO-9", None).unwrap();
        let persisted = StockMovement {
            id: Uuid::new_v4(),
            movement_type: draft.movement_type,
            product_id: draft.product_id,
            warehouse_id: draft.warehouse_id,
            destination_warehouse_id: draft.destination_warehouse_id,
            quantity: draft.quantity,
            unit_price: draft.unit_price,
            total_amount: draft.total_amount(),
            reference: draft.reference.clone(),
            notes: draft.notes.clone(),
            is_deleted: false,
            created_at: chrono::Utc::now(),
            created_by: None,
        };

        assert_eq!(StockLine::from(&persisted), StockLine::from(&draft));
        assert_eq!(persisted.total_amount, dec("24.50"));
    }

    #[test]
    fn factory_rejects_zero_and_negative_quantities() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        assert!(NewMovement::entry(product, warehouse, 0, dec("1.00"), "PO-1", None).is_err());
        assert!(NewMovement::exit(product, warehouse, -3, dec("1.00"), "SO-1", None).is_err());
    }

    #[test]
    fn factory_rejects_transfer_to_same_warehouse() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        let result = NewMovement::transfer(
            product,
            warehouse,
            warehouse,
            5,
            dec("1.00"),
            "TR-1",
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn adjustment_requires_notes() {
        let product = Uuid::new_v4();
        let warehouse = Uuid::new_v4();

        assert!(NewMovement::adjustment(product, warehouse, 1, dec("1.00"), "ADJ-1", "   ")
            .is_err());
        assert!(NewMovement::adjustment(
            product,
            warehouse,
            1,
            dec("1.00"),
            "ADJ-1",
            "Annual stocktake"
        )
        .is_ok());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod property_tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum Op {
        Entry(i32),
        Exit(i32),
        TransferOut(i32),
        TransferIn(i32),
        Adjustment(i32),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let q = 1i32..=1000i32;
        prop_oneof![
            q.clone().prop_map(Op::Entry),
            q.clone().prop_map(Op::Exit),
            q.clone().prop_map(Op::TransferOut),
            q.clone().prop_map(Op::TransferIn),
            q.prop_map(Op::Adjustment),
        ]
    }

    /// Build a ledger around one observed warehouse; transfers in and out go
    /// through a second warehouse
    fn build_lines(warehouse: Uuid, other: Uuid, ops: &[Op]) -> Vec<StockLine> {
        ops.iter()
            .map(|op| match *op {
                Op::Entry(q) => StockLine {
                    movement_type: MovementType::Entry,
                    warehouse_id: warehouse,
                    destination_warehouse_id: None,
                    quantity: q,
                },
                Op::Exit(q) => StockLine {
                    movement_type: MovementType::Exit,
                    warehouse_id: warehouse,
                    destination_warehouse_id: None,
                    quantity: q,
                },
                Op::TransferOut(q) => StockLine {
                    movement_type: MovementType::Transfer,
                    warehouse_id: warehouse,
                    destination_warehouse_id: Some(other),
                    quantity: q,
                },
                Op::TransferIn(q) => StockLine {
                    movement_type: MovementType::Transfer,
                    warehouse_id: other,
                    destination_warehouse_id: Some(warehouse),
                    quantity: q,
                },
                Op::Adjustment(q) => StockLine {
                    movement_type: MovementType::Adjustment,
                    warehouse_id: warehouse,
                    destination_warehouse_id: None,
                    quantity: q,
                },
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The fold agrees with a straight-line accumulator over the same
        /// replay rule
        #[test]
        fn projection_matches_reference_accumulator(ops in prop::collection::vec(op_strategy(), 0..50)) {
            let warehouse = Uuid::new_v4();
            let other = Uuid::new_v4();
            let lines = build_lines(warehouse, other, &ops);

            let expected: i64 = ops.iter().map(|op| match *op {
                Op::Entry(q) | Op::TransferIn(q) => i64::from(q),
                Op::Exit(q) | Op::TransferOut(q) | Op::Adjustment(q) => -i64::from(q),
            }).sum();

            prop_assert_eq!(project_stock(warehouse, &lines), expected);
        }

        /// Projection is order-insensitive: any permutation of the same
        /// ledger gives the same stock
        #[test]
        fn projection_is_order_insensitive(ops in prop::collection::vec(op_strategy(), 0..30)) {
            let warehouse = Uuid::new_v4();
            let other = Uuid::new_v4();
            let lines = build_lines(warehouse, other, &ops);

            let forward = project_stock(warehouse, &lines);
            let reversed: Vec<StockLine> = lines.iter().rev().copied().collect();

            prop_assert_eq!(project_stock(warehouse, &reversed), forward);
        }

        /// Every signed quantity is the line's quantity with a sign, or zero
        /// for an unrelated warehouse
        #[test]
        fn signed_quantity_is_bounded_by_quantity(ops in prop::collection::vec(op_strategy(), 1..30)) {
            let warehouse = Uuid::new_v4();
            let other = Uuid::new_v4();
            let lines = build_lines(warehouse, other, &ops);
            let unrelated = Uuid::new_v4();

            for stock_line in &lines {
                let signed = signed_quantity(stock_line, warehouse);
                prop_assert!(signed.abs() <= i64::from(stock_line.quantity));
                prop_assert_eq!(signed_quantity(stock_line, unrelated), 0);
            }
        }

        /// Transfers conserve stock across the two warehouses involved
        #[test]
        fn transfers_conserve_total_stock(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let warehouse = Uuid::new_v4();
            let other = Uuid::new_v4();
            let lines = build_lines(warehouse, other, &ops);

            let transfers_only: Vec<StockLine> = lines
                .iter()
                .filter(|l| l.movement_type == MovementType::Transfer)
                .copied()
                .collect();

            let total = project_stock(warehouse, &transfers_only)
                + project_stock(other, &transfers_only);
            prop_assert_eq!(total, 0);
        }
    }
}
