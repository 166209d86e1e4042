//! Reservation, deduction and restock integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Barrier};
use std::thread;

use clinic_stock_core::db::Database;
use clinic_stock_core::engine::{
    DeductionEngine, ReservationEngine, ReservationOutcome, RestockEngine, StockError,
};
use clinic_stock_core::models::{BookingContext, Equipment, EquipmentKind, StockTransactionType};

const CENTER: &str = "center-x";

fn add_equipment(db: &Database, name: &str) -> Equipment {
    let equipment = Equipment::new(name.to_string(), EquipmentKind::Consumable);
    db.insert_equipment(&equipment).unwrap();
    equipment
}

fn restock(db: &mut Database, equipment: &Equipment, quantity: i64) {
    RestockEngine::new(db)
        .restock(CENTER, &equipment.equipment_id, quantity, Some("admin-1"))
        .unwrap();
}

fn counters(db: &Database, equipment: &Equipment) -> (i64, i64) {
    let stock = db.get_stock(CENTER, &equipment.equipment_id).unwrap().unwrap();
    (stock.available_quantity, stock.reserved_quantity)
}

#[test]
fn test_reserve_single_item() {
    let mut db = Database::open_in_memory().unwrap();
    let strip = add_equipment(&db, "Glucose Strip");
    db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
    restock(&mut db, &strip, 10);

    let outcome = ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, Some("booking-1"), Some("clerk-1"))
        .unwrap();

    assert_eq!(outcome.message, ReservationOutcome::RESERVED);
    assert_eq!(outcome.reserved_items.len(), 1);
    assert_eq!(outcome.reserved_items[0].equipment_id, strip.equipment_id);
    assert_eq!(counters(&db, &strip), (10, 1));

    let log = db.list_transactions_for_booking("booking-1").unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].transaction_type, StockTransactionType::Reserve);
    assert_eq!(log[0].created_by.as_deref(), Some("clerk-1"));
}

#[test]
fn test_reserve_fully_reserved_stock() {
    let mut db = Database::open_in_memory().unwrap();
    let strip = add_equipment(&db, "Glucose Strip");
    db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
    restock(&mut db, &strip, 5);
    for i in 0..5 {
        ReservationEngine::new(&mut db)
            .reserve("glucose", CENTER, Some(&format!("booking-{i}")), None)
            .unwrap();
    }
    let before = db.count_transactions().unwrap();

    let err = ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, Some("booking-5"), None)
        .unwrap_err();

    match err {
        StockError::InsufficientStock {
            equipment_name,
            needed,
            available,
            ..
        } => {
            assert_eq!(equipment_name, "Glucose Strip");
            assert_eq!(needed, 1);
            assert_eq!(available, 0);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(counters(&db, &strip), (5, 5));
    assert_eq!(db.count_transactions().unwrap(), before);
}

#[test]
fn test_deduct_after_completion() {
    let mut db = Database::open_in_memory().unwrap();
    let strip = add_equipment(&db, "Glucose Strip");
    db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
    restock(&mut db, &strip, 100);

    ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, Some("booking-1"), None)
        .unwrap();
    assert_eq!(counters(&db, &strip), (100, 1));

    let mut bookings = HashMap::new();
    bookings.insert(
        "booking-1".to_string(),
        BookingContext {
            booking_id: "booking-1".into(),
            health_center_id: CENTER.into(),
            test_type_id: "glucose".into(),
        },
    );

    let outcome = DeductionEngine::new(&mut db)
        .deduct_after_completion("booking-1", Some("lab-tech-2"), &bookings)
        .unwrap();
    assert_eq!(outcome.deducted_items.len(), 1);
    assert_eq!(counters(&db, &strip), (99, 0));
}

#[test]
fn test_test_type_without_requirements() {
    let mut db = Database::open_in_memory().unwrap();

    let outcome = ReservationEngine::new(&mut db)
        .reserve("blood-pressure", CENTER, None, None)
        .unwrap();

    assert!(outcome.reserved_items.is_empty());
    assert_eq!(outcome.message, ReservationOutcome::NOTHING_REQUIRED);
    assert_eq!(db.count_transactions().unwrap(), 0);
}

#[test]
fn test_multi_item_reservation_is_atomic() {
    let mut db = Database::open_in_memory().unwrap();
    let strip = add_equipment(&db, "Glucose Strip");
    let lancet = add_equipment(&db, "Lancet");
    db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
    db.set_requirement("glucose", &lancet.equipment_id, 1).unwrap();
    restock(&mut db, &strip, 10);
    restock(&mut db, &lancet, 1);

    ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, Some("booking-1"), None)
        .unwrap();
    let before = db.count_transactions().unwrap();

    // Strip is plentiful, lancet is not; nothing may be applied
    let err = ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, Some("booking-2"), None)
        .unwrap_err();
    match err {
        StockError::InsufficientStock { equipment_id, .. } => {
            assert_eq!(equipment_id, lancet.equipment_id)
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(counters(&db, &strip), (10, 1));
    assert_eq!(counters(&db, &lancet), (1, 1));
    assert_eq!(db.count_transactions().unwrap(), before);
    assert!(db.list_transactions_for_booking("booking-2").unwrap().is_empty());
}

#[test]
fn test_deactivated_requirement_is_ignored() {
    let mut db = Database::open_in_memory().unwrap();
    let strip = add_equipment(&db, "Glucose Strip");
    db.set_requirement("glucose", &strip.equipment_id, 1).unwrap();
    db.deactivate_requirement("glucose", &strip.equipment_id)
        .unwrap();

    let outcome = ReservationEngine::new(&mut db)
        .reserve("glucose", CENTER, None, None)
        .unwrap();
    assert!(outcome.reserved_items.is_empty());
}

#[test]
fn test_concurrent_reservations_never_oversubscribe() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stock.db");

    let mut db = Database::open(&path).unwrap();
    let kit = add_equipment(&db, "Malaria RDT Kit");
    db.set_requirement("malaria-rdt", &kit.equipment_id, 2).unwrap();
    restock(&mut db, &kit, 7);

    const WORKERS: usize = 8;
    let connections: Vec<Database> = (0..WORKERS).map(|_| Database::open(&path).unwrap()).collect();
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = connections
        .into_iter()
        .enumerate()
        .map(|(i, mut conn)| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let booking_id = format!("booking-{i}");
                barrier.wait();
                loop {
                    let result = ReservationEngine::new(&mut conn).reserve(
                        "malaria-rdt",
                        CENTER,
                        Some(&booking_id),
                        None,
                    );
                    match result {
                        Err(err) if err.is_retryable() => continue,
                        other => return other,
                    }
                }
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    for result in results.iter().filter(|r| r.is_err()) {
        assert!(matches!(result, Err(StockError::InsufficientStock { .. })));
    }

    let stock = db.get_stock(CENTER, &kit.equipment_id).unwrap().unwrap();
    assert_eq!(stock.available_quantity, 7);
    assert_eq!(stock.reserved_quantity, 6);
    assert!(stock.is_consistent());

    let history = db
        .list_stock_transactions(CENTER, &kit.equipment_id, None)
        .unwrap();
    let reserves = history
        .iter()
        .filter(|t| t.transaction_type == StockTransactionType::Reserve)
        .count();
    assert_eq!(reserves, 3);
}
