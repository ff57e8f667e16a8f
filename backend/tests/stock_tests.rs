//! Stock adjustment and ledger tests
//!
//! Covers non-negative quantities under concurrency, ledger consistency,
//! the low-stock flag and threshold seeding.

mod common;

use std::sync::Arc;

use common::*;
use injera_backend::services::{
    settings::UpdateSettingInput,
    stock::{AdjustQuantityInput, QuickAdjustInput, QuickOperation, UpdateStockInput},
};
use injera_backend::AppError;
use proptest::prelude::*;
use shared::{StockCategory, ThresholdSource, TransactionType};

fn adjustment(amount: i32) -> AdjustQuantityInput {
    AdjustQuantityInput {
        adjustment: amount,
        reason: Some("count".to_string()),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_adjust_into_low_stock() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 100, Some(50)).await;
    assert!(!stock.is_low_stock);

    let adjusted = state
        .stock_service()
        .adjust(stock.id, adjustment(-60), Some(1))
        .await
        .unwrap();

    assert_eq!(adjusted.stock.quantity, 40);
    assert!(adjusted.stock.is_low_stock);

    let tx = adjusted.transaction.expect("ledger entry");
    assert_eq!(tx.transaction_type, TransactionType::Adjustment);
    assert_eq!(
        (tx.quantity_before, tx.quantity_after, tx.quantity_change),
        (100, 40, -60)
    );

    let entries = ledger(&state, stock.id).await;
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, tx.id);
    assert_eq!(entries[1].transaction_type, TransactionType::Initial);
}

#[tokio::test]
async fn test_adjust_below_zero_is_refused() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 10, Some(5)).await;

    let err = state
        .stock_service()
        .adjust(stock.id, adjustment(-15), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let current = state.stock_service().get(stock.id).await.unwrap();
    assert_eq!(current.quantity, 10);

    // Only the opening balance
    let entries = ledger(&state, stock.id).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transaction_type, TransactionType::Initial);
}

#[tokio::test]
async fn test_adjust_unknown_item_is_not_found() {
    let state = test_state();
    let err = state
        .stock_service()
        .adjust(999, adjustment(5), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_zero_adjustment_rejected() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 10, None).await;
    let err = state
        .stock_service()
        .adjust(stock.id, adjustment(0), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "adjustment"));
}

#[tokio::test]
async fn test_quick_adjust_records_in_and_out() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 10, Some(0)).await;
    let service = state.stock_service();

    let added = service
        .quick_adjust(
            stock.id,
            QuickAdjustInput {
                amount: 5,
                operation: QuickOperation::Add,
                reason: None,
            },
            Some(7),
        )
        .await
        .unwrap();
    assert_eq!(added.stock.quantity, 15);
    assert_eq!(added.stock.last_restocked_by, Some(7));
    assert_eq!(added.transaction.unwrap().transaction_type, TransactionType::In);

    let removed = service
        .quick_adjust(
            stock.id,
            QuickAdjustInput {
                amount: 15,
                operation: QuickOperation::Subtract,
                reason: None,
            },
            Some(7),
        )
        .await
        .unwrap();
    assert_eq!(removed.stock.quantity, 0);
    assert_eq!(removed.transaction.unwrap().transaction_type, TransactionType::Out);
}

#[tokio::test]
async fn test_setting_seeds_new_items_only() {
    let state = test_state();
    let settings = state.settings_service();

    settings
        .update(
            StockCategory::Injera,
            UpdateSettingInput {
                minimum_threshold: 200,
            },
            Some(1),
        )
        .await
        .unwrap();

    let first = create_stock(&state, "Injera", 150, None).await;
    assert_eq!(first.minimum_threshold, 200);
    assert!(first.is_low_stock);

    settings
        .update(
            StockCategory::Injera,
            UpdateSettingInput {
                minimum_threshold: 10,
            },
            Some(1),
        )
        .await
        .unwrap();

    let unchanged = state.stock_service().get(first.id).await.unwrap();
    assert_eq!(unchanged.minimum_threshold, 200);

    let second = create_stock(&state, "Injera (large)", 150, None).await;
    assert_eq!(second.minimum_threshold, 10);
}

#[tokio::test]
async fn test_threshold_resolution_order() {
    let state = test_state();
    let settings = state.settings_service();

    let resolved = settings.threshold_for(StockCategory::TeffFlour, None).await.unwrap();
    assert_eq!(resolved.minimum_threshold, 50);
    assert_eq!(resolved.source, ThresholdSource::Default);

    let explicit = settings.threshold_for(StockCategory::TeffFlour, Some(3)).await.unwrap();
    assert_eq!(explicit.minimum_threshold, 3);
    assert_eq!(explicit.source, ThresholdSource::Explicit);

    let listed = settings.list().await.unwrap();
    assert_eq!(listed.len(), StockCategory::ALL.len());
    assert!(listed.iter().all(|t| t.source == ThresholdSource::Default));
}

#[tokio::test]
async fn test_field_update_records_quantity_change() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 20, Some(10)).await;

    let updated = state
        .stock_service()
        .update(
            stock.id,
            UpdateStockInput {
                quantity: Some(5),
                ..Default::default()
            },
            Some(2),
        )
        .await
        .unwrap();
    assert_eq!(updated.quantity, 5);
    assert!(updated.is_low_stock);

    let entries = ledger(&state, stock.id).await;
    assert_eq!(entries[0].transaction_type, TransactionType::Out);
    assert_eq!(
        (entries[0].quantity_before, entries[0].quantity_after, entries[0].quantity_change),
        (20, 5, -15)
    );
}

#[tokio::test]
async fn test_zero_quantity_item_has_no_opening_entry() {
    let state = test_state();
    let stock = create_stock(&state, "Packaging box", 0, None).await;
    assert!(ledger(&state, stock.id).await.is_empty());
}

#[tokio::test]
async fn test_deactivated_items_leave_low_stock_listing() {
    let state = test_state();
    let low = create_stock(&state, "Injera", 1, Some(10)).await;
    let lower = create_stock(&state, "Injera (half)", 0, Some(10)).await;
    create_stock(&state, "Injera (family)", 50, Some(10)).await;

    let listed = state.stock_service().low_stock().await.unwrap();
    assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![lower.id, low.id]);

    state.stock_service().deactivate(low.id, Some(1)).await.unwrap();
    let listed = state.stock_service().low_stock().await.unwrap();
    assert_eq!(listed.iter().map(|s| s.id).collect::<Vec<_>>(), vec![lower.id]);

    // The ledger survives the soft delete
    assert_eq!(ledger(&state, low.id).await.len(), 1);
}

#[tokio::test]
async fn test_low_stock_crossing_notifies_once() {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = test_state().with_notifier(notifier.clone());
    let stock = create_stock(&state, "Injera", 12, Some(10)).await;
    let service = state.stock_service();

    service.adjust(stock.id, adjustment(-1), None).await.unwrap();
    assert!(notifier.events.lock().unwrap().is_empty());

    service.adjust(stock.id, adjustment(-5), None).await.unwrap();
    service.adjust(stock.id, adjustment(-1), None).await.unwrap();

    let events = notifier.events.lock().unwrap().clone();
    assert_eq!(events, vec![format!("low:{}", stock.id)]);
}

#[tokio::test]
async fn test_audit_failure_does_not_undo_adjustment() {
    let state = state_with_failing_audit();
    let stock = create_stock(&state, "Injera", 10, Some(0)).await;

    let adjusted = state
        .stock_service()
        .adjust(stock.id, adjustment(-4), None)
        .await
        .unwrap();
    assert_eq!(adjusted.stock.quantity, 6);
    assert!(adjusted.transaction.is_none());
}

#[tokio::test]
async fn test_stats_count_active_items() {
    let state = test_state();
    create_stock(&state, "Injera", 4, Some(10)).await;
    let retired = create_stock(&state, "Injera (old)", 100, Some(10)).await;
    state.stock_service().deactivate(retired.id, None).await.unwrap();

    let stats = state.stock_service().stats().await.unwrap();
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.active_items, 1);
    assert_eq!(stats.low_stock_count, 1);
    assert_eq!(stats.total_quantity, 4);
    assert_eq!(stats.total_value, dec("10.00"));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decrements_never_go_negative() {
    let state = test_state();
    let stock = create_stock(&state, "Injera", 100, Some(0)).await;

    let mut handles = Vec::new();
    for _ in 0..50 {
        let service = state.stock_service();
        let id = stock.id;
        handles.push(tokio::spawn(async move {
            service.adjust(id, adjustment(-3), None).await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(AppError::InsufficientStock(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(applied, 33);
    let current = state.stock_service().get(stock.id).await.unwrap();
    assert_eq!(current.quantity, 1);

    let entries = ledger(&state, stock.id).await;
    assert_eq!(entries.len(), 34);
    assert!(entries.iter().all(|e| e.quantity_after >= 0));
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Quantity never goes negative, the low-stock flag tracks the quantity,
    /// and the ledger replays to the stored quantity.
    #[test]
    fn prop_ledger_replays_to_quantity(
        initial in 0i32..200,
        threshold in 0i32..100,
        changes in prop::collection::vec(-80i32..80, 1..20),
    ) {
        let (final_quantity, is_low, entries, expected_low) = tokio_test::block_on(async {
            let state = test_state();
            let stock = create_stock(&state, "Injera", initial, Some(threshold)).await;
            let service = state.stock_service();

            for change in changes.iter().copied().filter(|c| *c != 0) {
                match service.adjust(stock.id, adjustment(change), None).await {
                    Ok(adjusted) => {
                        assert_eq!(
                            adjusted.stock.is_low_stock,
                            adjusted.stock.quantity < threshold
                        );
                    }
                    Err(AppError::InsufficientStock(_)) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }

            let current = service.get(stock.id).await.unwrap();
            let entries = ledger(&state, stock.id).await;
            (current.quantity, current.is_low_stock, entries, current.quantity < threshold)
        });

        prop_assert!(final_quantity >= 0);
        prop_assert_eq!(is_low, expected_low);
        prop_assert!(entries.iter().all(|e| e.quantity_after == e.quantity_before + e.quantity_change));
        prop_assert!(entries.iter().all(|e| e.quantity_after >= 0));

        let replayed: i32 = entries.iter().map(|e| e.quantity_change).sum();
        prop_assert_eq!(replayed, final_quantity);

        // Newest first: each entry starts where the previous one ended
        for pair in entries.windows(2) {
            prop_assert_eq!(pair[0].quantity_before, pair[1].quantity_after);
        }
    }
}

#[tokio::test]
async fn test_price_beyond_storage_rejected() {
    let state = test_state();
    let mut input = stock_input("Injera", StockCategory::Injera, 10, Some(0));
    input.price = dec("10000000000.00");

    let created = state.stock_service().create(input, None).await;
    assert!(matches!(created, Err(AppError::Validation { ref field, .. }) if field == "price"));

    let stock = create_stock(&state, "Injera", 10, Some(0)).await;
    let updated = state
        .stock_service()
        .update(
            stock.id,
            UpdateStockInput {
                price: Some(dec("10000000000.00")),
                ..Default::default()
            },
            None,
        )
        .await;
    assert!(matches!(updated, Err(AppError::Validation { ref field, .. }) if field == "price"));

    let current = state.stock_service().get(stock.id).await.unwrap();
    assert_eq!(current.price, dec("2.50"));
}
