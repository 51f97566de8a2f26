//! Budget editor against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sitebook_core::budget::{
    BudgetError, BudgetLineItem, ImportRow, LineRole, NewBudgetLineItem, SkipReason, WriteReason,
};
use sitebook_shared::AppError;
use sitebook_shared::types::{LineItemId, LocationId};
use sitebook_store::{
    BudgetEditor, EditError, ItemStore, MemoryStore, WriteMode, WriteScheduler,
};

const QUIET: Duration = Duration::from_millis(500);

struct Fixture {
    store: Arc<MemoryStore>,
    editor: BudgetEditor,
    parent: LineItemId,
    first: LineItemId,
    second: LineItemId,
}

fn line(
    number: &str,
    location: LocationId,
    qty: Decimal,
    rate: Option<Decimal>,
    hours: Decimal,
) -> BudgetLineItem {
    NewBudgetLineItem {
        unconverted_qty: qty,
        converted_qty: qty,
        production_rate: rate,
        hours,
        ..NewBudgetLineItem::new(number)
    }
    .into_item(LineItemId::new(), location)
}

/// Parent "26" at rate 5 with children "26.1" (10) and "26.2" (20).
async fn fixture() -> Fixture {
    let location = LocationId::new();
    let parent = line("26", location, dec!(30), Some(dec!(5)), dec!(150));
    let first = line("26.1", location, dec!(10), Some(dec!(5)), dec!(50));
    let second = line("26.2", location, dec!(20), Some(dec!(5)), dec!(100));
    let ids = (parent.id, first.id, second.id);

    let store = Arc::new(MemoryStore::with_items([parent, first, second]));
    let (scheduler, _failures) = WriteScheduler::new(store.clone(), QUIET);
    let editor = BudgetEditor::load(scheduler, location).await.unwrap();

    Fixture {
        store,
        editor,
        parent: ids.0,
        first: ids.1,
        second: ids.2,
    }
}

async fn editor_with(
    location: LocationId,
    items: Vec<BudgetLineItem>,
) -> (Arc<MemoryStore>, BudgetEditor) {
    let store = Arc::new(MemoryStore::with_items(items));
    let (scheduler, _failures) = WriteScheduler::new(store.clone(), QUIET);
    let editor = BudgetEditor::load(scheduler, location).await.unwrap();
    (store, editor)
}

fn numbers(items: &[BudgetLineItem]) -> Vec<&str> {
    items.iter().map(|i| i.line_item_number.as_str()).collect()
}

#[tokio::test]
async fn test_child_quantity_edit_writes_child_then_parent() {
    let mut fx = fixture().await;

    let report = fx
        .editor
        .edit_quantity(fx.first, "16", WriteMode::Immediate)
        .await
        .unwrap();

    assert!(report.is_persisted());
    assert_eq!(numbers(&fx.store.write_log().await), vec!["26.1", "26"]);

    let child = fx.store.get(fx.first).unwrap();
    assert_eq!(child.converted_qty, dec!(16));
    assert_eq!(child.hours, dec!(80));

    let parent = fx.store.get(fx.parent).unwrap();
    assert_eq!(parent.converted_qty, dec!(36));
    assert_eq!(parent.hours, dec!(180));
    assert_eq!(fx.editor.sheet().get(fx.parent), Some(&parent));
}

#[tokio::test]
async fn test_parent_rate_edit_cascades_to_children() {
    let mut fx = fixture().await;

    let report = fx
        .editor
        .edit_production_rate(fx.parent, "6", WriteMode::Immediate)
        .await
        .unwrap();

    let reasons: Vec<WriteReason> = report.recalculation.writes.iter().map(|w| w.reason).collect();
    assert_eq!(
        reasons,
        vec![
            WriteReason::Edited,
            WriteReason::ChildCascade,
            WriteReason::ChildCascade
        ]
    );
    assert_eq!(numbers(&fx.store.write_log().await), vec!["26", "26.1", "26.2"]);
    assert_eq!(fx.store.get(fx.first).unwrap().hours, dec!(60));
    assert_eq!(fx.store.get(fx.second).unwrap().hours, dec!(120));
    assert_eq!(fx.store.get(fx.parent).unwrap().hours, dec!(180));
}

#[tokio::test]
async fn test_parent_hours_edit_back_solves_rate() {
    let mut fx = fixture().await;

    fx.editor
        .edit_hours(fx.parent, "300", WriteMode::Immediate)
        .await
        .unwrap();

    let parent = fx.store.get(fx.parent).unwrap();
    assert_eq!(parent.production_rate, Some(dec!(10)));
    assert_eq!(parent.hours, dec!(300));
    assert_eq!(fx.store.get(fx.first).unwrap().hours, dec!(100));
    assert_eq!(fx.store.get(fx.second).unwrap().hours, dec!(200));
}

#[tokio::test]
async fn test_child_rate_edit_is_rejected_without_writes() {
    let mut fx = fixture().await;

    let err = fx
        .editor
        .edit_production_rate(fx.first, "9", WriteMode::Immediate)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EditError::Validation(BudgetError::ChildRateInherited { ref line }) if line == "26.1"
    ));
    assert_eq!(AppError::from(err).status_code(), 400);
    assert!(fx.store.write_log().await.is_empty());
    assert_eq!(
        fx.editor.sheet().get(fx.first).unwrap().production_rate,
        Some(dec!(5))
    );
}

#[tokio::test]
async fn test_unknown_item_is_not_found() {
    let mut fx = fixture().await;

    let err = fx
        .editor
        .edit_hours(LineItemId::new(), "1", WriteMode::Immediate)
        .await
        .unwrap_err();

    assert_eq!(AppError::from(err).status_code(), 404);
}

#[tokio::test]
async fn test_invalid_input_is_treated_as_zero() {
    let mut fx = fixture().await;

    fx.editor
        .edit_quantity(fx.first, "abc", WriteMode::Immediate)
        .await
        .unwrap();

    let child = fx.store.get(fx.first).unwrap();
    assert_eq!(child.unconverted_qty, Decimal::ZERO);
    assert_eq!(child.hours, Decimal::ZERO);
    let parent = fx.store.get(fx.parent).unwrap();
    assert_eq!(parent.converted_qty, dec!(20));
    assert_eq!(parent.hours, dec!(100));
}

#[tokio::test]
async fn test_failed_parent_write_keeps_local_state() {
    let mut fx = fixture().await;
    fx.store.fail_writes_for(fx.parent);

    let report = fx
        .editor
        .edit_quantity(fx.first, "16", WriteMode::Immediate)
        .await
        .unwrap();

    assert!(!report.is_persisted());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].item_id, fx.parent);

    // The child write stands and nothing is rolled back locally.
    assert_eq!(fx.store.get(fx.first).unwrap().hours, dec!(80));
    assert_eq!(fx.store.get(fx.parent).unwrap().hours, dec!(150));
    assert_eq!(fx.editor.sheet().get(fx.parent).unwrap().hours, dec!(180));

    // A reload shows what the store actually holds.
    fx.editor.reload().await.unwrap();
    assert_eq!(fx.editor.sheet().get(fx.parent).unwrap().hours, dec!(150));
    assert_eq!(fx.editor.sheet().get(fx.first).unwrap().hours, dec!(80));
}

#[tokio::test(start_paused = true)]
async fn test_typing_is_debounced_to_final_value() {
    let mut fx = fixture().await;

    for raw in ["1", "16"] {
        let report = fx
            .editor
            .edit_quantity(fx.first, raw, WriteMode::Debounced)
            .await
            .unwrap();
        assert_eq!(report.scheduled, 2);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(fx.store.write_log().await.is_empty());

    tokio::time::sleep(Duration::from_secs(1)).await;

    let log = fx.store.write_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(fx.store.get(fx.first).unwrap().hours, dec!(80));
    assert_eq!(fx.store.get(fx.parent).unwrap().hours, dec!(180));
}

#[tokio::test(start_paused = true)]
async fn test_flush_writes_pending_value_now() {
    let mut fx = fixture().await;

    fx.editor
        .edit_quantity(fx.first, "16", WriteMode::Debounced)
        .await
        .unwrap();
    fx.editor.flush(fx.first).await.unwrap();

    assert_eq!(numbers(&fx.store.write_log().await), vec!["26.1"]);
    assert_eq!(fx.store.get(fx.first).unwrap().converted_qty, dec!(16));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(numbers(&fx.store.write_log().await), vec!["26.1", "26"]);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_pending_writes() {
    let mut fx = fixture().await;

    fx.editor
        .edit_hours(fx.parent, "300", WriteMode::Debounced)
        .await
        .unwrap();
    fx.editor.shutdown();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(fx.store.write_log().await.is_empty());
}

#[tokio::test]
async fn test_added_child_inherits_rate_and_updates_parent() {
    let mut fx = fixture().await;

    let (created, report) = fx
        .editor
        .add_item(NewBudgetLineItem {
            unconverted_qty: dec!(4),
            production_rate: Some(dec!(99)),
            ..NewBudgetLineItem::new(" 26.3 ")
        })
        .await
        .unwrap();

    assert_eq!(created.line_item_number, "26.3");
    assert_eq!(created.production_rate, Some(dec!(5)));
    assert_eq!(created.hours, dec!(20));
    assert!(report.is_persisted());
    assert_eq!(fx.editor.sheet().role(created.id), Some(LineRole::Child));

    let parent = fx.store.get(fx.parent).unwrap();
    assert_eq!(parent.converted_qty, dec!(34));
    assert_eq!(parent.hours, dec!(170));
}

#[tokio::test]
async fn test_added_parent_aggregates_existing_children() {
    let location = LocationId::new();
    let orphan = line("26.1", location, dec!(10), Some(dec!(5)), dec!(50));
    let orphan_id = orphan.id;
    let (store, mut editor) = editor_with(location, vec![orphan]).await;

    let (parent, report) = editor
        .add_item(NewBudgetLineItem::new("26"))
        .await
        .unwrap();

    assert_eq!(editor.sheet().role(parent.id), Some(LineRole::Parent));
    assert_eq!(parent.converted_qty, dec!(10));
    assert_eq!(parent.unconverted_qty, dec!(10));
    assert_eq!(parent.hours, dec!(50));
    assert_eq!(report.recalculation.len(), 1);
    assert_eq!(report.recalculation.writes[0].reason, WriteReason::ParentAggregate);
    assert_eq!(store.get(parent.id).unwrap().hours, dec!(50));
    assert_eq!(store.get(orphan_id).unwrap().production_rate, Some(dec!(5)));
}

#[tokio::test]
async fn test_added_parent_pushes_its_rate_to_existing_children() {
    let location = LocationId::new();
    let first = line("26.1", location, dec!(10), Some(dec!(5)), dec!(50));
    let second = line("26.2", location, dec!(20), None, dec!(0));
    let ids = (first.id, second.id);
    let (store, mut editor) = editor_with(location, vec![first, second]).await;

    let (parent, report) = editor
        .add_item(NewBudgetLineItem {
            production_rate: Some(dec!(6)),
            ..NewBudgetLineItem::new("26")
        })
        .await
        .unwrap();

    assert!(report.is_persisted());
    assert_eq!(parent.converted_qty, dec!(30));
    assert_eq!(parent.hours, dec!(180));
    for (id, hours) in [(ids.0, dec!(60)), (ids.1, dec!(120))] {
        let child = store.get(id).unwrap();
        assert_eq!(child.production_rate, Some(dec!(6)));
        assert_eq!(child.hours, hours);
    }
}

#[tokio::test]
async fn test_duplicate_number_cannot_be_added() {
    let mut fx = fixture().await;

    let err = fx
        .editor
        .add_item(NewBudgetLineItem::new("26.1"))
        .await
        .unwrap_err();

    assert_eq!(AppError::from(err).status_code(), 409);
    assert_eq!(fx.editor.sheet().len(), 3);
}

#[tokio::test]
async fn test_deleting_child_reaggregates_parent() {
    let mut fx = fixture().await;

    let report = fx.editor.delete_item(fx.second).await.unwrap();

    assert_eq!(report.recalculation.len(), 1);
    assert!(fx.store.get(fx.second).is_none());
    let parent = fx.store.get(fx.parent).unwrap();
    assert_eq!(parent.converted_qty, dec!(10));
    assert_eq!(parent.hours, dec!(50));
}

#[tokio::test]
async fn test_deleting_last_child_leaves_standalone_parent() {
    let mut fx = fixture().await;

    fx.editor.delete_item(fx.second).await.unwrap();
    fx.editor.delete_item(fx.first).await.unwrap();

    assert_eq!(fx.editor.sheet().role(fx.parent), Some(LineRole::Standalone));
    fx.editor
        .edit_quantity(fx.parent, "7", WriteMode::Immediate)
        .await
        .unwrap();
    assert_eq!(fx.store.get(fx.parent).unwrap().hours, dec!(35));
}

#[tokio::test]
async fn test_import_creates_rows_and_skips_existing_numbers() {
    let mut fx = fixture().await;
    let row = |row_number: usize, number: &str, qty: &str, rate: &str| ImportRow {
        row_number,
        line_item_number: number.to_string(),
        unconverted_qty: qty.to_string(),
        production_rate: rate.to_string(),
        ..ImportRow::default()
    };

    let report = fx
        .editor
        .import(&[
            row(2, "40", "", "2"),
            row(3, "40.1", "3", ""),
            row(4, "26", "1", "1"),
            row(5, "  ", "1", "1"),
        ])
        .await
        .unwrap();

    assert_eq!(numbers(&report.created), vec!["40", "40.1"]);
    let skipped: Vec<(usize, SkipReason)> = report
        .skipped
        .iter()
        .map(|s| (s.row_number, s.reason))
        .collect();
    assert_eq!(
        skipped,
        vec![
            (5, SkipReason::InvalidLineNumber),
            (4, SkipReason::DuplicateLineNumber)
        ]
    );

    let sheet = fx.editor.sheet();
    let parent = sheet.get_by_number("40").unwrap();
    let child = sheet.get_by_number("40.1").unwrap();
    assert_eq!(child.production_rate, Some(dec!(2)));
    assert_eq!(child.hours, dec!(6));
    assert_eq!(parent.converted_qty, dec!(3));
    assert_eq!(parent.hours, dec!(6));
    assert!(report.updated.is_empty());
    assert_eq!(fx.store.read(fx.editor.location_id()).await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_imported_child_joins_existing_parent() {
    let location = LocationId::new();
    let parent = line("26", location, dec!(10), Some(dec!(5)), dec!(50));
    let first = line("26.1", location, dec!(10), Some(dec!(5)), dec!(50));
    let parent_id = parent.id;
    let (store, mut editor) = editor_with(location, vec![parent, first]).await;

    let report = editor
        .import(&[ImportRow {
            row_number: 2,
            line_item_number: "26.2".to_string(),
            unconverted_qty: "20".to_string(),
            ..ImportRow::default()
        }])
        .await
        .unwrap();

    assert_eq!(numbers(&report.created), vec!["26.2"]);
    assert_eq!(numbers(&report.updated), vec!["26", "26.2"]);
    assert!(report.failures.is_empty());

    let parent = store.get(parent_id).unwrap();
    assert_eq!(parent.converted_qty, dec!(30));
    assert_eq!(parent.hours, dec!(150));
    let child = editor.sheet().get_by_number("26.2").unwrap().clone();
    assert_eq!(child.production_rate, Some(dec!(5)));
    assert_eq!(child.hours, dec!(100));
    assert_eq!(store.get(child.id).unwrap(), child);
}

#[tokio::test]
async fn test_imported_parent_adopts_existing_children() {
    let location = LocationId::new();
    let orphan = line("30.1", location, dec!(8), None, dec!(0));
    let orphan_id = orphan.id;
    let (store, mut editor) = editor_with(location, vec![orphan]).await;

    let report = editor
        .import(&[ImportRow {
            row_number: 2,
            line_item_number: "30".to_string(),
            production_rate: "1.5".to_string(),
            ..ImportRow::default()
        }])
        .await
        .unwrap();

    assert_eq!(numbers(&report.updated), vec!["30", "30.1"]);
    let parent = editor.sheet().get_by_number("30").unwrap();
    assert_eq!(parent.converted_qty, dec!(8));
    assert_eq!(parent.hours, dec!(12));
    let child = store.get(orphan_id).unwrap();
    assert_eq!(child.production_rate, Some(dec!(1.5)));
    assert_eq!(child.hours, dec!(12));
}

#[tokio::test]
async fn test_summary_counts_parent_hours_once() {
    let fx = fixture().await;

    let summary = fx.editor.summary();

    assert_eq!(summary.total.hours, dec!(150));
}
