//! End-to-end flows through the record service: ledger consistency,
//! migration, clearing, and the message boundary.

use serde_json::json;
use tempfile::tempdir;
use watchstreak::{daykey, stats, Response, StreakTracker};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn total_experience_tracks_per_day_counts() {
    init_logging();
    let dir = tempdir().unwrap();
    let tracker = StreakTracker::open(dir.path()).unwrap();
    let service = tracker.service();

    let first = service.record_today(None).await.unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(first.gained, 100);
    assert_eq!(first.total_xp, 100);

    service
        .record_today(Some("watched 61s (51%)"))
        .await
        .unwrap();
    let third = service.record_today(None).await.unwrap();
    assert_eq!(third.count, 3);
    assert_eq!(third.total_xp, 300);

    let ledger = service.get_all().await;
    assert_eq!(ledger.total_xp, ledger.recomputed_total_xp());
    assert_eq!(ledger.days.values().map(|&c| c as u64).sum::<u64>(), 3);
}

#[tokio::test]
async fn clear_all_resets_every_derived_stat() {
    init_logging();
    let dir = tempdir().unwrap();
    let tracker = StreakTracker::open(dir.path()).unwrap();
    let service = tracker.service();

    service.record_today(None).await.unwrap();
    service.record_today(None).await.unwrap();
    service.clear_all().await.unwrap();

    let ledger = service.get_all().await;
    assert!(ledger.days.is_empty());
    assert_eq!(ledger.total_xp, 0);
    assert_eq!(stats::current_streak(&ledger.days, daykey::today()), 0);
    assert_eq!(stats::total_active_days(&ledger.days), 0);
}

#[tokio::test]
async fn ledger_survives_reopening_the_store() {
    init_logging();
    let dir = tempdir().unwrap();

    {
        let tracker = StreakTracker::open(dir.path()).unwrap();
        tracker.service().record_today(None).await.unwrap();
        tracker.storage().close();
    }

    let tracker = StreakTracker::open(dir.path()).unwrap();
    let ledger = tracker.service().get_all().await;
    assert_eq!(ledger.days.values().map(|&c| c as u64).sum::<u64>(), 1);
    assert_eq!(ledger.total_xp, 100);
}

#[tokio::test]
async fn malformed_messages_get_no_response_and_change_nothing() {
    init_logging();
    let dir = tempdir().unwrap();
    let tracker = StreakTracker::open(dir.path()).unwrap();
    let service = tracker.service();

    assert!(service.dispatch(json!({"ts": 1})).await.is_none());
    assert!(service.dispatch(json!({"action": "bogus"})).await.is_none());
    assert!(service.dispatch(json!("recordToday")).await.is_none());

    let ledger = service.get_all().await;
    assert!(ledger.days.is_empty());
    assert_eq!(ledger.total_xp, 0);
}

#[tokio::test]
async fn dispatch_speaks_the_wire_protocol() {
    init_logging();
    let dir = tempdir().unwrap();
    let tracker = StreakTracker::open(dir.path()).unwrap();
    let service = tracker.service();

    let recorded = service
        .dispatch(json!({"action": "recordToday", "ts": 1_700_000_000_000_i64}))
        .await
        .unwrap();
    let value = serde_json::to_value(&recorded).unwrap();
    assert_eq!(value["ok"], true);
    assert_eq!(value["key"], daykey::today_key());
    assert_eq!(value["count"], 1);
    assert_eq!(value["gained"], 100);
    assert_eq!(value["totalXP"], 100);

    let snapshot = service.dispatch(json!({"action": "getMap"})).await.unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["map"][daykey::today_key()], 1);
    assert_eq!(value["totalXP"], 100);

    let cleared = service
        .dispatch(json!({"action": "clearAll"}))
        .await
        .unwrap();
    assert_eq!(cleared, Response::cleared());

    let snapshot = service.dispatch(json!({"action": "getAll"})).await.unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["totalXP"], 0);
}

#[tokio::test]
async fn record_after_close_reports_failure_payload() {
    init_logging();
    let dir = tempdir().unwrap();
    let tracker = StreakTracker::open(dir.path()).unwrap();
    let service = tracker.service();
    tracker.storage().close();

    let response = service
        .dispatch(json!({"action": "recordToday", "ts": 1}))
        .await
        .unwrap();

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["ok"], false);
    assert!(value["error"].as_str().unwrap().contains("channel unavailable"));

    // Reads resolve to defaults instead of failing.
    let ledger = service.get_all().await;
    assert!(ledger.days.is_empty());
}
