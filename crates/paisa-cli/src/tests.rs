//! CLI command tests

use chrono::{TimeZone, Utc};
use paisa_core::{
    AIClient, AlertType, Database, EventSource, ExpenseQuery, PaisaConfig, Period,
};
use rust_decimal::Decimal;

use crate::commands::{self, truncate, IngestOptions};

fn setup() -> (Database, PaisaConfig) {
    let db = Database::in_memory().unwrap();
    let config = PaisaConfig::embedded().unwrap();
    (db, config)
}

async fn ingest(db: &Database, config: &PaisaConfig, user: &str, text: &str) {
    commands::cmd_ingest(db, config, None, user, text, &IngestOptions::default())
        .await
        .unwrap();
}

fn expenses(db: &Database, user: &str) -> Vec<paisa_core::StoredExpense> {
    db.list_expenses(user, &ExpenseQuery::default()).unwrap()
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a longer note here", 10), "a longe...");
    assert_eq!(truncate("₹₹₹₹₹₹", 5), "₹₹...");
}

#[test]
fn test_rupees() {
    assert_eq!(commands::rupees(Decimal::new(4505, 1)), "₹450.50");
    assert_eq!(commands::rupees(Decimal::from(20)), "₹20.00");
}

#[test]
fn test_canonical_category() {
    assert_eq!(commands::canonical_category("food"), "Food");
    assert_eq!(commands::canonical_category(" BILLS "), "Bills");
    assert_eq!(commands::canonical_category(" Pets "), "Pets");
}

#[test]
fn test_build_event_joins_notification_title() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap();
    let opts = IngestOptions {
        source: EventSource::PushNotification,
        sender: Some("com.phonepe.app".into()),
        title: Some("Payment successful".into()),
        ..Default::default()
    };
    let event = commands::build_event("₹250 paid to Blinkit", &opts, now);
    assert_eq!(event.text, "Payment successful ₹250 paid to Blinkit");
    assert_eq!(event.sender.as_deref(), Some("com.phonepe.app"));
    assert_eq!(event.received_at, now);
}

#[test]
fn test_build_event_prefers_explicit_time() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 30, 0).unwrap();
    let at = Utc.with_ymd_and_hms(2024, 3, 9, 18, 0, 0).unwrap();
    let opts = IngestOptions {
        title: Some("ignored for manual".into()),
        at: Some(at),
        ..Default::default()
    };
    let event = commands::build_event("coffee 120", &opts, now);
    assert_eq!(event.text, "coffee 120");
    assert_eq!(event.received_at, at);
}

// ========== Ingest Command Tests ==========

#[tokio::test]
async fn test_cmd_ingest_manual() {
    let (db, config) = setup();
    ingest(&db, &config, "alice", "coffee 120").await;

    let stored = expenses(&db, "alice");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].amount, Decimal::from(120));
    assert_eq!(stored[0].category, "Food");
    assert!(expenses(&db, "bob").is_empty());
}

#[tokio::test]
async fn test_cmd_ingest_dry_run_stores_nothing() {
    let (db, config) = setup();
    let opts = IngestOptions {
        dry_run: true,
        ..Default::default()
    };
    let result = commands::cmd_ingest(&db, &config, None, "alice", "coffee 120", &opts).await;
    assert!(result.is_ok());
    assert!(expenses(&db, "alice").is_empty());
}

#[tokio::test]
async fn test_cmd_ingest_untrusted_package_is_ignored() {
    let (db, config) = setup();
    let opts = IngestOptions {
        source: EventSource::PushNotification,
        sender: Some("com.example.game".into()),
        ..Default::default()
    };
    let result =
        commands::cmd_ingest(&db, &config, None, "alice", "Rs 999 debited at Zomato", &opts).await;
    assert!(result.is_ok());
    assert!(expenses(&db, "alice").is_empty());
}

#[tokio::test]
async fn test_cmd_ingest_sms_from_any_bank_header() {
    let (db, config) = setup();
    let opts = IngestOptions {
        source: EventSource::Sms,
        sender: Some("JD-SBIINB".into()),
        ..Default::default()
    };
    commands::cmd_ingest(&db, &config, None, "alice", "Rs 450 debited at Zomato", &opts)
        .await
        .unwrap();
    assert_eq!(expenses(&db, "alice").len(), 1);
}

#[tokio::test]
async fn test_cmd_ingest_with_mock_ai() {
    let (db, config) = setup();
    let result = commands::cmd_ingest(
        &db,
        &config,
        Some(AIClient::mock()),
        "alice",
        "movie night 560",
        &IngestOptions::default(),
    )
    .await;
    assert!(result.is_ok());

    let stored = expenses(&db, "alice");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].category, "Entertainment");
}

#[tokio::test]
async fn test_cmd_ingest_raises_alert() {
    let (db, config) = setup();
    commands::cmd_baseline_set(&db, "alice", "food", Decimal::from(100)).unwrap();

    ingest(&db, &config, "alice", "coffee 450").await;

    let alerts = db.list_alerts("alice").unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category, "Food");
    assert_eq!(alerts[0].alert_type, AlertType::AmountSpike);
    assert!(commands::cmd_alerts(&db, &config, "alice", false).is_ok());
    assert!(commands::cmd_alerts(&db, &config, "alice", true).is_ok());
}

// ========== Expenses Command Tests ==========

#[tokio::test]
async fn test_cmd_expenses_list() {
    let (db, config) = setup();
    assert!(commands::cmd_expenses_list(&db, &config, "alice", 20, None, false).is_ok());

    ingest(&db, &config, "alice", "coffee 120").await;
    assert!(commands::cmd_expenses_list(&db, &config, "alice", 20, None, false).is_ok());
    assert!(commands::cmd_expenses_list(&db, &config, "alice", 5, Some("Food"), true).is_ok());
}

#[tokio::test]
async fn test_cmd_expenses_remove() {
    let (db, config) = setup();
    ingest(&db, &config, "alice", "coffee 120").await;
    let id = expenses(&db, "alice")[0].id.clone();

    // Another user's id is not found
    assert!(commands::cmd_expenses_remove(&db, "bob", &id).is_err());

    assert!(commands::cmd_expenses_remove(&db, "alice", &id).is_ok());
    assert!(expenses(&db, "alice").is_empty());
}

#[test]
fn test_cmd_expenses_remove_not_found() {
    let (db, _) = setup();
    assert!(commands::cmd_expenses_remove(&db, "alice", "999").is_err());
    assert!(commands::cmd_expenses_remove(&db, "alice", "not-a-number").is_err());
}

#[test]
fn test_cmd_alerts_empty() {
    let (db, config) = setup();
    assert!(commands::cmd_alerts(&db, &config, "alice", false).is_ok());
}

// ========== Profile Command Tests ==========

#[test]
fn test_cmd_baseline_set_and_show() {
    let (db, _) = setup();
    assert!(commands::cmd_baseline_show(&db, "alice").is_ok());

    commands::cmd_baseline_set(&db, "alice", "food", Decimal::from(300)).unwrap();
    commands::cmd_baseline_set(&db, "alice", "Transport", Decimal::from(80)).unwrap();

    let baseline = db.get_baseline("alice").unwrap().unwrap();
    assert_eq!(baseline.average_for("Food"), Some(Decimal::from(300)));
    assert_eq!(baseline.average_for("Transport"), Some(Decimal::from(80)));
    assert!(commands::cmd_baseline_show(&db, "alice").is_ok());
}

#[test]
fn test_cmd_baseline_set_rejects_negative() {
    let (db, _) = setup();
    assert!(commands::cmd_baseline_set(&db, "alice", "Food", Decimal::from(-1)).is_err());
    assert!(commands::cmd_baseline_set(&db, "alice", "  ", Decimal::from(10)).is_err());
    assert!(db.get_baseline("alice").unwrap().is_none());
}

#[test]
fn test_cmd_budget() {
    let (db, _) = setup();
    assert!(commands::cmd_budget_show(&db, "alice").is_ok());

    assert!(commands::cmd_budget_set(&db, "alice", Decimal::ZERO).is_err());
    assert_eq!(db.get_monthly_budget("alice").unwrap(), None);

    commands::cmd_budget_set(&db, "alice", Decimal::from(20000)).unwrap();
    assert_eq!(
        db.get_monthly_budget("alice").unwrap(),
        Some(Decimal::from(20000))
    );
    assert!(commands::cmd_budget_show(&db, "alice").is_ok());
}

#[test]
fn test_cmd_learn_add_and_remove() {
    let (db, _) = setup();
    assert!(commands::cmd_learn_list(&db, "alice").is_ok());

    commands::cmd_learn_add(&db, "alice", "Cult.Fit", "health").unwrap();
    let learned = db.get_learned_keywords("alice").unwrap();
    assert_eq!(learned.get("cult.fit").map(String::as_str), Some("Health"));
    assert!(commands::cmd_learn_list(&db, "alice").is_ok());

    commands::cmd_learn_remove(&db, "alice", "CULT.FIT").unwrap();
    assert!(db.get_learned_keywords("alice").unwrap().is_empty());
    assert!(commands::cmd_learn_remove(&db, "alice", "cult.fit").is_err());
}

#[test]
fn test_cmd_learn_add_rejects_blank_keyword() {
    let (db, _) = setup();
    assert!(commands::cmd_learn_add(&db, "alice", "   ", "Food").is_err());
}

#[tokio::test]
async fn test_learned_keyword_drives_ingest() {
    let (db, config) = setup();
    commands::cmd_learn_add(&db, "alice", "cult.fit", "Health").unwrap();
    ingest(&db, &config, "alice", "cult.fit membership 1499").await;

    let stored = expenses(&db, "alice");
    assert_eq!(stored[0].category, "Health");
}

// ========== Report Command Tests ==========

#[tokio::test]
async fn test_cmd_summary() {
    let (db, config) = setup();
    assert!(commands::cmd_summary(&db, &config, "alice", Period::ThisMonth, false)
        .await
        .is_ok());

    ingest(&db, &config, "alice", "coffee 120").await;
    ingest(&db, &config, "alice", "metro card 200").await;
    commands::cmd_budget_set(&db, "alice", Decimal::from(5000)).unwrap();

    assert!(commands::cmd_summary(&db, &config, "alice", Period::ThisMonth, false)
        .await
        .is_ok());
    assert!(commands::cmd_summary(&db, &config, "alice", Period::ThisMonth, true)
        .await
        .is_ok());
    assert!(commands::cmd_summary(&db, &config, "alice", Period::LastMonth, false)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cmd_insight_without_and_with_ai() {
    let (db, config) = setup();
    ingest(&db, &config, "alice", "coffee 120").await;

    assert!(commands::cmd_insight(&db, &config, None, "alice", Period::ThisMonth)
        .await
        .is_ok());
    assert!(
        commands::cmd_insight(&db, &config, Some(AIClient::mock()), "alice", Period::ThisMonth)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn test_cmd_history() {
    let (db, config) = setup();
    assert!(commands::cmd_history(&db, &config, "alice", None).is_ok());

    ingest(&db, &config, "alice", "coffee 120").await;
    ingest(&db, &config, "alice", "metro card 200").await;

    assert!(commands::cmd_history(&db, &config, "alice", None).is_ok());
    assert!(commands::cmd_history(&db, &config, "alice", Some("food coffee")).is_ok());
    assert!(commands::cmd_history(&db, &config, "alice", Some("nothing-matches")).is_ok());
}

#[tokio::test]
async fn test_cmd_calendar() {
    let (db, config) = setup();
    assert!(commands::cmd_calendar(&db, &config, "alice", None, false).is_ok());

    ingest(&db, &config, "alice", "coffee 120").await;
    let opts = IngestOptions {
        at: Some(Utc.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap()),
        ..Default::default()
    };
    commands::cmd_ingest(&db, &config, None, "alice", "metro card 200", &opts)
        .await
        .unwrap();

    assert!(commands::cmd_calendar(&db, &config, "alice", None, false).is_ok());
    assert!(commands::cmd_calendar(&db, &config, "alice", Some("2025-03"), false).is_ok());
    assert!(commands::cmd_calendar(&db, &config, "alice", Some("2025-03"), true).is_ok());
    assert!(commands::cmd_calendar(&db, &config, "bob", Some("2025-03"), false).is_ok());
}

#[test]
fn test_cmd_calendar_rejects_bad_month() {
    let (db, config) = setup();
    assert!(commands::cmd_calendar(&db, &config, "alice", Some("March"), false).is_err());
    assert!(commands::cmd_calendar(&db, &config, "alice", Some("2025-13"), false).is_err());
}

#[test]
fn test_heat_level() {
    let peak = Decimal::from(400);
    assert_eq!(commands::heat_level(Decimal::ZERO, peak), 0);
    assert_eq!(commands::heat_level(Decimal::from(1), peak), 1);
    assert_eq!(commands::heat_level(Decimal::from(100), peak), 1);
    assert_eq!(commands::heat_level(Decimal::from(101), peak), 2);
    assert_eq!(commands::heat_level(Decimal::from(300), peak), 3);
    assert_eq!(commands::heat_level(peak, peak), 4);
    assert_eq!(commands::heat_level(Decimal::from(5), Decimal::ZERO), 0);
}

// ========== AI and Prompt Command Tests ==========

#[tokio::test]
async fn test_cmd_ai_test() {
    assert!(commands::cmd_ai_test(None, "Paid Rs 450 to Dominos").await.is_ok());
    assert!(commands::cmd_ai_test(Some(AIClient::mock()), "Paid Rs 450 to Dominos")
        .await
        .is_ok());
}

#[test]
fn test_cmd_prompts() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("classify_expense").is_ok());
    assert!(commands::cmd_prompts_show("spending_insight").is_ok());
    assert!(commands::cmd_prompts_show("unknown_prompt").is_ok());
}

#[test]
fn test_cmd_init() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("paisa.db");
    assert!(commands::cmd_init(&path, true, None).is_ok());
    assert!(path.exists());
}
