//! Event ingestion pipeline
//!
//! One flow for every event source:
//!
//! ```text
//! RawEvent -> source filter -> normalize -> amount / direction / merchant
//!          -> category classifier -> duplicate guard -> persist -> spike check
//! ```
//!
//! The source tag only decides which allow list applies and whether bare
//! numbers count as amounts; everything downstream is identical.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::anomaly::AnomalyDetector;
use crate::calendar::Calendar;
use crate::classify::{CategoryClassifier, ClassificationLayer, ClassifyRequest};
use crate::config::{PaisaConfig, SourceFilter};
use crate::dedupe::DuplicateGuard;
use crate::error::{Error, Result};
use crate::extract::{normalize, AmountExtractor, DirectionClassifier, MerchantExtractor};
use crate::models::{
    AlertRecord, Direction, EventSource, ParsedTransaction, RawEvent, StoredExpense,
};
use crate::store::{ExpenseStore, LearningStore};

/// Why an event was dropped without being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Sender or package is not on the allow list
    UntrustedSource,
    /// Money coming in, not an expense
    Income,
}

impl IgnoreReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UntrustedSource => "untrusted source",
            Self::Income => "income",
        }
    }
}

/// Result of processing one event
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    Recorded {
        expense: StoredExpense,
        transaction: ParsedTransaction,
        /// Alert written by the spike check, if any
        alert: Option<AlertRecord>,
    },
    /// Same amount and merchant already recorded today
    Duplicate(ParsedTransaction),
    Ignored(IgnoreReason),
}

impl PipelineOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

/// A parsed and classified event, before any store write
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub transaction: ParsedTransaction,
    pub layer: ClassificationLayer,
}

pub struct TransactionPipeline {
    sources: SourceFilter,
    amounts: AmountExtractor,
    directions: DirectionClassifier,
    merchants: MerchantExtractor,
    classifier: CategoryClassifier,
    guard: DuplicateGuard,
    detector: AnomalyDetector,
    store: Arc<dyn ExpenseStore>,
    learning: Arc<dyn LearningStore>,
}

impl TransactionPipeline {
    pub fn new(
        config: &PaisaConfig,
        store: Arc<dyn ExpenseStore>,
        learning: Arc<dyn LearningStore>,
    ) -> Result<Self> {
        let calendar = Calendar::new(config.timezone);
        Ok(Self {
            sources: config.sources.clone(),
            amounts: AmountExtractor::new()?,
            directions: DirectionClassifier,
            merchants: MerchantExtractor,
            classifier: CategoryClassifier::new(config.rules.clone()),
            guard: DuplicateGuard::new(calendar),
            detector: AnomalyDetector::new(config.anomaly.clone(), calendar),
            store,
            learning,
        })
    }

    /// Enable the AI fallback layer, bounded by the configured timeout
    pub fn with_ai(mut self, ai: AIClient, config: &PaisaConfig) -> Self {
        self.classifier = self.classifier.with_ai(ai, config.ai_timeout);
        self
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn detector(&self) -> &AnomalyDetector {
        &self.detector
    }

    /// Whether the event's sender may feed the pipeline
    pub fn accepts(&self, event: &RawEvent) -> bool {
        let sender = event.sender.as_deref();
        match event.source {
            EventSource::Sms => self.sources.sender_allowed(sender),
            EventSource::PushNotification => self.sources.package_allowed(sender),
            EventSource::ManualEntry => true,
        }
    }

    /// Extract and classify without touching the expense store
    pub async fn parse(&self, user_id: &str, event: &RawEvent) -> Draft {
        let text = normalize(&event.text);
        let local_amount = self.amounts.extract(&text, event.source);
        let direction = self.directions.classify(&text);
        let merchant = self.merchants.extract(&text);

        let learned = match self.learning.learned_keywords(user_id).await {
            Ok(learned) => learned,
            Err(e) => {
                warn!(error = %e, "Could not read learned keywords, skipping that layer");
                Default::default()
            }
        };

        let classification = self
            .classifier
            .classify(&ClassifyRequest {
                merchant: &merchant,
                text: &text,
                raw_text: &event.text,
                learned: &learned,
                local_amount,
            })
            .await;

        debug!(
            source = event.source.as_str(),
            merchant = %merchant,
            direction = direction.as_str(),
            category = %classification.category,
            layer = classification.layer.as_str(),
            amount = %classification.amount,
            "Parsed event"
        );

        Draft {
            transaction: ParsedTransaction {
                amount: classification.amount,
                direction,
                note: format!("{} | {}", merchant, event.text.trim()),
                merchant,
                category: classification.category,
                timestamp: event.received_at,
            },
            layer: classification.layer,
        }
    }

    /// Run one event start to finish
    ///
    /// Only a missing user or a failed expense write is an error. Read
    /// failures around deduplication and spike detection are logged and
    /// skipped.
    pub async fn process(&self, user_id: Option<&str>, event: &RawEvent) -> Result<PipelineOutcome> {
        let Some(user_id) = user_id.filter(|u| !u.trim().is_empty()) else {
            warn!(source = event.source.as_str(), "Dropping event with no user");
            return Err(Error::MissingUser);
        };

        if !self.accepts(event) {
            debug!(
                source = event.source.as_str(),
                sender = ?event.sender,
                "Sender not on allow list"
            );
            return Ok(PipelineOutcome::Ignored(IgnoreReason::UntrustedSource));
        }

        // Cheap check first so income never reaches the AI layer
        if self.directions.classify(&normalize(&event.text)) == Direction::Credit {
            debug!(source = event.source.as_str(), "Incoming money, not recorded");
            return Ok(PipelineOutcome::Ignored(IgnoreReason::Income));
        }

        let draft = self.parse(user_id, event).await;
        let tx = draft.transaction;

        let duplicate = match self
            .guard
            .is_duplicate(
                self.store.as_ref(),
                user_id,
                tx.amount,
                &tx.merchant,
                event.received_at,
            )
            .await
        {
            Ok(duplicate) => duplicate,
            Err(e) => {
                warn!(error = %e, "Duplicate check failed, recording anyway");
                false
            }
        };
        if duplicate {
            info!(merchant = %tx.merchant, amount = %tx.amount, "Duplicate event suppressed");
            return Ok(PipelineOutcome::Duplicate(tx));
        }

        let expense = self.store.add_expense(user_id, &tx).await?;
        info!(
            id = %expense.id,
            category = %expense.category,
            amount = %expense.amount,
            "Expense recorded"
        );

        let alert = match self
            .detector
            .check(self.store.as_ref(), user_id, &expense.category, event.received_at)
            .await
        {
            Ok(alert) => alert,
            Err(e) => {
                warn!(error = %e, category = %expense.category, "Spike check skipped");
                None
            }
        };

        Ok(PipelineOutcome::Recorded {
            expense,
            transaction: tx,
            alert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{AlertType, BaselineStats};
    use crate::store::{ExpenseQuery, MemoryStore};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn config() -> PaisaConfig {
        PaisaConfig::embedded().unwrap()
    }

    fn pipeline(store: &MemoryStore) -> TransactionPipeline {
        let store = Arc::new(store.clone());
        TransactionPipeline::new(&config(), store.clone(), store).unwrap()
    }

    // 13:00 IST
    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 7, 30, 0).unwrap()
    }

    async fn with_food_baseline(store: &MemoryStore, average: i64) {
        let mut baseline = BaselineStats::default();
        baseline
            .category_averages
            .insert("Food".into(), Decimal::from(average));
        store.set_baseline("u", &baseline).await.unwrap();
    }

    #[tokio::test]
    async fn test_sms_is_recorded() {
        let store = MemoryStore::new();
        let event = RawEvent::sms(
            "Rs.450.00 debited from A/c XX12, paid to ZOMATO via UPI",
            "VM-HDFCBK",
            at(),
        );

        let outcome = pipeline(&store).process(Some("u"), &event).await.unwrap();
        let PipelineOutcome::Recorded {
            expense,
            transaction,
            alert,
        } = outcome
        else {
            panic!("expected a recorded expense");
        };
        assert_eq!(expense.amount, Decimal::from(450));
        assert_eq!(expense.category, "Food");
        assert_eq!(transaction.merchant, "Zomato");
        assert_eq!(transaction.direction, Direction::Debit);
        assert!(expense.note.starts_with("Zomato | Rs.450.00 debited"));
        assert_eq!(expense.timestamp, at());
        assert!(alert.is_none());
    }

    #[tokio::test]
    async fn test_missing_user_is_an_error() {
        let store = MemoryStore::new();
        let p = pipeline(&store);
        let event = RawEvent::manual("coffee 120", at());
        assert!(matches!(p.process(None, &event).await, Err(Error::MissingUser)));
        assert!(matches!(p.process(Some("  "), &event).await, Err(Error::MissingUser)));
    }

    #[tokio::test]
    async fn test_untrusted_sender_and_package() {
        let store = MemoryStore::new();
        let mut config = config();
        config.sources.allowed_senders = vec!["HDFCBK".into(), "VM-SBIINB".into()];
        let shared = Arc::new(store.clone());
        let p = TransactionPipeline::new(&config, shared.clone(), shared).unwrap();

        let sms = RawEvent::sms("Rs 99 paid to someone", "AD-PROMO", at());
        assert_eq!(
            p.process(Some("u"), &sms).await.unwrap(),
            PipelineOutcome::Ignored(IgnoreReason::UntrustedSource)
        );

        // Operator prefixes vary between messages from the same bank
        for (sender, amount) in [("AD-HDFCBK", 101), ("VK-HDFCBK", 102), ("JD-SBIINB", 103)] {
            let sms = RawEvent::sms(&format!("Rs {} paid to Dominos", amount), sender, at());
            assert!(p.process(Some("u"), &sms).await.unwrap().is_recorded(), "{}", sender);
        }

        let push = RawEvent::notification("com.example.game", "Paid", "Rs 99 to x", at());
        assert_eq!(
            p.process(Some("u"), &push).await.unwrap(),
            PipelineOutcome::Ignored(IgnoreReason::UntrustedSource)
        );

        let trusted = RawEvent::notification(
            "com.phonepe.app",
            "Payment successful",
            "Paid ₹120 to Starbucks",
            at(),
        );
        assert!(p.process(Some("u"), &trusted).await.unwrap().is_recorded());
        assert_eq!(store.query_expenses("u", &ExpenseQuery::default()).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_income_is_ignored() {
        let store = MemoryStore::new();
        let event = RawEvent::sms("Refund of Rs 500 credited to your a/c", "VM-ICICIB", at());
        assert_eq!(
            pipeline(&store).process(Some("u"), &event).await.unwrap(),
            PipelineOutcome::Ignored(IgnoreReason::Income)
        );
        assert!(store.query_expenses("u", &ExpenseQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_entry_accepts_bare_number() {
        let store = MemoryStore::new();
        let outcome = pipeline(&store)
            .process(Some("u"), &RawEvent::manual("Lunch 180", at()))
            .await
            .unwrap();
        let PipelineOutcome::Recorded { expense, .. } = outcome else {
            panic!("expected a recorded expense");
        };
        assert_eq!(expense.amount, Decimal::from(180));
        assert_eq!(expense.category, "Food");
        assert_eq!(expense.note, "Unknown | Lunch 180");
    }

    #[tokio::test]
    async fn test_zero_amount_is_still_recorded() {
        let store = MemoryStore::new();
        let outcome = pipeline(&store)
            .process(Some("u"), &RawEvent::manual("paid the maid", at()))
            .await
            .unwrap();
        let PipelineOutcome::Recorded { expense, .. } = outcome else {
            panic!("expected a recorded expense");
        };
        assert_eq!(expense.amount, Decimal::ZERO);
        assert_eq!(expense.category, "Other");
    }

    #[tokio::test]
    async fn test_ai_fallback_and_failure() {
        let store = MemoryStore::new();
        let cfg = config();
        let mock = MockBackend::with_reply("Entertainment", None);
        let shared = Arc::new(store.clone());
        let p = TransactionPipeline::new(&cfg, shared.clone(), shared)
            .unwrap()
            .with_ai(AIClient::Mock(mock.clone()), &cfg);

        let outcome = p
            .process(Some("u"), &RawEvent::manual("pvr imax 699", at()))
            .await
            .unwrap();
        let PipelineOutcome::Recorded { expense, .. } = outcome else {
            panic!("expected a recorded expense");
        };
        assert_eq!(expense.category, "Entertainment");
        assert_eq!(mock.calls(), 1);

        let failing = TransactionPipeline::new(&cfg, Arc::new(store.clone()), Arc::new(store.clone()))
            .unwrap()
            .with_ai(AIClient::Mock(MockBackend::failing()), &cfg);
        let outcome = failing
            .process(Some("u"), &RawEvent::manual("mystery charge 42", at()))
            .await
            .unwrap();
        let PipelineOutcome::Recorded { expense, .. } = outcome else {
            panic!("expected a recorded expense");
        };
        assert_eq!(expense.category, "Other");
        assert_eq!(expense.amount, Decimal::from(42));
    }

    #[tokio::test]
    async fn test_learned_keyword_layer() {
        let store = MemoryStore::new();
        store.learn_keyword("u", "cult.fit", "Health").await.unwrap();
        let draft = pipeline(&store)
            .parse("u", &RawEvent::manual("cult.fit membership 1500", at()))
            .await;
        assert_eq!(draft.transaction.category, "Health");
        assert_eq!(draft.layer, ClassificationLayer::Learned);
    }

    #[tokio::test]
    async fn test_replay_records_once_and_alerts_once() {
        let store = MemoryStore::new();
        with_food_baseline(&store, 200).await;
        let p = pipeline(&store);

        let event = RawEvent::sms("Rs 450 paid to Swiggy via UPI", "VM-PAYTM", at());
        let first = p.process(Some("u"), &event).await.unwrap();
        let PipelineOutcome::Recorded { alert: Some(alert), .. } = first else {
            panic!("expected a recorded expense with an alert");
        };
        assert_eq!(alert.alert_type, AlertType::AmountSpike);
        assert_eq!(alert.amount, Decimal::from(450));

        let replay = RawEvent {
            received_at: at() + Duration::minutes(1),
            ..event
        };
        assert!(matches!(
            p.process(Some("u"), &replay).await.unwrap(),
            PipelineOutcome::Duplicate(_)
        ));

        assert_eq!(store.query_expenses("u", &ExpenseQuery::default()).await.unwrap().len(), 1);
        assert_eq!(store.alert("u", "Food").await.unwrap(), Some(alert));
    }

    #[tokio::test]
    async fn test_sms_and_notification_for_same_payment() {
        let store = MemoryStore::new();
        let p = pipeline(&store);

        let sms = RawEvent::sms("Rs 250 debited, paid to Uber", "VM-GPAYBNK", at());
        let push = RawEvent::notification(
            "com.google.android.apps.nbu.paisa.user",
            "Payment sent",
            "₹250 paid to Uber",
            at() + Duration::seconds(5),
        );
        assert!(p.process(Some("u"), &sms).await.unwrap().is_recorded());
        assert!(matches!(
            p.process(Some("u"), &push).await.unwrap(),
            PipelineOutcome::Duplicate(_)
        ));
    }

    #[tokio::test]
    async fn test_late_delivered_sms_lands_on_its_own_day() {
        let store = MemoryStore::new();
        let p = pipeline(&store);
        let next_day = at() + Duration::days(1);

        let today = RawEvent::sms("Rs 450 paid to Swiggy", "VM-PAYTM", next_day);
        assert!(p.process(Some("u"), &today).await.unwrap().is_recorded());

        let late = RawEvent::sms("Rs 450 paid to Swiggy", "VM-PAYTM", at());
        let PipelineOutcome::Recorded { expense, .. } = p.process(Some("u"), &late).await.unwrap()
        else {
            panic!("expected the earlier day's expense to be recorded");
        };
        assert_eq!(expense.timestamp, at());
        assert_eq!(store.query_expenses("u", &ExpenseQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_backdated_expense_does_not_borrow_later_spend() {
        let store = MemoryStore::new();
        with_food_baseline(&store, 200).await;
        let p = pipeline(&store);

        let later = RawEvent::sms("Rs 250 paid to Zomato", "VM-PAYTM", at() + Duration::days(1));
        let PipelineOutcome::Recorded { alert, .. } = p.process(Some("u"), &later).await.unwrap()
        else {
            panic!("expected a recorded expense");
        };
        assert!(alert.is_none());

        let earlier = RawEvent::sms("Rs 100 paid to Swiggy", "VM-PAYTM", at());
        let PipelineOutcome::Recorded { alert, .. } = p.process(Some("u"), &earlier).await.unwrap()
        else {
            panic!("expected a recorded expense");
        };
        assert!(alert.is_none());
        assert!(store.alert("u", "Food").await.unwrap().is_none());
    }
}
