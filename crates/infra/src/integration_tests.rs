//! Integration tests for the full categorization pipeline.
//!
//! Tests: Webhook → WorkQueue → Worker → Resolver → Ledger, with registry
//! events fanned out over the in-memory bus.
//!
//! Verifies:
//! - Events reach observers in mutation order with consistent snapshots
//! - Tasks run strictly one at a time, in submission order
//! - A timed-out task never touches its job again, and the queue moves on

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{Value as JsonValue, json};

    use autocat_ai::{AiError, Classification, Classifier};
    use autocat_core::{
        AcceptedWebhook, CancellationToken, CategoryMap, JobId, JobStatus, ManualRule, ManualRules,
        TransactionId, validate_webhook,
    };
    use autocat_events::{EventBus, InMemoryEventBus, JobEvent, JobEventKind};

    use crate::external::{LedgerClient, LedgerError};
    use crate::jobs::{JobRegistry, WorkQueue, WorkQueueConfig, Worker};
    use crate::resolver::{CategoryResolver, MANUAL_PROMPT};

    /// Ledger fake that records write-backs and tracks concurrent calls.
    #[derive(Default)]
    struct FakeLedger {
        writes: Mutex<Vec<(String, String)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn get_categories(&self, _: &CancellationToken) -> Result<CategoryMap, LedgerError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok([("Groceries", "1"), ("Shopping", "2"), ("Travel", "3")]
                .into_iter()
                .collect())
        }

        async fn set_category(
            &self,
            transaction_id: &TransactionId,
            _: &[JsonValue],
            category_id: &str,
            _: &CancellationToken,
        ) -> Result<(), LedgerError> {
            self.writes
                .lock()
                .unwrap()
                .push((transaction_id.to_string(), category_id.to_string()));
            Ok(())
        }
    }

    /// Answers "Travel", except for descriptions containing "slow", which
    /// take far longer than any test timeout.
    struct FakeClassifier;

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn classify(
            &self,
            _: &[String],
            _: &str,
            description: &str,
            _: &CancellationToken,
        ) -> Result<Classification, AiError> {
            if description.contains("slow") {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(Classification::matched("Travel", "prompt", "Travel"))
        }
    }

    struct Pipeline {
        registry: Arc<JobRegistry>,
        ledger: Arc<FakeLedger>,
        queue: WorkQueue,
        events: Arc<InMemoryEventBus<JobEvent>>,
    }

    fn pipeline(timeout: Duration) -> Pipeline {
        let registry = Arc::new(JobRegistry::new());
        let events = Arc::new(InMemoryEventBus::new());
        for kind in [JobEventKind::Created, JobEventKind::Updated] {
            let bus = events.clone();
            registry.on(kind, move |event| {
                bus.publish(event.clone())
                    .map_err(|e| anyhow::anyhow!("{e}"))
            });
        }

        let ledger = Arc::new(FakeLedger::default());
        let rules = ManualRules::new(vec![ManualRule::new("Amazon", "Shopping")]);
        let resolver = Arc::new(CategoryResolver::new(
            ledger.clone(),
            Arc::new(FakeClassifier),
            rules,
        ));
        let queue = Worker::new(registry.clone(), resolver, ledger.clone())
            .spawn(WorkQueueConfig::default().with_task_timeout(timeout));

        Pipeline {
            registry,
            ledger,
            queue,
            events,
        }
    }

    fn webhook(id: u64, description: &str) -> AcceptedWebhook {
        validate_webhook(&json!({
            "trigger": "STORE_TRANSACTION",
            "response": "TRANSACTIONS",
            "content": {
                "id": id,
                "transactions": [{
                    "transaction_journal_id": id * 10,
                    "type": "withdrawal",
                    "description": description,
                    "destination_name": "Some shop"
                }]
            }
        }))
        .unwrap()
    }

    async fn wait_until(queue: &WorkQueue, done: u64) {
        for _ in 0..400 {
            let stats = queue.stats();
            if stats.succeeded + stats.failed + stats.timed_out >= done {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue did not complete {done} tasks: {:?}", queue.stats());
    }

    #[tokio::test]
    async fn webhook_to_ledger_with_ordered_events() {
        let p = pipeline(Duration::from_secs(5));
        let mut sub = p.events.subscribe();

        let job = p.queue.submit(webhook(7, "Amazon.de order")).unwrap();
        wait_until(&p.queue, 1).await;

        let finished = p.registry.get_job(job.id).unwrap();
        assert_eq!(finished.status, JobStatus::Finished);
        assert_eq!(finished.data.category.as_deref(), Some("Shopping"));
        assert_eq!(finished.data.prompt.as_deref(), Some(MANUAL_PROMPT));
        assert_eq!(*p.ledger.writes.lock().unwrap(), vec![("7".to_string(), "2".to_string())]);

        let mut seen = Vec::new();
        while let Ok(event) = sub.try_recv() {
            seen.push((event.kind, event.job.status, event.job.data.is_classified()));
            assert_eq!(event.jobs.len(), 1);
            assert_eq!(event.jobs[0], event.job);
        }
        assert_eq!(
            seen,
            vec![
                (JobEventKind::Created, JobStatus::Queued, false),
                (JobEventKind::Updated, JobStatus::InProgress, false),
                (JobEventKind::Updated, JobStatus::InProgress, true),
                (JobEventKind::Updated, JobStatus::Finished, true),
            ]
        );
    }

    #[tokio::test]
    async fn tasks_never_overlap_and_follow_submission_order() {
        let p = pipeline(Duration::from_secs(5));
        let mut sub = p.events.subscribe();

        let ids: Vec<_> = (1..=5)
            .map(|n| p.queue.submit(webhook(n, "Train ticket")).unwrap().id)
            .collect();
        wait_until(&p.queue, 5).await;

        assert_eq!(p.ledger.max_in_flight.load(Ordering::SeqCst), 1);
        let written: Vec<_> = p.ledger.writes.lock().unwrap().iter().map(|w| w.0.clone()).collect();
        assert_eq!(written, vec!["1", "2", "3", "4", "5"]);

        // Job n+1 only starts after job n finished.
        let mut transitions: Vec<(JobId, JobStatus)> = Vec::new();
        while let Ok(event) = sub.try_recv() {
            let step = (event.job.id, event.job.status);
            if event.kind == JobEventKind::Updated && transitions.last() != Some(&step) {
                transitions.push(step);
            }
        }
        let expected: Vec<_> = ids
            .iter()
            .flat_map(|id| [(*id, JobStatus::InProgress), (*id, JobStatus::Finished)])
            .collect();
        assert_eq!(transitions, expected);
    }

    #[tokio::test]
    async fn timed_out_task_is_abandoned_and_queue_continues() {
        let p = pipeline(Duration::from_millis(100));

        let slow = p.queue.submit(webhook(1, "slow booking")).unwrap();
        let next = p.queue.submit(webhook(2, "Train ticket")).unwrap();
        wait_until(&p.queue, 2).await;

        let stats = p.queue.stats();
        assert_eq!(stats.timed_out, 1);
        assert_eq!(stats.succeeded, 1);

        assert_eq!(p.registry.get_job(next.id).unwrap().status, JobStatus::Finished);

        // Well past the classifier's delay, the abandoned job is untouched.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let slow = p.registry.get_job(slow.id).unwrap();
        assert_eq!(slow.status, JobStatus::InProgress);
        assert!(!slow.data.is_classified());
        assert_eq!(*p.ledger.writes.lock().unwrap(), vec![("2".to_string(), "3".to_string())]);
    }

    #[tokio::test]
    async fn snapshot_is_in_creation_order() {
        let p = pipeline(Duration::from_secs(5));
        let ids: Vec<_> = (1..=3)
            .map(|n| p.queue.submit(webhook(n, "Train ticket")).unwrap().id)
            .collect();
        wait_until(&p.queue, 3).await;

        let snapshot: Vec<_> = p.registry.jobs().iter().map(|j| j.id).collect();
        assert_eq!(snapshot, ids);
        assert!(p.registry.jobs().iter().all(|j| j.status == JobStatus::Finished));
    }
}
