use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio_stream::{Stream, StreamExt, wrappers::UnboundedReceiverStream};
use tracing::info;

use autocat_ai::{Classifier, OpenAiClassifier};
use autocat_core::ManualRules;
use autocat_events::{EventBus, InMemoryEventBus, JOBS_SNAPSHOT_EVENT, JobEvent, JobEventKind};
use autocat_infra::{
    config::{AppConfig, load_manual_rules},
    external::{FireflyClient, LedgerClient},
    jobs::{JobRegistry, WorkQueue, WorkQueueConfig, Worker},
    resolver::CategoryResolver,
};

/// Shared state behind every handler.
#[derive(Debug)]
pub struct AppServices {
    registry: Arc<JobRegistry>,
    queue: WorkQueue,
    events: Arc<InMemoryEventBus<JobEvent>>,
}

/// Collaborators and tuning for [`AppServices::with_collaborators`].
pub struct ServiceParts {
    pub ledger: Arc<dyn LedgerClient>,
    pub classifier: Arc<dyn Classifier>,
    pub rules: ManualRules,
    pub queue: WorkQueueConfig,
    pub history_limit: Option<usize>,
}

impl AppServices {
    /// Wire production collaborators from configuration.
    ///
    /// Must run inside a tokio runtime: the worker is spawned here.
    pub fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let ledger = FireflyClient::new(config.firefly.clone())?;
        let classifier = OpenAiClassifier::new(config.openai.clone())?;
        let rules = load_manual_rules(&config.manual_categories_path)?;

        Ok(Self::with_collaborators(ServiceParts {
            ledger: Arc::new(ledger),
            classifier: Arc::new(classifier),
            rules,
            queue: config.queue_config(),
            history_limit: config.job_history_limit,
        }))
    }

    pub fn with_collaborators(parts: ServiceParts) -> Self {
        let mut registry = JobRegistry::new();
        if let Some(limit) = parts.history_limit {
            registry = registry.with_history_limit(limit);
        }
        let registry = Arc::new(registry);

        // Registry events are forwarded to push-channel observers.
        let events: Arc<InMemoryEventBus<JobEvent>> = Arc::new(InMemoryEventBus::new());
        for kind in [JobEventKind::Created, JobEventKind::Updated] {
            let bus = events.clone();
            registry.on(kind, move |event| {
                bus.publish(event.clone())
                    .map_err(|e| anyhow::anyhow!("push channel publish failed: {e}"))
            });
        }

        let resolver = Arc::new(CategoryResolver::new(
            parts.ledger.clone(),
            parts.classifier,
            parts.rules,
        ));
        info!(manual_rules = resolver.rules().len(), "category resolver ready");

        let queue = Worker::new(registry.clone(), resolver, parts.ledger).spawn(parts.queue);

        Self {
            registry,
            queue,
            events,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn events(&self) -> &Arc<InMemoryEventBus<JobEvent>> {
        &self.events
    }
}

/// SSE stream for one observer: the `jobs` snapshot, then live job events.
pub fn job_sse_stream(
    services: Arc<AppServices>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    // Subscribe before snapshotting so no event falls between the two.
    let subscription = services.events.subscribe();
    let snapshot = services.registry.jobs();

    let initial = tokio_stream::once(json_event(JOBS_SNAPSHOT_EVENT, &snapshot));
    let live = UnboundedReceiverStream::new(subscription.into_inner())
        .map(|event| json_event(event.name(), &event));

    Sse::new(initial.chain(live)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn json_event<T: serde::Serialize>(name: &str, payload: &T) -> Result<SseEvent, Infallible> {
    let data = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    Ok(SseEvent::default().event(name).data(data))
}
