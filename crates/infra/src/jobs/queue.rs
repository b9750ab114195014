//! Serialized work queue and its single worker.
//!
//! Tasks run one at a time, strictly in submission order. Each run is
//! bounded by a timeout and isolated in its own tokio task, so a failed,
//! timed-out or panicking task is logged and the worker moves on to the next
//! one. The job keeps whatever status it last reached.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use autocat_core::{AcceptedWebhook, CancellationToken, Job, JobData, JobId};

use crate::external::LedgerClient;
use crate::resolver::CategoryResolver;

use super::registry::JobRegistry;
use super::task::{ClassificationTask, TaskError, TaskOutcome};

pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkQueueConfig {
    /// Execution budget per task.
    pub task_timeout: Duration,
    /// Name for logging.
    pub name: String,
}

impl Default for WorkQueueConfig {
    fn default() -> Self {
        Self {
            task_timeout: DEFAULT_TASK_TIMEOUT,
            name: "categorize-worker".to_string(),
        }
    }
}

impl WorkQueueConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }
}

/// Queue runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    /// Job currently being executed, if any.
    pub running: Option<JobId>,
}

impl QueueStats {
    /// Tasks accepted but not yet completed (including the running one).
    pub fn pending(&self) -> u64 {
        self.submitted
            .saturating_sub(self.succeeded + self.failed + self.timed_out)
    }
}

/// Queue failure at submission time.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("work queue is shut down")]
    Closed,
}

type SharedStats = Arc<Mutex<QueueStats>>;

struct QueueShared {
    registry: Arc<JobRegistry>,
    tx: mpsc::UnboundedSender<ClassificationTask>,
    intake: Mutex<()>,
    stats: SharedStats,
    shutdown: Arc<Notify>,
    join: Mutex<Option<JoinHandle<()>>>,
}

/// Submission side of the queue. Cheap to clone.
#[derive(Clone)]
pub struct WorkQueue {
    shared: Arc<QueueShared>,
}

impl WorkQueue {
    /// Create a queued job for an accepted webhook and schedule its task.
    ///
    /// Job creation and task submission happen atomically with respect to
    /// other submitters, so execution order always matches creation order.
    ///
    /// A queue that is already closed creates no job. If the worker stops
    /// between that check and the hand-off, the new job stays `queued` and
    /// is never counted as submitted.
    pub fn submit(&self, accepted: AcceptedWebhook) -> Result<Job, QueueError> {
        let _intake = self
            .shared
            .intake
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.shared.tx.is_closed() {
            return Err(QueueError::Closed);
        }

        let job = self.shared.registry.create_job(JobData::new(
            accepted.destination_name.clone(),
            accepted.description.clone(),
        ));
        let task = ClassificationTask::new(job.id, accepted);

        if self.shared.tx.send(task).is_err() {
            warn!(job_id = %job.id, "work queue closed before the job could be scheduled");
            return Err(QueueError::Closed);
        }
        update_stats(&self.shared.stats, |s| s.submitted += 1);

        Ok(job)
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.shared.registry
    }

    pub fn stats(&self) -> QueueStats {
        self.shared
            .stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether the worker loop has exited.
    pub fn is_closed(&self) -> bool {
        self.shared.tx.is_closed()
    }

    /// Stop the worker after the task it is currently running, if any.
    ///
    /// Tasks still waiting in the queue are not executed.
    pub async fn shutdown(&self) {
        self.shared.shutdown.notify_one();
        let join = self
            .shared
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(join) = join {
            let _ = join.await;
        }
    }
}

fn update_stats(stats: &Mutex<QueueStats>, f: impl FnOnce(&mut QueueStats)) {
    f(&mut stats.lock().unwrap_or_else(PoisonError::into_inner));
}

impl core::fmt::Debug for WorkQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WorkQueue").field("stats", &self.stats()).finish()
    }
}

/// Executes classification tasks.
pub struct Worker {
    registry: Arc<JobRegistry>,
    resolver: Arc<CategoryResolver>,
    ledger: Arc<dyn LedgerClient>,
}

impl Worker {
    pub fn new(
        registry: Arc<JobRegistry>,
        resolver: Arc<CategoryResolver>,
        ledger: Arc<dyn LedgerClient>,
    ) -> Self {
        Self {
            registry,
            resolver,
            ledger,
        }
    }

    /// Spawn the worker loop on the current tokio runtime.
    ///
    /// The loop also ends once every [`WorkQueue`] handle is dropped.
    pub fn spawn(self, config: WorkQueueConfig) -> WorkQueue {
        let (tx, rx) = mpsc::unbounded_channel();
        let registry = self.registry.clone();
        let stats = SharedStats::default();
        let shutdown = Arc::new(Notify::new());

        let join = tokio::spawn(worker_loop(
            Arc::new(self),
            config,
            rx,
            stats.clone(),
            shutdown.clone(),
        ));

        WorkQueue {
            shared: Arc::new(QueueShared {
                registry,
                tx,
                intake: Mutex::new(()),
                stats,
                shutdown,
                join: Mutex::new(Some(join)),
            }),
        }
    }

    /// Run one task under the timeout and report how it ended.
    pub async fn execute(&self, task: ClassificationTask, timeout: Duration) -> TaskOutcome {
        let job_id = task.job_id;
        let cancel = CancellationToken::new();
        info!(job_id = %job_id, "job started");

        match tokio::time::timeout(timeout, self.run(&task, &cancel)).await {
            Ok(Ok(())) => {
                info!(job_id = %job_id, "job success");
                TaskOutcome::Succeeded
            }
            Ok(Err(e)) => {
                error!(job_id = %job_id, error = %e, "job error");
                TaskOutcome::Failed
            }
            Err(_) => {
                cancel.cancel();
                warn!(job_id = %job_id, error = %TaskError::TimedOut(timeout), "job timeout");
                TaskOutcome::TimedOut
            }
        }
    }

    async fn run(&self, task: &ClassificationTask, cancel: &CancellationToken) -> Result<(), TaskError> {
        checkpoint(cancel)?;
        let job = self.registry.set_job_in_progress(task.job_id)?;

        let resolution = self
            .resolver
            .resolve(&task.destination_name, &task.description, cancel)
            .await?;

        checkpoint(cancel)?;
        let data = job.data.with_classification(
            resolution.category.clone(),
            resolution.prompt,
            resolution.response,
        );
        self.registry.update_job_data(task.job_id, data)?;

        if let Some(category_id) = resolution.category_id.as_deref() {
            checkpoint(cancel)?;
            self.ledger
                .set_category(&task.transaction_id, &task.transactions, category_id, cancel)
                .await?;
        }

        checkpoint(cancel)?;
        self.registry.set_job_finished(task.job_id)?;
        Ok(())
    }
}

/// Abandoned tasks must not touch the registry or the ledger again.
fn checkpoint(cancel: &CancellationToken) -> Result<(), TaskError> {
    if cancel.is_cancelled() {
        Err(TaskError::Cancelled)
    } else {
        Ok(())
    }
}

async fn worker_loop(
    worker: Arc<Worker>,
    config: WorkQueueConfig,
    mut rx: mpsc::UnboundedReceiver<ClassificationTask>,
    stats: SharedStats,
    shutdown: Arc<Notify>,
) {
    info!(worker = %config.name, timeout = ?config.task_timeout, "work queue started");

    loop {
        let task = tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            task = rx.recv() => match task {
                Some(task) => task,
                None => break,
            },
        };

        let job_id = task.job_id;
        update_stats(&stats, |s| s.running = Some(job_id));

        let run = tokio::spawn({
            let worker = worker.clone();
            let timeout = config.task_timeout;
            async move { worker.execute(task, timeout).await }
        });
        let outcome = match run.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(job_id = %job_id, error = %e, "job error");
                TaskOutcome::Failed
            }
        };

        update_stats(&stats, |s| {
            s.running = None;
            match outcome {
                TaskOutcome::Succeeded => s.succeeded += 1,
                TaskOutcome::Failed => s.failed += 1,
                TaskOutcome::TimedOut => s.timed_out += 1,
            }
        });
    }

    rx.close();
    info!(worker = %config.name, "work queue stopped");
}
