//! In-memory job registry with lifecycle notifications.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use autocat_core::{DomainError, Job, JobData, JobId, JobStatus};
use autocat_events::{JobEvent, JobEventKind, Listeners};

/// Registry error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error(transparent)]
    Transition(#[from] DomainError),
}

#[derive(Debug, Default)]
struct RegistryState {
    jobs: HashMap<JobId, Job>,
    /// Insertion order.
    order: VecDeque<JobId>,
}

impl RegistryState {
    fn snapshot(&self) -> Vec<Job> {
        self.order
            .iter()
            .filter_map(|id| self.jobs.get(id))
            .cloned()
            .collect()
    }

    /// Drop the oldest finished jobs until at most `limit` remain.
    fn evict_finished(&mut self, limit: usize) -> usize {
        let mut evicted = 0;
        while self.order.len() > limit {
            let oldest_finished = self.order.iter().position(|id| {
                self.jobs
                    .get(id)
                    .is_some_and(|job| job.status.is_terminal())
            });
            let Some(pos) = oldest_finished else { break };
            if let Some(id) = self.order.remove(pos) {
                self.jobs.remove(&id);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Owns every job record for the lifetime of the process.
///
/// Mutations and the events they produce are serialized: listeners observe
/// events in exactly the order the mutations happened, each carrying the
/// snapshot taken right after its mutation. Listeners run after the state
/// lock is released, so they may read the registry, but must not mutate it.
#[derive(Debug, Default)]
pub struct JobRegistry {
    state: RwLock<RegistryState>,
    emit_lock: Mutex<()>,
    listeners: Listeners,
    history_limit: Option<usize>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` jobs, evicting the oldest finished ones first.
    ///
    /// Queued and in-progress jobs are never evicted, so the registry may
    /// temporarily hold more than `limit` jobs.
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = Some(limit);
        self
    }

    /// Subscribe to job events of `kind`.
    pub fn on<F>(&self, kind: JobEventKind, listener: F)
    where
        F: Fn(&JobEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.on(kind, listener);
    }

    /// Register a new queued job and announce it.
    pub fn create_job(&self, data: JobData) -> Job {
        let _emit = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let job = Job::new(data);
        let jobs = {
            let mut state = self.write();
            state.jobs.insert(job.id, job.clone());
            state.order.push_back(job.id);
            if let Some(limit) = self.history_limit {
                let evicted = state.evict_finished(limit);
                if evicted > 0 {
                    debug!(evicted, limit, "evicted finished jobs");
                }
            }
            state.snapshot()
        };

        self.listeners.emit(&JobEvent::created(job.clone(), jobs));
        job
    }

    pub fn set_job_in_progress(&self, id: JobId) -> Result<Job, RegistryError> {
        self.mutate(id, |job| job.advance(JobStatus::InProgress).map_err(Into::into))
    }

    pub fn set_job_finished(&self, id: JobId) -> Result<Job, RegistryError> {
        self.mutate(id, |job| job.advance(JobStatus::Finished).map_err(Into::into))
    }

    /// Replace the job's data wholesale.
    pub fn update_job_data(&self, id: JobId, data: JobData) -> Result<Job, RegistryError> {
        self.mutate(id, |job| {
            job.data = data;
            Ok(())
        })
    }

    pub fn get_job(&self, id: JobId) -> Option<Job> {
        self.read().jobs.get(&id).cloned()
    }

    /// All jobs in creation order.
    pub fn jobs(&self) -> Vec<Job> {
        self.read().snapshot()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn mutate<F>(&self, id: JobId, apply: F) -> Result<Job, RegistryError>
    where
        F: FnOnce(&mut Job) -> Result<(), RegistryError>,
    {
        let _emit = self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let (job, jobs) = {
            let mut state = self.write();
            let job = state.jobs.get_mut(&id).ok_or(RegistryError::NotFound(id))?;
            apply(job)?;
            let job = job.clone();
            (job, state.snapshot())
        };

        self.listeners.emit(&JobEvent::updated(job.clone(), jobs));
        Ok(job)
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
