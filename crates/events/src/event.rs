use serde::Serialize;

use autocat_core::Job;

/// Name of the snapshot message sent to a push-channel observer on connect.
pub const JOBS_SNAPSHOT_EVENT: &str = "jobs";

/// Kind of job lifecycle event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    /// A job was accepted and queued.
    Created,
    /// A job changed status or received new data.
    Updated,
}

impl JobEventKind {
    /// Wire name used on the push channel.
    pub fn name(&self) -> &'static str {
        match self {
            JobEventKind::Created => "job created",
            JobEventKind::Updated => "job updated",
        }
    }
}

impl core::fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// A job lifecycle event.
///
/// Carries the affected job and the ordered list of all known jobs as of the
/// moment the event was produced. Only `job` and `jobs` go over the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEvent {
    #[serde(skip)]
    pub kind: JobEventKind,
    pub job: Job,
    pub jobs: Vec<Job>,
}

impl JobEvent {
    pub fn created(job: Job, jobs: Vec<Job>) -> Self {
        Self {
            kind: JobEventKind::Created,
            job,
            jobs,
        }
    }

    pub fn updated(job: Job, jobs: Vec<Job>) -> Self {
        Self {
            kind: JobEventKind::Updated,
            job,
            jobs,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autocat_core::JobData;

    #[test]
    fn wire_shape_is_job_and_jobs() {
        let job = Job::new(JobData::new("Shop", "Groceries"));
        let event = JobEvent::created(job.clone(), vec![job.clone()]);

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["job"]["id"], job.id.to_string());
        assert_eq!(value["jobs"].as_array().unwrap().len(), 1);
        assert!(value.get("kind").is_none());
        assert_eq!(event.name(), "job created");
    }
}
