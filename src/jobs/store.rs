//! In-memory job store
//!
//! Jobs live for the life of the process. Reads are open to anyone holding
//! the store; writes go through the single [`JobHandle`] returned by
//! [`JobStore::create`], and [`JobHandle::complete`] consumes that handle so
//! a job's terminal state is written exactly once.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::models::{percent, Job, JobId, JobStatus, JobStatusView, KeywordVolume, LookupOptions};
use crate::utils::error::JobError;

// ============================================================================
// Store
// ============================================================================

/// Shared map of job id → job
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running job and hand out its only writer
    pub fn create(self: &Arc<Self>, total: usize, options: LookupOptions) -> JobHandle {
        let id = JobId::new();
        self.write().insert(id, Job::new(id, total, options));

        tracing::debug!(job_id = %id, total, "Job created");

        JobHandle {
            id,
            store: Arc::clone(self),
        }
    }

    /// Full snapshot of a job
    pub fn get(&self, id: &JobId) -> Result<Job, JobError> {
        self.read()
            .get(id)
            .cloned()
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Status without the result payload
    pub fn status(&self, id: &JobId) -> Result<JobStatusView, JobError> {
        self.read()
            .get(id)
            .map(Job::status_view)
            .ok_or_else(|| JobError::NotFound(id.to_string()))
    }

    /// Ordered results of a completed job
    pub fn results(&self, id: &JobId) -> Result<Vec<KeywordVolume>, JobError> {
        let jobs = self.read();
        let job = jobs
            .get(id)
            .ok_or_else(|| JobError::NotFound(id.to_string()))?;

        if !job.is_completed() {
            return Err(JobError::NotCompleted(id.to_string()));
        }
        Ok(job.results.clone())
    }

    /// Number of jobs ever created
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of jobs still running
    pub fn running(&self) -> usize {
        self.read()
            .values()
            .filter(|job| job.status == JobStatus::Running)
            .count()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Exclusive write access to one job
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    store: Arc<JobStore>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Record progress; never moves backwards
    pub fn set_progress(&self, completed: usize, total: usize) {
        let mut jobs = self.store.write();
        let Some(job) = jobs.get_mut(&self.id) else {
            return;
        };
        if job.is_completed() {
            return;
        }

        job.completed = job.completed.max(completed.min(job.total));
        job.progress = job.progress.max(percent(completed, total));
    }

    /// Store the final results and mark the job completed
    pub fn complete(self, results: Vec<KeywordVolume>) {
        let mut jobs = self.store.write();
        let Some(job) = jobs.get_mut(&self.id) else {
            return;
        };

        job.completed = job.total;
        job.progress = 100;
        job.results = results;
        job.status = JobStatus::Completed;
        job.completed_at = Some(Utc::now());

        tracing::info!(
            job_id = %self.id,
            results = job.results.len(),
            "Job completed"
        );
    }
}
