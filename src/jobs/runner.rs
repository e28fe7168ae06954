//! Background job execution
//!
//! [`JobRunner::submit`] registers a job and returns its id at once; the
//! lookups run on a spawned task that reports progress through the job's
//! [`JobHandle`] and completes it with the ordered results.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::client::{Lookup, VolumeLookup};
use crate::metrics;
use crate::models::{JobId, JobStatusView, KeywordVolume, LookupOptions};
use crate::scheduler::{BatchProgress, BatchScheduler, SchedulerConfig};
use crate::utils::clean_keywords;
use crate::utils::error::JobError;

use super::store::{JobHandle, JobStore};

/// Submits jobs and owns their background tasks
pub struct JobRunner {
    store: Arc<JobStore>,
    scheduler: BatchScheduler,
    tasks: Mutex<HashMap<JobId, JoinHandle<()>>>,
}

impl JobRunner {
    pub fn new(store: Arc<JobStore>, scheduler: BatchScheduler) -> Self {
        Self {
            store,
            scheduler,
            tasks: Mutex::new(HashMap::new()),
        }
    }

    /// Runner with a fresh store
    pub fn with_lookup(lookup: Arc<dyn VolumeLookup>, config: SchedulerConfig) -> Self {
        Self::new(
            Arc::new(JobStore::new()),
            BatchScheduler::new(lookup, config),
        )
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Create a job for `keywords` and start it in the background
    ///
    /// Keywords are trimmed and empty ones dropped; an empty list yields a
    /// job that completes immediately with no results. Must be called from
    /// within a Tokio runtime.
    pub fn submit<I, S>(&self, keywords: I, options: LookupOptions) -> JobId
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = clean_keywords(keywords);
        let total = keywords.len();
        let handle = self.store.create(total, options);
        let id = handle.id();

        metrics::record_job_submitted(total);
        tracing::info!(
            job_id = %id,
            keywords = total,
            include_related = options.include_related,
            "Job submitted"
        );

        let scheduler = self.scheduler.clone();
        let task = tokio::spawn(async move {
            let results = execute(&scheduler, keywords, options, &handle).await;
            handle.complete(results);
            metrics::record_job_completed();
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|_, task| !task.is_finished());
        tasks.insert(id, task);

        id
    }

    pub fn status(&self, id: &JobId) -> Result<JobStatusView, JobError> {
        self.store.status(id)
    }

    pub fn results(&self, id: &JobId) -> Result<Vec<KeywordVolume>, JobError> {
        self.store.results(id)
    }

    /// Wait for one job's task to finish and return its final status
    pub async fn wait(&self, id: &JobId) -> Result<JobStatusView, JobError> {
        let task = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);

        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!(job_id = %id, error = %e, "Job task failed");
            }
        }

        self.store.status(id)
    }

    /// Wait for every outstanding job
    pub async fn shutdown(&self) {
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        if !tasks.is_empty() {
            tracing::info!(jobs = tasks.len(), "Waiting for running jobs");
        }

        for (id, task) in tasks {
            if let Err(e) = task.await {
                tracing::error!(job_id = %id, error = %e, "Job task failed");
            }
        }
    }
}

/// Run every lookup for one job, ticking its progress
async fn execute(
    scheduler: &BatchScheduler,
    keywords: Vec<String>,
    options: LookupOptions,
    handle: &JobHandle,
) -> Vec<KeywordVolume> {
    let on_progress = |p: BatchProgress| handle.set_progress(p.completed, p.total);

    if !options.include_related {
        return scheduler
            .run(keywords, on_progress)
            .await
            .into_iter()
            .map(Lookup::into_volume)
            .collect();
    }

    scheduler.run_related(keywords, on_progress).await
}
