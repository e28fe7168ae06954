//! Paced, bounded fan-out of keyword lookups
//!
//! # Overview
//!
//! [`BatchScheduler`] takes an ordered keyword list and runs one lookup per
//! keyword. Keywords are split into batches of `batch_size`; at most
//! `concurrency` lookups are in flight at once, and the scheduler sleeps for
//! `pacing_delay` between batches to stay friendly with the upstream quota.
//!
//! ```text
//!   keywords ──► trim/drop empty ──► chunks(batch_size)
//!                                          │
//!            ┌─────────────────────────────┼──────────────────────┐
//!            ▼                             ▼                      ▼
//!      ┌───────────┐  pacing_delay   ┌───────────┐  pacing   ┌───────────┐
//!      │  batch 0  │ ──────────────► │  batch 1  │ ────────► │  batch n  │
//!      │ JoinSet + │                 │ JoinSet + │           │ JoinSet + │
//!      │ Semaphore │                 │ Semaphore │           │ Semaphore │
//!      └─────┬─────┘                 └─────┬─────┘           └─────┬─────┘
//!            └──────────────┬──────────────┴───────────────────────┘
//!                           ▼
//!              results[index] (submission order)
//! ```
//!
//! Results land in a pre-sized buffer at the index of their keyword, so
//! output order always matches input order regardless of completion order.
//! A task that panics yields a zero result at its own index.
//!
//! In related mode ([`BatchScheduler::run_related`]) every primary lookup
//! and every lookup of its related terms draws from one permit pool, so a
//! job never has more than `concurrency` lookups in flight.
//!
//! # Modules
//!
//! - [`expander`] - Second-round lookups over each keyword's related terms

pub mod expander;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::client::{Lookup, Source, VolumeLookup};
use crate::config::LookupConfig;
use crate::metrics;
use crate::models::{percent, KeywordVolume};
use crate::utils::clean_keywords;

pub use expander::RelatedExpander;

/// Scheduler tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum lookups in flight for one run
    pub concurrency: usize,
    /// Keywords per batch
    pub batch_size: usize,
    /// Pause between consecutive batches
    pub pacing_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&LookupConfig::default())
    }
}

impl From<&LookupConfig> for SchedulerConfig {
    fn from(config: &LookupConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            batch_size: config.batch_size,
            pacing_delay: config.pacing_delay(),
        }
    }
}

/// Progress snapshot reported after every finished keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

impl BatchProgress {
    /// Floored completion percentage
    pub fn percent(&self) -> u8 {
        percent(self.completed, self.total)
    }
}

/// Result types that can stand in for a keyword whose task died
pub trait Fallback: Sized {
    fn on_failure(keyword: &str, reason: String) -> Self;
}

impl Fallback for Lookup {
    fn on_failure(keyword: &str, reason: String) -> Self {
        Self {
            volume: KeywordVolume::zero(keyword),
            related_terms: Vec::new(),
            source: Source::Fallback {
                kind: "task",
                reason,
            },
        }
    }
}

impl Fallback for KeywordVolume {
    fn on_failure(keyword: &str, _reason: String) -> Self {
        KeywordVolume::zero(keyword)
    }
}

/// Take a permit from `permits`, or a fallback naming `keyword` when the
/// pool has been closed
async fn acquire<T: Fallback>(
    permits: Arc<Semaphore>,
    keyword: &str,
) -> Result<OwnedSemaphorePermit, T> {
    permits.acquire_owned().await.map_err(|_| {
        tracing::warn!(keyword, "Lookup pool closed, using zero volume");
        metrics::record_fallback("task");
        T::on_failure(keyword, "lookup pool closed".to_string())
    })
}

/// Bounded, paced, order-preserving keyword fan-out
#[derive(Clone)]
pub struct BatchScheduler {
    lookup: Arc<dyn VolumeLookup>,
    config: SchedulerConfig,
    /// Pool shared across runs; `None` gives every run its own
    permits: Option<Arc<Semaphore>>,
}

impl BatchScheduler {
    pub fn new(lookup: Arc<dyn VolumeLookup>, config: SchedulerConfig) -> Self {
        Self {
            lookup,
            config,
            permits: None,
        }
    }

    /// Same scheduler, but every run draws from `permits`
    pub fn with_permits(&self, permits: Arc<Semaphore>) -> Self {
        Self {
            permits: Some(permits),
            ..self.clone()
        }
    }

    fn permits(&self) -> Arc<Semaphore> {
        self.permits
            .clone()
            .unwrap_or_else(|| Arc::new(Semaphore::new(self.config.concurrency.max(1))))
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Look up every keyword, returning one [`Lookup`] per non-empty input
    pub async fn run<I, S, P>(&self, keywords: I, on_progress: P) -> Vec<Lookup>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: FnMut(BatchProgress) + Send,
    {
        let lookup = Arc::clone(&self.lookup);
        self.run_with(
            keywords,
            move |keyword| {
                let lookup = Arc::clone(&lookup);
                async move { lookup.lookup(&keyword).await }
            },
            on_progress,
        )
        .await
    }

    /// Look up every keyword and nest the volumes of its related terms
    ///
    /// Primary and related lookups share one pool of `concurrency` permits.
    /// A primary keyword holds a permit only while its own lookup runs, so
    /// its expansion can proceed without starving other keywords.
    pub async fn run_related<I, S, P>(&self, keywords: I, on_progress: P) -> Vec<KeywordVolume>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        P: FnMut(BatchProgress) + Send,
    {
        let permits = self.permits();
        let expander = RelatedExpander::new(self.with_permits(Arc::clone(&permits)));
        let lookup = Arc::clone(&self.lookup);

        self.fan_out(
            keywords,
            move |keyword| {
                let lookup = Arc::clone(&lookup);
                let expander = expander.clone();
                let permits = Arc::clone(&permits);
                async move {
                    let primary = match acquire::<Lookup>(permits, &keyword).await {
                        Ok(_permit) => lookup.lookup(&keyword).await,
                        Err(fallback) => fallback,
                    };
                    expander.expand(primary).await
                }
            },
            on_progress,
            None,
        )
        .await
    }

    /// Run `work` for every keyword under this scheduler's batching rules
    ///
    /// Keywords are trimmed and empty ones dropped before scheduling; the
    /// output holds one value per remaining keyword, in input order.
    pub async fn run_with<I, S, T, W, Fut, P>(
        &self,
        keywords: I,
        work: W,
        on_progress: P,
    ) -> Vec<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: Fallback + Send + 'static,
        W: Fn(String) -> Fut + Send,
        Fut: Future<Output = T> + Send + 'static,
        P: FnMut(BatchProgress) + Send,
    {
        let permits = self.permits();
        self.fan_out(keywords, work, on_progress, Some(permits)).await
    }

    /// Batched, paced fan-out; with `permits` each task holds one for its
    /// whole run
    async fn fan_out<I, S, T, W, Fut, P>(
        &self,
        keywords: I,
        work: W,
        mut on_progress: P,
        permits: Option<Arc<Semaphore>>,
    ) -> Vec<T>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        T: Fallback + Send + 'static,
        W: Fn(String) -> Fut + Send,
        Fut: Future<Output = T> + Send + 'static,
        P: FnMut(BatchProgress) + Send,
    {
        let keywords = clean_keywords(keywords);
        let total = keywords.len();
        if total == 0 {
            return Vec::new();
        }

        let batch_size = self.config.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);

        let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut completed = 0;

        tracing::debug!(total, batch_size, batch_count, "Scheduling keyword lookups");

        for (batch_no, chunk) in keywords.chunks(batch_size).enumerate() {
            let offset = batch_no * batch_size;
            let mut tasks = JoinSet::new();
            let mut index_of = HashMap::with_capacity(chunk.len());

            for (i, keyword) in chunk.iter().enumerate() {
                let permits = permits.clone();
                let keyword = keyword.clone();
                let task = work(keyword.clone());
                let handle = tasks.spawn(async move {
                    let _permit = match permits {
                        Some(permits) => match acquire::<T>(permits, &keyword).await {
                            Ok(permit) => Some(permit),
                            Err(fallback) => return fallback,
                        },
                        None => None,
                    };
                    task.await
                });
                index_of.insert(handle.id(), offset + i);
            }

            while let Some(joined) = tasks.join_next_with_id().await {
                let (id, value) = match joined {
                    Ok((id, value)) => (id, value),
                    Err(err) => {
                        let id = err.id();
                        let keyword = index_of
                            .get(&id)
                            .map(|&index| keywords[index].as_str())
                            .unwrap_or_default();
                        tracing::error!(
                            keyword,
                            error = %err,
                            "Lookup task failed, using zero volume"
                        );
                        metrics::record_fallback("task");
                        (id, T::on_failure(keyword, err.to_string()))
                    }
                };

                let Some(&index) = index_of.get(&id) else {
                    continue;
                };
                slots[index] = Some(value);
                completed += 1;
                on_progress(BatchProgress { completed, total });
            }

            if batch_no + 1 < batch_count && !self.config.pacing_delay.is_zero() {
                tracing::trace!(
                    batch = batch_no,
                    delay_ms = self.config.pacing_delay.as_millis() as u64,
                    "Pacing before next batch"
                );
                tokio::time::sleep(self.config.pacing_delay).await;
            }
        }

        slots
            .into_iter()
            .zip(&keywords)
            .map(|(slot, keyword)| {
                slot.unwrap_or_else(|| T::on_failure(keyword, "no result recorded".into()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Returns `len(keyword)` as both counts after a keyword-dependent delay
    struct SlowLookup {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowLookup {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VolumeLookup for SlowLookup {
        async fn lookup(&self, keyword: &str) -> Lookup {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            // Later keywords finish first
            let delay = 30u64.saturating_sub(keyword.len() as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let n = keyword.len() as u64;
            Lookup {
                volume: KeywordVolume::new(keyword, n, n),
                related_terms: Vec::new(),
                source: Source::Api,
            }
        }
    }

    fn config(concurrency: usize, batch_size: usize, pacing_ms: u64) -> SchedulerConfig {
        SchedulerConfig {
            concurrency,
            batch_size,
            pacing_delay: Duration::from_millis(pacing_ms),
        }
    }

    #[tokio::test]
    async fn test_order_preserved() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(4, 3, 0));
        let keywords = ["a", "bb", "ccc", "dddd", "eeeee"];

        let results = scheduler.run(keywords, |_| {}).await;

        let order: Vec<_> = results.iter().map(|r| r.volume.keyword()).collect();
        assert_eq!(order, keywords);
        assert_eq!(results[2].volume.total(), 6);
    }

    #[tokio::test]
    async fn test_empty_keywords_dropped() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(2, 2, 0));
        let mut ticks = 0;

        let results = scheduler
            .run(["  dune ", "", "   ", "dune"], |_| ticks += 1)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.volume.keyword() == "dune"));
        assert_eq!(ticks, 2);
    }

    #[tokio::test]
    async fn test_empty_input_no_progress() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(2, 2, 0));
        let mut ticks = 0;

        let results = scheduler.run(Vec::<String>::new(), |_| ticks += 1).await;

        assert!(results.is_empty());
        assert_eq!(ticks, 0);
    }

    #[tokio::test]
    async fn test_progress_monotonic_and_complete() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(3, 2, 0));
        let seen = Mutex::new(Vec::new());

        scheduler
            .run(["a", "b", "c", "d", "e"], |p| seen.lock().unwrap().push(p))
            .await;

        let seen = seen.into_inner().unwrap();
        assert_eq!(seen.len(), 5);
        assert!(seen.windows(2).all(|w| w[0].completed < w[1].completed));
        assert_eq!(seen.last().unwrap().percent(), 100);
        assert!(seen.iter().all(|p| p.total == 5));
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let lookup = Arc::new(SlowLookup::new());
        let scheduler = BatchScheduler::new(lookup.clone(), config(2, 10, 0));

        scheduler.run(["a", "b", "c", "d", "e", "f"], |_| {}).await;

        assert!(lookup.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pacing_between_batches_only() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(5, 2, 1_000));
        let started = tokio::time::Instant::now();

        // Three batches → two pauses
        scheduler.run(["a", "b", "c", "d", "e"], |_| {}).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(2_000));
        assert!(elapsed < Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn test_panicking_task_falls_back_in_place() {
        let scheduler = BatchScheduler::new(Arc::new(SlowLookup::new()), config(2, 10, 0));

        let results: Vec<KeywordVolume> = scheduler
            .run_with(
                ["ok", "boom", "fine"],
                |keyword| async move {
                    if keyword == "boom" {
                        panic!("worker exploded");
                    }
                    KeywordVolume::new(keyword, 1, 1)
                },
                |_| {},
            )
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].total(), 2);
        assert_eq!(results[1], KeywordVolume::zero("boom"));
        assert_eq!(results[2].keyword(), "fine");
    }

    #[tokio::test]
    async fn test_closed_pool_falls_back() {
        let lookup = Arc::new(SlowLookup::new());
        let permits = Arc::new(Semaphore::new(2));
        permits.close();
        let scheduler =
            BatchScheduler::new(lookup.clone(), config(2, 10, 0)).with_permits(permits);

        let results = scheduler.run(["a", "b"], |_| {}).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Lookup::is_fallback));
        assert_eq!(results[1].volume, KeywordVolume::zero("b"));
        assert_eq!(lookup.peak.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shared_permits_bound_across_runs() {
        let lookup = Arc::new(SlowLookup::new());
        let scheduler = BatchScheduler::new(lookup.clone(), config(3, 10, 0))
            .with_permits(Arc::new(Semaphore::new(1)));

        tokio::join!(
            scheduler.run(["a", "b"], |_| {}),
            scheduler.run(["c", "d"], |_| {}),
        );

        assert_eq!(lookup.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_config_from_lookup_config() {
        let config = SchedulerConfig::from(&LookupConfig {
            concurrency: 3,
            batch_size: 7,
            pacing_delay_ms: 250,
        });
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.pacing_delay, Duration::from_millis(250));
    }
}
