//! searchvol - Batch keyword search-volume lookups
//!
//! Looks up monthly PC and mobile search volumes for lists of keywords
//! through a signed keyword tool API, optionally expanding each keyword
//! with the volumes of its related terms. Lookups run as background jobs
//! that can be polled for progress and exported once complete.
//!
//! # Architecture
//!
//! - [`config`] - Configuration from TOML files and environment variables
//! - [`client`] - Signed keyword tool client with zero-volume fallback
//! - [`cache`] - Process-wide memo of successful lookups
//! - [`scheduler`] - Paced, bounded, order-preserving fan-out
//! - [`jobs`] - Job store and background runner
//! - [`export`] - Flat CSV and JSON views of job results
//! - [`server`] - HTTP API over the job runner
//! - [`metrics`] - Prometheus counters and histograms
//! - [`models`] - Core data structures
//! - [`utils`] - Keyword cleanup helpers and domain errors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use searchvol::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let client = VolumeClient::new(&config.api, Arc::new(VolumeCache::new()))?;
//!     let runner = JobRunner::with_lookup(Arc::new(client), SchedulerConfig::from(&config.lookup));
//!
//!     let id = runner.submit(["dune", "emma"], LookupOptions::default());
//!     runner.wait(&id).await?;
//!     for volume in runner.results(&id)? {
//!         println!("{}: {}", volume.keyword(), volume.total());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod jobs;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod server;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::VolumeCache;
    pub use crate::client::{Lookup, Source, VolumeClient, VolumeLookup};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::jobs::{JobRunner, JobStore};
    pub use crate::models::{JobId, JobStatus, JobStatusView, KeywordVolume, LookupOptions};
    pub use crate::scheduler::{BatchScheduler, SchedulerConfig};
}

pub use models::{JobId, JobStatus, KeywordVolume, LookupOptions};
