//! Keyword lookup jobs
//!
//! - [`store`] - Process-wide job map and the single-writer [`JobHandle`]
//! - [`runner`] - Spawns and tracks the task behind each submitted job

pub mod runner;
pub mod store;

pub use runner::JobRunner;
pub use store::{JobHandle, JobStore};
