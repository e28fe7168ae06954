//! Core data structures for keyword volume lookups and jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Keyword Volume
// ============================================================================

/// Monthly search volume for one keyword
///
/// `total` is always `pc + mobile`; the fields are private so the only way
/// to build a value is through the constructors that compute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordVolume {
    keyword: String,
    pc: u64,
    mobile: u64,
    total: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    related: Vec<KeywordVolume>,
}

impl KeywordVolume {
    /// Create a volume entry from normalized counts
    pub fn new(keyword: impl Into<String>, pc: u64, mobile: u64) -> Self {
        Self {
            keyword: keyword.into(),
            pc,
            mobile,
            total: pc.saturating_add(mobile),
            related: Vec::new(),
        }
    }

    /// Zero-valued entry used when a lookup yields no data
    pub fn zero(keyword: impl Into<String>) -> Self {
        Self::new(keyword, 0, 0)
    }

    /// Attach related-term volumes
    #[must_use]
    pub fn with_related(mut self, related: Vec<KeywordVolume>) -> Self {
        self.related = related;
        self
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn pc(&self) -> u64 {
        self.pc
    }

    pub fn mobile(&self) -> u64 {
        self.mobile
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Related-term volumes, empty unless related expansion ran
    pub fn related(&self) -> &[KeywordVolume] {
        &self.related
    }

    /// True when both counts are zero
    pub fn is_zero(&self) -> bool {
        self.total == 0
    }
}

// ============================================================================
// Jobs
// ============================================================================

/// Opaque job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id received from a client
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Completed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// Per-submission options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOptions {
    /// Fetch volumes for each keyword's related terms as well
    #[serde(default)]
    pub include_related: bool,
}

impl LookupOptions {
    pub fn with_related() -> Self {
        Self {
            include_related: true,
        }
    }
}

/// One submitted batch of keywords
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    /// Percentage of keywords finished, 0-100
    pub progress: u8,
    /// Number of keywords finished
    pub completed: usize,
    /// Number of keywords scheduled (empty inputs excluded)
    pub total: usize,
    pub include_related: bool,
    /// Ordered results, filled only once the job completes
    pub results: Vec<KeywordVolume>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a running job with no progress
    pub fn new(id: JobId, total: usize, options: LookupOptions) -> Self {
        Self {
            id,
            status: JobStatus::Running,
            progress: 0,
            completed: 0,
            total,
            include_related: options.include_related,
            results: Vec::new(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    /// Status view without the result payload
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id,
            status: self.status,
            progress: self.progress,
            completed: self.completed,
            total: self.total,
        }
    }
}

/// Cheap status projection of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub completed: usize,
    pub total: usize,
}

/// Integer percentage of `completed` over `total`, floored
///
/// An empty batch counts as fully done.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let pct = completed.min(total) * 100 / total;
    pct as u8
}
