//! Keyword tool API client
//!
//! [`VolumeClient`] issues one signed `GET /keywordstool` per keyword and
//! turns the response into a [`KeywordVolume`]. Lookups never fail: any
//! transport, status or decoding problem yields a zero-valued result tagged
//! [`Source::Fallback`], which is logged but never cached.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use searchvol::cache::VolumeCache;
//! use searchvol::client::{VolumeClient, VolumeLookup};
//! use searchvol::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let client = VolumeClient::new(&config.api, Arc::new(VolumeCache::new()))?;
//! let volume = client.fetch("dune").await;
//! println!("{} → {}", volume.keyword(), volume.total());
//! # Ok(())
//! # }
//! ```

pub mod response;
pub mod signer;

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client,
};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::cache::{CachedLookup, VolumeCache};
use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::KeywordVolume;
use crate::utils::error::FetchError;

pub use response::{normalize, parse_count, KeywordToolResponse, MAX_RELATED_TERMS};
pub use signer::Signer;

/// Path of the keyword tool endpoint, also the signed URI
pub const KEYWORD_TOOL_PATH: &str = "/keywordstool";

const HEADER_TIMESTAMP: HeaderName = HeaderName::from_static("x-timestamp");
const HEADER_API_KEY: HeaderName = HeaderName::from_static("x-api-key");
const HEADER_CUSTOMER: HeaderName = HeaderName::from_static("x-customer");
const HEADER_SIGNATURE: HeaderName = HeaderName::from_static("x-signature");

// ============================================================================
// Lookup outcome
// ============================================================================

/// Where a lookup's volume came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Fresh answer from the API
    Api,
    /// Served from the process cache
    Cache,
    /// The lookup failed; the volume is zero
    Fallback { kind: &'static str, reason: String },
}

/// Result of looking up one keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub volume: KeywordVolume,
    /// Related terms reported by the API, at most [`MAX_RELATED_TERMS`]
    pub related_terms: Vec<String>,
    pub source: Source,
}

impl Lookup {
    /// Zero-valued lookup for a failed keyword
    pub fn fallback(keyword: &str, error: &FetchError) -> Self {
        Self {
            volume: KeywordVolume::zero(keyword),
            related_terms: Vec::new(),
            source: Source::Fallback {
                kind: error.kind(),
                reason: error.to_string(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.source, Source::Fallback { .. })
    }

    pub fn into_volume(self) -> KeywordVolume {
        self.volume
    }
}

/// Anything that can resolve a keyword to its volume
///
/// Implementations must not fail: problems are reported through
/// [`Source::Fallback`].
#[async_trait]
pub trait VolumeLookup: Send + Sync {
    /// Look up one keyword
    async fn lookup(&self, keyword: &str) -> Lookup;

    /// Look up one keyword, discarding the outcome tag and related terms
    async fn fetch(&self, keyword: &str) -> KeywordVolume {
        self.lookup(keyword).await.into_volume()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Signed, cached client for the keyword tool API
pub struct VolumeClient {
    /// HTTP client with configured timeout
    client: Client,

    signer: Signer,

    access_key: HeaderValue,

    customer_id: HeaderValue,

    /// Full endpoint URL
    endpoint: String,

    cache: Arc<VolumeCache>,

    /// Per-keyword locks so concurrent misses for one keyword issue one request
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,

    /// Optional process-wide request rate cap
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl VolumeClient {
    /// Create a client from API configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when credentials are missing or unusable and
    /// `Error::Http` if the HTTP client cannot be built.
    pub fn new(api: &ApiConfig, cache: Arc<VolumeCache>) -> Result<Self> {
        let signer = Signer::new(&api.secret_key)?;

        if api.access_key.is_empty() {
            return Err(Error::config("access key is empty"));
        }
        if api.customer_id.is_empty() {
            return Err(Error::config("customer id is empty"));
        }
        let access_key = HeaderValue::from_str(&api.access_key)
            .map_err(|e| Error::config(format!("access key is not a valid header: {e}")))?;
        let customer_id = HeaderValue::from_str(&api.customer_id)
            .map_err(|e| Error::config(format!("customer id is not a valid header: {e}")))?;

        let base = url::Url::parse(&api.base_url)
            .map_err(|e| Error::config(format!("invalid base url {}: {e}", api.base_url)))?;
        let endpoint = format!(
            "{}{}",
            base.as_str().trim_end_matches('/'),
            KEYWORD_TOOL_PATH
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        let rate_limiter = api
            .rate_limit
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));

        Ok(Self {
            client,
            signer,
            access_key,
            customer_id,
            endpoint,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            rate_limiter,
        })
    }

    /// Shared cache backing this client
    pub fn cache(&self) -> &Arc<VolumeCache> {
        &self.cache
    }

    /// Endpoint URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn cached(&self, keyword: &str) -> Option<Lookup> {
        let hit = self.cache.get(keyword)?;
        metrics::record_lookup("cache");
        Some(Lookup {
            volume: hit.volume,
            related_terms: hit.related_terms,
            source: Source::Cache,
        })
    }

    fn keyword_lock(&self, keyword: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(in_flight.entry(keyword.to_string()).or_default())
    }

    fn release_keyword(&self, keyword: &str) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(keyword);
    }

    /// Issue one signed request and decode the body
    async fn request(&self, keyword: &str) -> std::result::Result<KeywordToolResponse, FetchError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let headers = self.build_headers(timestamp)?;

        let _timer = metrics::start_api_timer();
        let response = self
            .client
            .get(&self.endpoint)
            .headers(headers)
            .query(&[("hintKeywords", keyword), ("showDetail", "1")])
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        let body = response.text().await.map_err(classify)?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    /// Build the signed header set for one request
    fn build_headers(&self, timestamp: i64) -> std::result::Result<HeaderMap, FetchError> {
        let signature = self.signer.sign(timestamp, "GET", KEYWORD_TOOL_PATH);

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(HEADER_TIMESTAMP, HeaderValue::from(timestamp));
        headers.insert(HEADER_API_KEY, self.access_key.clone());
        headers.insert(HEADER_CUSTOMER, self.customer_id.clone());
        headers.insert(
            HEADER_SIGNATURE,
            HeaderValue::from_str(&signature)
                .map_err(|e| FetchError::InvalidHeader(e.to_string()))?,
        );

        Ok(headers)
    }
}

/// Map transport errors, separating timeouts
fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(err)
    }
}

#[async_trait]
impl VolumeLookup for VolumeClient {
    async fn lookup(&self, keyword: &str) -> Lookup {
        if let Some(hit) = self.cached(keyword) {
            return hit;
        }

        // Whoever holds the keyword lock fetches; the rest find it cached
        let lock = self.keyword_lock(keyword);
        let _guard = lock.lock().await;
        if let Some(hit) = self.cached(keyword) {
            return hit;
        }

        let outcome = match self.request(keyword).await {
            Ok(body) => normalize(keyword, body),
            Err(e) => Err(e),
        };

        let lookup = match outcome {
            Ok(normalized) => {
                tracing::debug!(
                    keyword,
                    pc = normalized.volume.pc(),
                    mobile = normalized.volume.mobile(),
                    related = normalized.related_terms.len(),
                    "Keyword volume fetched"
                );
                metrics::record_lookup("api");
                self.cache.insert(
                    keyword,
                    CachedLookup::new(
                        normalized.volume.clone(),
                        normalized.related_terms.clone(),
                    ),
                );
                Lookup {
                    volume: normalized.volume,
                    related_terms: normalized.related_terms,
                    source: Source::Api,
                }
            }
            Err(e) => {
                tracing::warn!(
                    keyword,
                    kind = e.kind(),
                    error = %e,
                    "Keyword lookup failed, using zero volume"
                );
                metrics::record_fallback(e.kind());
                Lookup::fallback(keyword, &e)
            }
        };

        self.release_keyword(keyword);
        lookup
    }
}
