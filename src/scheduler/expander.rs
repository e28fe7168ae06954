//! Related-term expansion
//!
//! Given a primary lookup, fetch every related term it reported and attach
//! the resulting volumes as nested rows. Related rows are never expanded
//! themselves, so one primary keyword costs at most
//! `1 + MAX_RELATED_TERMS` external calls, fewer with cache hits.

use crate::client::Lookup;
use crate::models::KeywordVolume;

use super::BatchScheduler;

/// Second-round lookups over a keyword's related terms
#[derive(Clone)]
pub struct RelatedExpander {
    scheduler: BatchScheduler,
}

impl RelatedExpander {
    pub fn new(scheduler: BatchScheduler) -> Self {
        Self { scheduler }
    }

    /// Primary volume with one nested entry per related term, in the order
    /// the API reported them
    pub async fn expand(&self, primary: Lookup) -> KeywordVolume {
        if primary.related_terms.is_empty() {
            return primary.volume;
        }

        let related: Vec<KeywordVolume> = self
            .scheduler
            .run(&primary.related_terms, |_| {})
            .await
            .into_iter()
            .map(Lookup::into_volume)
            .collect();

        tracing::debug!(
            keyword = primary.volume.keyword(),
            related = related.len(),
            "Related terms expanded"
        );

        primary.volume.with_related(related)
    }
}
