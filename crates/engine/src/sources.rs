//! Abstract contracts for the three data collaborators. The aggregator
//! depends only on these traits; concrete backends live in `suggest-store`
//! and are passed in explicitly, never reached through globals.

use async_trait::async_trait;
use std::collections::HashMap;
use suggest_core::types::{ItemId, ProductAttributes, SimilarityMatch, UserId};
use suggest_core::SuggestResult;

/// Recent-interaction source. Returns the user's most recently interacted
/// item ids, newest first, deduplicated by the caller.
#[async_trait]
pub trait InteractionHistory: Send + Sync {
    async fn recent_items(&self, user_id: UserId, limit: usize) -> SuggestResult<Vec<ItemId>>;
}

/// Nearest-neighbor index. Returns up to `top_k` scored candidates for one
/// item. Implementations propagate backend errors; the degrade-to-empty
/// policy belongs to the aggregator.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn query(&self, item_id: &ItemId, top_k: usize) -> SuggestResult<Vec<SimilarityMatch>>;
}

/// Batched catalog resolution. Ids absent from the returned map did not
/// resolve (stale or deleted) and are dropped by the caller.
#[async_trait]
pub trait CatalogLookup: Send + Sync {
    async fn fetch(
        &self,
        item_ids: &[ItemId],
    ) -> SuggestResult<HashMap<ItemId, ProductAttributes>>;
}

/// Which collaborators failed (or timed out) while building a response.
/// Distinguishes "empty because the call failed" from a genuine cold
/// start, so degraded responses are observable as such.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DegradedSources {
    pub history_failed: bool,
    pub similarity_failures: usize,
    pub catalog_failed: bool,
}

impl DegradedSources {
    pub fn is_degraded(&self) -> bool {
        self.history_failed || self.similarity_failures > 0 || self.catalog_failed
    }
}
