//! Recent-interaction reads from the ClickHouse event store.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use suggest_core::config::ClickHouseConfig;
use suggest_core::types::{ItemId, UserId};
use suggest_core::{SuggestError, SuggestResult};
use suggest_engine::InteractionHistory;
use tracing::{debug, info};

#[derive(Debug, Deserialize, clickhouse::Row)]
struct InteractionRow {
    product_id: String,
}

/// Reads the `user_interactions` event table. Interactions are written by
/// the ingestion pipeline; this adapter is read-only.
pub struct ClickHouseHistory {
    client: clickhouse::Client,
}

impl ClickHouseHistory {
    pub fn new(config: &ClickHouseConfig) -> Self {
        info!(url = %config.url, database = %config.database, "Connecting to ClickHouse");
        let client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        Self { client }
    }

    /// Round-trip a trivial query to confirm the backend is reachable.
    pub async fn healthcheck(&self) -> SuggestResult<()> {
        self.client
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .map_err(|e| SuggestError::History(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl InteractionHistory for ClickHouseHistory {
    async fn recent_items(&self, user_id: UserId, limit: usize) -> SuggestResult<Vec<ItemId>> {
        let rows: Vec<InteractionRow> = self
            .client
            .query(
                "SELECT product_id FROM user_interactions \
                 WHERE user_id = ? ORDER BY timestamp DESC LIMIT ?",
            )
            .bind(user_id.0)
            .bind(limit as u64)
            .fetch_all()
            .await
            .map_err(|e| SuggestError::History(e.to_string()))?;

        metrics::counter!("store.history.queries").increment(1);
        let items = dedup_preserving_order(rows.into_iter().map(|r| ItemId(r.product_id)));
        debug!(user_id = %user_id, seeds = items.len(), "Fetched recent interactions");
        Ok(items)
    }
}

/// Collapse repeat interactions with the same item to one seed, keeping
/// the most-recent-first ordering of the query.
fn dedup_preserving_order(items: impl Iterator<Item = ItemId>) -> Vec<ItemId> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let items = ["7", "5", "7", "3", "5"].iter().map(|s| ItemId::from(*s));
        let deduped = dedup_preserving_order(items);
        let ids: Vec<&str> = deduped.iter().map(|i| i.as_str()).collect();
        assert_eq!(ids, vec!["7", "5", "3"]);
    }

    #[test]
    fn dedup_of_unique_input_is_identity() {
        let items = ["1", "2", "3"].iter().map(|s| ItemId::from(*s));
        assert_eq!(dedup_preserving_order(items).len(), 3);
    }
}
