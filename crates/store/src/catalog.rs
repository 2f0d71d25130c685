//! Catalog attribute lookups from Redis. Products are stored as JSON
//! blobs under `product:{id}` by the catalog sync job; this adapter only
//! reads them.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use suggest_core::config::RedisConfig;
use suggest_core::types::{ItemId, ProductAttributes};
use suggest_core::{SuggestError, SuggestResult};
use suggest_engine::CatalogLookup;
use tracing::{debug, info, warn};

pub struct RedisCatalog {
    client: redis::Client,
}

impl RedisCatalog {
    /// Connect to Redis and verify connectivity with a PING.
    pub async fn new(config: &RedisConfig) -> SuggestResult<Self> {
        let url = config
            .urls
            .first()
            .cloned()
            .unwrap_or_else(|| "redis://localhost:6379".to_string());

        info!(url = %url, "Connecting to Redis");

        let client =
            redis::Client::open(url.as_str()).map_err(|e| SuggestError::Catalog(e.to_string()))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SuggestError::Catalog(e.to_string()))?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| SuggestError::Catalog(e.to_string()))?;
        info!(response = %pong, "Redis connection established");

        Ok(Self { client })
    }

    fn key(item_id: &ItemId) -> String {
        format!("product:{item_id}")
    }
}

#[async_trait]
impl CatalogLookup for RedisCatalog {
    async fn fetch(
        &self,
        item_ids: &[ItemId],
    ) -> SuggestResult<HashMap<ItemId, ProductAttributes>> {
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| SuggestError::Catalog(e.to_string()))?;

        let keys: Vec<String> = item_ids.iter().map(Self::key).collect();
        let blobs: Vec<Option<String>> = conn
            .mget(&keys)
            .await
            .map_err(|e| SuggestError::Catalog(e.to_string()))?;

        metrics::counter!("store.catalog.batches").increment(1);

        let mut resolved = HashMap::with_capacity(item_ids.len());
        for (item_id, blob) in item_ids.iter().zip(blobs) {
            let Some(json) = blob else {
                // Stale index entry or deleted product; caller drops it
                continue;
            };
            match serde_json::from_str::<ProductAttributes>(&json) {
                Ok(attrs) => {
                    resolved.insert(item_id.clone(), attrs);
                }
                Err(e) => {
                    warn!(item_id = %item_id, error = %e, "Malformed catalog entry skipped");
                    metrics::counter!("store.catalog.malformed").increment(1);
                }
            }
        }

        debug!(
            requested = item_ids.len(),
            resolved = resolved.len(),
            "Catalog batch fetch complete"
        );
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use suggest_core::types::Price;

    #[test]
    fn key_format_is_stable() {
        assert_eq!(RedisCatalog::key(&ItemId::from("42")), "product:42");
    }

    #[test]
    fn catalog_blob_round_trip() {
        let raw = r#"{"id":"10","name":"Trail Shoe","brand":"Acme","price":89.99,"main_image":"https://cdn.example.com/10.jpg"}"#;
        let attrs: ProductAttributes = serde_json::from_str(raw).unwrap();
        assert_eq!(attrs.id, ItemId::from("10"));
        assert_eq!(attrs.price, Price::from_minor_units(8999));
    }
}
