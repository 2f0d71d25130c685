//! HTTP client for the external nearest-neighbor index service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use suggest_core::config::VectorIndexConfig;
use suggest_core::types::{ItemId, SimilarityMatch};
use suggest_core::{SuggestError, SuggestResult};
use suggest_engine::SimilarityIndex;
use tracing::{debug, info};

#[derive(Serialize)]
struct QueryRequest<'a> {
    id: &'a str,
    top_k: usize,
    include_metadata: bool,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<IndexMatch>,
}

#[derive(Deserialize)]
struct IndexMatch {
    id: String,
    score: f64,
}

/// Queries the index service by item id: the index holds the embeddings,
/// so callers never see a vector, only (id, score) matches.
pub struct VectorIndexClient {
    http: reqwest::Client,
    query_url: String,
}

impl VectorIndexClient {
    pub fn new(config: &VectorIndexConfig) -> SuggestResult<Self> {
        info!(base_url = %config.base_url, "Configuring vector index client");
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SuggestError::SimilarityIndex(e.to_string()))?;

        Ok(Self {
            http,
            query_url: format!("{}/query", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl SimilarityIndex for VectorIndexClient {
    async fn query(&self, item_id: &ItemId, top_k: usize) -> SuggestResult<Vec<SimilarityMatch>> {
        let body = QueryRequest {
            id: item_id.as_str(),
            top_k,
            include_metadata: false,
        };

        let response = self
            .http
            .post(&self.query_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SuggestError::SimilarityIndex(e.to_string()))?
            .error_for_status()
            .map_err(|e| SuggestError::SimilarityIndex(e.to_string()))?
            .json::<QueryResponse>()
            .await
            .map_err(|e| SuggestError::SimilarityIndex(e.to_string()))?;

        metrics::counter!("store.vector.queries").increment(1);
        debug!(item_id = %item_id, matches = response.matches.len(), "Similarity query complete");

        Ok(response
            .matches
            .into_iter()
            .map(|m| SimilarityMatch {
                item_id: ItemId(m.id),
                score: m.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_request_wire_shape() {
        let body = QueryRequest {
            id: "5",
            top_k: 10,
            include_metadata: false,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["id"], "5");
        assert_eq!(json["top_k"], 10);
        assert_eq!(json["include_metadata"], false);
    }

    #[test]
    fn response_parses_matches() {
        let raw = r#"{"matches":[{"id":"10","score":0.9},{"id":"11","score":0.4}]}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.matches.len(), 2);
        assert_eq!(parsed.matches[0].id, "10");
        assert_eq!(parsed.matches[0].score, 0.9);
    }

    #[test]
    fn response_without_matches_is_empty() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.matches.is_empty());
    }

    #[test]
    fn query_url_normalizes_trailing_slash() {
        let config = VectorIndexConfig {
            base_url: "http://index:7700/".to_string(),
            timeout_ms: 2000,
        };
        let client = VectorIndexClient::new(&config).unwrap();
        assert_eq!(client.query_url, "http://index:7700/query");
    }
}
