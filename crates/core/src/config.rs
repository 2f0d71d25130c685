use serde::Deserialize;
use std::time::Duration;

/// Root application configuration. Loaded from environment variables
/// with the prefix `SUGGEST__` and overridable from the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    #[serde(default)]
    pub recommend: RecommendConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickHouseConfig {
    #[serde(default = "default_clickhouse_url")]
    pub url: String,
    #[serde(default = "default_clickhouse_db")]
    pub database: String,
}

/// Endpoint of the external nearest-neighbor index service.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorIndexConfig {
    #[serde(default = "default_vector_index_url")]
    pub base_url: String,
    #[serde(default = "default_vector_index_timeout_ms")]
    pub timeout_ms: u64,
}

/// Tunables for the recommendation aggregation pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct RecommendConfig {
    /// How many distinct recently interacted items seed the similarity search.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// How many similar candidates are fetched per seed item.
    #[serde(default = "default_per_item_top_k")]
    pub per_item_top_k: usize,
    /// Final output size bound.
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,
    /// Timeout applied to each individual collaborator call.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Overall deadline for the similarity fan-out; past it, the request
    /// proceeds with whatever has been merged so far.
    #[serde(default = "default_request_deadline_ms")]
    pub request_deadline_ms: u64,
}

impl RecommendConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn request_deadline(&self) -> Duration {
        Duration::from_millis(self.request_deadline_ms)
    }
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_clickhouse_url() -> String {
    "http://localhost:8123".to_string()
}
fn default_clickhouse_db() -> String {
    "suggest".to_string()
}
fn default_vector_index_url() -> String {
    "http://localhost:7700".to_string()
}
fn default_vector_index_timeout_ms() -> u64 {
    2000
}
fn default_history_limit() -> usize {
    10
}
fn default_per_item_top_k() -> usize {
    10
}
fn default_result_limit() -> usize {
    10
}
fn default_call_timeout_ms() -> u64 {
    2000
}
fn default_request_deadline_ms() -> u64 {
    5000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: default_clickhouse_url(),
            database: default_clickhouse_db(),
        }
    }
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            base_url: default_vector_index_url(),
            timeout_ms: default_vector_index_timeout_ms(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            per_item_top_k: default_per_item_top_k(),
            result_limit: default_result_limit(),
            call_timeout_ms: default_call_timeout_ms(),
            request_deadline_ms: default_request_deadline_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            redis: RedisConfig::default(),
            clickhouse: ClickHouseConfig::default(),
            vector_index: VectorIndexConfig::default(),
            recommend: RecommendConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SUGGEST")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = RecommendConfig::default();
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.per_item_top_k, 10);
        assert_eq!(config.result_limit, 10);
        assert_eq!(config.call_timeout(), Duration::from_millis(2000));
    }
}
