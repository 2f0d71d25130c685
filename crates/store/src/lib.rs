//! Thin data-access adapters behind the engine's collaborator traits:
//! interaction history on ClickHouse, nearest-neighbor lookups over HTTP,
//! catalog attributes on Redis.

pub mod catalog;
pub mod history;
pub mod vector;

pub use catalog::RedisCatalog;
pub use history::ClickHouseHistory;
pub use vector::VectorIndexClient;
