//! Recommendation engine — collaborator contracts, max-merge score
//! accumulation, and the request-scoped aggregation pipeline.

pub mod accumulator;
pub mod aggregator;
pub mod sources;

pub use accumulator::ScoreAccumulator;
pub use aggregator::{RecommendOptions, RecommendationAggregator, Recommendations};
pub use sources::{CatalogLookup, DegradedSources, InteractionHistory, SimilarityIndex};
