//! The recommendation aggregation pipeline: seed collection, concurrent
//! similarity fan-out, max-merge, catalog enrichment, rank, truncate.

use crate::accumulator::ScoreAccumulator;
use crate::sources::{CatalogLookup, DegradedSources, InteractionHistory, SimilarityIndex};
use std::collections::HashSet;
use std::sync::Arc;
use suggest_core::config::RecommendConfig;
use suggest_core::types::{ItemId, RecommendationItem, SimilarityMatch, UserId};
use suggest_core::SuggestResult;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, warn};

/// Per-request bounds for the pipeline. All positive; defaults mirror the
/// service configuration.
#[derive(Debug, Clone, Copy)]
pub struct RecommendOptions {
    pub history_limit: usize,
    pub per_item_top_k: usize,
    pub result_limit: usize,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            history_limit: 10,
            per_item_top_k: 10,
            result_limit: 10,
        }
    }
}

impl From<&RecommendConfig> for RecommendOptions {
    fn from(config: &RecommendConfig) -> Self {
        Self {
            history_limit: config.history_limit,
            per_item_top_k: config.per_item_top_k,
            result_limit: config.result_limit,
        }
    }
}

/// Ranked recommendations for one user, plus which collaborators degraded
/// while building them. An empty list with a clear `degraded` is a genuine
/// cold start; an empty list with `degraded` set is a service-side gap.
#[derive(Debug, Clone)]
pub struct Recommendations {
    pub user_id: UserId,
    pub items: Vec<RecommendationItem>,
    pub degraded: DegradedSources,
}

/// Orchestrates the three collaborators into one ranked list per request.
/// Holds no cross-request state; every accumulator is request-scoped.
pub struct RecommendationAggregator<H, S, C> {
    history: Arc<H>,
    similarity: Arc<S>,
    catalog: Arc<C>,
    config: RecommendConfig,
}

impl<H, S, C> RecommendationAggregator<H, S, C>
where
    H: InteractionHistory + 'static,
    S: SimilarityIndex + 'static,
    C: CatalogLookup + 'static,
{
    pub fn new(history: Arc<H>, similarity: Arc<S>, catalog: Arc<C>, config: RecommendConfig) -> Self {
        Self {
            history,
            similarity,
            catalog,
            config,
        }
    }

    /// Produce the final ranked recommendation list for one user.
    ///
    /// Collaborator failures degrade the result instead of failing the
    /// request: a failed history read yields no seeds, a failed seed query
    /// contributes no candidates, and a failed catalog fetch resolves
    /// nothing. Each is logged and recorded in the returned
    /// [`DegradedSources`].
    pub async fn recommend(
        &self,
        user_id: UserId,
        opts: &RecommendOptions,
    ) -> SuggestResult<Recommendations> {
        let mut degraded = DegradedSources::default();

        let seeds = self.seed_items(user_id, opts.history_limit, &mut degraded).await;
        if seeds.is_empty() {
            debug!(user_id = %user_id, degraded = degraded.is_degraded(), "No seed items");
            return Ok(Recommendations {
                user_id,
                items: Vec::new(),
                degraded,
            });
        }

        let accumulator = self
            .merge_similarity(&seeds, opts.per_item_top_k, &mut degraded)
            .await;
        if accumulator.is_empty() {
            return Ok(Recommendations {
                user_id,
                items: Vec::new(),
                degraded,
            });
        }

        let candidates = accumulator.candidates();
        let attributes = match timeout(
            self.config.call_timeout(),
            self.catalog.fetch(&candidates),
        )
        .await
        {
            Ok(Ok(attributes)) => attributes,
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Catalog lookup failed");
                metrics::counter!("recommend.catalog_failures").increment(1);
                degraded.catalog_failed = true;
                Default::default()
            }
            Err(_) => {
                warn!(user_id = %user_id, "Catalog lookup timed out");
                metrics::counter!("recommend.catalog_failures").increment(1);
                degraded.catalog_failed = true;
                Default::default()
            }
        };

        // Candidates the catalog did not resolve are dropped silently;
        // stale index entries are expected, not an error.
        let scores = accumulator.into_scores();
        let mut items: Vec<RecommendationItem> = attributes
            .into_iter()
            .filter_map(|(item_id, attrs)| {
                scores
                    .get(&item_id)
                    .map(|score| RecommendationItem::from_attributes(attrs, *score))
            })
            .collect();

        // Rank by merged score, ties broken by item id ascending so equal
        // scores never depend on catalog iteration order.
        items.sort_by(|a, b| {
            b.hybrid_score
                .partial_cmp(&a.hybrid_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        items.truncate(opts.result_limit);

        if degraded.is_degraded() {
            metrics::counter!("recommend.degraded_responses").increment(1);
        }

        Ok(Recommendations {
            user_id,
            items,
            degraded,
        })
    }

    /// Fetch and deduplicate the seed set. A history failure yields no
    /// seeds and marks the response degraded rather than failing it.
    async fn seed_items(
        &self,
        user_id: UserId,
        limit: usize,
        degraded: &mut DegradedSources,
    ) -> Vec<ItemId> {
        let recent = match timeout(
            self.config.call_timeout(),
            self.history.recent_items(user_id, limit),
        )
        .await
        {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(user_id = %user_id, error = %e, "Interaction history lookup failed");
                metrics::counter!("recommend.history_failures").increment(1);
                degraded.history_failed = true;
                return Vec::new();
            }
            Err(_) => {
                warn!(user_id = %user_id, "Interaction history lookup timed out");
                metrics::counter!("recommend.history_failures").increment(1);
                degraded.history_failed = true;
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut seeds: Vec<ItemId> = recent
            .into_iter()
            .filter(|item| seen.insert(item.clone()))
            .collect();
        seeds.truncate(limit);
        seeds
    }

    /// Fan out one similarity query per seed and fold the results into a
    /// single accumulator. The fan-in loop is the only writer, so the
    /// max-merge needs no lock; completion order is irrelevant because the
    /// merge is commutative and associative. Past the request deadline,
    /// outstanding queries are abandoned and whatever merged so far wins.
    async fn merge_similarity(
        &self,
        seeds: &[ItemId],
        top_k: usize,
        degraded: &mut DegradedSources,
    ) -> ScoreAccumulator {
        let call_timeout = self.config.call_timeout();
        let deadline = Instant::now() + self.config.request_deadline();

        let mut queries: JoinSet<(ItemId, Option<SuggestResult<Vec<SimilarityMatch>>>)> =
            JoinSet::new();
        for seed in seeds {
            let index = Arc::clone(&self.similarity);
            let seed = seed.clone();
            queries.spawn(async move {
                let result = timeout(call_timeout, index.query(&seed, top_k)).await;
                (seed, result.ok())
            });
        }

        let mut accumulator = ScoreAccumulator::new();
        loop {
            let joined = match timeout_at(deadline, queries.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                Err(_) => {
                    let abandoned = queries.len();
                    warn!(abandoned, "Request deadline hit, returning partial merge");
                    metrics::counter!("recommend.deadline_exceeded").increment(1);
                    degraded.similarity_failures += abandoned;
                    queries.abort_all();
                    break;
                }
            };

            match joined {
                Ok((_, Some(Ok(matches)))) => accumulator.absorb(matches),
                Ok((seed, Some(Err(e)))) => {
                    warn!(item_id = %seed, error = %e, "Similarity query failed");
                    metrics::counter!("recommend.similarity_failures").increment(1);
                    degraded.similarity_failures += 1;
                }
                Ok((seed, None)) => {
                    warn!(item_id = %seed, "Similarity query timed out");
                    metrics::counter!("recommend.similarity_failures").increment(1);
                    degraded.similarity_failures += 1;
                }
                Err(e) => {
                    warn!(error = %e, "Similarity query task failed");
                    metrics::counter!("recommend.similarity_failures").increment(1);
                    degraded.similarity_failures += 1;
                }
            }
        }

        accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use suggest_core::types::{Price, ProductAttributes, SimilarityMatch};
    use suggest_core::SuggestError;

    struct FixedHistory {
        items: Vec<ItemId>,
        fail: bool,
    }

    #[async_trait]
    impl InteractionHistory for FixedHistory {
        async fn recent_items(&self, _user: UserId, limit: usize) -> SuggestResult<Vec<ItemId>> {
            if self.fail {
                return Err(SuggestError::History("connection refused".into()));
            }
            Ok(self.items.iter().take(limit).cloned().collect())
        }
    }

    struct FixedIndex {
        neighbors: HashMap<ItemId, Vec<SimilarityMatch>>,
        failing: HashSet<ItemId>,
    }

    #[async_trait]
    impl SimilarityIndex for FixedIndex {
        async fn query(&self, item: &ItemId, top_k: usize) -> SuggestResult<Vec<SimilarityMatch>> {
            if self.failing.contains(item) {
                return Err(SuggestError::SimilarityIndex("upstream 503".into()));
            }
            let mut matches = self.neighbors.get(item).cloned().unwrap_or_default();
            matches.truncate(top_k);
            Ok(matches)
        }
    }

    struct FixedCatalog {
        products: HashMap<ItemId, ProductAttributes>,
        fail: bool,
    }

    #[async_trait]
    impl CatalogLookup for FixedCatalog {
        async fn fetch(
            &self,
            ids: &[ItemId],
        ) -> SuggestResult<HashMap<ItemId, ProductAttributes>> {
            if self.fail {
                return Err(SuggestError::Catalog("connection refused".into()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.products.get(id).map(|p| (id.clone(), p.clone())))
                .collect())
        }
    }

    fn product(id: &str) -> ProductAttributes {
        ProductAttributes {
            id: ItemId::from(id),
            name: format!("Product {id}"),
            brand: "Acme".to_string(),
            price: Price::from_minor_units(1999),
            main_image: format!("https://cdn.example.com/{id}.jpg"),
        }
    }

    fn matches(pairs: &[(&str, f64)]) -> Vec<SimilarityMatch> {
        pairs
            .iter()
            .map(|(id, score)| SimilarityMatch {
                item_id: ItemId::from(*id),
                score: *score,
            })
            .collect()
    }

    fn aggregator(
        history: FixedHistory,
        index: FixedIndex,
        catalog: FixedCatalog,
    ) -> RecommendationAggregator<FixedHistory, FixedIndex, FixedCatalog> {
        RecommendationAggregator::new(
            Arc::new(history),
            Arc::new(index),
            Arc::new(catalog),
            RecommendConfig::default(),
        )
    }

    fn two_seed_fixture(failing: &[&str]) -> RecommendationAggregator<FixedHistory, FixedIndex, FixedCatalog> {
        let history = FixedHistory {
            items: vec![ItemId::from("5"), ItemId::from("7")],
            fail: false,
        };
        let mut neighbors = HashMap::new();
        neighbors.insert(ItemId::from("5"), matches(&[("10", 0.9), ("11", 0.4)]));
        neighbors.insert(ItemId::from("7"), matches(&[("11", 0.7), ("12", 0.3)]));
        let index = FixedIndex {
            neighbors,
            failing: failing.iter().map(|id| ItemId::from(*id)).collect(),
        };
        let mut products = HashMap::new();
        for id in ["10", "11", "12"] {
            products.insert(ItemId::from(id), product(id));
        }
        let catalog = FixedCatalog {
            products,
            fail: false,
        };
        aggregator(history, index, catalog)
    }

    #[tokio::test]
    async fn merges_ranks_and_orders_across_seeds() {
        let agg = two_seed_fixture(&[]);
        let result = agg
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();

        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11", "12"]);
        assert_eq!(result.items[0].hybrid_score, 0.9);
        assert_eq!(result.items[1].hybrid_score, 0.7);
        assert_eq!(result.items[2].hybrid_score, 0.3);
        assert!(!result.degraded.is_degraded());
    }

    #[tokio::test]
    async fn empty_history_is_cold_start_not_error() {
        let agg = aggregator(
            FixedHistory {
                items: vec![],
                fail: false,
            },
            FixedIndex {
                neighbors: HashMap::new(),
                failing: HashSet::new(),
            },
            FixedCatalog {
                products: HashMap::new(),
                fail: false,
            },
        );
        let result = agg
            .recommend(UserId(42), &RecommendOptions::default())
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert!(!result.degraded.is_degraded());
    }

    #[tokio::test]
    async fn history_failure_is_degraded_not_error() {
        let agg = aggregator(
            FixedHistory {
                items: vec![],
                fail: true,
            },
            FixedIndex {
                neighbors: HashMap::new(),
                failing: HashSet::new(),
            },
            FixedCatalog {
                products: HashMap::new(),
                fail: false,
            },
        );
        let result = agg
            .recommend(UserId(42), &RecommendOptions::default())
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert!(result.degraded.history_failed);
    }

    #[tokio::test]
    async fn one_failing_seed_leaves_the_other_intact() {
        let agg = two_seed_fixture(&["5"]);
        let result = agg
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();

        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["11", "12"]);
        assert_eq!(result.items[0].hybrid_score, 0.7);
        assert_eq!(result.degraded.similarity_failures, 1);
    }

    #[tokio::test]
    async fn unresolved_candidates_are_dropped_silently() {
        let history = FixedHistory {
            items: vec![ItemId::from("5")],
            fail: false,
        };
        let mut neighbors = HashMap::new();
        neighbors.insert(ItemId::from("5"), matches(&[("10", 0.9), ("99", 0.8)]));
        let index = FixedIndex {
            neighbors,
            failing: HashSet::new(),
        };
        let mut products = HashMap::new();
        products.insert(ItemId::from("10"), product("10"));
        // "99" is stale: in the index, gone from the catalog
        let catalog = FixedCatalog {
            products,
            fail: false,
        };

        let result = aggregator(history, index, catalog)
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();
        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["10"]);
        assert!(!result.degraded.is_degraded());
    }

    #[tokio::test]
    async fn catalog_failure_yields_empty_degraded_result() {
        let history = FixedHistory {
            items: vec![ItemId::from("5")],
            fail: false,
        };
        let mut neighbors = HashMap::new();
        neighbors.insert(ItemId::from("5"), matches(&[("10", 0.9)]));
        let index = FixedIndex {
            neighbors,
            failing: HashSet::new(),
        };
        let catalog = FixedCatalog {
            products: HashMap::new(),
            fail: true,
        };

        let result = aggregator(history, index, catalog)
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();
        assert!(result.items.is_empty());
        assert!(result.degraded.catalog_failed);
    }

    #[tokio::test]
    async fn result_limit_truncates_after_ranking() {
        let agg = two_seed_fixture(&[]);
        let opts = RecommendOptions {
            result_limit: 2,
            ..Default::default()
        };
        let result = agg.recommend(UserId(1), &opts).await.unwrap();
        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "11"]);
    }

    #[tokio::test]
    async fn duplicate_history_entries_collapse_to_one_seed() {
        let history = FixedHistory {
            items: vec![ItemId::from("5"), ItemId::from("5"), ItemId::from("5")],
            fail: false,
        };
        let mut neighbors = HashMap::new();
        neighbors.insert(ItemId::from("5"), matches(&[("10", 0.9)]));
        let index = FixedIndex {
            neighbors,
            failing: HashSet::new(),
        };
        let mut products = HashMap::new();
        products.insert(ItemId::from("10"), product("10"));
        let catalog = FixedCatalog {
            products,
            fail: false,
        };

        let result = aggregator(history, index, catalog)
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].hybrid_score, 0.9);
    }

    #[tokio::test]
    async fn equal_scores_break_ties_by_item_id() {
        let history = FixedHistory {
            items: vec![ItemId::from("5")],
            fail: false,
        };
        let mut neighbors = HashMap::new();
        neighbors.insert(
            ItemId::from("5"),
            matches(&[("b", 0.5), ("a", 0.5), ("c", 0.5)]),
        );
        let index = FixedIndex {
            neighbors,
            failing: HashSet::new(),
        };
        let mut products = HashMap::new();
        for id in ["a", "b", "c"] {
            products.insert(ItemId::from(id), product(id));
        }
        let catalog = FixedCatalog {
            products,
            fail: false,
        };

        let result = aggregator(history, index, catalog)
            .recommend(UserId(1), &RecommendOptions::default())
            .await
            .unwrap();
        let ids: Vec<&str> = result.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
