use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// User identifier. Opaque to the recommendation pipeline; the observed
/// identifier space is integer, which the path extractor enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Item identifier, shared between the similarity index and the catalog.
/// An id returned by the index must be resolvable by the catalog, though
/// resolution failure is tolerated (stale/deleted items).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A single user-item interaction as the history store records it.
/// Read-only from this service's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub timestamp: DateTime<Utc>,
}

/// One scored candidate returned by the similarity index. The score is an
/// opaque comparable real; no range is assumed beyond ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub item_id: ItemId,
    pub score: f64,
}

/// Fixed-point price in minor units (cents). The catalog boundary speaks
/// decimal numbers; internally there is exactly one representation, so
/// no implicit float coercion of catalog values can creep in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Price(i64);

impl Price {
    pub fn from_minor_units(minor: i64) -> Self {
        Self(minor)
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_major_units())
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        Ok(Self((major * 100.0).round() as i64))
    }
}

/// Display attributes for one catalog item, as stored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAttributes {
    pub id: ItemId,
    pub name: String,
    pub brand: String,
    pub price: Price,
    pub main_image: String,
}

/// One entry in the final ranked recommendation list. Assembled only for
/// candidates whose id resolved in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub id: ItemId,
    pub name: String,
    pub brand: String,
    pub price: Price,
    pub main_image: String,
    pub hybrid_score: f64,
}

impl RecommendationItem {
    pub fn from_attributes(attrs: ProductAttributes, hybrid_score: f64) -> Self {
        Self {
            id: attrs.id,
            name: attrs.name,
            brand: attrs.brand,
            price: attrs.price,
            main_image: attrs.main_image,
            hybrid_score,
        }
    }
}

/// Wire-level response body for `GET /recommendations/{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: UserId,
    pub recommended_products: Vec<RecommendationItem>,
}
