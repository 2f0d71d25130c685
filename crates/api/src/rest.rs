//! REST API handlers for the recommendation endpoint and operational
//! endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use suggest_core::types::{RecommendationResponse, UserId};
use suggest_engine::{RecommendOptions, RecommendationAggregator};
use suggest_store::{ClickHouseHistory, RedisCatalog, VectorIndexClient};
use tracing::{error, info_span, Instrument};
use uuid::Uuid;

/// The aggregator wired to its production backends.
pub type ProductRecommender =
    RecommendationAggregator<ClickHouseHistory, VectorIndexClient, RedisCatalog>;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<ProductRecommender>,
    pub options: RecommendOptions,
    pub node_id: String,
    pub start_time: Instant,
}

/// GET /recommendations/{user_id} — ranked product recommendations.
///
/// A non-integer path segment is rejected by the extractor as a client
/// error before this handler runs; collaborator failures degrade the body
/// rather than the status. Only a structural failure maps to 5xx, with a
/// generic message.
pub async fn recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<RecommendationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let user_id = UserId(user_id);
    let request_id = Uuid::new_v4();
    let span = info_span!("recommend", %request_id, %user_id);

    metrics::counter!("api.recommend.requests").increment(1);
    let started = Instant::now();

    match state
        .recommender
        .recommend(user_id, &state.options)
        .instrument(span)
        .await
    {
        Ok(result) => {
            metrics::histogram!("api.recommend.latency_ms")
                .record(started.elapsed().as_millis() as f64);
            if result.degraded.is_degraded() {
                metrics::counter!("api.recommend.degraded").increment(1);
            }
            Ok(Json(RecommendationResponse {
                user_id: result.user_id,
                recommended_products: result.items,
            }))
        }
        Err(e) => {
            error!(error = %e, %user_id, "Recommendation request failed");
            metrics::counter!("api.recommend.errors").increment(1);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "recommendation_failed".to_string(),
                    message: "Internal processing error".to_string(),
                }),
            ))
        }
    }
}

/// GET /health — Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe for Kubernetes.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.start_time.elapsed().as_secs() > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe for Kubernetes.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}
