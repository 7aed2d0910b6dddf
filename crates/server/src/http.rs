//! HTTP Endpoints
//!
//! REST API for the turf advisor.

use std::time::{Duration, Instant};

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use turf_advisor_core::AskResponse;
use turf_advisor_pipeline::{AskRequest, FeedbackRequest};
use uuid::Uuid;

use crate::metrics::{metrics_handler, record_rate_limited, record_request};
use crate::state::AppState;
use crate::ServerError;

const ANONYMOUS_USER: &str = "anonymous";
const DEFAULT_ORIGIN: &str = "http://localhost:3000";

pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let timeout = Duration::from_secs(server.timeout_seconds.max(1));

    Router::new()
        .route("/api/ask", post(ask))
        .route("/api/feedback", post(feedback))
        .route("/api/cache/stats", get(cache_stats))
        .route("/api/cache/clear", post(clear_cache))
        .route("/api/budget", get(budget))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// CORS from configured origins; permissive when disabled
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if parsed.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to {}", DEFAULT_ORIGIN);
        return layer.allow_origin(HeaderValue::from_static(DEFAULT_ORIGIN));
    }

    tracing::info!("CORS configured with {} origins", parsed.len());
    layer.allow_origin(parsed)
}

#[derive(Debug, Deserialize)]
struct AskBody {
    question: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct AskReply {
    conversation_id: Uuid,
    cached: bool,
    #[serde(flatten)]
    response: AskResponse,
}

async fn ask(State(state): State<AppState>, Json(body): Json<AskBody>) -> Response {
    let started = Instant::now();
    let response = match answer(&state, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    record_request("ask", response.status(), started.elapsed());
    response
}

async fn answer(state: &AppState, body: AskBody) -> Result<Response, ServerError> {
    let max_chars = state.config.server.max_question_chars;
    if body.question.trim().is_empty() {
        return Err(ServerError::InvalidRequest("question is required".to_string()));
    }
    if body.question.chars().count() > max_chars {
        return Err(ServerError::InvalidRequest(format!(
            "question exceeds {} characters",
            max_chars
        )));
    }

    let request = AskRequest {
        question: body.question,
        user_id: body
            .user_id
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        session_id: body.session_id,
    };

    if let Err(limited) = state.rate_limiter.check(&request.user_id) {
        record_rate_limited();
        tracing::info!(user_id = %request.user_id, retry_after = ?limited.retry_after, "Rate limited");
        let response = state.advisor.rate_limited(&request).await;
        let reply = AskReply {
            conversation_id: Uuid::new_v4(),
            cached: false,
            response,
        };
        return Ok((StatusCode::from(ServerError::RateLimit), Json(reply)).into_response());
    }

    let outcome = state.advisor.ask(&request).await?;
    let reply = AskReply {
        conversation_id: outcome.conversation_id,
        cached: outcome.cached,
        response: outcome.response,
    };
    Ok(Json(reply).into_response())
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    conversation_id: Uuid,
    #[serde(default)]
    user_id: Option<String>,
    rating: String,
    #[serde(default)]
    correction: Option<String>,
}

async fn feedback(
    State(state): State<AppState>,
    Json(body): Json<FeedbackBody>,
) -> Result<StatusCode, ServerError> {
    let request = FeedbackRequest {
        conversation_id: body.conversation_id,
        user_id: body.user_id.unwrap_or_else(|| ANONYMOUS_USER.to_string()),
        rating: body.rating,
        correction: body.correction.filter(|c| !c.trim().is_empty()),
    };
    state.advisor.feedback(&request).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cache_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.advisor.caches().stats()))
}

async fn clear_cache(State(state): State<AppState>) -> Json<serde_json::Value> {
    state.advisor.caches().clear();
    tracing::info!("Caches cleared");
    Json(serde_json::json!({ "status": "cleared" }))
}

async fn budget(State(state): State<AppState>) -> Json<serde_json::Value> {
    let budget = state.advisor.budget();
    Json(serde_json::json!({
        "spent_today_usd": budget.spent_today(),
        "daily_limit_usd": state.config.budget.daily_limit_usd,
        "status": format!("{:?}", budget.status()).to_lowercase(),
    }))
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready when the vector index and, if configured, the LLM answer
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let index_ok = state.advisor.ready().await;
    let llm_status = match &state.llm {
        Some(llm) if llm.ping().await => "ok",
        Some(_) => "unreachable",
        None => "not_configured",
    };
    let ready = index_ok && llm_status != "unreachable";

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": {
                "vector_index": if index_ok { "ok" } else { "unreachable" },
                "llm_backend": llm_status,
            }
        })),
    )
}
