//! Prometheus metrics
//!
//! The recorder is installed once at startup; pipeline stages record
//! through the `metrics` facade and `/metrics` renders the snapshot.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use turf_advisor_pipeline::stats;

use crate::state::AppState;

pub const HTTP_REQUESTS: &str = "turf_advisor_http_requests_total";
pub const HTTP_LATENCY: &str = "turf_advisor_http_request_seconds";
pub const RATE_LIMITED: &str = "turf_advisor_rate_limited_total";

/// Install the global Prometheus recorder
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_metrics();
            Some(handle)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
}

fn describe_metrics() {
    metrics::describe_counter!(HTTP_REQUESTS, "HTTP requests by endpoint and status");
    metrics::describe_histogram!(HTTP_LATENCY, "HTTP request latency in seconds");
    metrics::describe_counter!(RATE_LIMITED, "Requests refused by the per-user rate limit");
    metrics::describe_counter!(stats::ASKS, "Questions received");
    metrics::describe_counter!(stats::SHORT_CIRCUITS, "Questions answered before generation");
    metrics::describe_counter!(stats::DEGRADED, "Upstream stages that failed softly");
    metrics::describe_counter!(stats::ANSWER_CACHE, "Answer cache lookups");
    metrics::describe_counter!(stats::NEEDS_REVIEW, "Answers flagged for expert review");
    metrics::describe_histogram!(stats::STAGE_SECONDS, "Pipeline stage latency in seconds");
    metrics::describe_histogram!(stats::CONFIDENCE, "Reported answer confidence");
    metrics::describe_counter!(stats::SPEND_MICRODOLLARS, "LLM spend in micro-dollars");
}

pub fn record_request(endpoint: &'static str, status: StatusCode, elapsed: Duration) {
    metrics::counter!(HTTP_REQUESTS, "endpoint" => endpoint, "status" => status.as_u16().to_string())
        .increment(1);
    metrics::histogram!(HTTP_LATENCY, "endpoint" => endpoint).record(elapsed.as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!(RATE_LIMITED).increment(1);
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics disabled".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_metrics_render() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, || {
            record_request("ask", StatusCode::OK, Duration::from_millis(20));
            record_rate_limited();
        });
        let rendered = handle.render();
        assert!(rendered.contains(HTTP_REQUESTS));
        assert!(rendered.contains(RATE_LIMITED));
    }
}
