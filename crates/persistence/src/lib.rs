//! ScyllaDB persistence for the turf advisor
//!
//! Provides the write path behind `ConversationSink`:
//! - Conversation log (question, answer, confidence, sources)
//! - User feedback
//! - Audit events (short-circuits, degraded stages, review flags)

pub mod client;
pub mod conversations;
pub mod error;
pub mod log_sink;
pub mod schema;

pub use client::{ScyllaClient, ScyllaConfig};
pub use conversations::ScyllaConversationLog;
pub use error::PersistenceError;
pub use log_sink::LogSink;

use std::sync::Arc;

use turf_advisor_config::PersistenceConfig;
use turf_advisor_core::ConversationSink;

/// Connect and ensure the schema
pub async fn init(config: ScyllaConfig) -> Result<ScyllaConversationLog, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaConversationLog::new(client))
}

/// The configured sink. An unreachable cluster is logged and replaced by
/// [`LogSink`] so the advisor still starts.
pub async fn connect_sink(config: &PersistenceConfig) -> Arc<dyn ConversationSink> {
    if !config.enabled {
        tracing::info!("Persistence disabled, logging conversations only");
        return Arc::new(LogSink);
    }
    match init(ScyllaConfig::from(config)).await {
        Ok(log) => Arc::new(log),
        Err(e) => {
            tracing::warn!(error = %e, "ScyllaDB unavailable, logging conversations only");
            Arc::new(LogSink)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_persistence_uses_log_sink() {
        let config = PersistenceConfig {
            enabled: false,
            scylla_hosts: vec![],
            keyspace: "turf".into(),
            replication_factor: 1,
        };
        let sink = connect_sink(&config).await;
        let event = turf_advisor_core::AuditEvent::new(
            turf_advisor_core::AuditEventType::NeedsReview,
            "u1",
            "low confidence",
        );
        assert!(sink.record_audit(&event).await.is_ok());
    }
}
