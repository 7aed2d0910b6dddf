//! Sink used when ScyllaDB persistence is disabled

use async_trait::async_trait;
use turf_advisor_core::{AuditEvent, ConversationRecord, ConversationSink, Degraded, FeedbackRecord};

/// Writes every record to the tracing log and keeps nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ConversationSink for LogSink {
    async fn record_conversation(&self, record: &ConversationRecord) -> Result<(), Degraded> {
        tracing::info!(
            conversation_id = %record.id,
            user_id = %record.user_id,
            topic = record.topic.as_deref().unwrap_or("general"),
            confidence = record.confidence,
            needs_review = record.needs_review,
            "Conversation"
        );
        Ok(())
    }

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<(), Degraded> {
        tracing::info!(
            conversation_id = %feedback.conversation_id,
            rating = feedback.rating,
            has_correction = feedback.correction.is_some(),
            "Feedback"
        );
        Ok(())
    }

    async fn record_audit(&self, event: &AuditEvent) -> Result<(), Degraded> {
        tracing::info!(
            event = event.event_type.as_str(),
            user_id = %event.user_id,
            detail = %event.detail,
            "Audit"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::AuditEventType;

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let sink = LogSink;
        let event = AuditEvent::new(AuditEventType::RateLimited, "u1", "too fast");
        assert!(sink.record_audit(&event).await.is_ok());
    }
}
