//! Conversation log, feedback and audit events in ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use turf_advisor_core::{
    AuditEvent, ConversationRecord, ConversationSink, Degraded, FeedbackRecord,
};
use uuid::Uuid;

use crate::{PersistenceError, ScyllaClient};

#[derive(Clone)]
pub struct ScyllaConversationLog {
    client: ScyllaClient,
}

impl ScyllaConversationLog {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    pub async fn insert_conversation(&self, record: &ConversationRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.conversations (
                user_id, created_at, id, session_id, question, answer,
                confidence, needs_review, sources_json, topic
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        let sources_json = serde_json::to_string(&record.sources)?;

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &record.user_id,
                    record.created_at.timestamp_millis(),
                    record.id,
                    &record.session_id,
                    &record.question,
                    &record.answer,
                    record.confidence,
                    record.needs_review,
                    sources_json,
                    &record.topic,
                ),
            )
            .await?;

        tracing::debug!(conversation_id = %record.id, user_id = %record.user_id, "Conversation logged");
        Ok(())
    }

    pub async fn insert_feedback(&self, feedback: &FeedbackRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.feedback (conversation_id, created_at, user_id, rating, correction)
             VALUES (?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    feedback.conversation_id,
                    feedback.created_at.timestamp_millis(),
                    &feedback.user_id,
                    feedback.rating,
                    &feedback.correction,
                ),
            )
            .await?;

        tracing::info!(
            conversation_id = %feedback.conversation_id,
            rating = feedback.rating,
            "Feedback stored"
        );
        Ok(())
    }

    pub async fn insert_audit(&self, event: &AuditEvent) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.audit_log (partition_date, created_at, id, event_type, user_id, detail)
             VALUES (?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    partition_date(&event.created_at),
                    event.created_at.timestamp_millis(),
                    event.id,
                    event.event_type.as_str(),
                    &event.user_id,
                    &event.detail,
                ),
            )
            .await?;
        Ok(())
    }

    /// Most recent conversations of one user, newest first
    pub async fn recent_for_user(
        &self,
        user_id: &str,
        limit: i32,
    ) -> Result<Vec<ConversationRecord>, PersistenceError> {
        let query = format!(
            "SELECT user_id, created_at, id, session_id, question, answer,
                    confidence, needs_review, sources_json, topic
             FROM {}.conversations WHERE user_id = ? LIMIT ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (user_id, limit))
            .await?;

        let mut records = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                records.push(row_to_conversation(row)?);
            }
        }
        Ok(records)
    }

    /// Ratings left for one conversation
    pub async fn feedback_for(&self, conversation_id: Uuid) -> Result<Vec<FeedbackRecord>, PersistenceError> {
        let query = format!(
            "SELECT conversation_id, created_at, user_id, rating, correction
             FROM {}.feedback WHERE conversation_id = ?",
            self.client.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (conversation_id,))
            .await?;

        let mut records = Vec::new();
        if let Some(rows) = result.rows {
            for row in rows {
                let (conversation_id, created_at, user_id, rating, correction): (
                    Uuid,
                    i64,
                    String,
                    i8,
                    Option<String>,
                ) = row
                    .into_typed()
                    .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;
                records.push(FeedbackRecord {
                    conversation_id,
                    user_id,
                    rating,
                    correction,
                    created_at: from_millis(created_at),
                });
            }
        }
        Ok(records)
    }
}

fn row_to_conversation(
    row: scylla::frame::response::result::Row,
) -> Result<ConversationRecord, PersistenceError> {
    let (user_id, created_at, id, session_id, question, answer, confidence, needs_review, sources_json, topic): (
        String,
        i64,
        Uuid,
        Option<String>,
        String,
        String,
        f32,
        bool,
        Option<String>,
        Option<String>,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    let sources = match sources_json {
        Some(json) => serde_json::from_str(&json)?,
        None => Vec::new(),
    };
    Ok(ConversationRecord {
        id,
        user_id,
        session_id,
        question,
        answer,
        confidence,
        needs_review,
        sources,
        topic,
        created_at: from_millis(created_at),
    })
}

fn partition_date(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

#[async_trait]
impl ConversationSink for ScyllaConversationLog {
    async fn record_conversation(&self, record: &ConversationRecord) -> Result<(), Degraded> {
        self.insert_conversation(record).await.map_err(|e| e.degraded())
    }

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<(), Degraded> {
        self.insert_feedback(feedback).await.map_err(|e| e.degraded())
    }

    async fn record_audit(&self, event: &AuditEvent) -> Result<(), Degraded> {
        self.insert_audit(event).await.map_err(|e| e.degraded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_partition_date_is_utc_day() {
        let at = Utc.with_ymd_and_hms(2026, 4, 30, 23, 59, 59).unwrap();
        assert_eq!(partition_date(&at), "2026-04-30");
    }

    #[test]
    fn test_millis_round_trip() {
        let at = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        assert_eq!(from_millis(at.timestamp_millis()), at);
    }
}
