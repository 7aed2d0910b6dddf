//! Write-only persistence trait and its records

use crate::error::Degraded;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub session_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub confidence: f32,
    pub needs_review: bool,
    pub sources: Vec<String>,
    pub topic: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub conversation_id: Uuid,
    pub user_id: String,
    /// +1 helpful, -1 not helpful
    pub rating: i8,
    pub correction: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    ClassifierRejected,
    FeasibilityRejected,
    StageDegraded,
    BudgetExceeded,
    RateLimited,
    NeedsReview,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::ClassifierRejected => "classifier_rejected",
            AuditEventType::FeasibilityRejected => "feasibility_rejected",
            AuditEventType::StageDegraded => "stage_degraded",
            AuditEventType::BudgetExceeded => "budget_exceeded",
            AuditEventType::RateLimited => "rate_limited",
            AuditEventType::NeedsReview => "needs_review",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub event_type: AuditEventType,
    pub user_id: String,
    pub detail: String,
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(event_type: AuditEventType, user_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            user_id: user_id.into(),
            detail: detail.into(),
            created_at: Utc::now(),
        }
    }
}

/// Conversation log, feedback and audit sink. Schema is owned by the store.
#[async_trait]
pub trait ConversationSink: Send + Sync + 'static {
    async fn record_conversation(&self, record: &ConversationRecord) -> Result<(), Degraded>;

    async fn record_feedback(&self, feedback: &FeedbackRecord) -> Result<(), Degraded>;

    async fn record_audit(&self, event: &AuditEvent) -> Result<(), Degraded>;
}
