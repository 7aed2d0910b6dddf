//! Per-session conversation memory

use std::time::Duration;

use turf_advisor_config::constants::limits;
use turf_advisor_core::{CachePolicy, ChatMessage, TtlCache};
use turf_advisor_query::SessionContext;

const SESSION_CAPACITY: usize = 5000;
const SESSION_IDLE: Duration = Duration::from_secs(2 * 60 * 60);

/// Bounded store of session contexts; idle sessions expire
pub struct SessionStore {
    sessions: TtlCache<String, SessionContext>,
}

impl SessionStore {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            sessions: TtlCache::new(policy),
        }
    }

    /// Context for `session_id`; anonymous requests get a fresh one
    pub fn load(&self, session_id: Option<&str>) -> SessionContext {
        session_id
            .and_then(|id| self.sessions.get(&id.to_string()))
            .unwrap_or_default()
    }

    pub fn save(&self, session_id: Option<&str>, context: SessionContext) {
        if let Some(id) = session_id {
            self.sessions.insert(id.to_string(), context);
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(CachePolicy::new(SESSION_CAPACITY, SESSION_IDLE))
    }
}

/// Prior turns as chat messages, most recent last
pub fn history_messages(context: &SessionContext) -> Vec<ChatMessage> {
    let start = context.history.len().saturating_sub(limits::HISTORY_TURNS);
    context.history[start..]
        .iter()
        .flat_map(|turn| {
            [
                ChatMessage::user(turn.question.clone()),
                ChatMessage::assistant(turn.answer.clone()),
            ]
        })
        .collect()
}
