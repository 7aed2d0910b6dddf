//! Query understanding front door
//!
//! Sanitizes the raw text, runs classification, rewriting and the
//! feasibility gate concurrently, then annotates a [`Question`] for
//! retrieval.
//!
//! Follow-up context and vague-question expansion only feed detection.
//! The [`Question`] itself always carries the text the user asked, which
//! is what the prompt and verification see.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use turf_advisor_config::{LlmSettings, QueryConfig};
use turf_advisor_core::{ChatCompletion, Question, Topic};

use crate::classifier::{Classification, QueryClassifier};
use crate::detection::{
    detect_grass_type, detect_product_need, detect_region, detect_state, detect_subject,
    detect_topic,
};
use crate::expansion::{expand_query, expand_vague_question, query_intent, QueryIntent};
use crate::feasibility::{check_feasibility, FeasibilityVerdict};
use crate::rewriter::QueryRewriter;
use crate::sanitize::sanitize_question;
use crate::topic_change::is_significant_topic_change;
use crate::Result;

/// Previous answers are clipped to this many characters in the prompt
const CONTEXT_ANSWER_CHARS: usize = 200;

/// One question/answer exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// What the session remembers between questions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub last_topic: Option<Topic>,
    pub last_subject: Option<String>,
    pub history: Vec<Turn>,
}

impl SessionContext {
    /// Record a finished exchange, keeping at most `max_turns`.
    ///
    /// `asked` is the user's text; `question` carries the detected topic.
    pub fn record(&mut self, asked: &str, question: &Question, answer: &str, max_turns: usize) {
        self.last_topic = question.topic;
        self.last_subject = question.subject.clone();
        self.history.push(Turn {
            question: asked.to_string(),
            answer: answer.to_string(),
        });
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(..excess);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Understanding {
    /// Sanitized text as the user typed it
    pub asked: String,
    /// Text detection ran over: the previous turn prepended on follow-ups,
    /// vague questions expanded
    pub resolved: String,
    pub classification: Classification,
    pub question: Question,
    pub feasibility: FeasibilityVerdict,
    pub intent: QueryIntent,
    pub topic_changed: bool,
}

pub struct QueryUnderstanding {
    classifier: QueryClassifier,
    rewriter: QueryRewriter,
}

impl QueryUnderstanding {
    pub fn new(classifier: QueryClassifier, rewriter: QueryRewriter) -> Self {
        Self { classifier, rewriter }
    }

    pub fn from_settings(chat: Arc<dyn ChatCompletion>, llm: &LlmSettings, query: &QueryConfig) -> Self {
        Self::new(
            QueryClassifier::from_settings(chat.clone(), llm, query),
            QueryRewriter::from_settings(chat, llm, query),
        )
    }

    /// Annotate a raw question. Only empty input is an error.
    pub async fn understand(&self, raw: &str, session: &SessionContext) -> Result<Understanding> {
        let text = sanitize_question(raw)?;

        let (classification, rewritten, feasibility) = tokio::join!(
            self.classifier.classify(&text),
            self.rewriter.rewrite(&text),
            async { check_feasibility(&text) },
        );

        let current_topic = detect_topic(&text);
        let current_subject = detect_subject(&text);
        let topic_changed = !session.history.is_empty()
            && is_significant_topic_change(
                session.last_topic,
                current_topic,
                &text,
                session.last_subject.as_deref(),
                current_subject.as_deref(),
            );

        let base = match session.history.last() {
            Some(turn) if !topic_changed => contextual_question(turn, &text),
            _ => text.clone(),
        };
        let resolved = expand_vague_question(&base).unwrap_or(base);

        let grass_type = detect_grass_type(&resolved);
        let state = detect_state(&resolved);
        let region = detect_region(&resolved, state.as_deref());
        let product_need = detect_product_need(&resolved);
        let topic = detect_topic(&resolved).or(product_need.map(|_| Topic::Chemical));
        let subject = detect_subject(&resolved).or(current_subject);

        let mut expanded = expand_query(&rewritten);
        if let Some(grass) = grass_type {
            expanded.push(' ');
            expanded.push_str(grass.as_str());
        }
        if let Some(region) = region {
            expanded.push(' ');
            expanded.push_str(region.as_str());
        }

        let intent = query_intent(&text);
        tracing::debug!(
            category = classification.category.as_str(),
            topic = ?topic,
            grass = ?grass_type,
            region = ?region,
            topic_changed,
            "Question understood"
        );

        let question = Question::new(text.clone())
            .with_rewritten(rewritten)
            .with_expanded(expanded)
            .with_topic(topic)
            .with_product_need(product_need)
            .with_grass_type(grass_type)
            .with_region(region)
            .with_state(state)
            .with_subject(subject);

        Ok(Understanding {
            asked: text,
            resolved,
            classification,
            question,
            feasibility,
            intent,
            topic_changed,
        })
    }
}

fn contextual_question(previous: &Turn, current: &str) -> String {
    let mut answer: String = previous.answer.chars().take(CONTEXT_ANSWER_CHARS).collect();
    if previous.answer.chars().count() > CONTEXT_ANSWER_CHARS {
        answer.push_str("...");
    }
    format!(
        "Previous conversation context:\nUser asked: {}\nYou answered: {}\n\nCurrent question: {}",
        previous.question, answer, current
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use turf_advisor_core::testing::ScriptedChat;
    use turf_advisor_core::{CachePolicy, GrassType, ProductNeed, QueryCategory, Region};

    use crate::QueryError;

    fn understanding(chat: Arc<ScriptedChat>) -> QueryUnderstanding {
        let policy = CachePolicy::new(16, Duration::from_secs(60));
        QueryUnderstanding::new(
            QueryClassifier::new(chat.clone(), "mini", Duration::from_secs(1), policy),
            QueryRewriter::new(chat, "mini", Duration::from_secs(1), policy),
        )
    }

    #[tokio::test]
    async fn test_empty_question_rejected() {
        let qu = understanding(Arc::new(ScriptedChat::failing()));
        let err = qu.understand("  \n\t ", &SessionContext::default()).await.unwrap_err();
        assert_eq!(err, QueryError::EmptyQuestion);
    }

    #[tokio::test]
    async fn test_degraded_models_still_annotate() {
        let qu = understanding(Arc::new(ScriptedChat::failing()));
        let u = qu
            .understand("What fungicide controls dollar spot on bentgrass greens in Ohio?", &SessionContext::default())
            .await
            .unwrap();

        assert_eq!(u.classification.category, QueryCategory::Good);
        assert_eq!(u.question.rewritten, u.question.original());
        assert_eq!(u.question.grass_type, Some(GrassType::Bentgrass));
        assert_eq!(u.question.state.as_deref(), Some("ohio"));
        assert_eq!(u.question.region, Some(Region::Midwest));
        assert!(u.question.expanded.ends_with("bentgrass midwest"));
        assert!(u.feasibility.is_feasible());
        assert!(!u.topic_changed);
    }

    #[tokio::test]
    async fn test_vague_question_expanded() {
        let qu = understanding(Arc::new(ScriptedChat::failing()));
        let u = qu.understand("dollar spot?", &SessionContext::default()).await.unwrap();
        assert!(u.resolved.starts_with("What fungicide should I use to control dollar spot"));
        assert_eq!(u.question.original(), "dollar spot?");
        assert_eq!(u.question.product_need, Some(ProductNeed::Fungicide));
        assert_eq!(u.question.subject.as_deref(), Some("dollar spot"));
    }

    #[tokio::test]
    async fn test_follow_up_carries_context() {
        let qu = understanding(Arc::new(ScriptedChat::failing()));
        let mut session = SessionContext::default();
        let first = qu
            .understand("What fungicide controls dollar spot on bentgrass?", &session)
            .await
            .unwrap();
        session.record(&first.asked, &first.question, &"Rotate FRAC groups. ".repeat(20), 5);

        let follow = qu.understand("what about the fungicide rate", &session).await.unwrap();
        assert!(!follow.topic_changed);
        assert!(follow.resolved.starts_with("Previous conversation context:"));
        assert!(follow.resolved.contains("...\n\nCurrent question: what about the fungicide rate"));
        assert_eq!(follow.question.original(), "what about the fungicide rate");
        assert_eq!(follow.asked, "what about the fungicide rate");
        // the bentgrass from the first turn carries through
        assert_eq!(follow.question.grass_type, Some(GrassType::Bentgrass));
    }

    #[tokio::test]
    async fn test_feasibility_runs_alongside() {
        let qu = understanding(Arc::new(ScriptedChat::failing()));
        let u = qu
            .understand("Can I put down 10 lbs of nitrogen per 1000 sq ft?", &SessionContext::default())
            .await
            .unwrap();
        assert!(!u.feasibility.is_feasible());
        assert_eq!(u.question.topic, Some(Topic::Fertilizer));
    }

    #[test]
    fn test_session_history_is_bounded() {
        let mut session = SessionContext::default();
        for i in 0..4 {
            let asked = format!("q{}", i);
            session.record(&asked, &Question::new(asked.clone()), "a", 2);
        }
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history[0].question, "q2");
    }
}
