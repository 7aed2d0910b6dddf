//! Model selection and the generation orchestrator
//!
//! Generation never fails outward: a second failed attempt yields
//! [`APOLOGY_ANSWER`] so the pipeline can still verify and respond.

use std::sync::Arc;
use std::time::{Duration, Instant};

use turf_advisor_config::LlmSettings;
use turf_advisor_core::{ChatCompletion, ChatMessage, CompletionRequest};

pub const APOLOGY_ANSWER: &str =
    "I'm having trouble generating a response right now. Please try again in a moment.";

pub const EMPTY_ANSWER: &str =
    "I wasn't able to generate a response. Please try rephrasing your question.";

const IMAGE_PATTERNS: &[&str] = &["photo", "image", "picture", "diagnose from"];

const SIMPLE_PATTERNS: &[&str] = &[
    "what is the rate",
    "how much",
    "application rate",
    "label rate",
    "how often",
    "what frac",
    "what hrac",
    "what is the active ingredient",
    "what class",
    "signal word",
    "rei for",
    "phi for",
    "restricted entry",
    "pre-harvest interval",
    "how to calibrate",
    "what nozzle",
    "mixing order",
];

const COMPLEX_PATTERNS: &[&str] = &[
    "diagnose",
    "identify",
    "what is wrong",
    "what's wrong",
    "program",
    "plan",
    "strategy",
    "rotation",
    "why is",
    "why are",
    "why does",
    "compare",
    "versus",
    " vs",
    "best approach",
    "should i",
    "differential",
    "distinguish",
    "resistance management",
    "integrated pest management",
    "cultural practices for",
    "long-term",
    "season-long",
    "explain",
    "how does it work",
];

/// Short questions without complexity markers count as lookups
const SHORT_QUESTION_WORDS: usize = 8;
/// This many sources usually means the answer is a direct lookup
const WELL_SOURCED: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Mini,
    Full,
}

/// Intent signals that influence model choice
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentHints {
    pub wants_rate: bool,
    pub wants_diagnosis: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelChoice {
    pub model: String,
    pub tier: ModelTier,
    pub reason: &'static str,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelChoice {
    /// Force the mini model, keeping the token budget of a lookup
    pub fn downgrade(mut self, mini_model: &str) -> Self {
        if self.tier == ModelTier::Full {
            self.model = mini_model.to_string();
            self.tier = ModelTier::Mini;
            self.reason = "budget_downgrade";
            self.max_tokens = self.max_tokens.min(800);
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct ModelSelector {
    full_model: String,
    mini_model: String,
}

impl ModelSelector {
    pub fn new(full_model: impl Into<String>, mini_model: impl Into<String>) -> Self {
        Self {
            full_model: full_model.into(),
            mini_model: mini_model.into(),
        }
    }

    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(&settings.model, &settings.mini_model)
    }

    pub fn mini_model(&self) -> &str {
        &self.mini_model
    }

    fn full(&self, reason: &'static str) -> ModelChoice {
        ModelChoice {
            model: self.full_model.clone(),
            tier: ModelTier::Full,
            reason,
            max_tokens: 1500,
            temperature: 0.2,
        }
    }

    fn mini(&self, reason: &'static str) -> ModelChoice {
        ModelChoice {
            model: self.mini_model.clone(),
            tier: ModelTier::Mini,
            reason,
            max_tokens: 800,
            temperature: 0.15,
        }
    }

    /// Pick model, token budget and temperature for one question
    pub fn select(&self, question: &str, intent: IntentHints, source_count: usize) -> ModelChoice {
        let lower = question.to_lowercase();

        if IMAGE_PATTERNS.iter().any(|p| lower.contains(p)) {
            return self.full("image_diagnosis");
        }

        let mut simple = SIMPLE_PATTERNS.iter().any(|p| lower.contains(p));
        let mut complex = COMPLEX_PATTERNS.iter().any(|p| lower.contains(p));

        if question.split_whitespace().count() <= SHORT_QUESTION_WORDS && !complex {
            simple = true;
        }
        if intent.wants_rate && !intent.wants_diagnosis {
            simple = true;
        }
        if intent.wants_diagnosis {
            complex = true;
        }
        if source_count >= WELL_SOURCED && !complex {
            simple = true;
        }

        match (simple, complex) {
            (_, true) if !simple => self.full("complex_query"),
            (true, false) => self.mini("simple_lookup"),
            _ => self.full("default"),
        }
    }
}

/// Outcome of one generation, including token usage for the budget
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub answer: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub attempts: u32,
    /// Both attempts failed and `answer` is the apology
    pub failed: bool,
}

pub struct Generator {
    chat: Arc<dyn ChatCompletion>,
    first_timeout: Duration,
    retry_timeout: Duration,
}

impl Generator {
    pub fn new(chat: Arc<dyn ChatCompletion>, first_timeout: Duration, retry_timeout: Duration) -> Self {
        Self {
            chat,
            first_timeout,
            retry_timeout,
        }
    }

    pub fn from_settings(chat: Arc<dyn ChatCompletion>, settings: &LlmSettings) -> Self {
        Self::new(
            chat,
            Duration::from_secs(settings.first_timeout_secs),
            Duration::from_secs(settings.retry_timeout_secs),
        )
    }

    /// Generate an answer: short-deadline attempt, then one longer retry
    pub async fn generate(&self, messages: Vec<ChatMessage>, choice: &ModelChoice) -> Generation {
        let start = Instant::now();

        for (attempt, timeout) in [self.first_timeout, self.retry_timeout].into_iter().enumerate() {
            let request = CompletionRequest::new(&choice.model, messages.clone())
                .with_max_tokens(choice.max_tokens)
                .with_temperature(choice.temperature)
                .with_timeout(timeout);

            match self.chat.complete(request).await {
                Ok(completion) => {
                    let answer = if completion.text.trim().is_empty() {
                        EMPTY_ANSWER.to_string()
                    } else {
                        completion.text
                    };
                    tracing::info!(
                        model = %choice.model,
                        reason = choice.reason,
                        attempt = attempt + 1,
                        completion_tokens = completion.completion_tokens,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Answer generated"
                    );
                    return Generation {
                        answer,
                        model: choice.model.clone(),
                        prompt_tokens: completion.prompt_tokens,
                        completion_tokens: completion.completion_tokens,
                        attempts: attempt as u32 + 1,
                        failed: false,
                    };
                }
                Err(degraded) => {
                    tracing::warn!(
                        stage = degraded.stage,
                        attempt = attempt + 1,
                        timeout_ms = timeout.as_millis() as u64,
                        error = %degraded,
                        "Generation attempt failed"
                    );
                }
            }
        }

        tracing::error!(model = %choice.model, "Generation failed after 2 attempts");
        Generation {
            answer: APOLOGY_ANSWER.to_string(),
            model: choice.model.clone(),
            prompt_tokens: 0,
            completion_tokens: 0,
            attempts: 2,
            failed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::testing::ScriptedChat;
    use turf_advisor_core::Degraded;

    fn selector() -> ModelSelector {
        ModelSelector::new("gpt-4o", "gpt-4o-mini")
    }

    #[test]
    fn test_rate_lookup_uses_mini() {
        let choice = selector().select(
            "What is the label rate of Heritage for brown patch on bentgrass greens?",
            IntentHints {
                wants_rate: true,
                wants_diagnosis: false,
            },
            3,
        );
        assert_eq!(choice.tier, ModelTier::Mini);
        assert_eq!(choice.max_tokens, 800);
    }

    #[test]
    fn test_complex_and_image_use_full() {
        let s = selector();
        let choice = s.select(
            "Can you help me build a fungicide rotation program for summer on poa greens?",
            IntentHints::default(),
            2,
        );
        assert_eq!(choice.tier, ModelTier::Full);
        assert_eq!(choice.reason, "complex_query");

        let choice = s.select("diagnose from photo", IntentHints::default(), 10);
        assert_eq!(choice.reason, "image_diagnosis");
    }

    #[test]
    fn test_short_question_is_simple() {
        let choice = selector().select("Primo rate on bentgrass?", IntentHints::default(), 0);
        assert_eq!(choice.model, "gpt-4o-mini");
    }

    #[test]
    fn test_ambiguous_defaults_to_full() {
        let choice = selector().select(
            "My fairways look thin coming out of winter and I am wondering about options",
            IntentHints::default(),
            2,
        );
        assert_eq!(choice.reason, "default");
        let downgraded = choice.downgrade("gpt-4o-mini");
        assert_eq!(downgraded.tier, ModelTier::Mini);
        assert_eq!(downgraded.reason, "budget_downgrade");
    }

    #[tokio::test]
    async fn test_retry_uses_longer_timeout() {
        let chat = Arc::new(ScriptedChat::new(vec![
            Err(Degraded::timeout("llm", "first attempt")),
            Ok("Apply 0.2 oz/1000 sq ft.".to_string()),
        ]));
        let generator = Generator::new(chat.clone(), Duration::from_secs(20), Duration::from_secs(30));
        let choice = selector().select("Heritage rate?", IntentHints::default(), 1);

        let out = generator.generate(vec![ChatMessage::user("q")], &choice).await;
        assert!(!out.failed);
        assert_eq!(out.attempts, 2);
        assert_eq!(out.answer, "Apply 0.2 oz/1000 sq ft.");

        let requests = chat.requests();
        assert_eq!(requests[0].timeout, Duration::from_secs(20));
        assert_eq!(requests[1].timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_double_failure_returns_apology() {
        let generator = Generator::new(
            Arc::new(ScriptedChat::failing()),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );
        let out = generator
            .generate(vec![ChatMessage::user("q")], &selector().mini("test"))
            .await;
        assert!(out.failed);
        assert_eq!(out.answer, APOLOGY_ANSWER);
        assert_eq!(out.completion_tokens, 0);
    }

    #[tokio::test]
    async fn test_empty_reply_substituted() {
        let generator = Generator::new(
            Arc::new(ScriptedChat::always("   ")),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );
        let out = generator
            .generate(vec![ChatMessage::user("q")], &selector().full("test"))
            .await;
        assert_eq!(out.answer, EMPTY_ANSWER);
        assert!(!out.failed);
    }
}
