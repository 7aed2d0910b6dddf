//! LLM-judge grounding check

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use turf_advisor_config::{LlmSettings, VerificationConfig};
use turf_advisor_core::{ChatCompletion, ChatMessage, CompletionRequest, GroundingReport};

const GROUNDING_PROMPT: &str = "You are a fact-checker for a turf management assistant. Decide whether \
the assistant's answer is supported by the source context.

Source context:
{context}

Assistant answer:
{answer}

User question:
{question}

Check that every claim is supported by the sources, that no rates, products or facts were invented, \
and that the answer addresses the question. Be strict about product rates: a rate such as \
\"0.5 oz/1000 sq ft\" that does not appear in the sources is unsupported.

Reply with JSON only:
{\"grounded\": true or false, \"confidence\": 0.0-1.0, \"issues\": [\"...\"], \"unsupported_claims\": [\"...\"]}";

/// Appended to answers the judge was clearly unhappy with
pub const GROUNDING_WARNING: &str = "\n\n**Note:** Some details in this response may need verification \
against product labels or university guidelines.";

#[derive(Debug, Deserialize)]
struct RawJudgement {
    grounded: bool,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    issues: Vec<String>,
    #[serde(default)]
    unsupported_claims: Vec<String>,
}

fn parse_judgement(reply: &str) -> Option<GroundingReport> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    let raw: RawJudgement = serde_json::from_str(&reply[start..=end]).ok()?;
    Some(GroundingReport {
        grounded: raw.grounded,
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        unsupported_claims: raw.unsupported_claims,
        issues: raw.issues,
        checked: true,
    })
}

fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub struct GroundingJudge {
    chat: Arc<dyn ChatCompletion>,
    model: String,
    timeout: Duration,
    enabled: bool,
    context_chars: usize,
    min_answer_chars: usize,
}

impl GroundingJudge {
    pub fn new(chat: Arc<dyn ChatCompletion>, model: impl Into<String>, timeout: Duration) -> Self {
        let defaults = VerificationConfig::default();
        Self {
            chat,
            model: model.into(),
            timeout,
            enabled: defaults.grounding_enabled,
            context_chars: defaults.grounding_context_chars,
            min_answer_chars: defaults.grounding_min_answer_chars,
        }
    }

    pub fn from_settings(chat: Arc<dyn ChatCompletion>, llm: &LlmSettings, config: &VerificationConfig) -> Self {
        let mut judge = Self::new(
            chat,
            llm.utility_model.clone(),
            Duration::from_secs(llm.utility_timeout_secs),
        );
        judge.enabled = config.grounding_enabled;
        judge.context_chars = config.grounding_context_chars;
        judge.min_answer_chars = config.grounding_min_answer_chars;
        judge
    }

    /// Ask the judge whether `answer` is supported by `context`.
    ///
    /// Short answers are not judged. A failed or unreadable judgement yields
    /// [`GroundingReport::conservative`].
    pub async fn check(&self, answer: &str, context: &str, question: &str) -> GroundingReport {
        if !self.enabled || answer.chars().count() < self.min_answer_chars {
            return GroundingReport::skipped();
        }

        let prompt = GROUNDING_PROMPT
            .replace("{context}", clip(context, self.context_chars))
            .replace("{answer}", answer)
            .replace("{question}", question);
        let request = CompletionRequest::new(self.model.clone(), vec![ChatMessage::user(prompt)])
            .with_max_tokens(300)
            .with_temperature(0.1)
            .with_timeout(self.timeout)
            .json();

        let reply = match self.chat.complete(request).await {
            Ok(completion) => completion.text,
            Err(degraded) => {
                tracing::warn!(stage = "grounding", error = %degraded, "Grounding judge unavailable");
                return GroundingReport::conservative("Grounding check unavailable");
            }
        };

        match parse_judgement(&reply) {
            Some(report) => {
                tracing::info!(
                    grounded = report.grounded,
                    confidence = report.confidence,
                    unsupported = report.unsupported_claims.len(),
                    "Grounding check"
                );
                report
            }
            None => {
                tracing::warn!(stage = "grounding", "Could not parse grounding judgement");
                GroundingReport::conservative("Grounding check returned an unreadable verdict")
            }
        }
    }
}

/// Whether the answer should carry [`GROUNDING_WARNING`]
pub fn needs_grounding_warning(report: &GroundingReport) -> bool {
    report.checked
        && !report.grounded
        && (report.confidence < 0.5 || report.unsupported_claims.len() > 2)
}

/// Shift a 0-100 base score by the judge's verdict.
///
/// Ungrounded answers lose 15 points, each unsupported claim costs 5 (at
/// most 15) and a clean verdict earns 5. Adjusted scores never fall below 30.
pub fn grounding_adjustment(base: f32, report: &GroundingReport) -> f32 {
    if !report.grounded {
        return (base - 15.0).max(30.0);
    }
    let claims = report.unsupported_claims.len();
    if claims > 0 {
        let penalty = (claims as f32 * 5.0).min(15.0);
        return (base - penalty).max(30.0);
    }
    if report.checked {
        (base + 5.0).min(100.0)
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turf_advisor_core::testing::ScriptedChat;

    const ANSWER: &str = "Apply Heritage at 0.2-0.4 oz/1000 sq ft on a 14-21 day interval for brown patch.";

    fn judge(chat: Arc<ScriptedChat>) -> GroundingJudge {
        GroundingJudge::new(chat, "mini", Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_parses_fenced_judgement() {
        let chat = Arc::new(ScriptedChat::always(
            "```json\n{\"grounded\": false, \"confidence\": 0.4, \"issues\": [], \"unsupported_claims\": [\"21 day interval\"]}\n```",
        ));
        let report = judge(chat.clone()).check(ANSWER, "Heritage 0.2-0.4 oz", "heritage rate").await;
        assert!(report.checked);
        assert!(!report.grounded);
        assert_eq!(report.unsupported_claims, vec!["21 day interval"]);
        assert!(chat.requests()[0].json_mode);
    }

    #[tokio::test]
    async fn test_failures_are_conservative() {
        let report = judge(Arc::new(ScriptedChat::failing())).check(ANSWER, "ctx", "q").await;
        assert!(!report.grounded);
        assert!(!report.checked);

        let report = judge(Arc::new(ScriptedChat::always("looks fine to me"))).check(ANSWER, "ctx", "q").await;
        assert!(!report.grounded);
        assert_eq!(report.issues.len(), 1);
    }

    #[tokio::test]
    async fn test_short_answers_skip_judge() {
        let chat = Arc::new(ScriptedChat::failing());
        let report = judge(chat.clone()).check("Use Heritage.", "ctx", "q").await;
        assert!(report.grounded);
        assert!(chat.requests().is_empty());
    }

    #[test]
    fn test_context_is_clipped_on_char_boundary() {
        assert_eq!(clip("°F°F", 3), "°F°");
        assert_eq!(clip("abc", 10), "abc");
    }

    #[test]
    fn test_adjustment() {
        let mut report = GroundingReport::skipped();
        assert_eq!(grounding_adjustment(70.0, &report), 70.0);
        report.checked = true;
        assert_eq!(grounding_adjustment(98.0, &report), 100.0);
        report.unsupported_claims = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        assert_eq!(grounding_adjustment(80.0, &report), 65.0);
        assert_eq!(grounding_adjustment(40.0, &GroundingReport::conservative("down")), 30.0);
    }

    #[test]
    fn test_warning_only_for_judged_failures() {
        assert!(!needs_grounding_warning(&GroundingReport::conservative("down")));
        let report = GroundingReport {
            grounded: false,
            confidence: 0.3,
            unsupported_claims: vec![],
            issues: vec![],
            checked: true,
        };
        assert!(needs_grounding_warning(&report));
    }
}
