//! Post-generation verification
//!
//! The grounding judge is the only check that calls out; the deterministic
//! checks run alongside it. Notes from every check are appended to the
//! answer and the penalties fold into one calibrated confidence.

use std::sync::Arc;

use turf_advisor_config::{LlmSettings, VerificationConfig};
use turf_advisor_core::{
    needs_review, ChatCompletion, Confidence, ContextBundle, KnowledgeStore, Question,
    VerificationReport,
};

use crate::calibration::Calibrator;
use crate::confidence::{base_confidence, combine};
use crate::grounding::{needs_grounding_warning, GroundingJudge, GROUNDING_WARNING};
use crate::hallucination::HallucinationFilter;
use crate::validator::DomainValidator;

/// Topic key for calibration when detection found none
const GENERAL_TOPIC: &str = "general";

/// Answer text after notes were appended, plus the verdicts behind it
#[derive(Debug, Clone)]
pub struct VerifiedAnswer {
    pub answer: String,
    pub confidence: Confidence,
    pub report: VerificationReport,
    pub needs_review: bool,
}

pub struct Verifier {
    judge: GroundingJudge,
    hallucination: HallucinationFilter,
    validator: DomainValidator,
    calibrator: Arc<Calibrator>,
}

impl Verifier {
    pub fn new(
        judge: GroundingJudge,
        hallucination: HallucinationFilter,
        validator: DomainValidator,
        calibrator: Arc<Calibrator>,
    ) -> Self {
        Self {
            judge,
            hallucination,
            validator,
            calibrator,
        }
    }

    /// Build every check from settings.
    ///
    /// A calibration file that cannot be read is logged and replaced by an
    /// empty calibrator.
    pub fn from_settings(
        chat: Arc<dyn ChatCompletion>,
        knowledge: Arc<dyn KnowledgeStore>,
        llm: &LlmSettings,
        config: &VerificationConfig,
    ) -> Self {
        let calibrator = match &config.calibration_path {
            Some(path) => Calibrator::load(path, config.calibration_min_points).unwrap_or_else(|e| {
                tracing::warn!(path = %path, error = %e, "Starting with empty calibration");
                Calibrator::new(config.calibration_min_points)
            }),
            None => Calibrator::new(config.calibration_min_points),
        };
        Self::new(
            GroundingJudge::from_settings(chat, llm, config),
            HallucinationFilter::new(knowledge.clone(), config.hallucination_cap),
            DomainValidator::new(knowledge, config.validation_cap),
            Arc::new(calibrator),
        )
    }

    pub fn calibrator(&self) -> &Arc<Calibrator> {
        &self.calibrator
    }

    pub async fn verify(
        &self,
        answer: &str,
        question: &Question,
        context: &ContextBundle,
    ) -> VerifiedAnswer {
        let asked = question.original();
        let (grounding, (hallucination, validation)) = tokio::join!(
            self.judge.check(answer, &context.text, asked),
            async {
                (
                    self.hallucination.check(answer, asked, &context.text),
                    self.validator.validate(answer, asked, &context.text),
                )
            }
        );

        let mut text = answer.to_string();
        for note in hallucination.notes.iter().chain(validation.notes.iter()) {
            text.push_str("\n\n");
            text.push_str(note);
        }
        if needs_grounding_warning(&grounding) {
            text.push_str(GROUNDING_WARNING);
        }

        let base = base_confidence(&context.sources, answer, asked);
        let raw = combine(
            base,
            &grounding,
            hallucination.report.penalty,
            validation.report.penalty,
        );
        let topic = question.topic.map_or(GENERAL_TOPIC, |t| t.as_str());
        let score = self.calibrator.adjust(topic, raw);
        let review = needs_review(score, &grounding, context.sources.len());

        tracing::info!(
            base,
            raw,
            score,
            grounded = grounding.grounded,
            hallucination_penalty = hallucination.report.penalty,
            validation_penalty = validation.report.penalty,
            needs_review = review,
            "Verified answer"
        );

        VerifiedAnswer {
            answer: text,
            confidence: Confidence::labelled(score),
            report: VerificationReport {
                grounding,
                hallucination: hallucination.report,
                validation: validation.report,
            },
            needs_review: review,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::Duration;
    use turf_advisor_core::testing::{ScriptedChat, StaticKnowledge};
    use turf_advisor_core::{IssueKind, ProductFact, ProductNeed, Source, Topic};

    const GROUNDED: &str =
        r#"{"grounded": true, "confidence": 0.9, "issues": [], "unsupported_claims": []}"#;

    fn knowledge() -> Arc<StaticKnowledge> {
        Arc::new(StaticKnowledge {
            products: vec![ProductFact {
                active_ingredient: "azoxystrobin".into(),
                category: ProductNeed::Fungicide,
                trade_names: vec!["Heritage".into()],
                moa_code: Some("11".into()),
                rates: BTreeMap::from([(
                    "preventive".to_string(),
                    "0.2-0.4 oz/1000 sq ft".to_string(),
                )]),
                targets: vec!["dollar_spot".into()],
            }],
            diseases: vec![],
        })
    }

    fn verifier(chat: ScriptedChat) -> Verifier {
        let knowledge = knowledge();
        Verifier::new(
            GroundingJudge::new(Arc::new(chat), "utility", Duration::from_secs(5)),
            HallucinationFilter::new(knowledge.clone(), 30.0),
            DomainValidator::new(knowledge, 25.0),
            Arc::new(Calibrator::default()),
        )
    }

    fn context() -> ContextBundle {
        ContextBundle {
            text: "[Source 1: Heritage Label]\nApply 0.2–0.4 oz/1000 sq ft for dollar spot.".into(),
            sources: vec![
                Source {
                    number: 1,
                    name: "Heritage Label".into(),
                    url: None,
                    source_type: "label".into(),
                },
                Source {
                    number: 2,
                    name: "Rutgers Extension".into(),
                    url: None,
                    source_type: "web".into(),
                },
            ],
            images: vec![],
        }
    }

    fn question() -> Question {
        Question::new("Heritage rate for dollar spot on bentgrass").with_topic(Some(Topic::Chemical))
    }

    #[tokio::test]
    async fn test_clean_answer_scores_high() {
        let v = verifier(ScriptedChat::always(GROUNDED));
        let out = v
            .verify(
                "Apply Heritage at 0.2-0.4 oz/1000 sq ft every 14-28 days for dollar spot on bentgrass greens.",
                &question(),
                &context(),
            )
            .await;
        assert!(out.confidence.score >= 75.0);
        assert_eq!(out.confidence.label, "High Confidence");
        assert!(!out.needs_review);
        assert!(out.report.grounding.checked);
        assert!(!out.answer.contains("**Verification Note"));
    }

    #[tokio::test]
    async fn test_rate_mismatch_lowers_confidence_and_adds_note() {
        let clean = verifier(ScriptedChat::always(GROUNDED))
            .verify(
                "Apply Heritage at 0.4 oz/1000 sq ft every 14-28 days for dollar spot on bentgrass greens.",
                &question(),
                &context(),
            )
            .await;
        let flagged = verifier(ScriptedChat::always(GROUNDED))
            .verify(
                "Apply Heritage at 0.5 oz/1000 sq ft every 14-28 days for dollar spot on bentgrass greens.",
                &question(),
                &context(),
            )
            .await;
        assert!(flagged.confidence.score < clean.confidence.score);
        assert_eq!(flagged.report.validation.issues[0].kind, IssueKind::RateMismatch);
        assert!(flagged.answer.contains("**Verification Note:**"));
    }

    #[tokio::test]
    async fn test_judge_outage_forces_review() {
        let out = verifier(ScriptedChat::failing())
            .verify(
                "Apply Heritage at 0.2-0.4 oz/1000 sq ft every 14-28 days for dollar spot on bentgrass greens.",
                &question(),
                &context(),
            )
            .await;
        assert!(!out.report.grounding.grounded);
        assert!(!out.report.grounding.checked);
        assert!(out.needs_review);
        assert!(!out.answer.contains(GROUNDING_WARNING));
    }

    #[tokio::test]
    async fn test_ungrounded_verdict_appends_warning() {
        let judge = r#"{"grounded": false, "confidence": 0.2, "issues": ["rate not in context"], "unsupported_claims": []}"#;
        let out = verifier(ScriptedChat::always(judge))
            .verify(
                "Apply Heritage at 0.2-0.4 oz/1000 sq ft every 14-28 days for dollar spot on bentgrass greens.",
                &question(),
                &context(),
            )
            .await;
        assert!(out.answer.ends_with(GROUNDING_WARNING));
        assert!(out.needs_review);
        assert!(out.report.issue_messages().contains(&"rate not in context".to_string()));
    }

    #[tokio::test]
    async fn test_no_sources_needs_review() {
        let mut empty = context();
        empty.sources.clear();
        let out = verifier(ScriptedChat::always(GROUNDED))
            .verify("Short answer.", &question(), &empty)
            .await;
        assert!(!out.report.grounding.checked);
        assert!(out.needs_review);
    }
}
