//! Verification report types

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Year or "recent" claim the evidence does not contain
    UnsupportedTemporal,
    /// Product-like name that is neither indexed nor in context
    UnknownProduct,
    /// Product named for the wrong pest category
    ProductCategory,
    DangerousMixing,
    RateMismatch,
    ModeOfActionMismatch,
    DiseaseProductMismatch,
    GerminationTemperature,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl VerificationIssue {
    pub fn new(kind: IssueKind, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
        }
    }
}

/// LLM-judge verdict on whether the answer is supported by the context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundingReport {
    pub grounded: bool,
    pub confidence: f32,
    #[serde(default)]
    pub unsupported_claims: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
    /// False when the judge was skipped or failed and this is a default
    #[serde(default)]
    pub checked: bool,
}

impl GroundingReport {
    /// Verdict used when the judge is unavailable or unparseable
    pub fn conservative(reason: impl Into<String>) -> Self {
        Self {
            grounded: false,
            confidence: 0.0,
            unsupported_claims: Vec::new(),
            issues: vec![reason.into()],
            checked: false,
        }
    }

    /// Verdict for answers too short to judge
    pub fn skipped() -> Self {
        Self {
            grounded: true,
            confidence: 1.0,
            unsupported_claims: Vec::new(),
            issues: Vec::new(),
            checked: false,
        }
    }
}

/// Issues from one deterministic checker with its capped penalty (0-100 scale)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckReport {
    pub issues: Vec<VerificationIssue>,
    pub penalty: f32,
}

impl CheckReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationReport {
    pub grounding: GroundingReport,
    pub hallucination: CheckReport,
    pub validation: CheckReport,
}

impl VerificationReport {
    /// Human-readable issues for the response payload
    pub fn issue_messages(&self) -> Vec<String> {
        let mut out: Vec<String> = self.grounding.issues.clone();
        out.extend(
            self.grounding
                .unsupported_claims
                .iter()
                .map(|c| format!("Unsupported claim: {}", c)),
        );
        out.extend(self.hallucination.issues.iter().map(|i| i.message.clone()));
        out.extend(self.validation.issues.iter().map(|i| i.message.clone()));
        out
    }
}

/// Whether an answer must be flagged for human review.
///
/// Downstream subsystems rely on exactly these four triggers.
pub fn needs_review(
    confidence: f32,
    grounding: &GroundingReport,
    source_count: usize,
) -> bool {
    confidence < 70.0
        || !grounding.grounded
        || grounding.unsupported_claims.len() > 1
        || source_count == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded() -> GroundingReport {
        GroundingReport {
            grounded: true,
            confidence: 0.9,
            unsupported_claims: vec![],
            issues: vec![],
            checked: true,
        }
    }

    #[test]
    fn test_review_triggers() {
        assert!(!needs_review(80.0, &grounded(), 3));
        assert!(needs_review(69.9, &grounded(), 3));
        assert!(needs_review(90.0, &grounded(), 0));
        assert!(needs_review(90.0, &GroundingReport::conservative("judge down"), 3));

        let mut claims = grounded();
        claims.unsupported_claims = vec!["a".into()];
        assert!(!needs_review(90.0, &claims, 3));
        claims.unsupported_claims.push("b".into());
        assert!(needs_review(90.0, &claims, 3));
    }

    #[test]
    fn test_issue_messages_union() {
        let report = VerificationReport {
            grounding: GroundingReport {
                unsupported_claims: vec!["rate is 2 oz".into()],
                ..grounded()
            },
            hallucination: CheckReport::default(),
            validation: CheckReport {
                issues: vec![VerificationIssue::new(
                    IssueKind::RateMismatch,
                    Severity::High,
                    "Heritage rate exceeds label",
                )],
                penalty: 8.0,
            },
        };
        let messages = report.issue_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("rate is 2 oz"));
    }
}
