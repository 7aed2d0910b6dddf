//! Response returned by `ask`

use crate::retrieval::Source;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confidence {
    pub score: f32,
    pub label: String,
}

impl Confidence {
    pub fn new(score: f32, label: impl Into<String>) -> Self {
        Self {
            score,
            label: label.into(),
        }
    }

    /// Label for a computed confidence score
    pub fn labelled(score: f32) -> Self {
        let label = if score >= 75.0 {
            "High Confidence"
        } else if score >= 55.0 {
            "Good Confidence"
        } else if score >= 40.0 {
            "Moderate Confidence"
        } else {
            "Low Confidence"
        };
        Self::new(score, label)
    }
}

/// Why the pipeline stopped before generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortCircuit {
    Classifier,
    Feasibility,
    Budget,
    RateLimit,
    /// Every retrieval channel failed and a curated answer was served
    Unavailable,
}

impl ShortCircuit {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShortCircuit::Classifier => "classifier",
            ShortCircuit::Feasibility => "feasibility",
            ShortCircuit::Budget => "budget",
            ShortCircuit::RateLimit => "rate_limit",
            ShortCircuit::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub confidence: Confidence,
    pub needs_review: bool,
    pub grounding_issues: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_circuit: Option<ShortCircuit>,
}

impl AskResponse {
    /// Terminal response with no evidence (verdicts, budget, rate limit)
    pub fn terminal(
        answer: impl Into<String>,
        label: impl Into<String>,
        reason: ShortCircuit,
    ) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            confidence: Confidence::new(0.0, label),
            needs_review: false,
            grounding_issues: Vec::new(),
            images: Vec::new(),
            short_circuit: Some(reason),
        }
    }

    pub fn with_score(mut self, score: f32) -> Self {
        self.confidence.score = score;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_labels() {
        assert_eq!(Confidence::labelled(80.0).label, "High Confidence");
        assert_eq!(Confidence::labelled(75.0).label, "High Confidence");
        assert_eq!(Confidence::labelled(60.0).label, "Good Confidence");
        assert_eq!(Confidence::labelled(40.0).label, "Moderate Confidence");
        assert_eq!(Confidence::labelled(39.9).label, "Low Confidence");
    }

    #[test]
    fn test_terminal_response_serializes_reason() {
        let resp = AskResponse::terminal("Please try again tomorrow.", "Budget Exceeded", ShortCircuit::Budget);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["short_circuit"], "budget");
        assert_eq!(json["confidence"]["score"], 0.0);
        assert!(json.get("images").is_none());
    }
}
