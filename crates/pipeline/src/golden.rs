//! Curated fallback answers keyed by topic
//!
//! Served when the pipeline cannot produce a fresh answer: the daily budget
//! is spent, the user is rate limited, or every retrieval channel is down.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use turf_advisor_core::{AskResponse, Confidence, ShortCircuit, Source, Topic};

use crate::PipelineError;

/// Confidence reported for a curated answer that was not generated for this question
pub const GOLDEN_SCORE: f32 = 65.0;
const GENERAL_KEY: &str = "general";

#[derive(Debug, Clone, Deserialize)]
struct RawSource {
    name: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default = "default_source_type", rename = "type")]
    source_type: String,
}

fn default_source_type() -> String {
    "reference".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct RawGolden {
    answer: String,
    #[serde(default)]
    sources: Vec<RawSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GoldenAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default)]
pub struct GoldenAnswers {
    by_topic: HashMap<String, GoldenAnswer>,
}

impl GoldenAnswers {
    /// Load a YAML or JSON map of `topic -> {answer, sources}`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Golden(format!("{}: {}", path.display(), e)))?;
        let parsed: HashMap<String, RawGolden> = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&raw).map_err(|e| PipelineError::Golden(e.to_string()))?
        } else {
            serde_yaml::from_str(&raw).map_err(|e| PipelineError::Golden(e.to_string()))?
        };

        let by_topic: HashMap<String, GoldenAnswer> = parsed
            .into_iter()
            .map(|(topic, g)| {
                let sources = g
                    .sources
                    .into_iter()
                    .enumerate()
                    .map(|(i, s)| Source {
                        number: i + 1,
                        name: s.name,
                        url: s.url,
                        source_type: s.source_type,
                    })
                    .collect();
                (
                    topic.to_lowercase(),
                    GoldenAnswer {
                        answer: g.answer,
                        sources,
                    },
                )
            })
            .collect();
        tracing::info!(topics = by_topic.len(), path = %path.display(), "Golden answers loaded");
        Ok(Self { by_topic })
    }

    pub fn insert(&mut self, topic: &str, answer: GoldenAnswer) {
        self.by_topic.insert(topic.to_lowercase(), answer);
    }

    pub fn len(&self) -> usize {
        self.by_topic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }

    /// The topic's curated answer, else the general one
    pub fn lookup(&self, topic: Option<Topic>) -> Option<&GoldenAnswer> {
        topic
            .and_then(|t| self.by_topic.get(t.as_str()))
            .or_else(|| self.by_topic.get(GENERAL_KEY))
    }

    /// Response built from the curated answer for `topic`
    pub fn fallback(&self, topic: Option<Topic>, reason: ShortCircuit) -> Option<AskResponse> {
        let golden = self.lookup(topic)?;
        Some(AskResponse {
            answer: golden.answer.clone(),
            sources: golden.sources.clone(),
            confidence: Confidence::labelled(GOLDEN_SCORE),
            needs_review: true,
            grounding_issues: Vec::new(),
            images: Vec::new(),
            short_circuit: Some(reason),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
disease:
  answer: "Rotate FRAC groups and reduce leaf wetness."
  sources:
    - name: "Turfgrass Disease Guide"
      url: "https://extension.example.edu/disease"
      type: "extension"
general:
  answer: "Start with a soil test and correct mowing height."
"#;

    #[test]
    fn test_load_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("golden_answers.yaml");
        std::fs::write(&path, YAML).unwrap();

        let golden = GoldenAnswers::load(&path).unwrap();
        assert_eq!(golden.len(), 2);

        let disease = golden.lookup(Some(Topic::Disease)).unwrap();
        assert_eq!(disease.sources[0].number, 1);
        assert_eq!(disease.sources[0].source_type, "extension");

        let fallback = golden.lookup(Some(Topic::Irrigation)).unwrap();
        assert!(fallback.answer.starts_with("Start with a soil test"));
    }

    #[test]
    fn test_fallback_response_is_flagged() {
        let mut golden = GoldenAnswers::default();
        assert!(golden.fallback(None, ShortCircuit::Budget).is_none());

        golden.insert(
            "chemical",
            GoldenAnswer {
                answer: "Follow the label.".into(),
                sources: vec![],
            },
        );
        let response = golden.fallback(Some(Topic::Chemical), ShortCircuit::Budget).unwrap();
        assert_eq!(response.confidence.score, GOLDEN_SCORE);
        assert!(response.needs_review);
        assert_eq!(response.short_circuit, Some(ShortCircuit::Budget));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(GoldenAnswers::load(dir.path().join("missing.yaml")).is_err());
    }
}
