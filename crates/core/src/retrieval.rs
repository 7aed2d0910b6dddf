//! Retrieval data model: channels, matches, scored results, context bundles

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Independent vector-search channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    General,
    Product,
    Timing,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::General => "general",
            Channel::Product => "product",
            Channel::Timing => "timing",
        }
    }
}

/// How recently a source was confirmed current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    #[default]
    Fresh,
    Aging,
    Stale,
    VeryStale,
}

impl Freshness {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "aging" => Freshness::Aging,
            "stale" => Freshness::Stale,
            "very_stale" | "very-stale" => Freshness::VeryStale,
            _ => Freshness::Fresh,
        }
    }
}

/// Chunk metadata: the fields scoring reads, plus passthrough
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document name as displayed to users
    pub source: String,
    pub text: String,
    /// `pesticide_label`, `pesticide_product`, `solution_sheet`, ...
    pub doc_type: Option<String>,
    pub url: Option<String>,
    pub country: Option<String>,
    #[serde(default)]
    pub freshness: Freshness,
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl ChunkMetadata {
    /// Split a flat key/value payload into known fields and `extra`
    pub fn from_fields(mut fields: HashMap<String, String>) -> Self {
        let text = fields.remove("text").unwrap_or_default();
        let source = fields
            .remove("source")
            .or_else(|| fields.get("document_name").cloned())
            .or_else(|| fields.get("product_name").cloned())
            .unwrap_or_else(|| "Unknown".to_string());
        let doc_type = fields.remove("type");
        let url = fields.remove("url").or_else(|| fields.get("label_url").cloned());
        let country = fields.remove("country");
        let freshness = fields
            .remove("freshness")
            .map(|f| Freshness::parse(&f))
            .unwrap_or_default();

        Self {
            source,
            text,
            doc_type,
            url,
            country,
            freshness,
            extra: fields,
        }
    }

    pub fn doc_type_or_default(&self) -> &str {
        self.doc_type.as_deref().unwrap_or("document")
    }

    /// Source name and text, lowercased, for keyword checks
    pub fn source_lower(&self) -> String {
        self.source.to_lowercase()
    }
}

/// One hit from the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    /// Raw similarity from the index
    pub score: f32,
    pub metadata: ChunkMetadata,
}

/// Matches per channel; a failed channel is simply empty
#[derive(Debug, Clone, Default)]
pub struct ChannelResults {
    pub general: Vec<Match>,
    pub product: Vec<Match>,
    pub timing: Vec<Match>,
}

impl ChannelResults {
    pub fn is_empty(&self) -> bool {
        self.general.is_empty() && self.product.is_empty() && self.timing.is_empty()
    }

    pub fn len(&self) -> usize {
        self.general.len() + self.product.len() + self.timing.len()
    }

    pub fn channel(&self, channel: Channel) -> &[Match] {
        match channel {
            Channel::General => &self.general,
            Channel::Product => &self.product,
            Channel::Timing => &self.timing,
        }
    }

    /// All matches, channel by channel
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.general
            .iter()
            .chain(self.product.iter())
            .chain(self.timing.iter())
    }
}

/// A match after fusion and the boost/penalty chain.
///
/// `score` is only comparable within one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub id: String,
    pub score: f32,
    pub vector_score: f32,
    pub keyword_score: f32,
    pub rrf_score: f32,
    pub metadata: ChunkMetadata,
}

impl ScoredResult {
    pub fn source(&self) -> &str {
        &self.metadata.source
    }

    pub fn text(&self) -> &str {
        &self.metadata.text
    }
}

/// Citation shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub number: usize,
    pub name: String,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub source_type: String,
}

/// Rendered context handed to the generator.
///
/// Every entry in `sources` has text present in `text`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextBundle {
    pub text: String,
    pub sources: Vec<Source>,
    pub images: Vec<String>,
}

impl ContextBundle {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Equality filter over a metadata field (`field IN values`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataFilter {
    pub field: String,
    pub values: Vec<String>,
}

impl MetadataFilter {
    pub fn any_of(field: impl Into<String>, values: &[&str]) -> Self {
        Self {
            field: field.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        let value = match self.field.as_str() {
            "type" => metadata.doc_type.as_deref(),
            "source" => Some(metadata.source.as_str()),
            "country" => metadata.country.as_deref(),
            other => metadata.extra.get(other).map(String::as_str),
        };
        value.map_or(false, |v| self.values.iter().any(|allowed| allowed == v))
    }

    /// Stable string form used in search cache keys
    pub fn cache_key(&self) -> String {
        format!("{}in[{}]", self.field, self.values.join(","))
    }
}

/// Vector index statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_vectors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_metadata_from_fields() {
        let meta = ChunkMetadata::from_fields(fields(&[
            ("source", "Heritage Label"),
            ("text", "Apply 0.2-0.4 oz"),
            ("type", "pesticide_label"),
            ("freshness", "very_stale"),
            ("brand", "Syngenta"),
        ]));
        assert_eq!(meta.source, "Heritage Label");
        assert_eq!(meta.doc_type.as_deref(), Some("pesticide_label"));
        assert_eq!(meta.freshness, Freshness::VeryStale);
        assert_eq!(meta.extra.get("brand").map(String::as_str), Some("Syngenta"));
        assert!(!meta.extra.contains_key("text"));
    }

    #[test]
    fn test_metadata_source_fallback() {
        let meta = ChunkMetadata::from_fields(fields(&[("document_name", "Rutgers Fact Sheet")]));
        assert_eq!(meta.source, "Rutgers Fact Sheet");
        assert_eq!(meta.doc_type_or_default(), "document");
    }

    #[test]
    fn test_filter_matches_type() {
        let filter = MetadataFilter::any_of("type", &["pesticide_label", "pesticide_product"]);
        let label = ChunkMetadata {
            doc_type: Some("pesticide_product".into()),
            ..Default::default()
        };
        let sheet = ChunkMetadata {
            doc_type: Some("solution_sheet".into()),
            ..Default::default()
        };
        assert!(filter.matches(&label));
        assert!(!filter.matches(&sheet));
        assert!(!filter.matches(&ChunkMetadata::default()));
    }
}
