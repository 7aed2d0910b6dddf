//! Context assembly
//!
//! Renders ranked chunks into the bounded text handed to the generator,
//! with a numbered source list, verified knowledge facts and equipment
//! page images.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use turf_advisor_config::constants::sources::DEFAULT_SOURCES;
use turf_advisor_config::RetrievalConfig;
use turf_advisor_core::{ContextBundle, KnowledgeStore, ScoredResult, Source};

use crate::text::head;

const FACTS_HEADER: &str = "\n\n--- VERIFIED PRODUCT/DISEASE DATA ---\n\n";
const REFERENCE_HEADER: &str = "--- EXPERT REFERENCE DATA ---\n";
const RETRIEVED_HEADER: &str = "\n\n--- RETRIEVED SOURCES ---\n";
const MAX_IMAGES: usize = 6;

static EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.(pdf|doc|docx)$").expect("valid regex"));
static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_]?v?\d+(\.\d+)?$").expect("valid regex"));
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-_\s]*(label|sds|msds|specimen|booklet|brochure)[-_\s]*").expect("valid regex")
});
static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-_\s]+").expect("valid regex"));

/// Lowercased document name with extension, version and label boilerplate
/// removed, used to spot the same document under different file names
pub fn normalize_source_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let s = EXTENSION.replace(&lower, "");
    let s = VERSION.replace(&s, "");
    let s = BOILERPLATE.replace_all(&s, " ");
    SEPARATORS.replace_all(&s, " ").trim().to_string()
}

/// Cut `text` to at most `budget` characters.
///
/// Prefers the last paragraph break at or past 70% of the budget, then the
/// last sentence end past that point, then a hard cut.
pub fn truncate_context(text: &str, budget: usize) -> String {
    let cut = head(text, budget);
    if cut.len() == text.len() {
        return text.to_string();
    }
    let floor = head(cut, budget * 7 / 10).len();

    if let Some(pos) = cut.rfind("\n\n").filter(|p| *p >= floor) {
        return cut[..pos].to_string();
    }
    if let Some(pos) = cut.rfind(". ").filter(|p| *p >= floor) {
        return cut[..=pos].to_string();
    }
    cut.to_string()
}

/// Sources fit for display: those without a link, or whose link contains
/// one of `allowed`. Falls back to the default reference list when nothing
/// is left.
pub fn display_sources(sources: &[Source], allowed: &[String]) -> Vec<Source> {
    let shown: Vec<Source> = sources
        .iter()
        .filter(|s| match &s.url {
            None => true,
            Some(url) => allowed.is_empty() || allowed.iter().any(|a| url.contains(a.as_str())),
        })
        .cloned()
        .collect();

    if !shown.is_empty() {
        return shown;
    }
    DEFAULT_SOURCES
        .iter()
        .enumerate()
        .map(|(i, (name, url))| Source {
            number: i + 1,
            name: name.to_string(),
            url: Some(url.to_string()),
            source_type: "reference".to_string(),
        })
        .collect()
}

pub struct ContextAssembler {
    max_sources: usize,
    max_chunk_chars: usize,
    max_context_chars: usize,
    images_dir: Option<PathBuf>,
    knowledge: Option<Arc<dyn KnowledgeStore>>,
}

impl ContextAssembler {
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            max_sources: config.max_sources,
            max_chunk_chars: config.max_chunk_chars,
            max_context_chars: config.max_context_chars,
            images_dir: config.images_dir.as_ref().map(PathBuf::from),
            knowledge: None,
        }
    }

    pub fn with_knowledge(mut self, knowledge: Arc<dyn KnowledgeStore>) -> Self {
        self.knowledge = Some(knowledge);
        self
    }

    /// Render `results` (best first) for `question`.
    ///
    /// `reference_topic` selects a curated expert passage to put in front of
    /// the retrieved text.
    pub fn assemble(
        &self,
        results: &[ScoredResult],
        question: &str,
        reference_topic: Option<&str>,
    ) -> ContextBundle {
        let (retrieved, sources, images) = self.render_results(results);

        let reference = reference_topic
            .zip(self.knowledge.as_ref())
            .and_then(|(topic, kb)| kb.reference(topic));
        let facts = self.knowledge_facts(question);

        let prefix = reference
            .map(|r| format!("{}{}{}", REFERENCE_HEADER, r, RETRIEVED_HEADER))
            .unwrap_or_default();
        let fixed = prefix.chars().count() + facts.chars().count();
        let retrieved = truncate_context(&retrieved, self.max_context_chars.saturating_sub(fixed));

        let sources: Vec<Source> = sources
            .into_iter()
            .filter(|s| retrieved.contains(&format!("[Source {}:", s.number)))
            .collect();

        let text = if retrieved.is_empty() {
            String::new()
        } else {
            format!("{}{}{}", prefix, retrieved, facts)
        };

        ContextBundle {
            text,
            sources,
            images,
        }
    }

    fn render_results(&self, results: &[ScoredResult]) -> (String, Vec<Source>, Vec<String>) {
        let mut text = String::new();
        let mut sources: Vec<Source> = Vec::new();
        let mut numbers: HashMap<String, usize> = HashMap::new();
        let mut seen_chunks: HashSet<String> = HashSet::new();
        let mut images: Vec<String> = Vec::new();

        for result in results {
            if !seen_chunks.insert(head(result.text(), 200).to_string()) {
                continue;
            }
            let normalized = normalize_source_name(result.source());
            let number = match numbers.get(&normalized) {
                Some(n) => *n,
                None => {
                    if sources.len() >= self.max_sources {
                        continue;
                    }
                    let n = sources.len() + 1;
                    numbers.insert(normalized, n);
                    sources.push(Source {
                        number: n,
                        name: result.source().to_string(),
                        url: result.metadata.url.clone(),
                        source_type: result.metadata.doc_type_or_default().to_string(),
                    });
                    n
                }
            };

            text.push_str(&format!(
                "[Source {}: {}]\n{}\n\n---\n\n",
                number,
                result.source(),
                head(result.text(), self.max_chunk_chars)
            ));

            if result.id.to_lowercase().contains("equipment") {
                for image in self.equipment_images(&result.id) {
                    if !images.contains(&image) && images.len() < MAX_IMAGES {
                        images.push(image);
                    }
                }
            }
        }

        (text, sources, images)
    }

    fn equipment_images(&self, match_id: &str) -> Vec<String> {
        let Some(dir) = &self.images_dir else {
            return Vec::new();
        };
        let doc = match_id
            .split("-chunk-")
            .next()
            .unwrap_or(match_id)
            .replace("equipment-", "");
        (1..=3)
            .map(|page| format!("{}_page_{}.jpg", doc, page))
            .filter(|name| dir.join(name).exists())
            .collect()
    }

    fn knowledge_facts(&self, question: &str) -> String {
        let Some(kb) = &self.knowledge else {
            return String::new();
        };
        let mut lines: Vec<String> = kb
            .products_in(question)
            .iter()
            .map(|p| format!("[Knowledge Base - {}]: {}", p.display_name(), p.render()))
            .collect();
        if let Some(d) = kb.disease_in(question) {
            lines.push(format!("[Knowledge Base - {}]: {}", d.display_name(), d.render()));
        }
        if lines.is_empty() {
            return String::new();
        }
        format!("{}{}", FACTS_HEADER, lines.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use turf_advisor_core::testing::StaticKnowledge;
    use turf_advisor_core::{ChunkMetadata, ProductFact, ProductNeed};

    fn result(id: &str, source: &str, text: &str) -> ScoredResult {
        ScoredResult {
            id: id.into(),
            score: 1.0,
            vector_score: 0.8,
            keyword_score: 0.0,
            rrf_score: 0.0,
            metadata: ChunkMetadata {
                source: source.into(),
                text: text.into(),
                doc_type: Some("pesticide_label".into()),
                ..Default::default()
            },
        }
    }

    fn assembler() -> ContextAssembler {
        ContextAssembler::new(&RetrievalConfig::default())
    }

    #[test]
    fn test_normalize_source_name() {
        assert_eq!(normalize_source_name("Heritage_Label_v2.pdf"), "heritage");
        assert_eq!(normalize_source_name("Heritage-SDS.pdf"), "heritage");
        assert_eq!(normalize_source_name("Dollar  Spot_Guide"), "dollar spot guide");
    }

    #[test]
    fn test_sources_deduplicated_by_normalized_name() {
        let results = vec![
            result("1", "Heritage Label.pdf", "Apply 0.2-0.4 oz/1000 sq ft."),
            result("2", "Heritage_SDS.pdf", "Wear gloves when mixing."),
            result("3", "Dollar Spot Guide", "Dollar spot favors humid nights."),
        ];
        let bundle = assembler().assemble(&results, "heritage rate", None);
        assert_eq!(bundle.sources.len(), 2);
        assert_eq!(bundle.sources[0].name, "Heritage Label.pdf");
        assert!(bundle.text.contains("Wear gloves"));
        assert!(bundle.text.contains("[Source 2: Dollar Spot Guide]"));
    }

    #[test]
    fn test_every_source_has_text_after_truncation() {
        let long = "word ".repeat(400);
        let results: Vec<_> = (0..10)
            .map(|i| result(&i.to_string(), &format!("Doc {}", i), &format!("doc {} {}", i, long)))
            .collect();
        let mut config = RetrievalConfig::default();
        config.max_context_chars = 3000;
        let bundle = ContextAssembler::new(&config).assemble(&results, "q", None);
        assert!(bundle.text.chars().count() <= 3000);
        assert!(!bundle.sources.is_empty());
        for s in &bundle.sources {
            assert!(bundle.text.contains(&format!("[Source {}:", s.number)));
        }
        assert!(bundle.sources.len() < 10);
    }

    #[test]
    fn test_truncate_prefers_paragraph_break() {
        let text = format!("{}\n\n{}", "a".repeat(80), "b".repeat(50));
        assert_eq!(truncate_context(&text, 100), "a".repeat(80));
    }

    #[test]
    fn test_truncate_falls_back_to_sentence_then_hard_cut() {
        let text = format!("{}. {}", "a".repeat(80), "b".repeat(50));
        assert_eq!(truncate_context(&text, 100), format!("{}.", "a".repeat(80)));
        let text = "c".repeat(150);
        assert_eq!(truncate_context(&text, 100), "c".repeat(100));
        assert_eq!(truncate_context("short", 100), "short");
    }

    #[test]
    fn test_knowledge_facts_appended() {
        let kb = StaticKnowledge {
            products: vec![ProductFact {
                active_ingredient: "azoxystrobin".into(),
                category: ProductNeed::Fungicide,
                trade_names: vec!["Heritage".into()],
                moa_code: Some("11".into()),
                rates: BTreeMap::from([("preventive".into(), "0.2-0.4 oz/1000 sq ft".into())]),
                targets: vec![],
            }],
            diseases: vec![],
        };
        let bundle = assembler()
            .with_knowledge(Arc::new(kb))
            .assemble(&[result("1", "Label", "text")], "Heritage rate?", None);
        assert!(bundle.text.contains("--- VERIFIED PRODUCT/DISEASE DATA ---"));
        assert!(bundle.text.contains("[Knowledge Base - Heritage]"));
    }

    #[test]
    fn test_empty_results_give_empty_bundle() {
        let bundle = assembler().assemble(&[], "q", None);
        assert!(bundle.is_empty());
        assert!(bundle.sources.is_empty());
    }

    #[test]
    fn test_display_sources_fallback() {
        let hidden = vec![Source {
            number: 1,
            name: "Internal".into(),
            url: Some("file:///private/x.pdf".into()),
            source_type: "document".into(),
        }];
        let shown = display_sources(&hidden, &["https://".to_string()]);
        assert_eq!(shown.len(), DEFAULT_SOURCES.len());
        assert_eq!(display_sources(&hidden, &[]).len(), 1);
    }

    #[test]
    fn test_equipment_images() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("toro-reelmaster_page_1.jpg"), b"").unwrap();
        let mut config = RetrievalConfig::default();
        config.images_dir = Some(dir.path().to_string_lossy().into_owned());
        let bundle = ContextAssembler::new(&config).assemble(
            &[result("equipment-toro-reelmaster-chunk-3", "Reelmaster Manual", "bedknife")],
            "q",
            None,
        );
        assert_eq!(bundle.images, vec!["toro-reelmaster_page_1.jpg".to_string()]);
    }
}
