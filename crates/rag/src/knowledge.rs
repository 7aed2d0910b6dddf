//! File-backed knowledge store
//!
//! Reads `products`, `diseases` and `references` documents (YAML or JSON)
//! from one directory at startup. Missing files leave that part empty.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;
use turf_advisor_core::{DiseaseFact, KnowledgeStore, ProductFact, ProductNeed};

use crate::RagError;

const CATEGORIES: [(&str, ProductNeed); 4] = [
    ("fungicides", ProductNeed::Fungicide),
    ("herbicides", ProductNeed::Herbicide),
    ("insecticides", ProductNeed::Insecticide),
    ("pgrs", ProductNeed::Pgr),
];

#[derive(Debug, Default, Deserialize)]
struct RawProduct {
    #[serde(default)]
    trade_names: Vec<String>,
    #[serde(default, alias = "frac_code", alias = "hrac_group", alias = "irac_group")]
    moa_code: Option<Value>,
    #[serde(default)]
    rates: BTreeMap<String, Value>,
    #[serde(default, alias = "diseases", alias = "weeds", alias = "pests")]
    targets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawChemicalControl {
    #[serde(default)]
    top_products: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDisease {
    #[serde(default)]
    pathogen: Option<Value>,
    #[serde(default)]
    environmental_triggers: Option<Value>,
    #[serde(default)]
    cultural_control: Option<Value>,
    #[serde(default)]
    chemical_control: Option<RawChemicalControl>,
}

/// Render a loosely typed YAML/JSON value as one line of text
fn flatten(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Sequence(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Mapping(map) => {
            let parts: Vec<String> = map
                .iter()
                .filter_map(|(k, v)| Some(format!("{}: {}", flatten(k)?, flatten(v)?)))
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        Value::Tagged(tagged) => flatten(&tagged.value),
    }
}

#[derive(Debug, Default)]
pub struct FileKnowledgeStore {
    products: Vec<ProductFact>,
    diseases: Vec<DiseaseFact>,
    references: HashMap<String, String>,
}

impl FileKnowledgeStore {
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, RagError> {
        let dir = dir.as_ref();
        let mut store = Self::default();

        if let Some(raw) = read_document::<BTreeMap<String, BTreeMap<String, RawProduct>>>(dir, "products")? {
            store.products = products_from(raw);
        }
        if let Some(raw) = read_document::<BTreeMap<String, RawDisease>>(dir, "diseases")? {
            store.diseases = raw
                .into_iter()
                .map(|(name, d)| DiseaseFact {
                    name: name.to_lowercase(),
                    pathogen: d.pathogen.as_ref().and_then(flatten),
                    environmental_triggers: d.environmental_triggers.as_ref().and_then(flatten),
                    cultural_control: d.cultural_control.as_ref().and_then(flatten),
                    top_products: d.chemical_control.map(|c| c.top_products).unwrap_or_default(),
                })
                .collect();
        }
        if let Some(refs) = read_document::<HashMap<String, String>>(dir, "references")? {
            store.references = refs.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect();
        }

        tracing::info!(
            products = store.products.len(),
            diseases = store.diseases.len(),
            references = store.references.len(),
            dir = %dir.display(),
            "Knowledge store loaded"
        );
        Ok(store)
    }

    pub fn from_facts(products: Vec<ProductFact>, diseases: Vec<DiseaseFact>) -> Self {
        Self {
            products,
            diseases,
            references: HashMap::new(),
        }
    }

    pub fn with_reference(mut self, topic: &str, text: impl Into<String>) -> Self {
        self.references.insert(topic.to_lowercase(), text.into());
        self
    }

    fn normalize_disease(name: &str) -> String {
        name.trim().to_lowercase().replace([' ', '-'], "_")
    }
}

fn products_from(raw: BTreeMap<String, BTreeMap<String, RawProduct>>) -> Vec<ProductFact> {
    let mut out = Vec::new();
    for (key, category) in CATEGORIES {
        let Some(entries) = raw.get(key) else {
            continue;
        };
        for (ai, p) in entries {
            out.push(ProductFact {
                active_ingredient: ai.to_lowercase(),
                category,
                trade_names: p.trade_names.clone(),
                moa_code: p.moa_code.as_ref().and_then(flatten),
                rates: p
                    .rates
                    .iter()
                    .filter_map(|(k, v)| flatten(v).map(|v| (k.clone(), v)))
                    .collect(),
                targets: p.targets.clone(),
            });
        }
    }
    out
}

fn document_path(dir: &Path, stem: &str) -> Option<PathBuf> {
    ["yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .find(|p| p.exists())
}

fn read_document<T: serde::de::DeserializeOwned>(dir: &Path, stem: &str) -> Result<Option<T>, RagError> {
    let Some(path) = document_path(dir, stem) else {
        tracing::warn!(dir = %dir.display(), document = stem, "Knowledge document not found");
        return Ok(None);
    };
    let raw = std::fs::read_to_string(&path)
        .map_err(|e| RagError::Index(format!("{}: {}", path.display(), e)))?;
    serde_yaml::from_str(&raw)
        .map(Some)
        .map_err(|e| RagError::Index(format!("{}: {}", path.display(), e)))
}

impl KnowledgeStore for FileKnowledgeStore {
    fn product(&self, name: &str) -> Option<ProductFact> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.products
            .iter()
            .find(|p| p.names().iter().any(|n| n.contains(&needle)))
            .cloned()
    }

    fn products_in(&self, text: &str) -> Vec<ProductFact> {
        let lower = text.to_lowercase();
        self.products
            .iter()
            .filter(|p| p.names().iter().any(|n| !n.is_empty() && lower.contains(n.as_str())))
            .cloned()
            .collect()
    }

    fn disease(&self, name: &str) -> Option<DiseaseFact> {
        let needle = Self::normalize_disease(name);
        if needle.is_empty() {
            return None;
        }
        self.diseases
            .iter()
            .find(|d| d.name == needle)
            .or_else(|| {
                self.diseases
                    .iter()
                    .find(|d| d.name.contains(&needle) || needle.contains(&d.name))
            })
            .cloned()
    }

    fn disease_in(&self, text: &str) -> Option<DiseaseFact> {
        let lower = text.to_lowercase();
        self.diseases
            .iter()
            .find(|d| lower.contains(&d.display_name()) || lower.contains(&d.name))
            .cloned()
    }

    fn reference(&self, topic: &str) -> Option<String> {
        self.references.get(&topic.to_lowercase()).cloned()
    }

    fn is_known_product(&self, name: &str) -> bool {
        let lower = name.trim().to_lowercase();
        self.products.iter().any(|p| p.names().contains(&lower))
    }

    fn all_products(&self) -> Vec<ProductFact> {
        self.products.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCTS: &str = r#"
fungicides:
  azoxystrobin:
    trade_names: [Heritage]
    frac_code: 11
    rates:
      preventive: "0.2-0.4 oz/1000 sq ft"
    diseases: [brown_patch, summer_patch]
herbicides:
  mesotrione:
    trade_names: [Tenacity]
    hrac_group: "27"
    rates:
      postemergence: "5 fl oz/acre"
"#;

    const DISEASES: &str = r#"{
  "dollar_spot": {
    "pathogen": "Clarireedia jacksonii",
    "environmental_triggers": {"temperature": "60-85F", "humidity": "high"},
    "cultural_control": ["reduce leaf wetness", "adequate nitrogen"],
    "chemical_control": {"top_products": ["Xzemplar", "Banner Maxx"]}
  },
  "brown_patch": {"pathogen": "Rhizoctonia solani"}
}"#;

    fn store() -> (tempfile::TempDir, FileKnowledgeStore) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.yaml"), PRODUCTS).unwrap();
        std::fs::write(dir.path().join("diseases.json"), DISEASES).unwrap();
        std::fs::write(dir.path().join("references.yaml"), "Disease: \"Scout at dawn.\"\n").unwrap();
        let store = FileKnowledgeStore::load(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_product_lookup_by_trade_and_partial_name() {
        let (_dir, kb) = store();
        let p = kb.product("heritage").unwrap();
        assert_eq!(p.active_ingredient, "azoxystrobin");
        assert_eq!(p.moa_code.as_deref(), Some("11"));
        assert_eq!(p.max_label_rate(), Some(0.4));
        assert_eq!(kb.product("azoxy").unwrap().category, ProductNeed::Fungicide);
        assert!(kb.product("unobtainium").is_none());
        assert!(kb.is_known_product("Tenacity"));
        assert!(!kb.is_known_product("Tena"));
    }

    #[test]
    fn test_disease_lookup() {
        let (_dir, kb) = store();
        assert_eq!(kb.disease("Dollar Spot").unwrap().name, "dollar_spot");
        assert_eq!(kb.disease("brown-patch").unwrap().name, "brown_patch");
        let d = kb.disease("dollar").unwrap();
        assert!(d.environmental_triggers.unwrap().contains("temperature: 60-85F"));
        assert_eq!(d.top_products, vec!["Xzemplar", "Banner Maxx"]);
    }

    #[test]
    fn test_mentions_in_text() {
        let (_dir, kb) = store();
        let found = kb.products_in("Can I tank mix Heritage with Tenacity?");
        assert_eq!(found.len(), 2);
        assert_eq!(kb.disease_in("dollar spot on greens").unwrap().name, "dollar_spot");
        assert_eq!(kb.reference("disease").as_deref(), Some("Scout at dawn."));
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let kb = FileKnowledgeStore::load(dir.path().join("nope")).unwrap();
        assert!(kb.all_products().is_empty());
    }

    #[test]
    fn test_malformed_document_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("products.json"), "{ not valid").unwrap();
        assert!(FileKnowledgeStore::load(dir.path()).is_err());
    }
}
