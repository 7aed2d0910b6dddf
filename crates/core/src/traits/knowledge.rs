//! Knowledge store trait

use crate::knowledge::{DiseaseFact, ProductFact};

/// Read-only product and disease facts with partial-name lookup
pub trait KnowledgeStore: Send + Sync + 'static {
    /// Product by active ingredient or trade name (substring match)
    fn product(&self, name: &str) -> Option<ProductFact>;

    /// Products whose active ingredient or a trade name occurs in `text`
    fn products_in(&self, text: &str) -> Vec<ProductFact>;

    /// Disease by common name (partial match, `_`/`-`/space insensitive)
    fn disease(&self, name: &str) -> Option<DiseaseFact>;

    /// First disease whose name occurs in `text`
    fn disease_in(&self, text: &str) -> Option<DiseaseFact>;

    /// Expert reference passage for a topic, if one is curated
    fn reference(&self, topic: &str) -> Option<String>;

    /// Whether `name` is a known product (exact, case-insensitive)
    fn is_known_product(&self, name: &str) -> bool;

    /// All products, for validators that scan answers
    fn all_products(&self) -> Vec<ProductFact>;
}
