//! Question and the attributes derived from it
//!
//! A [`Question`] is built once from user input and then only annotated:
//! every `with_*` call consumes the value and returns a new one.

use serde::{Deserialize, Serialize};

/// Classifier verdict. Only [`QueryCategory::Good`] proceeds to retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
    OffTopic,
    Vague,
    MissingContext,
    Injection,
    Good,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::OffTopic => "off_topic",
            QueryCategory::Vague => "vague",
            QueryCategory::MissingContext => "missing_context",
            QueryCategory::Injection => "injection",
            QueryCategory::Good => "good",
        }
    }

    /// Parse a judge label; accepts the aliases the classifier prompt allows
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "off_topic" | "off-topic" | "offtopic" => Some(QueryCategory::OffTopic),
            "vague" | "vague_turf" => Some(QueryCategory::Vague),
            "missing_context" | "missing-context" => Some(QueryCategory::MissingContext),
            "injection" | "prompt_injection" => Some(QueryCategory::Injection),
            "good" | "good_query" => Some(QueryCategory::Good),
            _ => None,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, QueryCategory::Good)
    }
}

/// Subject area used for prompt selection and safety filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Diagnostic,
    Disease,
    Chemical,
    Fertilizer,
    Irrigation,
    Equipment,
    Cultural,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Diagnostic => "diagnostic",
            Topic::Disease => "disease",
            Topic::Chemical => "chemical",
            Topic::Fertilizer => "fertilizer",
            Topic::Irrigation => "irrigation",
            Topic::Equipment => "equipment",
            Topic::Cultural => "cultural",
        }
    }

    /// Questions about these never need pesticide label text
    pub fn is_non_chemical(&self) -> bool {
        matches!(self, Topic::Irrigation | Topic::Equipment)
    }
}

/// Pesticide category the question is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductNeed {
    Fungicide,
    Herbicide,
    Insecticide,
    Pgr,
}

impl ProductNeed {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductNeed::Fungicide => "fungicide",
            ProductNeed::Herbicide => "herbicide",
            ProductNeed::Insecticide => "insecticide",
            ProductNeed::Pgr => "pgr",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrassType {
    Bentgrass,
    Bermudagrass,
    PoaAnnua,
    KentuckyBluegrass,
    TallFescue,
    PerennialRyegrass,
    Zoysiagrass,
}

impl GrassType {
    pub const ALL: [GrassType; 7] = [
        GrassType::Bentgrass,
        GrassType::Bermudagrass,
        GrassType::PoaAnnua,
        GrassType::KentuckyBluegrass,
        GrassType::TallFescue,
        GrassType::PerennialRyegrass,
        GrassType::Zoysiagrass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrassType::Bentgrass => "bentgrass",
            GrassType::Bermudagrass => "bermudagrass",
            GrassType::PoaAnnua => "poa annua",
            GrassType::KentuckyBluegrass => "kentucky bluegrass",
            GrassType::TallFescue => "tall fescue",
            GrassType::PerennialRyegrass => "perennial ryegrass",
            GrassType::Zoysiagrass => "zoysiagrass",
        }
    }

    pub fn is_warm_season(&self) -> bool {
        matches!(self, GrassType::Bermudagrass | GrassType::Zoysiagrass)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Northeast,
    Southeast,
    Midwest,
    Southwest,
    West,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Northeast => "northeast",
            Region::Southeast => "southeast",
            Region::Midwest => "midwest",
            Region::Southwest => "southwest",
            Region::West => "west",
        }
    }
}

/// User question plus everything query understanding derives from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Question {
    original: String,
    pub rewritten: String,
    pub expanded: String,
    pub topic: Option<Topic>,
    pub product_need: Option<ProductNeed>,
    pub grass_type: Option<GrassType>,
    pub region: Option<Region>,
    pub state: Option<String>,
    /// Most specific subject named (disease, product, weed, pest)
    pub subject: Option<String>,
}

impl Question {
    pub fn new(text: impl Into<String>) -> Self {
        let original = text.into();
        Self {
            rewritten: original.clone(),
            expanded: original.to_lowercase(),
            original,
            topic: None,
            product_need: None,
            grass_type: None,
            region: None,
            state: None,
            subject: None,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn lower(&self) -> String {
        self.original.to_lowercase()
    }

    pub fn with_rewritten(mut self, rewritten: impl Into<String>) -> Self {
        self.rewritten = rewritten.into();
        self
    }

    pub fn with_expanded(mut self, expanded: impl Into<String>) -> Self {
        self.expanded = expanded.into();
        self
    }

    pub fn with_topic(mut self, topic: Option<Topic>) -> Self {
        self.topic = topic;
        self
    }

    pub fn with_product_need(mut self, need: Option<ProductNeed>) -> Self {
        self.product_need = need;
        self
    }

    pub fn with_grass_type(mut self, grass: Option<GrassType>) -> Self {
        self.grass_type = grass;
        self
    }

    pub fn with_region(mut self, region: Option<Region>) -> Self {
        self.region = region;
        self
    }

    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    pub fn with_subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_aliases() {
        assert_eq!(QueryCategory::parse("vague_turf"), Some(QueryCategory::Vague));
        assert_eq!(QueryCategory::parse(" GOOD_QUERY "), Some(QueryCategory::Good));
        assert_eq!(QueryCategory::parse("banana"), None);
    }

    #[test]
    fn test_question_annotation_keeps_original() {
        let q = Question::new("Heritage rate for Dollar Spot")
            .with_rewritten("heritage azoxystrobin rate for dollar spot")
            .with_product_need(Some(ProductNeed::Fungicide));
        assert_eq!(q.original(), "Heritage rate for Dollar Spot");
        assert_eq!(q.product_need, Some(ProductNeed::Fungicide));
        assert_eq!(q.expanded, "heritage rate for dollar spot");
    }

    #[test]
    fn test_warm_season() {
        assert!(GrassType::Bermudagrass.is_warm_season());
        assert!(!GrassType::Bentgrass.is_warm_season());
    }
}
