//! Prompt building for answer generation
//!
//! The system prompt is a shared base plus at most one section picked by
//! product need first, then topic.

use turf_advisor_config::constants::limits;
use turf_advisor_core::{ChatMessage, ProductNeed, Role, Topic};
use unicode_segmentation::UnicodeSegmentation;

const BASE_PROMPT: &str = r#"You are an experienced golf course superintendent and turfgrass agronomist. You advise on products, diagnostics, cultural practices, equipment, planning and agronomic theory.

Answer the question that was asked. Give chemical options, cultural options or both as the question requires; disease and weed control questions get both.

## Safety rules
- Glyphosate is non-selective. Recommend it only for dormant bermudagrass, renovation or spot treatment.
- Fungicides treat diseases, herbicides treat weeds, insecticides treat insects, PGRs regulate growth. Never recommend a product outside its category.
- Check turf species tolerance and pre- versus post-emergence activity before recommending a herbicide.
- Only suggest tank mixes the label allows. DMI plus chlorothalonil in high heat risks phytotoxicity.
- Name the FRAC, HRAC or IRAC code with every pesticide and rotate between groups.
- Remind the reader to confirm state registration for any pesticide.

## Evidence
- Treat the provided context as the primary authority.
- When the context or verified product data gives a rate, use that exact rate.
- If sources disagree, say so.
- If the question is too vague to diagnose, ask about pattern, timing, recent events and grass type instead of guessing.

## Formatting
Plain text only, no LaTeX. Write calculations inline, for example "20 x 0.44 = 8.8%". Be concise."#;

const DISEASE_SECTION: &str = r#"## Disease management
- FRAC 1 (thiophanate-methyl) and FRAC 11 (strobilurins) carry high resistance risk; FRAC 3 (DMIs) and FRAC 7 (SDHIs) medium; multi-site contacts (chlorothalonil, fluazinam) low.
- Do not apply the same FRAC group more than twice in a row.
- Pair every fungicide program with cultural controls: leaf wetness, nitrogen, airflow and mowing practices.
- State whether a rate is preventive or curative and give the re-application interval."#;

const HERBICIDE_SECTION: &str = r#"## Weed management
- Separate pre-emergent from post-emergent options and give the application window.
- Pre-emergents block seed germination; never pair them with seeding in the same window unless the label allows it (siduron, mesotrione).
- Note warm-season versus cool-season tolerance for every herbicide.
- Include the HRAC group and the soil temperature trigger where relevant."#;

const INSECT_SECTION: &str = r#"## Insect management
- Identify the life stage that is targetable and time applications to it.
- Give thresholds where the context provides them.
- Include the IRAC group and pollinator precautions for flowering weeds."#;

const CULTURAL_SECTION: &str = r#"## Cultural practices
- Give timing by grass type and season, with equipment settings where relevant.
- Explain the agronomic reason behind each practice and the expected recovery time."#;

const IRRIGATION_SECTION: &str = r#"## Irrigation
- Work from evapotranspiration, soil type and root depth.
- Address distribution uniformity, run times and localized dry spots.
- Do not recommend pesticides for an irrigation question."#;

const FERTILIZER_SECTION: &str = r#"## Fertility
- Give nutrient rates in lbs per 1000 sq ft and show the product conversion.
- Typical nitrogen per application is 0.25-1.0 lbs N/1000 sq ft; annual totals depend on species.
- Use soil and tissue test results when they are provided."#;

const EQUIPMENT_SECTION: &str = r#"## Equipment and calibration
- Show calibration math step by step, for example GPA = (5940 x GPM) / (MPH x nozzle spacing in inches).
- Tank mixing order: wettable powders, agitate, liquids, emulsifiable concentrates, surfactants.
- Do not recommend pesticides for an equipment question."#;

const DIAGNOSTIC_SECTION: &str = r#"## Diagnosis
- List the likely causes in order of probability with the symptom that separates them.
- Consider abiotic causes (drought, traffic, chemical injury, shade) alongside disease and insects.
- Say what to check next to confirm before treating."#;

/// Topic-specific section; product need outranks topic
fn topic_section(topic: Option<Topic>, need: Option<ProductNeed>) -> Option<&'static str> {
    match need {
        Some(ProductNeed::Fungicide) => return Some(DISEASE_SECTION),
        Some(ProductNeed::Herbicide) => return Some(HERBICIDE_SECTION),
        Some(ProductNeed::Insecticide) => return Some(INSECT_SECTION),
        Some(ProductNeed::Pgr) | None => {}
    }
    match topic? {
        Topic::Irrigation => Some(IRRIGATION_SECTION),
        Topic::Equipment => Some(EQUIPMENT_SECTION),
        Topic::Cultural => Some(CULTURAL_SECTION),
        Topic::Fertilizer => Some(FERTILIZER_SECTION),
        Topic::Diagnostic => Some(DIAGNOSTIC_SECTION),
        Topic::Chemical | Topic::Disease => Some(DISEASE_SECTION),
    }
}

pub fn system_prompt(topic: Option<Topic>, need: Option<ProductNeed>) -> String {
    match topic_section(topic, need) {
        Some(section) => format!("{}\n\n{}", BASE_PROMPT, section),
        None => BASE_PROMPT.to_string(),
    }
}

/// Final user turn carrying the retrieved context
pub fn user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from research and manuals:\n\n{}\n\nQuestion: {}\n\n\
         Instructions:\n\
         1. Give specific options with actual rates and explain why each is recommended.\n\
         2. Include FRAC/HRAC/IRAC codes when recommending pesticides.\n\
         3. If verified product data is provided, use those exact rates.",
        context, question
    )
}

/// Rough token count, about four graphemes per token
pub fn estimate_tokens(text: &str) -> usize {
    text.graphemes(true).count().max(1) / 4
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Builds the message list sent to the generator
pub struct PromptBuilder {
    messages: Vec<ChatMessage>,
}

impl PromptBuilder {
    pub fn new(topic: Option<Topic>, need: Option<ProductNeed>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_prompt(topic, need))],
        }
    }

    /// Append curated question/answer pairs to the system prompt
    pub fn with_examples(mut self, examples: &[(String, String)]) -> Self {
        if examples.is_empty() {
            return self;
        }
        let mut block = String::from("\n\n--- CURATED EXAMPLES (reference for similar questions) ---");
        for (q, a) in examples {
            block.push_str(&format!("\nQ: {}\nA: {}\n", q, a));
        }
        if let Some(system) = self.messages.first_mut() {
            system.content.push_str(&block);
        }
        self
    }

    /// Add the last `HISTORY_TURNS` exchanges (a user and an assistant
    /// message each), with long assistant replies clipped
    pub fn with_history(mut self, history: &[ChatMessage]) -> Self {
        let start = history.len().saturating_sub(limits::HISTORY_TURNS * 2);
        for msg in &history[start..] {
            match msg.role {
                Role::User => self.messages.push(msg.clone()),
                Role::Assistant => self.messages.push(ChatMessage::assistant(truncate_chars(
                    &msg.content,
                    limits::HISTORY_ASSISTANT_CHARS,
                ))),
                Role::System => {}
            }
        }
        self
    }

    pub fn question(mut self, context: &str, question: &str) -> Self {
        self.messages.push(ChatMessage::user(user_prompt(context, question)));
        self
    }

    pub fn build(self) -> Vec<ChatMessage> {
        self.messages
    }

    /// Build, dropping the oldest history turns until the estimate fits.
    ///
    /// The system prompt and the final question are always kept.
    pub fn build_with_limit(self, max_tokens: usize) -> Vec<ChatMessage> {
        let total: usize = self.messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        if total <= max_tokens || self.messages.len() <= 2 {
            return self.messages;
        }

        let mut messages = self.messages;
        let last = messages.pop();
        let mut used: usize = messages
            .iter()
            .chain(last.iter())
            .map(|m| estimate_tokens(&m.content))
            .sum();

        let mut dropped = 0;
        while used > max_tokens && messages.len() > 1 {
            let removed = messages.remove(1);
            used -= estimate_tokens(&removed.content);
            dropped += 1;
        }
        messages.extend(last);

        tracing::debug!(
            "History truncated: {} -> {} tokens ({} messages dropped)",
            total,
            used,
            dropped
        );
        messages
    }

    pub fn estimate_tokens(&self) -> usize {
        self.messages.iter().map(|m| estimate_tokens(&m.content)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_need_outranks_topic() {
        let prompt = system_prompt(Some(Topic::Irrigation), Some(ProductNeed::Herbicide));
        assert!(prompt.contains("## Weed management"));
        assert!(!prompt.contains("## Irrigation"));
    }

    #[test]
    fn test_topic_sections() {
        assert!(system_prompt(Some(Topic::Equipment), None).contains("GPA = (5940"));
        assert!(system_prompt(Some(Topic::Chemical), None).contains("## Disease management"));
        assert_eq!(system_prompt(None, Some(ProductNeed::Pgr)), BASE_PROMPT);
    }

    #[test]
    fn test_history_is_bounded_and_clipped() {
        let mut history = Vec::new();
        for i in 0..8 {
            history.push(ChatMessage::user(format!("question {}", i)));
            history.push(ChatMessage::assistant("x".repeat(900)));
        }
        let messages = PromptBuilder::new(None, None)
            .with_history(&history)
            .question("ctx", "what about poa?")
            .build();

        // system + 6 turns of two messages + question
        assert_eq!(messages.len(), 14);
        assert_eq!(messages[1].content, "question 2");
        assert_eq!(messages[2].content.chars().count(), 503);
        assert_eq!(messages[11].content, "question 7");
        assert!(messages[13].content.contains("Question: what about poa?"));
    }

    #[test]
    fn test_examples_extend_system_prompt() {
        let examples = vec![("Heritage rate?".to_string(), "0.2-0.4 oz".to_string())];
        let messages = PromptBuilder::new(None, None).with_examples(&examples).build();
        assert!(messages[0].content.contains("Q: Heritage rate?"));
    }

    #[test]
    fn test_build_with_limit_keeps_system_and_question() {
        let history = vec![
            ChatMessage::user("a ".repeat(400)),
            ChatMessage::assistant("b ".repeat(200)),
            ChatMessage::user("recent"),
        ];
        let builder = PromptBuilder::new(None, None)
            .with_history(&history)
            .question("context", "final question");
        let budget = builder.estimate_tokens() - 150;
        let messages = builder.build_with_limit(budget);

        assert_eq!(messages.first().map(|m| m.role), Some(Role::System));
        assert!(messages.last().unwrap().content.contains("final question"));
        assert!(messages.len() < 5);
        assert!(messages.iter().any(|m| m.content == "recent"));
    }
}
