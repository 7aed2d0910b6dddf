//! Search-oriented question rewriting

use std::sync::Arc;
use std::time::Duration;

use turf_advisor_config::{LlmSettings, QueryConfig};
use turf_advisor_core::{CachePolicy, ChatCompletion, ChatMessage, CompletionRequest, TtlCache};

const REWRITE_PROMPT: &str = "You rewrite questions into search queries for a golf course and turf \
management knowledge base. The base holds pesticide labels, disease control guides with efficacy \
ratings, cultural practice guides, equipment manuals and university research.

Rules:
1. Expand abbreviations (DS -> dollar spot, BP -> brown patch, PGR -> plant growth regulator)
2. Keep the grass type and product category if they are mentioned
3. Add common synonyms for the key terms
4. Stay under 100 words
5. If the question is already specific, change as little as possible
6. Product questions: include \"rate\" and \"application\"
7. Disease questions: include \"control\" and \"fungicide\"
8. Weed questions: include \"herbicide\" and whether the weed is annual or perennial

Examples:
- \"heritage rate\" -> \"Heritage fungicide application rate per 1000 sq ft azoxystrobin timing\"
- \"brown spots on my green\" -> \"brown patch disease diagnosis bentgrass putting green fungicide control Rhizoctonia\"
- \"when to spray barricade\" -> \"Barricade prodiamine pre-emergent herbicide application timing soil temperature spring\"

Reply with the rewritten query only.";

pub struct QueryRewriter {
    chat: Arc<dyn ChatCompletion>,
    model: String,
    timeout: Duration,
    enabled: bool,
    skip_chars: usize,
    max_chars: usize,
    cache: TtlCache<String, String>,
}

impl QueryRewriter {
    pub fn new(chat: Arc<dyn ChatCompletion>, model: impl Into<String>, timeout: Duration, cache: CachePolicy) -> Self {
        let defaults = QueryConfig::default();
        Self {
            chat,
            model: model.into(),
            timeout,
            enabled: true,
            skip_chars: defaults.rewrite_skip_chars,
            max_chars: defaults.rewrite_max_chars,
            cache: TtlCache::new(cache),
        }
    }

    pub fn from_settings(chat: Arc<dyn ChatCompletion>, llm: &LlmSettings, query: &QueryConfig) -> Self {
        let mut rewriter = Self::new(
            chat,
            llm.utility_model.clone(),
            Duration::from_secs(llm.utility_timeout_secs),
            query.cache_policy(),
        );
        rewriter.enabled = query.rewrite_enabled;
        rewriter.skip_chars = query.rewrite_skip_chars;
        rewriter.max_chars = query.rewrite_max_chars;
        rewriter
    }

    /// Rewrite for search. Any failure returns the question unchanged.
    pub async fn rewrite(&self, question: &str) -> String {
        if !self.enabled || question.chars().count() > self.skip_chars {
            return question.to_string();
        }

        let key = question.trim().to_lowercase();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }

        let request = CompletionRequest::new(
            self.model.clone(),
            vec![ChatMessage::system(REWRITE_PROMPT), ChatMessage::user(question)],
        )
        .with_max_tokens(150)
        .with_temperature(0.3)
        .with_timeout(self.timeout);

        let reply = match self.chat.complete(request).await {
            Ok(completion) => completion.text,
            Err(degraded) => {
                tracing::warn!(stage = "rewriter", error = %degraded, "Rewrite degraded, searching original");
                return question.to_string();
            }
        };

        let rewritten = reply.trim().trim_matches('"').trim();
        if rewritten.is_empty() || rewritten.chars().count() > self.max_chars {
            tracing::warn!(
                stage = "rewriter",
                chars = rewritten.chars().count(),
                "Rewrite rejected, searching original"
            );
            return question.to_string();
        }

        tracing::debug!(original = %question, rewritten = %rewritten, "Question rewritten");
        self.cache.insert(key, rewritten.to_string());
        rewritten.to_string()
    }
}
