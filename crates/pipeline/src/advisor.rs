//! The `ask` pipeline
//!
//! ```text
//! answer cache -> understand -> classifier / feasibility / budget gates
//!   -> retrieve -> score (-> reformulate) -> rerank -> safety filter
//!   -> assemble -> select model -> generate -> verify -> respond
//! ```
//!
//! Upstream failures degrade locally and are audited; only a malformed
//! question is an error.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use turf_advisor_config::constants::limits;
use turf_advisor_config::Settings;
use turf_advisor_core::{
    AskResponse, AuditEvent, AuditEventType, CachePolicy, CacheRegistry, ChatCompletion,
    ChatMessage, CompletionRequest, Confidence, ConversationRecord, ConversationSink, Degraded,
    Embedder, FeedbackRecord, KnowledgeStore, ScoredResult, ShortCircuit, Topic, TtlCache,
    VectorIndex,
};
use turf_advisor_llm::{estimate_tokens, Generator, IntentHints, ModelSelector, PromptBuilder};
use turf_advisor_query::{canned_response, detect_topic, sanitize_question, QueryUnderstanding};
use turf_advisor_rag::{
    build_reranker, display_sources, safety_filter, ContextAssembler, HybridRetriever,
    RetrievalQuery, Reranker, Scorer,
};
use turf_advisor_verify::{satisfaction, Calibrator, Verifier};
use uuid::Uuid;

use crate::budget::{BudgetStatus, DailyBudget, BUDGET_EXCEEDED_ANSWER};
use crate::golden::GoldenAnswers;
use crate::session::{history_messages, SessionStore};
use crate::{stats, PipelineError, Result};

/// Generator prompt budget; oldest history turns are dropped past this
const MAX_PROMPT_TOKENS: usize = 12_000;
const RECENT_CAPACITY: usize = 10_000;
const RECENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub const RATE_LIMITED_ANSWER: &str =
    "You're sending questions faster than I can answer them. Please wait a minute and try again.";

const REFORMULATE_PROMPT: &str = "The search below found nothing in a turfgrass research library. \
Rephrase it as a broader search query using standard turfgrass terminology. Keep product, disease \
and grass names. Reply with the query only.";

#[derive(Debug, Clone)]
pub struct AskRequest {
    pub question: String,
    pub user_id: String,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AskOutcome {
    /// Id of the logged conversation, referenced by feedback
    pub conversation_id: Uuid,
    pub response: AskResponse,
    pub cached: bool,
}

#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub conversation_id: Uuid,
    pub user_id: String,
    /// helpful, partially_helpful, unhelpful, wrong, ...
    pub rating: String,
    pub correction: Option<String>,
}

/// Tunables of the orchestration itself
#[derive(Debug, Clone)]
pub struct AdvisorOptions {
    pub rerank_top_k: usize,
    pub reformulate_on_empty: bool,
    pub utility_model: String,
    pub utility_timeout: Duration,
    pub answer_min_confidence: f32,
    pub display_url_prefixes: Vec<String>,
}

impl AdvisorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            rerank_top_k: settings.retrieval.rerank_top_k,
            reformulate_on_empty: settings.retrieval.reformulate_on_empty,
            utility_model: settings.llm.utility_model.clone(),
            utility_timeout: Duration::from_secs(settings.llm.utility_timeout_secs),
            answer_min_confidence: settings.cache.answer_min_confidence,
            display_url_prefixes: settings.retrieval.display_url_prefixes.clone(),
        }
    }
}

impl Default for AdvisorOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// External services the advisor talks to
pub struct Backends {
    pub chat: Arc<dyn ChatCompletion>,
    pub index: Arc<dyn VectorIndex>,
    pub embedder: Arc<dyn Embedder>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub sink: Arc<dyn ConversationSink>,
}

/// Every stage of the pipeline, constructed once
pub struct AdvisorParts {
    pub understanding: QueryUnderstanding,
    pub retriever: HybridRetriever,
    pub scorer: Scorer,
    pub reranker: Arc<dyn Reranker>,
    pub assembler: ContextAssembler,
    pub selector: ModelSelector,
    pub generator: Generator,
    pub verifier: Verifier,
    /// Utility model used to rephrase searches that found nothing
    pub reformulator: Arc<dyn ChatCompletion>,
    pub budget: DailyBudget,
    pub golden: GoldenAnswers,
    pub sessions: SessionStore,
    pub sink: Arc<dyn ConversationSink>,
    pub caches: Arc<CacheRegistry>,
    pub options: AdvisorOptions,
}

#[derive(Debug, Clone, Copy)]
struct Answered {
    topic: Option<Topic>,
    confidence: f32,
}

pub struct TurfAdvisor {
    parts: AdvisorParts,
    recent: TtlCache<Uuid, Answered>,
}

impl TurfAdvisor {
    pub fn new(parts: AdvisorParts) -> Self {
        Self {
            parts,
            recent: TtlCache::new(CachePolicy::new(RECENT_CAPACITY, RECENT_TTL)),
        }
    }

    /// Wire every stage from settings. A missing golden-answer file is
    /// logged and leaves the fallbacks empty.
    pub fn from_settings(settings: &Settings, backends: Backends) -> Self {
        let caches = Arc::new(CacheRegistry::new(
            settings.cache.embedding_policy(),
            settings.cache.search_policy(),
            settings.cache.answer_policy(),
        ));
        let golden = match &settings.knowledge.golden_answers_path {
            Some(path) => GoldenAnswers::load(path).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Golden answers unavailable");
                GoldenAnswers::default()
            }),
            None => GoldenAnswers::default(),
        };

        Self::new(AdvisorParts {
            understanding: QueryUnderstanding::from_settings(
                backends.chat.clone(),
                &settings.llm,
                &settings.query,
            ),
            retriever: HybridRetriever::new(
                backends.index,
                backends.embedder,
                caches.clone(),
                settings.retrieval.clone(),
            ),
            scorer: Scorer::new(settings.retrieval.clone(), settings.scoring.clone()),
            reranker: build_reranker(&settings.reranker),
            assembler: ContextAssembler::new(&settings.retrieval)
                .with_knowledge(backends.knowledge.clone()),
            selector: ModelSelector::from_settings(&settings.llm),
            generator: Generator::from_settings(backends.chat.clone(), &settings.llm),
            verifier: Verifier::from_settings(
                backends.chat.clone(),
                backends.knowledge,
                &settings.llm,
                &settings.verification,
            ),
            reformulator: backends.chat,
            budget: DailyBudget::new(settings.budget.clone()),
            golden,
            sessions: SessionStore::default(),
            sink: backends.sink,
            caches,
            options: AdvisorOptions::from_settings(settings),
        })
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.parts.caches
    }

    pub fn budget(&self) -> &DailyBudget {
        &self.parts.budget
    }

    pub fn calibrator(&self) -> &Arc<Calibrator> {
        self.parts.verifier.calibrator()
    }

    /// Whether the vector index answers
    pub async fn ready(&self) -> bool {
        self.parts.retriever.describe_stats().await.is_ok()
    }

    /// Answer one question. Errors only for empty or unreadable input.
    pub async fn ask(&self, request: &AskRequest) -> Result<AskOutcome> {
        let started = Instant::now();
        stats::record_ask();
        let conversation_id = Uuid::new_v4();
        let p = &self.parts;

        let text = sanitize_question(&request.question)?;
        let mut session = p.sessions.load(request.session_id.as_deref());

        let cache_key = session
            .history
            .is_empty()
            .then(|| CacheRegistry::answer_key(&request.user_id, &text));
        if let Some(key) = &cache_key {
            if let Some(hit) = p.caches.answers.get(key) {
                stats::record_answer_cache(true);
                tracing::info!(user_id = %request.user_id, "Answer cache hit");
                self.remember(conversation_id, request, &text, detect_topic(&text), &hit)
                    .await;
                return Ok(AskOutcome {
                    conversation_id,
                    response: hit,
                    cached: true,
                });
            }
            stats::record_answer_cache(false);
        }

        let stage = Instant::now();
        let understanding = p.understanding.understand(&text, &session).await?;
        stats::record_stage("understand", stage.elapsed());
        let question = &understanding.question;

        if let Some(response) = canned_response(understanding.classification.category) {
            let detail = understanding.classification.reason.clone();
            return Ok(self
                .short_circuit(conversation_id, request, response, AuditEventType::ClassifierRejected, detail)
                .await);
        }
        if let Some(response) = understanding.feasibility.response() {
            let detail = understanding.feasibility.issue_types().join(", ");
            return Ok(self
                .short_circuit(conversation_id, request, response, AuditEventType::FeasibilityRejected, detail)
                .await);
        }

        let budget = p.budget.status();
        if budget == BudgetStatus::Exceeded {
            let response = p
                .golden
                .fallback(question.topic, ShortCircuit::Budget)
                .unwrap_or_else(|| {
                    AskResponse::terminal(BUDGET_EXCEEDED_ANSWER, "Budget Exceeded", ShortCircuit::Budget)
                });
            let detail = format!("spent {:.2} USD today", p.budget.spent_today());
            return Ok(self
                .short_circuit(conversation_id, request, response, AuditEventType::BudgetExceeded, detail)
                .await);
        }

        let stage = Instant::now();
        let outcome = p.retriever.retrieve(&RetrievalQuery::from(question)).await;
        stats::record_stage("retrieve", stage.elapsed());
        for degraded in &outcome.degraded {
            self.audit_degraded(&request.user_id, degraded).await;
        }
        let matches = outcome.all_matches();
        if matches.is_empty() && !outcome.degraded.is_empty() {
            if let Some(response) = p.golden.fallback(question.topic, ShortCircuit::Unavailable) {
                stats::record_short_circuit(ShortCircuit::Unavailable);
                tracing::warn!(stage = "retrieval", "Retrieval unavailable, serving curated answer");
                self.remember(conversation_id, request, &understanding.asked, question.topic, &response)
                    .await;
                return Ok(AskOutcome {
                    conversation_id,
                    response,
                    cached: false,
                });
            }
        }

        let stage = Instant::now();
        let mut scored = p.scorer.score_results(matches, question);
        if scored.is_empty() && p.options.reformulate_on_empty {
            if let Some(rephrased) = self.reformulate(&question.rewritten).await {
                match p.retriever.search_general(&rephrased).await {
                    Ok(more) => scored = p.scorer.score_results(more, question),
                    Err(degraded) => self.audit_degraded(&request.user_id, &degraded).await,
                }
            }
        }
        stats::record_stage("score", stage.elapsed());

        let stage = Instant::now();
        let top_k = p.options.rerank_top_k;
        let reranked = self.rerank(&question.rewritten, scored, top_k).await;
        stats::record_stage("rerank", stage.elapsed());

        let results = safety_filter(reranked, question.topic, question.product_need, top_k);
        let reference = question
            .subject
            .as_deref()
            .or(question.topic.map(|t| t.as_str()));
        let bundle = p.assembler.assemble(&results, &understanding.asked, reference);

        let hints = IntentHints {
            wants_rate: understanding.intent.wants_rate,
            wants_diagnosis: understanding.intent.wants_diagnosis,
        };
        let mut choice = p.selector.select(&understanding.asked, hints, bundle.sources.len());
        if budget == BudgetStatus::Downgrade {
            choice = choice.downgrade(p.selector.mini_model());
        }

        if understanding.topic_changed {
            session.history.clear();
        }
        let messages = PromptBuilder::new(question.topic, question.product_need)
            .with_history(&history_messages(&session))
            .question(&bundle.text, &understanding.asked)
            .build_with_limit(MAX_PROMPT_TOKENS);
        let prompt_estimate: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();

        let stage = Instant::now();
        let generation = p.generator.generate(messages, &choice).await;
        stats::record_stage("generate", stage.elapsed());

        let sources = display_sources(&bundle.sources, &p.options.display_url_prefixes);
        let response = if generation.failed {
            self.audit_degraded(
                &request.user_id,
                &Degraded::unavailable("generation", "both attempts failed"),
            )
            .await;
            AskResponse {
                answer: generation.answer.clone(),
                sources,
                confidence: Confidence::labelled(0.0),
                needs_review: true,
                grounding_issues: vec!["Answer generation failed".to_string()],
                images: Vec::new(),
                short_circuit: None,
            }
        } else {
            let (prompt_tokens, completion_tokens) =
                if generation.prompt_tokens == 0 && generation.completion_tokens == 0 {
                    (prompt_estimate as u32, estimate_tokens(&generation.answer) as u32)
                } else {
                    (generation.prompt_tokens, generation.completion_tokens)
                };
            stats::record_spend(p.budget.record(&generation.model, prompt_tokens, completion_tokens));

            let stage = Instant::now();
            let verified = p.verifier.verify(&generation.answer, question, &bundle).await;
            stats::record_stage("verify", stage.elapsed());
            AskResponse {
                answer: verified.answer,
                sources,
                confidence: verified.confidence,
                needs_review: verified.needs_review,
                grounding_issues: verified.report.issue_messages(),
                images: bundle.images,
                short_circuit: None,
            }
        };

        if let Some(key) = cache_key {
            if !generation.failed && response.confidence.score >= p.options.answer_min_confidence {
                p.caches.answers.insert(key, response.clone());
            }
        }

        session.record(&understanding.asked, question, &response.answer, limits::HISTORY_TURNS);
        p.sessions.save(request.session_id.as_deref(), session);
        self.remember(conversation_id, request, &understanding.asked, question.topic, &response)
            .await;
        stats::record_answer(response.confidence.score, response.needs_review);
        tracing::info!(
            user_id = %request.user_id,
            model = %generation.model,
            sources = response.sources.len(),
            confidence = response.confidence.score,
            needs_review = response.needs_review,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(AskOutcome {
            conversation_id,
            response,
            cached: false,
        })
    }

    /// Response for a user over the request rate
    pub async fn rate_limited(&self, request: &AskRequest) -> AskResponse {
        let topic = detect_topic(&request.question);
        let response = self
            .parts
            .golden
            .fallback(topic, ShortCircuit::RateLimit)
            .unwrap_or_else(|| {
                AskResponse::terminal(RATE_LIMITED_ANSWER, "Rate Limited", ShortCircuit::RateLimit)
            });
        stats::record_short_circuit(ShortCircuit::RateLimit);
        self.audit(AuditEvent::new(
            AuditEventType::RateLimited,
            &request.user_id,
            "request rate exceeded",
        ))
        .await;
        response
    }

    /// Record user feedback and feed it to confidence calibration
    pub async fn feedback(&self, feedback: &FeedbackRequest) -> Result<()> {
        let rating = feedback.rating.trim();
        if rating.is_empty() {
            return Err(PipelineError::InvalidFeedback("rating is required".to_string()));
        }
        let observed = satisfaction(rating);

        match self.recent.get(&feedback.conversation_id) {
            Some(answered) => {
                let topic = answered.topic.map_or("general", |t| t.as_str());
                self.parts
                    .verifier
                    .calibrator()
                    .record(topic, answered.confidence, rating);
            }
            None => tracing::debug!(
                conversation_id = %feedback.conversation_id,
                "Feedback for unknown conversation, not calibrating"
            ),
        }

        let record = FeedbackRecord {
            conversation_id: feedback.conversation_id,
            user_id: feedback.user_id.clone(),
            rating: if observed >= 0.5 { 1 } else { -1 },
            correction: feedback.correction.clone(),
            created_at: Utc::now(),
        };
        if let Err(degraded) = self.parts.sink.record_feedback(&record).await {
            tracing::warn!(stage = degraded.stage, error = %degraded, "Feedback not persisted");
            stats::record_degraded(&degraded);
        }
        Ok(())
    }

    async fn short_circuit(
        &self,
        conversation_id: Uuid,
        request: &AskRequest,
        response: AskResponse,
        event: AuditEventType,
        detail: String,
    ) -> AskOutcome {
        if let Some(reason) = response.short_circuit {
            stats::record_short_circuit(reason);
            tracing::info!(reason = reason.as_str(), detail = %detail, "Pipeline short-circuited");
        }
        self.audit(AuditEvent::new(event, &request.user_id, detail)).await;
        AskOutcome {
            conversation_id,
            response,
            cached: false,
        }
    }

    async fn rerank(&self, query: &str, results: Vec<ScoredResult>, top_k: usize) -> Vec<ScoredResult> {
        let reranker = self.parts.reranker.clone();
        let query = query.to_string();
        let upstream = results.clone();
        match tokio::task::spawn_blocking(move || reranker.rerank(&query, results, top_k)).await {
            Ok(reranked) => reranked,
            Err(e) => {
                tracing::warn!(stage = "rerank", error = %e, "Reranker task failed, keeping upstream order");
                upstream.into_iter().take(top_k).collect()
            }
        }
    }

    /// One utility-model rephrase of a search that found nothing
    async fn reformulate(&self, query: &str) -> Option<String> {
        let opts = &self.parts.options;
        let request = CompletionRequest::new(
            opts.utility_model.clone(),
            vec![ChatMessage::system(REFORMULATE_PROMPT), ChatMessage::user(query)],
        )
        .with_max_tokens(150)
        .with_temperature(0.4)
        .with_timeout(opts.utility_timeout);

        match self.parts.reformulator.complete(request).await {
            Ok(completion) => {
                let rephrased = completion.text.trim().trim_matches('"').trim().to_string();
                if rephrased.is_empty() || rephrased.eq_ignore_ascii_case(query.trim()) {
                    return None;
                }
                tracing::info!(original = %query, rephrased = %rephrased, "Search reformulated");
                Some(rephrased)
            }
            Err(degraded) => {
                tracing::warn!(stage = "reformulate", error = %degraded, "Reformulation degraded");
                stats::record_degraded(&degraded);
                None
            }
        }
    }

    /// Log an answer and keep it addressable by feedback
    async fn remember(
        &self,
        id: Uuid,
        request: &AskRequest,
        asked: &str,
        topic: Option<Topic>,
        response: &AskResponse,
    ) {
        self.recent.insert(
            id,
            Answered {
                topic,
                confidence: response.confidence.score,
            },
        );
        self.persist(id, request, asked, topic, response).await;
    }

    async fn persist(
        &self,
        id: Uuid,
        request: &AskRequest,
        asked: &str,
        topic: Option<Topic>,
        response: &AskResponse,
    ) {
        let record = ConversationRecord {
            id,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
            question: asked.to_string(),
            answer: response.answer.clone(),
            confidence: response.confidence.score,
            needs_review: response.needs_review,
            sources: response.sources.iter().map(|s| s.name.clone()).collect(),
            topic: topic.map(|t| t.as_str().to_string()),
            created_at: Utc::now(),
        };
        if let Err(degraded) = self.parts.sink.record_conversation(&record).await {
            tracing::warn!(stage = degraded.stage, error = %degraded, "Conversation not persisted");
            stats::record_degraded(&degraded);
        }
        if response.needs_review {
            self.audit(AuditEvent::new(
                AuditEventType::NeedsReview,
                &request.user_id,
                format!("conversation {} confidence {:.1}", id, response.confidence.score),
            ))
            .await;
        }
    }

    async fn audit_degraded(&self, user_id: &str, degraded: &Degraded) {
        stats::record_degraded(degraded);
        self.audit(AuditEvent::new(AuditEventType::StageDegraded, user_id, degraded.to_string()))
            .await;
    }

    async fn audit(&self, event: AuditEvent) {
        if let Err(degraded) = self.parts.sink.record_audit(&event).await {
            tracing::warn!(
                stage = degraded.stage,
                event = event.event_type.as_str(),
                error = %degraded,
                "Audit event not persisted"
            );
        }
    }
}
