//! Query understanding for the turf advisor
//!
//! This crate turns raw user text into an annotated [`Question`]:
//! - **Sanitizing**: control characters, whitespace, length limits
//! - **Classification**: utility-model verdict with a rule-based fallback
//! - **Rewriting**: search-oriented rephrasing, skipped for long questions
//! - **Detection**: grass type, region, state, product need, topic, subject
//! - **Expansion**: synonym expansion and vague-question rewrites
//! - **Feasibility**: deterministic gate for contradictory or unsafe questions
//!
//! # Example
//!
//! ```ignore
//! use turf_advisor_query::{QueryUnderstanding, SessionContext};
//!
//! let understanding = QueryUnderstanding::from_settings(chat, &settings.llm, &settings.query);
//! let result = understanding.understand("heritage rate for dollar spot", &SessionContext::default()).await?;
//! assert!(result.feasibility.is_feasible());
//! ```
//!
//! [`Question`]: turf_advisor_core::Question

pub mod classifier;
pub mod detection;
pub mod expansion;
pub mod feasibility;
pub mod rewriter;
pub mod sanitize;
pub mod topic_change;

mod error;
mod understand;

pub use error::{QueryError, Result};
pub use understand::{QueryUnderstanding, SessionContext, Turn, Understanding};

pub use classifier::{canned_response, fallback_classify, Classification, ClassifierSource, QueryClassifier};
pub use detection::{
    detect_grass_type, detect_product_need, detect_region, detect_state, detect_subject,
    detect_topic,
};
pub use expansion::{expand_query, expand_vague_question, extract_keywords, query_intent, QueryIntent};
pub use feasibility::{check_feasibility, FeasibilityIssue, FeasibilityKind, FeasibilityVerdict};
pub use rewriter::QueryRewriter;
pub use sanitize::sanitize_question;
pub use topic_change::is_significant_topic_change;
