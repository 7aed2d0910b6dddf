//! Capability traits for the pluggable backends
//!
//! ```text
//! Retrieval:
//!   - VectorIndex: nearest-neighbour search over chunk embeddings
//!   - Embedder: text -> dense vector
//!
//! Language models:
//!   - ChatCompletion: message list -> text
//!
//! Knowledge:
//!   - KnowledgeStore: read-only product/disease facts
//!
//! Persistence:
//!   - ConversationSink: write-only conversation, feedback and audit log
//! ```
//!
//! Every network-bound method returns `Result<_, Degraded>` so callers can
//! recover locally instead of propagating.

mod knowledge;
mod llm;
mod persistence;
mod retrieval;

pub use knowledge::KnowledgeStore;
pub use llm::ChatCompletion;
pub use persistence::{AuditEvent, AuditEventType, ConversationRecord, ConversationSink, FeedbackRecord};
pub use retrieval::{Embedder, VectorIndex};
