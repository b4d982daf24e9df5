//! Conversation orchestration core.
//!
//! This crate composes the pieces of one chat request:
//! - **Entitlement gate** (`gate`) - may this account make a request now?
//! - **Conversation store** (`store`) - per-(account, session) transcripts
//!   with bounded retention and per-key serialization
//! - **Generation adapter** (`llm`) - the boundary to the upstream
//!   chat-completion provider
//! - **Orchestrator** (`orchestrator`) - the request lifecycle for the
//!   single-turn, multi-turn and structured (legal) variants
//!
//! # Error discipline
//!
//! The orchestrator never propagates a fault past its boundary. Every
//! request resolves to a `ChatStatus` the client can switch on; provider and
//! store failures surface as the `error` status with a diagnostic, and
//! nothing is persisted for a failed turn.

pub mod gate;
pub mod llm;
pub mod orchestrator;
pub mod store;

pub use gate::{Entitlement, EntitlementGate};
pub use llm::{GenerationClient, GenerationRequest, HttpGenerationClient};
pub use orchestrator::{ChatReply, GenerationSettings, Orchestrator, StructuredReply};
pub use store::{ConversationKey, ConversationStore, Transcript, MAX_TRANSCRIPT_LEN};
