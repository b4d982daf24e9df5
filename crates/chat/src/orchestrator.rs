use std::sync::Arc;

use parley_core::config::LlmConfig;
use parley_core::{parse_structured_answer, ChatStatus, Message, ProfileRegistry, StructuredAnswer};

use crate::gate::{Entitlement, EntitlementGate};
use crate::llm::{GenerationClient, GenerationRequest};
use crate::store::{ConversationKey, ConversationStore};

/// Global generation parameters that apply when a profile does not override
/// them.
#[derive(Clone, Debug)]
pub struct GenerationSettings {
    pub model: String,
    pub max_tokens: u32,
}

impl From<&LlmConfig> for GenerationSettings {
    fn from(config: &LlmConfig) -> Self {
        Self { model: config.model.clone(), max_tokens: config.max_tokens }
    }
}

/// Outcome of a single- or multi-turn chat request. `session_id` is echoed
/// on every exit path so the client can resume the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatReply {
    pub status: ChatStatus,
    pub reply: Option<String>,
    pub err_msg: Option<String>,
    pub session_id: i64,
}

impl ChatReply {
    fn status(status: ChatStatus, session_id: i64) -> Self {
        Self { status, reply: None, err_msg: None, session_id }
    }

    fn ok(reply: String, session_id: i64) -> Self {
        Self { status: ChatStatus::Ok, reply: Some(reply), err_msg: None, session_id }
    }

    fn error(err_msg: String, session_id: i64) -> Self {
        Self {
            status: ChatStatus::GenerationError,
            reply: None,
            err_msg: Some(err_msg),
            session_id,
        }
    }
}

/// Outcome of a structured-answer request. Stateless: no session id, no
/// persisted conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredReply {
    pub status: ChatStatus,
    pub answer: Option<StructuredAnswer>,
    pub err_msg: Option<String>,
}

impl StructuredReply {
    fn status(status: ChatStatus) -> Self {
        Self { status, answer: None, err_msg: None }
    }

    fn error(err_msg: String) -> Self {
        Self { status: ChatStatus::GenerationError, answer: None, err_msg: Some(err_msg) }
    }
}

enum GateOutcome {
    Allowed,
    Blocked(ChatStatus),
    Failed(String),
}

/// Composes gate, profile registry, conversation store and generation
/// adapter into one response per request.
///
/// Step order is fixed: input validation short-circuits before the gate is
/// consulted, the gate short-circuits before any provider call, and nothing
/// is persisted for a turn whose generation failed.
pub struct Orchestrator {
    gate: EntitlementGate,
    store: ConversationStore,
    registry: ProfileRegistry,
    client: Arc<dyn GenerationClient>,
    settings: GenerationSettings,
}

impl Orchestrator {
    pub fn new(
        gate: EntitlementGate,
        registry: ProfileRegistry,
        client: Arc<dyn GenerationClient>,
        settings: GenerationSettings,
    ) -> Self {
        Self { gate, store: ConversationStore::new(), registry, client, settings }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Multi-turn chat. A zero `session_id` mints a fresh conversation; any
    /// other value resumes (or implicitly starts) the conversation under
    /// that id.
    pub async fn chat_multi(
        &self,
        feature: &str,
        openid: &str,
        session_id: i64,
        input: &str,
    ) -> ChatReply {
        if input.trim().is_empty() {
            return ChatReply::status(ChatStatus::EmptyInput, session_id);
        }

        match self.gate_outcome(openid).await {
            GateOutcome::Allowed => {}
            GateOutcome::Blocked(status) => return ChatReply::status(status, session_id),
            GateOutcome::Failed(err_msg) => return ChatReply::error(err_msg, session_id),
        }

        let session_id = if session_id == 0 { self.store.mint_id() } else { session_id };
        let key = ConversationKey::new(openid, session_id);

        // Hold the conversation lock across generation so concurrent
        // requests on the same key cannot interleave their turns.
        let handle = self.store.entry(&key);
        let mut transcript = handle.lock().await;

        // A brand-new conversation is seeded into the working copy only;
        // nothing at all is persisted until the turn succeeds.
        let profile = self.registry.resolve(feature);
        let mut working = transcript.messages().to_vec();
        if working.is_empty() {
            working.push(Message::system(profile.system_prompt.clone()));
        }
        working.push(Message::user(input));

        let request = GenerationRequest {
            messages: working,
            temperature: profile.temperature,
            max_tokens: profile.max_tokens.unwrap_or(self.settings.max_tokens),
            model: self.settings.model.clone(),
        };

        match self.client.complete(request).await {
            Ok(reply) => {
                if transcript.is_empty() {
                    transcript.push(Message::system(profile.system_prompt.clone()));
                }
                transcript.push(Message::user(input));
                transcript.push(Message::assistant(reply.clone()));
                tracing::debug!(
                    openid,
                    session_id,
                    transcript_len = transcript.len(),
                    "multi-turn generation succeeded"
                );
                ChatReply::ok(reply, session_id)
            }
            Err(error) => {
                tracing::warn!(openid, session_id, error = %error, "generation failed");
                drop(transcript);
                self.store.discard_if_empty(&key);
                ChatReply::error(format!("generation provider unavailable: {error}"), session_id)
            }
        }
    }

    /// Single-turn chat: every request is a fresh system+user transcript and
    /// nothing is persisted. A session id is still minted for API symmetry.
    pub async fn chat_single(&self, feature: &str, openid: &str, input: &str) -> ChatReply {
        let session_id = self.store.mint_id();

        if input.trim().is_empty() {
            return ChatReply::status(ChatStatus::EmptyInput, session_id);
        }

        match self.gate_outcome(openid).await {
            GateOutcome::Allowed => {}
            GateOutcome::Blocked(status) => return ChatReply::status(status, session_id),
            GateOutcome::Failed(err_msg) => return ChatReply::error(err_msg, session_id),
        }

        match self.generate_single_turn(feature, input).await {
            Ok(reply) => ChatReply::ok(reply, session_id),
            Err(err_msg) => ChatReply::error(err_msg, session_id),
        }
    }

    /// Structured-answer chat: single-turn generation followed by the
    /// three-part parse. Best effort; the parse itself never fails.
    pub async fn chat_structured(
        &self,
        feature: &str,
        openid: &str,
        input: &str,
    ) -> StructuredReply {
        if input.trim().is_empty() {
            return StructuredReply::status(ChatStatus::EmptyInput);
        }

        match self.gate_outcome(openid).await {
            GateOutcome::Allowed => {}
            GateOutcome::Blocked(status) => return StructuredReply::status(status),
            GateOutcome::Failed(err_msg) => return StructuredReply::error(err_msg),
        }

        match self.generate_single_turn(feature, input).await {
            Ok(reply) => StructuredReply {
                status: ChatStatus::Ok,
                answer: Some(parse_structured_answer(&reply)),
                err_msg: None,
            },
            Err(err_msg) => StructuredReply::error(err_msg),
        }
    }

    async fn gate_outcome(&self, openid: &str) -> GateOutcome {
        match self.gate.check(openid).await {
            Ok(Entitlement::Allowed) => GateOutcome::Allowed,
            Ok(Entitlement::NoAccount) => GateOutcome::Blocked(ChatStatus::NoAccount),
            Ok(Entitlement::Exhausted) => GateOutcome::Blocked(ChatStatus::Exhausted),
            Err(error) => {
                tracing::error!(openid, error = %error, "entitlement lookup failed");
                GateOutcome::Failed(format!("internal error: {error}"))
            }
        }
    }

    async fn generate_single_turn(&self, feature: &str, input: &str) -> Result<String, String> {
        let profile = self.registry.resolve(feature);
        let request = GenerationRequest {
            messages: vec![
                Message::system(profile.system_prompt.clone()),
                Message::user(input),
            ],
            temperature: profile.temperature,
            max_tokens: profile.max_tokens.unwrap_or(self.settings.max_tokens),
            model: self.settings.model.clone(),
        };

        self.client.complete(request).await.map_err(|error| {
            tracing::warn!(feature, error = %error, "generation failed");
            format!("generation provider unavailable: {error}")
        })
    }
}
