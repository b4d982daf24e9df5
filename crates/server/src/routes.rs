//! Miniapp-facing JSON routes.
//!
//! Endpoints (all `PUT`, matching the client the miniapp already ships):
//! - `PUT /chatSingle/`   — stateless single-turn chat
//! - `PUT /chatMultiple/` — session-scoped multi-turn chat
//! - `PUT /chatLegal/`    — single-turn legal consultation with a
//!   three-part structured answer
//! - `PUT /addUser/`      — register (or re-register) an account
//! - `PUT /checkUser/`    — look up an account's balance and status
//!
//! Chat endpoints always answer `200 OK` with a `chatResult` envelope; the
//! `status` field inside carries the outcome. Account endpoints answer
//! `500` only when the store itself fails.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::put, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use parley_chat::{ChatReply, Orchestrator, StructuredReply};
use parley_core::{Account, ChatStatus};
use parley_db::AccountRepository;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub accounts: Arc<dyn AccountRepository>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chatSingle/", put(chat_single))
        .route("/chatMultiple/", put(chat_multiple))
        .route("/chatLegal/", put(chat_legal))
        .route("/addUser/", put(add_user))
        .route("/checkUser/", put(check_user))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ChatSingleRequest {
    pub function: String,
    pub openid: String,
    #[serde(rename = "userInputStr", default)]
    pub user_input: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatMultipleRequest {
    pub function: String,
    pub openid: String,
    #[serde(default)]
    pub sessionid: i64,
    #[serde(rename = "userInputStr", default)]
    pub user_input: String,
}

#[derive(Debug, Serialize)]
pub struct ChatEnvelope {
    #[serde(rename = "chatResult")]
    pub chat_result: ChatResult,
}

#[derive(Debug, Serialize)]
pub struct ChatResult {
    pub status: ChatStatus,
    #[serde(rename = "GPTmsg", skip_serializing_if = "Option::is_none")]
    pub gpt_msg: Option<String>,
    #[serde(rename = "errMsg", skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<String>,
    #[serde(rename = "sessionId")]
    pub session_id: i64,
}

impl From<ChatReply> for ChatEnvelope {
    fn from(reply: ChatReply) -> Self {
        Self {
            chat_result: ChatResult {
                status: reply.status,
                gpt_msg: reply.reply,
                err_msg: reply.err_msg,
                session_id: reply.session_id,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LegalEnvelope {
    #[serde(rename = "chatResult")]
    pub chat_result: LegalResult,
}

#[derive(Debug, Serialize)]
pub struct LegalResult {
    pub status: ChatStatus,
    #[serde(rename = "ResultText", skip_serializing_if = "Option::is_none")]
    pub result_text: Option<String>,
    #[serde(rename = "chosenText", skip_serializing_if = "Option::is_none")]
    pub chosen_text: Option<String>,
    #[serde(rename = "analysisText", skip_serializing_if = "Option::is_none")]
    pub analysis_text: Option<String>,
    #[serde(rename = "errMsg", skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<String>,
}

impl From<StructuredReply> for LegalEnvelope {
    fn from(reply: StructuredReply) -> Self {
        let (result_text, chosen_text, analysis_text) = match reply.answer {
            Some(answer) => (Some(answer.primary), Some(answer.citation), Some(answer.analysis)),
            None => (None, None, None),
        };
        Self {
            chat_result: LegalResult {
                status: reply.status,
                result_text,
                chosen_text,
                analysis_text,
                err_msg: reply.err_msg,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AccountRequest {
    pub openid: String,
}

#[derive(Debug, Serialize)]
pub struct AddUserEnvelope {
    #[serde(rename = "addUserResult")]
    pub add_user_result: AccountResult,
}

#[derive(Debug, Serialize)]
pub struct CheckUserEnvelope {
    #[serde(rename = "checkUserResult")]
    pub check_user_result: AccountResult,
}

#[derive(Debug, Serialize)]
pub struct AccountResult {
    pub status: &'static str,
    pub openid: String,
    #[serde(rename = "nickName", skip_serializing_if = "Option::is_none")]
    pub nick_name: Option<String>,
    #[serde(rename = "balanceAmount", skip_serializing_if = "Option::is_none")]
    pub balance_amount: Option<i64>,
    #[serde(rename = "freeTry", skip_serializing_if = "Option::is_none")]
    pub free_try: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip: Option<i64>,
}

impl AccountResult {
    fn found(account: Account) -> Self {
        Self {
            status: "ok",
            openid: account.openid,
            nick_name: Some(account.nick_name),
            balance_amount: Some(account.balance),
            free_try: Some(account.free_try),
            vip: Some(account.vip),
        }
    }

    fn missing(openid: String) -> Self {
        Self {
            status: "noUser",
            openid,
            nick_name: None,
            balance_amount: None,
            free_try: None,
            vip: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn chat_single(
    State(state): State<AppState>,
    Json(request): Json<ChatSingleRequest>,
) -> Json<ChatEnvelope> {
    let reply = state
        .orchestrator
        .chat_single(&request.function, &request.openid, &request.user_input)
        .await;
    Json(reply.into())
}

async fn chat_multiple(
    State(state): State<AppState>,
    Json(request): Json<ChatMultipleRequest>,
) -> Json<ChatEnvelope> {
    let reply = state
        .orchestrator
        .chat_multi(&request.function, &request.openid, request.sessionid, &request.user_input)
        .await;
    Json(reply.into())
}

async fn chat_legal(
    State(state): State<AppState>,
    Json(request): Json<ChatSingleRequest>,
) -> Json<LegalEnvelope> {
    let reply = state
        .orchestrator
        .chat_structured(&request.function, &request.openid, &request.user_input)
        .await;
    Json(reply.into())
}

async fn add_user(
    State(state): State<AppState>,
    Json(request): Json<AccountRequest>,
) -> Result<Json<AddUserEnvelope>, StatusCode> {
    let account = Account::registered(&request.openid);
    if let Err(repo_error) = state.accounts.upsert(account.clone()).await {
        error!(openid = %request.openid, error = %repo_error, "account registration failed");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(AddUserEnvelope { add_user_result: AccountResult::found(account) }))
}

async fn check_user(
    State(state): State<AppState>,
    Json(request): Json<AccountRequest>,
) -> Result<Json<CheckUserEnvelope>, StatusCode> {
    match state.accounts.find_by_openid(&request.openid).await {
        Ok(Some(account)) => {
            Ok(Json(CheckUserEnvelope { check_user_result: AccountResult::found(account) }))
        }
        Ok(None) => Ok(Json(CheckUserEnvelope {
            check_user_result: AccountResult::missing(request.openid),
        })),
        Err(repo_error) => {
            error!(openid = %request.openid, error = %repo_error, "account lookup failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use parley_chat::{
        EntitlementGate, GenerationClient, GenerationRequest, GenerationSettings, Orchestrator,
    };
    use parley_core::{Account, ProfileRegistry};
    use parley_db::{AccountRepository, InMemoryAccountRepository};

    use super::{router, AppState};

    struct StubClient {
        reply: String,
    }

    #[async_trait]
    impl GenerationClient for StubClient {
        async fn complete(&self, _request: GenerationRequest) -> Result<String> {
            Ok(self.reply.clone())
        }
    }

    fn test_router(accounts: Vec<Account>, reply: &str) -> axum::Router {
        let repository: Arc<dyn AccountRepository> =
            Arc::new(InMemoryAccountRepository::with_accounts(accounts));
        let orchestrator = Orchestrator::new(
            EntitlementGate::new(Arc::clone(&repository)),
            ProfileRegistry::builtin(1.0),
            Arc::new(StubClient { reply: reply.to_string() }),
            GenerationSettings { model: "glm-4-flash".to_string(), max_tokens: 1000 },
        );
        router(AppState { orchestrator: Arc::new(orchestrator), accounts: repository })
    }

    async fn put_json(app: axum::Router, path: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::PUT)
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    #[tokio::test]
    async fn chat_multiple_answers_with_a_reply_and_session_id() {
        let app = test_router(vec![Account::registered("openid-1")], "Hi, how can I help?");

        let (status, body) = put_json(
            app,
            "/chatMultiple/",
            json!({
                "function": "chat3",
                "openid": "openid-1",
                "sessionid": 0,
                "userInputStr": "hello"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatResult"]["status"], "OK");
        assert_eq!(body["chatResult"]["GPTmsg"], "Hi, how can I help?");
        assert!(body["chatResult"]["sessionId"].as_i64().expect("sessionId") > 0);
        assert!(body["chatResult"].get("errMsg").is_none());
    }

    #[tokio::test]
    async fn chat_endpoints_report_unknown_accounts_in_band() {
        let app = test_router(vec![], "unused");

        let (status, body) = put_json(
            app,
            "/chatSingle/",
            json!({ "function": "chat3", "openid": "openid-ghost", "userInputStr": "hello" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatResult"]["status"], "noUser");
        assert!(body["chatResult"].get("GPTmsg").is_none());
    }

    #[tokio::test]
    async fn blank_input_maps_to_the_no_session_word_status() {
        let app = test_router(vec![Account::registered("openid-1")], "unused");

        let (status, body) = put_json(
            app,
            "/chatMultiple/",
            json!({
                "function": "chat3",
                "openid": "openid-1",
                "sessionid": 7,
                "userInputStr": "   "
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatResult"]["status"], "noSessionWord");
        assert_eq!(body["chatResult"]["sessionId"], 7);
    }

    #[tokio::test]
    async fn chat_legal_returns_the_three_part_answer() {
        let app = test_router(
            vec![Account::registered("openid-1")],
            "You may claim severance.\nCitations:\nLabor Law, Article 47.\nLegal analysis:\nTermination without cause obliges the employer to compensate.",
        );

        let (status, body) = put_json(
            app,
            "/chatLegal/",
            json!({ "function": "law", "openid": "openid-1", "userInputStr": "I was fired" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chatResult"]["status"], "OK");
        assert_eq!(body["chatResult"]["ResultText"], "You may claim severance.");
        assert_eq!(body["chatResult"]["chosenText"], "Labor Law, Article 47.");
        assert_eq!(
            body["chatResult"]["analysisText"],
            "Termination without cause obliges the employer to compensate."
        );
        assert!(body["chatResult"].get("sessionId").is_none());
    }

    #[tokio::test]
    async fn add_user_then_check_user_round_trips_the_account() {
        let app = test_router(vec![], "unused");

        let (status, body) =
            put_json(app.clone(), "/addUser/", json!({ "openid": "openid-new" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["addUserResult"]["status"], "ok");
        assert_eq!(body["addUserResult"]["balanceAmount"], 99);
        assert_eq!(body["addUserResult"]["vip"], 1);

        let (status, body) = put_json(app, "/checkUser/", json!({ "openid": "openid-new" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkUserResult"]["status"], "ok");
        assert_eq!(body["checkUserResult"]["nickName"], "User");
        assert_eq!(body["checkUserResult"]["freeTry"], 0);
    }

    #[tokio::test]
    async fn check_user_reports_missing_accounts() {
        let app = test_router(vec![], "unused");

        let (status, body) =
            put_json(app, "/checkUser/", json!({ "openid": "openid-ghost" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checkUserResult"]["status"], "noUser");
        assert!(body["checkUserResult"].get("balanceAmount").is_none());
    }
}
