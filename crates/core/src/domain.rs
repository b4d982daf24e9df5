use serde::{Deserialize, Serialize};

/// Speaker of a single transcript turn. The lowercase serde form is the
/// provider wire contract and must not change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a conversation, replayed verbatim to the generation provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Entitlement state of one account, keyed by the miniapp openid.
///
/// A persisted row always has `balance >= 0` and `free_try >= 0`; the
/// account table enforces this with CHECK constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub openid: String,
    pub nick_name: String,
    pub balance: i64,
    pub free_try: i64,
    pub vip: i64,
}

impl Account {
    /// Default grant handed to a freshly registered account.
    pub fn registered(openid: impl Into<String>) -> Self {
        Self {
            openid: openid.into(),
            nick_name: "User".to_string(),
            balance: 99,
            free_try: 0,
            vip: 1,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.balance <= 0 && self.free_try <= 0
    }
}

/// Terminal status of one chat request. The serialized literals are the
/// stable vocabulary the miniapp client switches on; the legacy "noMoney"
/// spelling was folded into `runOut`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "noUser")]
    NoAccount,
    #[serde(rename = "runOut")]
    Exhausted,
    #[serde(rename = "noSessionWord")]
    EmptyInput,
    #[serde(rename = "error")]
    GenerationError,
}

impl ChatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoAccount => "noUser",
            Self::Exhausted => "runOut",
            Self::EmptyInput => "noSessionWord",
            Self::GenerationError => "error",
        }
    }
}

/// Three-part decomposition of one generated text block, produced by the
/// structured response parser and never by the provider itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub primary: String,
    pub citation: String,
    pub analysis: String,
}

#[cfg(test)]
mod tests {
    use super::{Account, ChatStatus, Message, Role};

    #[test]
    fn message_serializes_to_provider_schema() {
        let message = Message::system("You are my personal assistant.");
        let json = serde_json::to_value(&message).expect("serialize");
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "You are my personal assistant.");
    }

    #[test]
    fn role_round_trips_lowercase() {
        let role: Role = serde_json::from_str("\"assistant\"").expect("deserialize");
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn status_literals_match_client_vocabulary() {
        assert_eq!(ChatStatus::Ok.as_str(), "OK");
        assert_eq!(ChatStatus::NoAccount.as_str(), "noUser");
        assert_eq!(ChatStatus::Exhausted.as_str(), "runOut");
        assert_eq!(ChatStatus::EmptyInput.as_str(), "noSessionWord");
        assert_eq!(ChatStatus::GenerationError.as_str(), "error");

        let serialized = serde_json::to_string(&ChatStatus::Exhausted).expect("serialize");
        assert_eq!(serialized, "\"runOut\"");
    }

    #[test]
    fn exhaustion_requires_both_balance_and_trials_spent() {
        let mut account = Account::registered("openid-1");
        assert!(!account.is_exhausted());

        account.balance = 0;
        assert!(account.is_exhausted());

        account.free_try = 3;
        assert!(!account.is_exhausted());
    }
}
