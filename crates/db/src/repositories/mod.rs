use async_trait::async_trait;
use thiserror::Error;

use parley_core::Account;

pub mod account;
pub mod memory;

pub use account::SqlAccountRepository;
pub use memory::InMemoryAccountRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Entitlement store contract consumed by the chat orchestration core. The
/// store never decrements balances here; billing happens out of band.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn find_by_openid(&self, openid: &str) -> Result<Option<Account>, RepositoryError>;
    async fn upsert(&self, account: Account) -> Result<(), RepositoryError>;
}
