use std::collections::HashMap;

use tokio::sync::RwLock;

use parley_core::Account;

use super::{AccountRepository, RepositoryError};

/// Map-backed account store for tests and offline runs.
#[derive(Default)]
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl InMemoryAccountRepository {
    pub fn with_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let accounts = accounts
            .into_iter()
            .map(|account| (account.openid.clone(), account))
            .collect::<HashMap<_, _>>();
        Self { accounts: RwLock::new(accounts) }
    }
}

#[async_trait::async_trait]
impl AccountRepository for InMemoryAccountRepository {
    async fn find_by_openid(&self, openid: &str) -> Result<Option<Account>, RepositoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts.get(openid).cloned())
    }

    async fn upsert(&self, account: Account) -> Result<(), RepositoryError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.openid.clone(), account);
        Ok(())
    }
}
