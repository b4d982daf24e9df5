use std::sync::Arc;

use parley_db::{AccountRepository, RepositoryError};

/// Answer to "may this account make a request now?".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Entitlement {
    Allowed,
    NoAccount,
    Exhausted,
}

/// Single synchronous entitlement lookup against the account store.
///
/// Fails closed: a missing account is `NoAccount`, and a store failure is a
/// hard error for the caller to report, never a silent `Allowed`. Balances
/// are only read here; decrementing is the billing pipeline's job.
pub struct EntitlementGate {
    accounts: Arc<dyn AccountRepository>,
}

impl EntitlementGate {
    pub fn new(accounts: Arc<dyn AccountRepository>) -> Self {
        Self { accounts }
    }

    pub async fn check(&self, openid: &str) -> Result<Entitlement, RepositoryError> {
        match self.accounts.find_by_openid(openid).await? {
            None => Ok(Entitlement::NoAccount),
            Some(account) if account.is_exhausted() => Ok(Entitlement::Exhausted),
            Some(_) => Ok(Entitlement::Allowed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parley_core::Account;
    use parley_db::InMemoryAccountRepository;

    use super::{Entitlement, EntitlementGate};

    #[tokio::test]
    async fn unknown_account_is_refused() {
        let gate = EntitlementGate::new(Arc::new(InMemoryAccountRepository::default()));
        let entitlement = gate.check("openid-ghost").await.expect("check");
        assert_eq!(entitlement, Entitlement::NoAccount);
    }

    #[tokio::test]
    async fn spent_account_is_exhausted() {
        let mut account = Account::registered("openid-1");
        account.balance = 0;
        account.free_try = 0;
        let gate =
            EntitlementGate::new(Arc::new(InMemoryAccountRepository::with_accounts([account])));

        let entitlement = gate.check("openid-1").await.expect("check");
        assert_eq!(entitlement, Entitlement::Exhausted);
    }

    #[tokio::test]
    async fn remaining_free_trials_keep_an_account_allowed() {
        let mut account = Account::registered("openid-1");
        account.balance = 0;
        account.free_try = 1;
        let gate =
            EntitlementGate::new(Arc::new(InMemoryAccountRepository::with_accounts([account])));

        let entitlement = gate.check("openid-1").await.expect("check");
        assert_eq!(entitlement, Entitlement::Allowed);
    }
}
