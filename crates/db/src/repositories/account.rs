use async_trait::async_trait;

use parley_core::Account;

use super::{AccountRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAccountRepository {
    pool: DbPool,
}

impl SqlAccountRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for SqlAccountRepository {
    async fn find_by_openid(&self, openid: &str) -> Result<Option<Account>, RepositoryError> {
        let row: Option<(String, String, i64, i64, i64)> = sqlx::query_as(
            "SELECT openid, nick_name, balance, free_try, vip FROM account WHERE openid = ?1",
        )
        .bind(openid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(openid, nick_name, balance, free_try, vip)| Account {
            openid,
            nick_name,
            balance,
            free_try,
            vip,
        }))
    }

    async fn upsert(&self, account: Account) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO account (openid, nick_name, balance, free_try, vip) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (openid) DO UPDATE SET \
                 nick_name = excluded.nick_name, \
                 balance = excluded.balance, \
                 free_try = excluded.free_try, \
                 vip = excluded.vip",
        )
        .bind(&account.openid)
        .bind(&account.nick_name)
        .bind(account.balance)
        .bind(account.free_try)
        .bind(account.vip)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parley_core::Account;

    use super::SqlAccountRepository;
    use crate::repositories::AccountRepository;
    use crate::{connect_with_settings, migrations};

    async fn repository() -> SqlAccountRepository {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations should apply");
        SqlAccountRepository::new(pool)
    }

    #[tokio::test]
    async fn upsert_then_find_round_trips() {
        let repository = repository().await;
        let account = Account::registered("openid-abc");

        repository.upsert(account.clone()).await.expect("upsert");
        let found = repository
            .find_by_openid("openid-abc")
            .await
            .expect("find")
            .expect("account should exist");

        assert_eq!(found, account);
    }

    #[tokio::test]
    async fn missing_account_reads_as_none() {
        let repository = repository().await;
        let found = repository.find_by_openid("openid-ghost").await.expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_entitlement_state() {
        let repository = repository().await;
        let mut account = Account::registered("openid-abc");
        repository.upsert(account.clone()).await.expect("insert");

        account.balance = 0;
        account.free_try = 2;
        repository.upsert(account).await.expect("update");

        let found = repository
            .find_by_openid("openid-abc")
            .await
            .expect("find")
            .expect("account should exist");
        assert_eq!(found.balance, 0);
        assert_eq!(found.free_try, 2);
    }
}
