use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

#[cfg(test)]
mod tests {
    use super::run_pending;
    use crate::connect_with_settings;

    #[tokio::test]
    async fn migrations_create_the_account_table() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        run_pending(&pool).await.expect("migrations should apply");

        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'account'",
        )
        .fetch_one(&pool)
        .await
        .expect("schema query");
        assert_eq!(count, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = connect_with_settings("sqlite::memory:?cache=shared", 1, 5)
            .await
            .expect("pool should connect");
        run_pending(&pool).await.expect("first run");
        run_pending(&pool).await.expect("second run");
        pool.close().await;
    }
}
