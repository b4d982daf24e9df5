use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use parley_chat::{EntitlementGate, GenerationSettings, HttpGenerationClient, Orchestrator};
use parley_core::config::{AppConfig, ConfigError, LoadOptions};
use parley_core::ProfileRegistry;
use parley_db::{
    connect_with_settings, migrations, AccountRepository, DbPool, SqlAccountRepository,
};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub accounts: Arc<dyn AccountRepository>,
    pub orchestrator: Arc<Orchestrator>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("generation client initialization failed: {0}")]
    Generation(#[source] anyhow::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let accounts: Arc<dyn AccountRepository> =
        Arc::new(SqlAccountRepository::new(db_pool.clone()));

    let client =
        HttpGenerationClient::from_config(&config.llm).map_err(BootstrapError::Generation)?;

    let orchestrator = Orchestrator::new(
        EntitlementGate::new(Arc::clone(&accounts)),
        ProfileRegistry::builtin(config.llm.temperature),
        Arc::new(client),
        GenerationSettings::from(&config.llm),
    );
    info!(
        event_name = "system.bootstrap.orchestrator_ready",
        model = %config.llm.model,
        "chat orchestrator initialized"
    );

    Ok(Application { config, db_pool, accounts, orchestrator: Arc::new(orchestrator) })
}
