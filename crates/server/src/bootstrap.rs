use std::sync::Arc;

use renewly_agent::llm::{LlmGateway, OpenAiChatClient};
use renewly_agent::{AgentError, AgentRuntime, RuntimeSettings};
use renewly_core::config::{AppConfig, ConfigError};
use renewly_core::errors::GatewayError;
use renewly_db::repositories::{SqlConversationRepository, SqlPolicyRepository};
use renewly_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub agent_runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    LlmClient(#[source] GatewayError),
    #[error("agent runtime setup failed: {0}")]
    Agent(#[source] AgentError),
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

    let client = OpenAiChatClient::from_config(&config.llm).map_err(BootstrapError::LlmClient)?;
    info!(
        event_name = "system.bootstrap.llm_ready",
        model = client.model(),
        base_url = %config.llm.base_url,
        "llm client configured"
    );

    let agent_runtime = AgentRuntime::new(
        LlmGateway::new(Arc::new(client)),
        Arc::new(SqlPolicyRepository::new(db_pool.clone())),
        Arc::new(SqlConversationRepository::new(db_pool.clone())),
        RuntimeSettings::from(&config.agent),
    )
    .map_err(BootstrapError::Agent)?;

    Ok(Application { config, db_pool, agent_runtime: Arc::new(agent_runtime) })
}
