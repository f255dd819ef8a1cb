use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use shopfront_core::config::{AppConfig, ConfigError, LoadOptions};
use shopfront_db::repositories::{SqlCatalogRepository, SqlOrderRepository, SqlSessionStore};
use shopfront_db::{connect, fixtures, migrations, DbPool};
use shopfront_mail::transport::{HttpRelayTransport, MailTransport, NoopTransport};
use shopfront_mail::OrderMailer;

use crate::state::AppState;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("catalog seeding failed: {0}")]
    Seed(String),
    #[error("mail setup failed: {0}")]
    Mail(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    seed_if_empty(&db_pool).await?;

    let catalog = Arc::new(SqlCatalogRepository::new(db_pool.clone()));
    let transport: Arc<dyn MailTransport> = if config.mail.enabled {
        // Validation guarantees url and token are present when enabled.
        let api_url = config
            .mail
            .api_url
            .clone()
            .ok_or_else(|| BootstrapError::Mail("mail.api_url is missing".to_string()))?;
        let api_token = config
            .mail
            .api_token
            .clone()
            .ok_or_else(|| BootstrapError::Mail("mail.api_token is missing".to_string()))?;
        Arc::new(HttpRelayTransport::new(api_url, api_token, config.mail.from_address.clone()))
    } else {
        Arc::new(NoopTransport)
    };
    let notifier = OrderMailer::new(
        transport,
        config.store.name.clone(),
        config.store.currency.clone(),
        config.mail.operator_address.clone(),
    )
    .map_err(|err| BootstrapError::Mail(err.to_string()))?;

    info!(
        event_name = "system.bootstrap.mail_transport",
        correlation_id = "bootstrap",
        transport_mode = if config.mail.enabled { "http_relay" } else { "noop" },
        "mail transport initialized"
    );

    let state = AppState {
        catalog: catalog.clone(),
        lookup: catalog,
        orders: Arc::new(SqlOrderRepository::new(db_pool.clone())),
        sessions: Arc::new(SqlSessionStore::new(db_pool.clone())),
        notifier: Arc::new(notifier),
        store: config.store.clone(),
    };

    Ok(Application { config, db_pool, state })
}

/// First boot gets the demo catalog; an already-stocked store is left alone.
async fn seed_if_empty(db_pool: &DbPool) -> Result<(), BootstrapError> {
    let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
        .fetch_one(db_pool)
        .await
        .map_err(|err| BootstrapError::Seed(err.to_string()))?;

    if product_count == 0 {
        fixtures::seed_demo_catalog(db_pool)
            .await
            .map_err(|err| BootstrapError::Seed(err.to_string()))?;
        info!(
            event_name = "system.bootstrap.catalog_seeded",
            correlation_id = "bootstrap",
            "seeded demo catalog into empty database"
        );
    }

    Ok(())
}
