//! Webhook reconciliation service.
//!
//! Loads configuration, connects to PostgreSQL, applies migrations when
//! enabled, purges expired ledger rows and serves `POST /webhooks/stripe`.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tenant_billing_reconciler::adapters::http::{app_router, WebhookAppState};
use tenant_billing_reconciler::adapters::{PostgresBillingStore, SystemClock, MIGRATOR};
use tenant_billing_reconciler::application::{
    PurgeWebhookEventsCommand, PurgeWebhookEventsHandler, ReconcileWebhookHandler,
};
use tenant_billing_reconciler::config::{AppConfig, LogFormat, ServerConfig};
use tenant_billing_reconciler::domain::billing::WebhookSignatureVerifier;
use tenant_billing_reconciler::ports::Clock;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = ?config.server.environment,
        provider = %config.billing.provider,
        "Starting billing reconciler"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    tracing::info!("Database connection established");

    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let store = Arc::new(PostgresBillingStore::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let purge = PurgeWebhookEventsHandler::new(store.clone(), clock.clone());
    let retention_days = config.billing.webhook_retention_days;
    if let Err(err) = purge
        .handle(PurgeWebhookEventsCommand { retention_days })
        .await
    {
        tracing::error!(error = %err, "Startup webhook ledger purge failed");
    }

    let reconciler = ReconcileWebhookHandler::new(
        store,
        clock.clone(),
        config.billing.reconciler_settings()?,
    );
    let verifier = WebhookSignatureVerifier::new(
        config.billing.webhook_secret.clone(),
        config.billing.signature_tolerance_secs,
    );
    let state = WebhookAppState {
        reconciler: Arc::new(reconciler),
        verifier: Arc::new(verifier),
        clock,
    };
    let app = app_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for webhooks");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    match server.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
