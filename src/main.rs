//! OPSQ - Support-Queue Dispatcher
//!
//! Main entry point for the dispatcher server.

use opsq::audit::spawn_audit_worker;
use opsq::slack::{SlackClient, WebhookAuditSink};
use opsq::{Config, Dispatcher, Result};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Environment overrides from .env, if present
    let _ = dotenvy::dotenv();

    info!("Starting OPSQ dispatcher v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    std::fs::create_dir_all(&config.data_dir)?;

    let slack = Arc::new(SlackClient::new(&config.bot_token, &config.allowed_group));
    let audit = spawn_audit_worker(Arc::new(WebhookAuditSink::new(&config.audit_webhook_url)));

    let dispatcher = Arc::new(Dispatcher::new(
        &config.data_dir,
        slack.clone(),
        slack,
        audit,
        &config.general_channel,
    ));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    opsq::server::serve(listener, dispatcher).await
}
