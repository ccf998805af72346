//! Environment-driven configuration

use crate::{Error, Result};
use std::path::PathBuf;

/// Runtime configuration, collected once at startup
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP router binds to
    pub bind_addr: String,
    /// Directory holding the three snapshot files
    pub data_dir: PathBuf,
    /// Bot token for the chat platform
    pub bot_token: String,
    /// Channel id for announcements
    pub general_channel: String,
    /// Id of the single allowed admin group
    pub allowed_group: String,
    /// Webhook URL the audit worker posts rows to
    pub audit_webhook_url: String,
}

impl Config {
    /// Read configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if a required variable is missing.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("OPSQ_BIND_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            data_dir: std::env::var("OPSQ_DATA_DIR")
                .unwrap_or_else(|_| ".".to_string())
                .into(),
            bot_token: require("SLACK_BOT_TOKEN")?,
            general_channel: require("GENERAL_CHANNEL_ID")?,
            allowed_group: require("ALLOWED_USER_GROUP")?,
            audit_webhook_url: require("AUDIT_WEBHOOK_URL")?,
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| Error::Config(format!("{name} is not set")))
}
