//! HTTP implementations of the collaborator traits
//!
//! [`SlackClient`] talks to the chat platform's Web API for notifications
//! and identity lookups; [`WebhookAuditSink`] posts audit rows to a
//! spreadsheet-bridge webhook. The dispatcher core never sees these types,
//! only the traits.

use crate::collab::{AuditRecord, AuditSink, IdentityResolver, Notifier};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

const API_BASE: &str = "https://slack.com/api";

/// Chat-platform Web API client
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    allowed_group: String,
}

#[derive(Deserialize)]
struct ApiEnvelope {
    ok: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UserInfoResponse {
    ok: bool,
    error: Option<String>,
    user: Option<UserInfo>,
}

#[derive(Deserialize)]
struct UserInfo {
    profile: UserProfile,
}

#[derive(Deserialize)]
struct UserProfile {
    display_name: Option<String>,
    real_name: Option<String>,
}

#[derive(Deserialize)]
struct GroupUsersResponse {
    ok: bool,
    error: Option<String>,
    #[serde(default)]
    users: Vec<String>,
}

impl SlackClient {
    /// Build a client for the given bot token and allowed admin group
    #[must_use]
    pub fn new(token: impl Into<String>, allowed_group: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            allowed_group: allowed_group.into(),
        }
    }

    async fn post_api(&self, method: &str, body: serde_json::Value) -> Result<reqwest::Response> {
        self.http
            .post(format!("{API_BASE}/{method}"))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Notify(format!("{method}: {e}")))
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post(&self, channel: &str, text: &str) -> Result<()> {
        let response = self
            .post_api("chat.postMessage", json!({ "channel": channel, "text": text }))
            .await?;

        let envelope: ApiEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Notify(format!("chat.postMessage: {e}")))?;

        if !envelope.ok {
            return Err(Error::Notify(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!("Posted to {}", channel);
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for SlackClient {
    async fn display_name_for(&self, user_id: &str) -> Result<Option<String>> {
        let response = self
            .post_api("users.info", json!({ "user": user_id }))
            .await
            .map_err(|e| Error::Identity(e.to_string()))?;

        let info: UserInfoResponse = response
            .json()
            .await
            .map_err(|e| Error::Identity(format!("users.info: {e}")))?;

        if !info.ok {
            return Err(Error::Identity(
                info.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        // Fall back to the real name when no display name is set
        Ok(info.user.and_then(|u| {
            u.profile
                .display_name
                .filter(|n| !n.is_empty())
                .or(u.profile.real_name)
        }))
    }

    async fn is_member_of_allowed_group(&self, user_id: &str) -> Result<bool> {
        let response = self
            .post_api(
                "usergroups.users.list",
                json!({ "usergroup": self.allowed_group }),
            )
            .await
            .map_err(|e| Error::Identity(e.to_string()))?;

        let group: GroupUsersResponse = response
            .json()
            .await
            .map_err(|e| Error::Identity(format!("usergroups.users.list: {e}")))?;

        if !group.ok {
            return Err(Error::Identity(
                group.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(group.users.iter().any(|u| u == user_id))
    }
}

/// Audit sink that posts each row to a webhook as JSON
pub struct WebhookAuditSink {
    http: reqwest::Client,
    url: String,
}

impl WebhookAuditSink {
    /// Build a sink posting to `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AuditSink for WebhookAuditSink {
    async fn record(&self, record: &AuditRecord) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(record)
            .send()
            .await
            .map_err(|e| Error::Audit(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Audit(format!("webhook returned {}", response.status())));
        }
        Ok(())
    }
}
