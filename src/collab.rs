//! Capability contracts for the external collaborators
//!
//! The dispatcher core only sees these traits. The production
//! implementations live in [`crate::slack`]; tests substitute in-memory
//! mocks.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Posts announcements to the shared channel
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Post `text` to `channel`
    ///
    /// # Errors
    ///
    /// Returns `Error::Notify` if the message could not be delivered. A
    /// failed notification aborts the dispatch operation that requested it.
    async fn post(&self, channel: &str, text: &str) -> Result<()>;
}

/// Resolves operator identity and permissions on the chat platform
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Display name for the given operator id, if the platform knows one
    ///
    /// # Errors
    ///
    /// Returns `Error::Identity` if the lookup itself fails.
    async fn display_name_for(&self, user_id: &str) -> Result<Option<String>>;

    /// Whether the operator belongs to the single allowed admin group
    ///
    /// # Errors
    ///
    /// Returns `Error::Identity` if the lookup itself fails.
    async fn is_member_of_allowed_group(&self, user_id: &str) -> Result<bool>;
}

/// One row of the external audit log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Assignment time, formatted `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
    /// Task payload
    pub message: String,
    /// Task language tag
    pub language: String,
    /// Display name of the assigned operator
    pub display_name: String,
}

/// Receives audit rows for completed assignments
///
/// Invoked from the background audit worker only; a failure is logged and
/// the row dropped, never surfaced to the dispatch caller.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one assignment
    ///
    /// # Errors
    ///
    /// Returns `Error::Audit` if the row could not be written.
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}
