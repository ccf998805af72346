//! Fire-and-forget audit logging
//!
//! Dispatch operations hand completed assignments to a bounded channel and
//! return immediately; a background worker drains the channel and writes
//! each row to the [`AuditSink`]. Sink failures are logged and the row is
//! dropped — the assignment already reported to the caller stands.

use crate::collab::{AuditRecord, AuditSink};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Capacity of the audit channel; at the intended scale this only fills if
/// the sink is down for an extended stretch.
const AUDIT_CHANNEL_CAPACITY: usize = 256;

/// Handle used by the dispatcher to submit audit rows
#[derive(Clone)]
pub struct AuditHandle {
    tx: mpsc::Sender<AuditRecord>,
}

impl AuditHandle {
    /// Submit an assignment for auditing without blocking
    ///
    /// A full channel drops the row with a warning; dispatch never waits on
    /// the audit path.
    pub fn submit(&self, message: &str, language: &str, display_name: &str) {
        let record = AuditRecord {
            timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            message: message.to_string(),
            language: language.to_string(),
            display_name: display_name.to_string(),
        };

        if let Err(e) = self.tx.try_send(record) {
            warn!("Audit channel full, dropping row: {}", e);
        }
    }
}

/// Spawn the audit worker, returning the submission handle
///
/// The worker runs until every `AuditHandle` clone is dropped.
pub fn spawn_audit_worker(sink: Arc<dyn AuditSink>) -> AuditHandle {
    let (tx, rx) = mpsc::channel(AUDIT_CHANNEL_CAPACITY);

    tokio::spawn(run_audit_worker(sink, rx));

    AuditHandle { tx }
}

async fn run_audit_worker(sink: Arc<dyn AuditSink>, mut rx: mpsc::Receiver<AuditRecord>) {
    debug!("Audit worker started");

    while let Some(record) = rx.recv().await {
        match sink.record(&record).await {
            Ok(()) => {
                debug!(
                    "Audit row written: {} ({}) -> {}",
                    record.message, record.language, record.display_name
                );
            }
            Err(e) => {
                // No retry: the row is lost, matching source behavior
                error!("Failed to write audit row: {}", e);
            }
        }
    }

    debug!("Audit worker stopped");
}
