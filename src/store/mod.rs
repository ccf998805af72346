//! File-backed stores for dispatcher state
//!
//! Three independent snapshot files, one per store:
//! - `register.json` — registered operators and their language sets
//! - `queue.json` — the active queue, in position order
//! - `awaiting.json` — tasks deferred for lack of an eligible operator
//!
//! Every mutation rewrites the full snapshot before the operation reports
//! success. Missing or malformed files load as an empty store.

mod awaiting;
mod queue;
mod roster;

pub use awaiting::{AwaitingTask, AwaitingTasks};
pub use queue::{ActiveQueue, QueueEntry};
pub use roster::{Operator, Roster};

use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

/// Load a snapshot file, treating absence or corruption as an empty store.
fn load_snapshot<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(_) => {
            debug!("No snapshot at {}, starting empty", path.display());
            return Vec::new();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Malformed snapshot at {}: {}, starting empty", path.display(), e);
            Vec::new()
        }
    }
}

/// Persist a full snapshot.
///
/// The JSON document is built in memory first, then written to a sibling
/// temp file and renamed into place, so a failed write never leaves a
/// truncated snapshot behind.
fn save_snapshot<T: Serialize>(path: &Path, entries: &[T]) -> Result<()> {
    let json = serde_json::to_vec_pretty(entries)?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json)?;
    std::fs::rename(&tmp, path)?;

    debug!("Persisted {} entries to {}", entries.len(), path.display());
    Ok(())
}
