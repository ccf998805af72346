//! Active queue: the ordered list of operators available for dispatch

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

use super::Roster;

/// One position in the active queue
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    /// Reference to a roster entry
    pub user_id: String,
    /// Display name copied from the roster at insertion time
    pub display_name: String,
    /// Paused entries keep their position but are skipped for dispatch
    pub paused: bool,
}

/// File-backed operator queue; the head is dispatched first
pub struct ActiveQueue {
    path: PathBuf,
    entries: Vec<QueueEntry>,
}

impl ActiveQueue {
    /// Load the queue snapshot from `path`, or start empty if absent
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = super::load_snapshot(&path);
        Self { path, entries }
    }

    /// Whether `user_id` currently holds a queue entry
    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.entries.iter().any(|e| e.user_id == user_id)
    }

    /// Append an operator to the tail; no-op if already a member
    pub fn enqueue(&mut self, user_id: &str, display_name: &str) -> Result<()> {
        if self.is_member(user_id) {
            debug!("{} already queued, enqueue is a no-op", user_id);
            return Ok(());
        }

        self.entries.push(QueueEntry {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            paused: false,
        });
        self.persist()?;

        info!("{} ({}) joined the queue at position {}", display_name, user_id, self.entries.len());
        Ok(())
    }

    /// Remove the entry for `user_id`; no-op if absent
    pub fn dequeue(&mut self, user_id: &str) -> Result<()> {
        let before = self.entries.len();
        self.entries.retain(|e| e.user_id != user_id);

        if self.entries.len() != before {
            info!("{} left the queue", user_id);
        }
        self.persist()
    }

    /// Set the pause flag on the matching entry; no-op if absent
    pub fn pause(&mut self, user_id: &str) -> Result<()> {
        self.set_paused(user_id, true)
    }

    /// Clear the pause flag on the matching entry; no-op if absent
    pub fn resume(&mut self, user_id: &str) -> Result<()> {
        self.set_paused(user_id, false)
    }

    fn set_paused(&mut self, user_id: &str, paused: bool) -> Result<()> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.user_id == user_id) {
            entry.paused = paused;
            self.persist()?;
            debug!("{} paused={}", user_id, paused);
        }
        Ok(())
    }

    /// Relocate an existing entry to the head, preserving its fields; no-op if absent
    pub fn promote_to_head(&mut self, user_id: &str) -> Result<()> {
        let Some(pos) = self.entries.iter().position(|e| e.user_id == user_id) else {
            return Ok(());
        };

        let entry = self.entries.remove(pos);
        self.entries.insert(0, entry);
        self.persist()?;

        info!("{} moved to the head of the queue", user_id);
        Ok(())
    }

    /// Current entries in position order
    #[must_use]
    pub fn list(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// First unpaused entry whose operator speaks `language`
    ///
    /// Scans head to tail; entries whose roster lookup fails are skipped
    /// (a dangling reference is tolerated, not fatal).
    #[must_use]
    pub fn first_eligible(&self, language: &str, roster: &Roster) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| {
            !e.paused
                && roster
                    .get(&e.user_id)
                    .is_some_and(|op| op.speaks(language))
        })
    }

    /// Head of the queue regardless of pause state or language.
    ///
    /// Forced assignment deliberately bypasses both filters; this is an
    /// administrative override, so a paused head is still a valid target.
    #[must_use]
    pub fn first_any(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    fn persist(&self) -> Result<()> {
        super::save_snapshot(&self.path, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_stores() -> (ActiveQueue, Roster, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let queue = ActiveQueue::open(temp_dir.path().join("queue.json"));
        let roster = Roster::open(temp_dir.path().join("register.json"));
        (queue, roster, temp_dir)
    }

    fn langs(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_enqueue_and_membership() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();

        assert!(queue.is_member("U1"));
        assert_eq!(
            queue.list(),
            &[QueueEntry {
                user_id: "U1".to_string(),
                display_name: "Alice".to_string(),
                paused: false,
            }]
        );
    }

    #[test]
    fn test_enqueue_duplicate_is_noop() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.enqueue("U1", "Alice").unwrap();

        assert_eq!(queue.list().len(), 1);
    }

    #[test]
    fn test_dequeue() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.dequeue("U1").unwrap();
        assert!(!queue.is_member("U1"));

        // Dequeue of an absent operator is a no-op
        queue.dequeue("U1").unwrap();
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.pause("U1").unwrap();
        assert!(queue.list()[0].paused);

        queue.resume("U1").unwrap();
        assert!(!queue.list()[0].paused);
    }

    #[test]
    fn test_pause_keeps_position() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.enqueue("U2", "Bob").unwrap();
        queue.pause("U1").unwrap();

        assert_eq!(queue.list()[0].user_id, "U1");
        assert_eq!(queue.list().len(), 2);
    }

    #[test]
    fn test_promote_to_head() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.enqueue("U2", "Bob").unwrap();
        queue.enqueue("U3", "Carol").unwrap();

        queue.promote_to_head("U2").unwrap();

        let order: Vec<&str> = queue.list().iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(order, ["U2", "U1", "U3"]);
    }

    #[test]
    fn test_promote_absent_is_noop() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.promote_to_head("U9").unwrap();

        assert_eq!(queue.list().len(), 1);
        assert_eq!(queue.list()[0].user_id, "U1");
    }

    #[test]
    fn test_first_eligible_skips_paused() {
        let (mut queue, mut roster, _temp) = test_stores();

        roster.register("U1", langs(&["EN"]), "Alice").unwrap();
        roster.register("U2", langs(&["EN"]), "Bob").unwrap();
        queue.enqueue("U1", "Alice").unwrap();
        queue.enqueue("U2", "Bob").unwrap();
        queue.pause("U1").unwrap();

        let entry = queue.first_eligible("EN", &roster).unwrap();
        assert_eq!(entry.user_id, "U2");
    }

    #[test]
    fn test_first_eligible_matches_language() {
        let (mut queue, mut roster, _temp) = test_stores();

        roster.register("U1", langs(&["EN"]), "Alice").unwrap();
        roster.register("U2", langs(&["EN", "FR"]), "Bob").unwrap();
        queue.enqueue("U1", "Alice").unwrap();
        queue.enqueue("U2", "Bob").unwrap();

        let entry = queue.first_eligible("FR", &roster).unwrap();
        assert_eq!(entry.user_id, "U2");
    }

    #[test]
    fn test_first_eligible_none_when_no_speaker() {
        let (mut queue, mut roster, _temp) = test_stores();

        roster.register("U1", langs(&["EN"]), "Alice").unwrap();
        queue.enqueue("U1", "Alice").unwrap();

        assert!(queue.first_eligible("DE", &roster).is_none());
    }

    #[test]
    fn test_first_eligible_skips_dangling_reference() {
        let (mut queue, roster, _temp) = test_stores();

        // Queued but never registered: tolerated, never matched
        queue.enqueue("U1", "Alice").unwrap();

        assert!(queue.first_eligible("EN", &roster).is_none());
    }

    #[test]
    fn test_first_any_ignores_pause() {
        let (mut queue, _roster, _temp) = test_stores();

        queue.enqueue("U1", "Alice").unwrap();
        queue.pause("U1").unwrap();

        assert_eq!(queue.first_any().unwrap().user_id, "U1");
    }

    #[test]
    fn test_first_any_empty() {
        let (queue, _roster, _temp) = test_stores();
        assert!(queue.first_any().is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.json");

        {
            let mut queue = ActiveQueue::open(&path);
            queue.enqueue("U1", "Alice").unwrap();
            queue.enqueue("U2", "Bob").unwrap();
            queue.pause("U2").unwrap();
        }

        let reloaded = ActiveQueue::open(&path);
        assert_eq!(reloaded.list().len(), 2);
        assert_eq!(reloaded.list()[0].user_id, "U1");
        assert!(reloaded.list()[1].paused);
    }

    #[test]
    fn test_snapshot_field_names() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("queue.json");

        let mut queue = ActiveQueue::open(&path);
        queue.enqueue("U1", "Alice").unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["user_id"], "U1");
        assert_eq!(raw[0]["display_name"], "Alice");
        assert_eq!(raw[0]["paused"], false);
    }
}
