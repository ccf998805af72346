//! Awaiting-task store: tasks that found no eligible operator at creation

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// A task held for later reconciliation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AwaitingTask {
    /// Free-text task payload
    pub message: String,
    /// Required capability tag
    pub language: String,
}

/// File-backed ordered list of deferred tasks
pub struct AwaitingTasks {
    path: PathBuf,
    tasks: Vec<AwaitingTask>,
}

impl AwaitingTasks {
    /// Load the awaiting-task snapshot from `path`, or start empty if absent
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let tasks = super::load_snapshot(&path);
        Self { path, tasks }
    }

    /// Append a task to the tail
    pub fn append(&mut self, message: &str, language: &str) -> Result<()> {
        self.tasks.push(AwaitingTask {
            message: message.to_string(),
            language: language.to_string(),
        });
        self.persist()?;

        info!("Deferred task ({}) at position {}", language, self.tasks.len());
        Ok(())
    }

    /// Current tasks in arrival order
    #[must_use]
    pub fn list(&self) -> &[AwaitingTask] {
        &self.tasks
    }

    /// Remove and return the task at `index` (0-based)
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is not in `[0, len)`.
    pub fn remove_at(&mut self, index: usize) -> Result<AwaitingTask> {
        if index >= self.tasks.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            });
        }

        let task = self.tasks.remove(index);
        self.persist()?;
        Ok(task)
    }

    /// Remove and return the earliest task whose language is in `languages`
    ///
    /// The join-queue reconciliation in the dispatcher scans with
    /// `list()` + `remove_at` instead of this method: the channel
    /// announcement must go out before the task is removed, so the
    /// dispatcher needs the task's position (and content) while the store
    /// is still unchanged. The two scans share the earliest-position rule;
    /// keep them in step.
    #[must_use = "the removed task must be dispatched or it is lost"]
    pub fn take_first_matching(&mut self, languages: &[String]) -> Result<Option<AwaitingTask>> {
        let Some(pos) = self
            .tasks
            .iter()
            .position(|t| languages.iter().any(|l| *l == t.language))
        else {
            return Ok(None);
        };

        let task = self.tasks.remove(pos);
        self.persist()?;
        Ok(Some(task))
    }

    fn persist(&self) -> Result<()> {
        super::save_snapshot(&self.path, &self.tasks)
    }
}
