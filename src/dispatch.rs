//! The dispatcher core: matching tasks to operators
//!
//! All mutable state (roster, active queue, awaiting tasks) lives behind a
//! single mutex. Match-then-Assign and Enqueue-then-Auto-Match each run as
//! one critical section spanning the read of queue/awaiting state and the
//! corresponding write, so concurrent requests cannot double-assign an
//! operator or lose a task mid-defer.
//!
//! Channel notifications happen inside the critical section and before any
//! store mutation: a failed notification aborts the operation with state
//! untouched. Audit rows go through the fire-and-forget worker and never
//! block the outcome.

use crate::audit::AuditHandle;
use crate::collab::{IdentityResolver, Notifier};
use crate::store::{ActiveQueue, AwaitingTask, AwaitingTasks, QueueEntry, Roster};
use crate::{Error, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Terminal state of a task-creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Matched an eligible operator, who was removed from the queue
    Assigned {
        user_id: String,
        display_name: String,
    },
    /// No eligible operator; the task went to the awaiting list
    Deferred,
}

/// Terminal state of an operator joining the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Appended to the queue tail
    Queued { languages: Vec<String> },
    /// An awaiting task matched one of the operator's languages; the
    /// operator took it immediately and never entered the queue
    AutoAssigned { task: AwaitingTask },
}

struct DispatchState {
    roster: Roster,
    queue: ActiveQueue,
    awaiting: AwaitingTasks,
}

/// Owns the dispatch state and the collaborator handles
pub struct Dispatcher {
    state: Mutex<DispatchState>,
    notifier: Arc<dyn Notifier>,
    identity: Arc<dyn IdentityResolver>,
    audit: AuditHandle,
    channel: String,
}

impl Dispatcher {
    /// Build a dispatcher over the snapshot files in `data_dir`
    pub fn new(
        data_dir: &Path,
        notifier: Arc<dyn Notifier>,
        identity: Arc<dyn IdentityResolver>,
        audit: AuditHandle,
        channel: impl Into<String>,
    ) -> Self {
        let state = DispatchState {
            roster: Roster::open(data_dir.join("register.json")),
            queue: ActiveQueue::open(data_dir.join("queue.json")),
            awaiting: AwaitingTasks::open(data_dir.join("awaiting.json")),
        };

        Self {
            state: Mutex::new(state),
            notifier,
            identity,
            audit,
            channel: channel.into(),
        }
    }

    /// Whether the caller may run administrative commands
    pub async fn is_admin(&self, user_id: &str) -> Result<bool> {
        self.identity.is_member_of_allowed_group(user_id).await
    }

    // ---- Registration ----

    /// Register a new operator, resolving their display name on the platform
    pub async fn register(&self, user_id: &str, languages: Vec<String>) -> Result<String> {
        let mut state = self.state.lock().await;

        if state.roster.is_registered(user_id) {
            return Err(Error::AlreadyRegistered);
        }

        let display_name = self
            .identity
            .display_name_for(user_id)
            .await?
            .ok_or_else(|| Error::Identity(format!("no display name for {user_id}")))?;

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> [{}] has been successfully registered.",
                    languages.join(", ")
                ),
            )
            .await?;

        state.roster.register(user_id, languages, &display_name)?;
        Ok(display_name)
    }

    /// Replace a registered operator's language set (admin)
    pub async fn edit_registration(
        &self,
        display_name: &str,
        languages: Vec<String>,
    ) -> Result<()> {
        let mut state = self.state.lock().await;

        let operator = state
            .roster
            .get_by_display_name(display_name)
            .ok_or_else(|| Error::NotFound(display_name.to_string()))?;
        let user_id = operator.user_id.clone();

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> languages have been updated to: [{}].",
                    languages.join(", ")
                ),
            )
            .await?;

        state.roster.update_languages(display_name, languages)
    }

    /// De-register every operator with the given display name (admin)
    pub async fn delete_registration(&self, display_name: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.roster.get_by_display_name(display_name).is_none() {
            return Err(Error::NotFound(display_name.to_string()));
        }

        state.roster.delete(display_name)
    }

    // ---- Queue membership ----

    /// Operator joins the queue, taking a matching awaiting task if one exists
    pub async fn join_queue(&self, user_id: &str) -> Result<JoinOutcome> {
        let mut state = self.state.lock().await;

        if !state.roster.is_registered(user_id) {
            return Err(Error::NotRegistered);
        }
        if state.queue.is_member(user_id) {
            return Err(Error::AlreadyQueued);
        }

        let operator = state
            .roster
            .get(user_id)
            .ok_or(Error::NotRegistered)?
            .clone();

        // Reconcile before queuing: the earliest awaiting task in one of the
        // operator's languages is assigned immediately and the operator is
        // considered busy, never entering the queue.
        let matching = state
            .awaiting
            .list()
            .iter()
            .position(|t| operator.speaks(&t.language));

        if let Some(pos) = matching {
            let task = state.awaiting.list()[pos].clone();
            self.notifier
                .post(
                    &self.channel,
                    &format!("{} <@{user_id}> ({})", task.message, task.language),
                )
                .await?;

            let task = state.awaiting.remove_at(pos)?;
            self.audit
                .submit(&task.message, &task.language, &operator.display_name);

            info!(
                "Awaiting task auto-assigned to {} on join",
                operator.display_name
            );
            return Ok(JoinOutcome::AutoAssigned { task });
        }

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> [{}] added to queue successfully.",
                    operator.languages.join(", ")
                ),
            )
            .await?;

        state.queue.enqueue(user_id, &operator.display_name)?;
        Ok(JoinOutcome::Queued {
            languages: operator.languages,
        })
    }

    /// Operator leaves the queue; returns their languages for the announcement
    pub async fn leave_queue(&self, user_id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;

        if !state.queue.is_member(user_id) {
            return Err(Error::NotQueued);
        }
        let languages = state.roster.languages_of(user_id);

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> [{}] removed from queue successfully.",
                    languages.join(", ")
                ),
            )
            .await?;

        state.queue.dequeue(user_id)?;
        Ok(languages)
    }

    /// Pause a queued operator; the reason only travels to the channel
    pub async fn pause(&self, user_id: &str, reason: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        if !state.queue.is_member(user_id) {
            return Err(Error::NotQueued);
        }
        let languages = state.roster.languages_of(user_id);

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> [{}] paused in queue. Reason: \"{reason}\"",
                    languages.join(", ")
                ),
            )
            .await?;

        state.queue.pause(user_id)
    }

    /// Clear the pause flag, keeping the operator's position
    pub async fn resume(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        if !state.queue.is_member(user_id) {
            return Err(Error::NotQueued);
        }
        state.queue.resume(user_id)
    }

    /// Clear the pause flag and move the operator to the queue head
    pub async fn resume_and_promote(&self, user_id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().await;

        if !state.queue.is_member(user_id) {
            return Err(Error::NotQueued);
        }
        let languages = state.roster.languages_of(user_id);

        self.notifier
            .post(
                &self.channel,
                &format!(
                    "<@{user_id}> [{}] resumed and moved to the top of the queue.",
                    languages.join(", ")
                ),
            )
            .await?;

        state.queue.resume(user_id)?;
        state.queue.promote_to_head(user_id)?;
        Ok(languages)
    }

    /// Snapshot of the queue with each entry's languages, in position order
    pub async fn list_queue(&self) -> Vec<(QueueEntry, Vec<String>)> {
        let state = self.state.lock().await;
        state
            .queue
            .list()
            .iter()
            .map(|e| (e.clone(), state.roster.languages_of(&e.user_id)))
            .collect()
    }

    // ---- Task dispatch ----

    /// Create a task: match an eligible operator or defer to the awaiting list
    pub async fn create_task(&self, message: &str, language: &str) -> Result<TaskOutcome> {
        let mut state = self.state.lock().await;

        let matched = state
            .queue
            .first_eligible(language, &state.roster)
            .cloned();

        let Some(entry) = matched else {
            // Defer: the task waits for the next matching operator to join
            state.awaiting.append(message, language)?;
            self.notifier
                .post(
                    &self.channel,
                    &format!(
                        "<!here> Oops, looks like we need an operator with this language \
                         ({language}). Please, if anyone is available, join the queue using \
                         /queue add."
                    ),
                )
                .await?;
            return Ok(TaskOutcome::Deferred);
        };

        self.notifier
            .post(
                &self.channel,
                &format!("{message} <@{}> ({language})", entry.user_id),
            )
            .await?;

        self.audit.submit(message, language, &entry.display_name);
        state.queue.dequeue(&entry.user_id)?;

        info!("Task ({}) assigned to {}", language, entry.display_name);
        Ok(TaskOutcome::Assigned {
            user_id: entry.user_id,
            display_name: entry.display_name,
        })
    }

    /// Assign a task to a named operator, ignoring language and pause state
    ///
    /// The operator is removed from the queue only if currently present.
    pub async fn assign_to(
        &self,
        display_name: &str,
        message: &str,
        language: &str,
    ) -> Result<String> {
        let mut state = self.state.lock().await;

        let operator = state
            .roster
            .get_by_display_name(display_name)
            .ok_or_else(|| Error::OperatorNotFound(display_name.to_string()))?
            .clone();

        self.notifier
            .post(
                &self.channel,
                &format!("{message} <@{}> {language}", operator.user_id),
            )
            .await?;

        self.audit.submit(message, language, &operator.display_name);
        if state.queue.is_member(&operator.user_id) {
            state.queue.dequeue(&operator.user_id)?;
        }

        info!("Task ({}) assigned directly to {}", language, display_name);
        Ok(operator.user_id)
    }

    /// Assign a task to the queue head, bypassing language and pause filters
    ///
    /// Forced tasks are never deferred: an empty queue is an error.
    pub async fn force_assign(&self, message: &str, language: &str) -> Result<TaskOutcome> {
        let mut state = self.state.lock().await;

        let entry = state
            .queue
            .first_any()
            .cloned()
            .ok_or(Error::NoOperatorsAvailable)?;

        self.notifier
            .post(
                &self.channel,
                &format!("{message} <@{}> ({language})", entry.user_id),
            )
            .await?;

        self.audit.submit(message, language, &entry.display_name);
        state.queue.dequeue(&entry.user_id)?;

        info!("Task ({}) force-assigned to {}", language, entry.display_name);
        Ok(TaskOutcome::Assigned {
            user_id: entry.user_id,
            display_name: entry.display_name,
        })
    }

    // ---- Awaiting-task administration ----

    /// Current awaiting tasks in arrival order
    pub async fn list_awaiting(&self) -> Vec<AwaitingTask> {
        let state = self.state.lock().await;
        state.awaiting.list().to_vec()
    }

    /// Hand the awaiting task at `index` (0-based) to a named operator
    pub async fn give_awaiting(&self, index: usize, display_name: &str) -> Result<AwaitingTask> {
        let mut state = self.state.lock().await;

        let operator = state
            .roster
            .get_by_display_name(display_name)
            .ok_or_else(|| Error::OperatorNotFound(display_name.to_string()))?
            .clone();

        let len = state.awaiting.list().len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        let task = state.awaiting.list()[index].clone();

        self.notifier
            .post(
                &self.channel,
                &format!("{} <@{}> ({})", task.message, operator.user_id, task.language),
            )
            .await?;

        let task = state.awaiting.remove_at(index)?;
        self.audit
            .submit(&task.message, &task.language, &operator.display_name);
        if state.queue.is_member(&operator.user_id) {
            state.queue.dequeue(&operator.user_id)?;
        }

        info!(
            "Awaiting task #{} handed to {}",
            index + 1,
            operator.display_name
        );
        Ok(task)
    }
}
