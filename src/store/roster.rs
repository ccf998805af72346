//! Roster store: the durable register of known operators

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// A registered operator
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    /// Stable external identity (opaque to the dispatcher)
    pub user_id: String,
    /// Human-readable label; treated as a first-match key by admin commands
    pub display_name: String,
    /// Language capability tags, non-empty after registration
    pub languages: Vec<String>,
}

impl Operator {
    /// Whether the operator can take tasks in the given language
    #[must_use]
    pub fn speaks(&self, language: &str) -> bool {
        self.languages.iter().any(|l| l == language)
    }
}

/// File-backed register of operators, kept in storage order
pub struct Roster {
    path: PathBuf,
    operators: Vec<Operator>,
}

impl Roster {
    /// Load the roster snapshot from `path`, or start empty if absent
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let operators = super::load_snapshot(&path);
        Self { path, operators }
    }

    /// Whether `user_id` has a roster entry
    #[must_use]
    pub fn is_registered(&self, user_id: &str) -> bool {
        self.operators.iter().any(|o| o.user_id == user_id)
    }

    /// Register a new operator
    ///
    /// # Errors
    ///
    /// Returns `AlreadyRegistered` if `user_id` already has an entry, or a
    /// persistence error if the snapshot write fails.
    pub fn register(
        &mut self,
        user_id: &str,
        languages: Vec<String>,
        display_name: &str,
    ) -> Result<()> {
        if self.is_registered(user_id) {
            return Err(Error::AlreadyRegistered);
        }

        self.operators.push(Operator {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
            languages,
        });
        self.persist()?;

        info!("Registered operator {} ({})", display_name, user_id);
        Ok(())
    }

    /// First roster entry with the given display name, in storage order
    #[must_use]
    pub fn get_by_display_name(&self, display_name: &str) -> Option<&Operator> {
        self.operators.iter().find(|o| o.display_name == display_name)
    }

    /// Roster entry for the given id
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<&Operator> {
        self.operators.iter().find(|o| o.user_id == user_id)
    }

    /// Replace the language set of the first entry matching `display_name`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entry matches.
    pub fn update_languages(&mut self, display_name: &str, new_languages: Vec<String>) -> Result<()> {
        let operator = self
            .operators
            .iter_mut()
            .find(|o| o.display_name == display_name)
            .ok_or_else(|| Error::NotFound(display_name.to_string()))?;

        operator.languages = new_languages;
        self.persist()?;

        info!("Updated languages for {}", display_name);
        Ok(())
    }

    /// Remove every entry matching `display_name` (idempotent)
    pub fn delete(&mut self, display_name: &str) -> Result<()> {
        let before = self.operators.len();
        self.operators.retain(|o| o.display_name != display_name);

        if self.operators.len() != before {
            info!("Deleted registration for {}", display_name);
        }
        self.persist()
    }

    /// Language set of the given operator; empty if unknown
    #[must_use]
    pub fn languages_of(&self, user_id: &str) -> Vec<String> {
        self.get(user_id)
            .map(|o| o.languages.clone())
            .unwrap_or_default()
    }

    fn persist(&self) -> Result<()> {
        super::save_snapshot(&self.path, &self.operators)
    }
}
