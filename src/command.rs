//! Command-text parsing for the HTTP router
//!
//! Slash-command payloads arrive as a single `text` field; arguments are
//! whitespace-separated with double quotes grouping multi-word values
//! (`"need help with order" EN`). Parsed commands are explicit structs, so
//! handlers never poke at raw argument lists.

use crate::{Error, Result};

/// Language tags operators may register with
pub const SUPPORTED_LANGUAGES: &[&str] = &["RU", "UA", "EN", "KA", "TR", "PL", "ES", "PT"];

/// `/queue` subcommands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueCommand {
    /// Register the calling operator with the given languages
    Register { languages: Vec<String> },
    /// Show the queue in position order
    List,
    /// Join the queue (or take a matching awaiting task)
    Add,
    /// Leave the queue
    Remove,
    /// Pause with a mandatory reason
    Pause { reason: String },
    /// Resume and move to the head
    Resume,
    /// Resume in place, keeping the current position
    Unpause,
    /// Admin: delete a registration by display name
    DeleteReg { display_name: String },
    /// Admin: replace a registration's languages by display name
    EditReg {
        display_name: String,
        languages: Vec<String>,
    },
}

/// `/create` payload: a task to dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommand {
    pub message: String,
    pub language: String,
}

/// `/assign` payload: a task for a named operator, or for the queue head
/// when no target is given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignCommand {
    pub message: String,
    /// `None` forces assignment to the queue head, bypassing language and
    /// pause filters
    pub target: Option<String>,
    pub language: String,
}

/// `/awaiting` subcommands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AwaitingCommand {
    /// Show deferred tasks, 1-indexed
    List,
    /// Admin: hand task `number` (1-indexed) to a named operator
    Give { number: usize, display_name: String },
}

/// Split command text into arguments, honoring double quotes
///
/// # Errors
///
/// Returns `InvalidCommand` on an unterminated quote.
pub fn split_args(text: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for ch in text.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if in_quotes {
        return Err(Error::InvalidCommand("unterminated quote".to_string()));
    }
    if has_token {
        args.push(current);
    }

    Ok(args)
}

/// Validate language tags against the supported set, normalizing to uppercase
///
/// # Errors
///
/// Returns `UnsupportedLanguage` for an unknown tag and `InvalidCommand`
/// when no tags were given.
pub fn parse_languages(args: &[String]) -> Result<Vec<String>> {
    if args.is_empty() {
        return Err(Error::InvalidCommand(
            "at least one language is required".to_string(),
        ));
    }

    args.iter()
        .map(|tag| {
            let tag = tag.to_uppercase();
            if SUPPORTED_LANGUAGES.contains(&tag.as_str()) {
                Ok(tag)
            } else {
                Err(Error::UnsupportedLanguage(tag))
            }
        })
        .collect()
}

/// Language tag for a task; tasks may use any tag operators can register with
fn parse_language(arg: &str) -> Result<String> {
    parse_languages(&[arg.to_string()]).map(|mut tags| tags.remove(0))
}

/// Strip the chat-platform mention decoration from a display name
fn clean_display_name(arg: &str) -> String {
    arg.trim_start_matches('@').trim().to_string()
}

impl QueueCommand {
    /// Parse `/queue` command text
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` for unknown subcommands or bad arity, and
    /// `UnsupportedLanguage` for unknown language tags.
    pub fn parse(text: &str) -> Result<Self> {
        let args = split_args(text)?;
        let Some((cmd, rest)) = args.split_first() else {
            return Err(Error::InvalidCommand("empty command".to_string()));
        };

        match cmd.as_str() {
            "register" => Ok(QueueCommand::Register {
                languages: parse_languages(rest)?,
            }),
            "list" => Ok(QueueCommand::List),
            "add" => Ok(QueueCommand::Add),
            "remove" => Ok(QueueCommand::Remove),
            "pause" => {
                let reason = rest.join(" ");
                if reason.trim().is_empty() {
                    return Err(Error::InvalidCommand("pause requires a reason".to_string()));
                }
                Ok(QueueCommand::Pause { reason })
            }
            "resume" => Ok(QueueCommand::Resume),
            "unpause" => Ok(QueueCommand::Unpause),
            "deletereg" => match rest {
                [name] => Ok(QueueCommand::DeleteReg {
                    display_name: clean_display_name(name),
                }),
                _ => Err(Error::InvalidCommand(
                    "deletereg requires the display name in quotes".to_string(),
                )),
            },
            "editreg" => match rest.split_first() {
                Some((name, languages)) => Ok(QueueCommand::EditReg {
                    display_name: clean_display_name(name),
                    languages: parse_languages(languages)?,
                }),
                None => Err(Error::InvalidCommand(
                    "editreg requires the display name in quotes".to_string(),
                )),
            },
            other => Err(Error::InvalidCommand(format!("unknown subcommand '{other}'"))),
        }
    }
}

impl CreateCommand {
    /// Parse `/create` command text: `"message" language`
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` on bad arity, `UnsupportedLanguage` for an
    /// unknown tag.
    pub fn parse(text: &str) -> Result<Self> {
        match split_args(text)?.as_slice() {
            [message, language] => Ok(CreateCommand {
                message: message.clone(),
                language: parse_language(language)?,
            }),
            _ => Err(Error::InvalidCommand(
                "expected: \"message\" language".to_string(),
            )),
        }
    }
}

impl AssignCommand {
    /// Parse `/assign` command text: `"message" @name language`, or
    /// `"message" language` to force-assign to the queue head
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` on bad arity, `UnsupportedLanguage` for an
    /// unknown tag.
    pub fn parse(text: &str) -> Result<Self> {
        match split_args(text)?.as_slice() {
            [message, name, language] => Ok(AssignCommand {
                message: message.clone(),
                target: Some(clean_display_name(name)),
                language: parse_language(language)?,
            }),
            [message, language] => Ok(AssignCommand {
                message: message.clone(),
                target: None,
                language: parse_language(language)?,
            }),
            _ => Err(Error::InvalidCommand(
                "expected: \"message\" [@name] language".to_string(),
            )),
        }
    }
}

impl AwaitingCommand {
    /// Parse `/awaiting` command text
    ///
    /// # Errors
    ///
    /// Returns `InvalidCommand` for unknown subcommands, bad arity, or a
    /// non-numeric task number.
    pub fn parse(text: &str) -> Result<Self> {
        let args = split_args(text)?;
        let Some((cmd, rest)) = args.split_first() else {
            return Err(Error::InvalidCommand("empty command".to_string()));
        };

        match cmd.as_str() {
            "list" => Ok(AwaitingCommand::List),
            "give" => match rest {
                [number, name] => {
                    let number: usize = number.parse().map_err(|_| {
                        Error::InvalidCommand(format!("'{number}' is not a task number"))
                    })?;
                    if number == 0 {
                        return Err(Error::InvalidCommand(
                            "task numbers start at 1".to_string(),
                        ));
                    }
                    Ok(AwaitingCommand::Give {
                        number,
                        display_name: clean_display_name(name),
                    })
                }
                _ => Err(Error::InvalidCommand(
                    "expected: give N \"name\"".to_string(),
                )),
            },
            other => Err(Error::InvalidCommand(format!("unknown subcommand '{other}'"))),
        }
    }
}
