//! HTTP command router
//!
//! Exposes the dispatcher over the chat platform's slash-command webhook
//! shape: form-encoded POSTs carrying `user_id` and a `text` field. Every
//! response is an ephemeral JSON message back to the caller; channel-wide
//! announcements are the dispatcher's job.

use crate::command::{AssignCommand, AwaitingCommand, CreateCommand, QueueCommand};
use crate::dispatch::{Dispatcher, JoinOutcome, TaskOutcome};
use crate::{Error, Result};
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Slash-command payload fields the router cares about
#[derive(Deserialize, Debug)]
pub struct SlashPayload {
    /// Caller's platform id
    pub user_id: String,
    /// Raw command text after the slash command itself
    #[serde(default)]
    pub text: String,
}

/// Ephemeral reply to the calling user
#[derive(Serialize, Debug)]
struct Ephemeral {
    response_type: &'static str,
    text: String,
}

impl Ephemeral {
    fn new(text: impl Into<String>) -> Self {
        Self {
            response_type: "ephemeral",
            text: text.into(),
        }
    }
}

fn reply(text: impl Into<String>) -> Response {
    (StatusCode::OK, Json(Ephemeral::new(text))).into_response()
}

fn reply_error(err: &Error) -> Response {
    let status = match err {
        Error::InvalidCommand(_) | Error::UnsupportedLanguage(_) => StatusCode::BAD_REQUEST,
        Error::Notify(_) | Error::Identity(_) | Error::Io(_) | Error::Json(_) => {
            warn!("Command failed: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::OK,
    };
    (status, Json(Ephemeral::new(err.user_message()))).into_response()
}

/// Build the router over a shared dispatcher
pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/queue", post(handle_queue))
        .route("/create", post(handle_create))
        .route("/assign", post(handle_assign))
        .route("/awaiting", post(handle_awaiting))
        .with_state(dispatcher)
}

/// Serve the router until the process exits
///
/// # Errors
///
/// Returns an error if the listener fails.
pub async fn serve(listener: TcpListener, dispatcher: Arc<Dispatcher>) -> Result<()> {
    info!("Dispatcher listening on {}", listener.local_addr()?);
    axum::serve(listener, router(dispatcher))
        .await
        .map_err(Error::from)
}

async fn handle_queue(
    State(dispatcher): State<Arc<Dispatcher>>,
    Form(payload): Form<SlashPayload>,
) -> Response {
    let command = match QueueCommand::parse(&payload.text) {
        Ok(command) => command,
        Err(e) => return reply_error(&e),
    };

    match command {
        QueueCommand::Register { languages } => {
            match dispatcher.register(&payload.user_id, languages).await {
                Ok(display_name) => reply(format!("Registered as {display_name}.")),
                Err(e) => reply_error(&e),
            }
        }
        QueueCommand::List => {
            let entries = dispatcher.list_queue().await;
            let lines: Vec<String> = entries
                .iter()
                .map(|(entry, languages)| {
                    let marker = if entry.paused { " (paused)" } else { "" };
                    format!("<@{}>{} [{}]", entry.user_id, marker, languages.join(", "))
                })
                .collect();
            reply(format!("Current Queue:\n{}", lines.join("\n")))
        }
        QueueCommand::Add => match dispatcher.join_queue(&payload.user_id).await {
            Ok(JoinOutcome::Queued { .. }) => reply("You have been added to the queue."),
            Ok(JoinOutcome::AutoAssigned { task }) => reply(format!(
                "An awaiting task was assigned to you: {} ({}).",
                task.message, task.language
            )),
            Err(e) => reply_error(&e),
        },
        QueueCommand::Remove => match dispatcher.leave_queue(&payload.user_id).await {
            Ok(_) => reply("You have been removed from the queue."),
            Err(e) => reply_error(&e),
        },
        QueueCommand::Pause { reason } => {
            match dispatcher.pause(&payload.user_id, &reason).await {
                Ok(()) => reply("You are paused in the queue."),
                Err(e) => reply_error(&e),
            }
        }
        QueueCommand::Resume => match dispatcher.resume_and_promote(&payload.user_id).await {
            Ok(_) => reply("You are resumed and moved to the top of the queue."),
            Err(e) => reply_error(&e),
        },
        QueueCommand::Unpause => match dispatcher.resume(&payload.user_id).await {
            Ok(()) => reply("You are resumed in your current position."),
            Err(e) => reply_error(&e),
        },
        QueueCommand::DeleteReg { display_name } => {
            if let Err(e) = require_admin(&dispatcher, &payload.user_id).await {
                return reply_error(&e);
            }
            match dispatcher.delete_registration(&display_name).await {
                Ok(()) => reply(format!(
                    "User {display_name} has been successfully unregistered."
                )),
                Err(e) => reply_error(&e),
            }
        }
        QueueCommand::EditReg {
            display_name,
            languages,
        } => {
            if let Err(e) = require_admin(&dispatcher, &payload.user_id).await {
                return reply_error(&e);
            }
            match dispatcher.edit_registration(&display_name, languages).await {
                Ok(()) => reply(format!("Languages updated for {display_name}.")),
                Err(e) => reply_error(&e),
            }
        }
    }
}

async fn handle_create(
    State(dispatcher): State<Arc<Dispatcher>>,
    Form(payload): Form<SlashPayload>,
) -> Response {
    let command = match CreateCommand::parse(&payload.text) {
        Ok(command) => command,
        Err(e) => return reply_error(&e),
    };

    match dispatcher
        .create_task(&command.message, &command.language)
        .await
    {
        Ok(TaskOutcome::Assigned { .. }) => {
            reply("Task created and assigned. Operator has been removed from the queue.")
        }
        Ok(TaskOutcome::Deferred) => reply(format!(
            "No operator available for the language: {}. The task has been added to the awaiting list.",
            command.language
        )),
        Err(e) => reply_error(&e),
    }
}

async fn handle_assign(
    State(dispatcher): State<Arc<Dispatcher>>,
    Form(payload): Form<SlashPayload>,
) -> Response {
    if let Err(e) = require_admin(&dispatcher, &payload.user_id).await {
        return reply_error(&e);
    }

    let command = match AssignCommand::parse(&payload.text) {
        Ok(command) => command,
        Err(e) => return reply_error(&e),
    };

    let outcome = match &command.target {
        Some(display_name) => dispatcher
            .assign_to(display_name, &command.message, &command.language)
            .await
            .map(|_| ()),
        // No target: forced assignment to the queue head
        None => dispatcher
            .force_assign(&command.message, &command.language)
            .await
            .map(|_| ()),
    };

    match outcome {
        Ok(()) => reply("Task assigned successfully."),
        Err(e) => reply_error(&e),
    }
}

async fn handle_awaiting(
    State(dispatcher): State<Arc<Dispatcher>>,
    Form(payload): Form<SlashPayload>,
) -> Response {
    let command = match AwaitingCommand::parse(&payload.text) {
        Ok(command) => command,
        Err(e) => return reply_error(&e),
    };

    match command {
        AwaitingCommand::List => {
            let tasks = dispatcher.list_awaiting().await;
            if tasks.is_empty() {
                return reply("No tasks are awaiting an operator.");
            }
            let lines: Vec<String> = tasks
                .iter()
                .enumerate()
                .map(|(i, t)| format!("{}. {} ({})", i + 1, t.message, t.language))
                .collect();
            reply(format!("Awaiting tasks:\n{}", lines.join("\n")))
        }
        AwaitingCommand::Give {
            number,
            display_name,
        } => {
            if let Err(e) = require_admin(&dispatcher, &payload.user_id).await {
                return reply_error(&e);
            }
            // External interface is 1-indexed
            match dispatcher.give_awaiting(number - 1, &display_name).await {
                Ok(task) => reply(format!(
                    "Task \"{}\" assigned to {display_name}.",
                    task.message
                )),
                Err(e) => reply_error(&e),
            }
        }
    }
}

async fn require_admin(dispatcher: &Dispatcher, user_id: &str) -> Result<()> {
    if dispatcher.is_admin(user_id).await? {
        Ok(())
    } else {
        Err(Error::PermissionDenied)
    }
}
