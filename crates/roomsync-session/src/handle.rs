// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Actor wrapper that runs a [`ConversationSession`] on its own task.
//!
//! The task owns the session and is the only place it is mutated. Callers
//! talk to it through a cloneable [`SessionHandle`] and read state from the
//! snapshot subscription.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use roomsync_core::{ClientToken, ConversationId, PendingMessage, RoomsyncError};

use crate::session::ConversationSession;
use crate::snapshot::SessionSnapshot;

const COMMAND_BUFFER: usize = 64;

enum Command {
    Select {
        conversation_id: ConversationId,
        reply: oneshot::Sender<()>,
    },
    Send {
        text: String,
        reply: oneshot::Sender<Result<PendingMessage, RoomsyncError>>,
    },
    RefreshHistory {
        reply: oneshot::Sender<Result<(), RoomsyncError>>,
    },
    Retry {
        token: ClientToken,
        reply: oneshot::Sender<bool>,
    },
}

/// Cloneable front end of a session task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

impl SessionHandle {
    /// Move `session` onto a new task.
    ///
    /// The task runs until `cancel` fires or every handle is dropped, then
    /// closes the session.
    pub fn spawn(
        session: ConversationSession,
        cancel: CancellationToken,
    ) -> (Self, JoinHandle<()>) {
        let (commands, rx) = mpsc::channel(COMMAND_BUFFER);
        let snapshots = session.subscribe();
        let task = tokio::spawn(run(session, rx, cancel));
        (
            Self {
                commands,
                snapshots,
            },
            task,
        )
    }

    pub async fn select(&self, conversation_id: ConversationId) -> Result<(), RoomsyncError> {
        self.request(|reply| Command::Select {
            conversation_id,
            reply,
        })
        .await
    }

    pub async fn send(&self, text: impl Into<String>) -> Result<PendingMessage, RoomsyncError> {
        let text = text.into();
        self.request(|reply| Command::Send { text, reply }).await?
    }

    pub async fn refresh_history(&self) -> Result<(), RoomsyncError> {
        self.request(|reply| Command::RefreshHistory { reply }).await?
    }

    pub async fn retry(&self, token: ClientToken) -> Result<bool, RoomsyncError> {
        self.request(|reply| Command::Retry { token, reply }).await
    }

    /// A receiver that observes every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RoomsyncError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }
}

fn stopped() -> RoomsyncError {
    RoomsyncError::Internal("session task has stopped".to_string())
}

async fn run(
    mut session: ConversationSession,
    mut commands: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    debug!("session task running");

    loop {
        let deadline = session.next_ack_deadline();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("shutdown signal received, stopping session task");
                break;
            }
            command = commands.recv() => match command {
                Some(command) => execute(&mut session, command),
                None => break,
            },
            _ = session.process_next() => {}
            _ = ack_deadline(deadline) => {
                session.expire_acks(Instant::now());
            }
        }
    }

    session.close();
    debug!("session task stopped");
}

fn execute(session: &mut ConversationSession, command: Command) {
    match command {
        Command::Select {
            conversation_id,
            reply,
        } => {
            session.select(conversation_id);
            let _ = reply.send(());
        }
        Command::Send { text, reply } => {
            let _ = reply.send(session.send(text));
        }
        Command::RefreshHistory { reply } => {
            let _ = reply.send(session.refresh_history());
        }
        Command::Retry { token, reply } => {
            let _ = reply.send(session.retry(&token));
        }
    }
}

async fn ack_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
