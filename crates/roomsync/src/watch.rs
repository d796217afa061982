// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `roomsync watch` command implementation.
//!
//! Runs a conversation session against the configured server, prints every
//! snapshot change, and sends stdin lines as messages. Slash commands switch
//! conversations, refetch history, and resend failed submissions.

use std::sync::Arc;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use roomsync_config::RoomsyncConfig;
use roomsync_core::{
    ConversationId, Credential, CredentialCell, DeliveryStatus, InMemoryDirectory, RoomsyncError,
};
use roomsync_history::HttpHistorySource;
use roomsync_session::{ConversationSession, SessionConfig, SessionHandle};
use roomsync_transport::WsConnector;

use crate::render::SnapshotPrinter;
use crate::signal;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Text(String),
    Switch(ConversationId),
    Refresh,
    Resend,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Input::Empty;
        }
        let Some(command) = trimmed.strip_prefix('/') else {
            return Input::Text(line.trim_end().to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("switch"), Some(id)) => Input::Switch(ConversationId::new(id)),
            (Some("refresh"), None) => Input::Refresh,
            (Some("resend"), None) => Input::Resend,
            (Some("quit" | "exit"), None) => Input::Quit,
            // A doubled slash sends the rest literally.
            _ if command.starts_with('/') => Input::Text(command.to_string()),
            _ => Input::Unknown(trimmed.to_string()),
        }
    }
}

/// Runs the `roomsync watch` command until Ctrl+C, `/quit`, or end of input.
pub async fn run_watch(
    config: RoomsyncConfig,
    conversation_id: ConversationId,
    directory: InMemoryDirectory,
    use_color: bool,
) -> Result<(), RoomsyncError> {
    let connector = Arc::new(WsConnector::new(config.server.ws_url.clone()));
    let history = Arc::new(HttpHistorySource::new(
        config.server.api_url.clone(),
        &config.history,
    )?);
    let credentials = Arc::new(CredentialCell::new(
        config.server.token.clone().map(Credential::new),
    ));
    let session = ConversationSession::new(
        SessionConfig::from_config(&config),
        connector,
        history,
        credentials,
    );

    let cancel = signal::install_signal_handler();
    let (handle, task) = SessionHandle::spawn(session, cancel.clone());
    let mut snapshots = handle.subscribe();
    let mut printer = SnapshotPrinter::new(Arc::new(directory), use_color);

    if let Some(name) = &config.client.display_name {
        println!("signed in as {name}");
    }
    println!("type a message and press enter; /switch <id>, /refresh, /resend, /quit");
    handle.select(conversation_id).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                for line in printer.update(&snapshot) {
                    println!("{line}");
                }
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !dispatch(&handle, Input::parse(&line), use_color).await? {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("end of input");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed to read input");
                    break;
                }
            },
        }
    }

    cancel.cancel();
    if let Err(e) = task.await {
        warn!(error = %e, "session task ended abnormally");
    }
    Ok(())
}

/// Act on one input line. Returns `false` when the user asked to quit.
async fn dispatch(
    handle: &SessionHandle,
    input: Input,
    use_color: bool,
) -> Result<bool, RoomsyncError> {
    match input {
        Input::Empty => {}
        Input::Quit => return Ok(false),
        Input::Text(text) => {
            handle.send(text).await?;
        }
        Input::Switch(conversation_id) => handle.select(conversation_id).await?,
        Input::Refresh => {
            if let Err(e) = handle.refresh_history().await {
                report(&e.to_string(), use_color);
            }
        }
        Input::Resend => {
            let failed: Vec<_> = handle
                .snapshot()
                .pending
                .into_iter()
                .filter(|p| p.status == DeliveryStatus::Failed)
                .collect();
            if failed.is_empty() {
                report("nothing to resend", use_color);
            }
            for pending in failed {
                handle.retry(pending.token).await?;
            }
        }
        Input::Unknown(command) => {
            report(&format!("unknown command `{command}`"), use_color);
        }
    }
    Ok(true)
}

fn report(message: &str, use_color: bool) {
    if use_color {
        eprintln!("{}: {message}", "error".red());
    } else {
        eprintln!("error: {message}");
    }
}
