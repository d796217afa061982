// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal rendering of messages and session snapshots.

use std::collections::HashSet;
use std::sync::Arc;

use colored::Colorize;

use roomsync_core::{
    ClientToken, ConnectionState, ConversationId, DeliveryStatus, Directory, Message, MessageId,
};
use roomsync_session::{HistoryStatus, SessionSnapshot};

/// Format one message as a single line.
pub fn format_message(message: &Message, directory: &dyn Directory, use_color: bool) -> String {
    let time = message.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
    let sender = directory.label_for(&message.sender);
    let mut line = if use_color {
        format!("[{}] {}: {}", time.dimmed(), sender.bold(), message.content)
    } else {
        format!("[{time}] {sender}: {}", message.content)
    };
    if let Some(attachment) = &message.attachment {
        line.push_str(&format!(" [{}: {}]", attachment.kind, attachment.url));
    }
    line
}

fn format_state(state: ConnectionState, use_color: bool) -> String {
    let label = match state {
        ConnectionState::Open => "connected",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Reconnecting => "reconnecting",
        ConnectionState::Disconnected => "disconnected",
        ConnectionState::Failed => "disconnected (not retrying)",
    };
    if !use_color {
        return format!("* {label}");
    }
    match state {
        ConnectionState::Open => format!("* {}", label.green()),
        ConnectionState::Failed => format!("* {}", label.red()),
        _ => format!("* {}", label.yellow()),
    }
}

/// Turns successive snapshots into the lines that are new since the last one.
///
/// Messages are printed once each, in merged order at the time they first
/// appear. A history page that lands after live messages therefore prints
/// below them.
pub struct SnapshotPrinter {
    directory: Arc<dyn Directory>,
    use_color: bool,
    conversation: Option<ConversationId>,
    seen: HashSet<MessageId>,
    state: Option<ConnectionState>,
    history: HistoryStatus,
    failed: HashSet<ClientToken>,
}

impl SnapshotPrinter {
    pub fn new(directory: Arc<dyn Directory>, use_color: bool) -> Self {
        Self {
            directory,
            use_color,
            conversation: None,
            seen: HashSet::new(),
            state: None,
            history: HistoryStatus::Idle,
            failed: HashSet::new(),
        }
    }

    pub fn update(&mut self, snapshot: &SessionSnapshot) -> Vec<String> {
        let mut lines = Vec::new();

        if snapshot.conversation_id != self.conversation {
            self.conversation = snapshot.conversation_id.clone();
            self.seen.clear();
            self.state = None;
            self.history = HistoryStatus::Idle;
            self.failed.clear();
            if let Some(id) = &self.conversation {
                let header = format!("== {id} ==");
                lines.push(if self.use_color {
                    header.bold().to_string()
                } else {
                    header
                });
            }
        }

        if self.state != Some(snapshot.connection_state) {
            self.state = Some(snapshot.connection_state);
            lines.push(format_state(snapshot.connection_state, self.use_color));
        }

        if snapshot.history != self.history {
            self.history = snapshot.history.clone();
            match &snapshot.history {
                HistoryStatus::Loaded => lines.push("* history loaded".to_string()),
                HistoryStatus::Failed(reason) => {
                    let line = format!("* history unavailable: {reason} (/refresh to retry)");
                    lines.push(if self.use_color {
                        line.red().to_string()
                    } else {
                        line
                    });
                }
                HistoryStatus::Idle | HistoryStatus::Loading => {}
            }
        }

        for message in &snapshot.messages {
            if self.seen.insert(message.id.clone()) {
                lines.push(format_message(
                    message,
                    self.directory.as_ref(),
                    self.use_color,
                ));
            }
        }

        for pending in &snapshot.pending {
            if pending.status == DeliveryStatus::Failed {
                if self.failed.insert(pending.token.clone()) {
                    lines.push(format!(
                        "* not delivered: {} (/resend to retry)",
                        pending.text
                    ));
                }
            } else {
                self.failed.remove(&pending.token);
            }
        }

        lines
    }
}
