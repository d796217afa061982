// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only view of a session, published to subscribers.

use std::fmt;

use roomsync_core::{ConnectionState, ConversationId, Message, PendingMessage};

/// Progress of the history fetch for the selected conversation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// The fetch failed. The live channel is unaffected.
    Failed(String),
}

impl fmt::Display for HistoryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryStatus::Idle => f.write_str("idle"),
            HistoryStatus::Loading => f.write_str("loading"),
            HistoryStatus::Loaded => f.write_str("loaded"),
            HistoryStatus::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Everything a presentation layer renders for the selected conversation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSnapshot {
    pub conversation_id: Option<ConversationId>,
    /// Merged history and live messages, ordered by (timestamp, id).
    pub messages: Vec<Message>,
    pub connection_state: ConnectionState,
    pub history: HistoryStatus,
    /// Outbound submissions not yet confirmed.
    pub pending: Vec<PendingMessage>,
}
