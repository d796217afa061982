// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message builders for tests.

use chrono::DateTime;

use roomsync_core::{ClientToken, ConversationId, Message, MessageId, Sender};

/// A message with a numeric id and a timestamp in epoch seconds.
pub fn message(id: i64, conversation: &str, ts_secs: i64) -> Message {
    with_id(MessageId::Number(id), conversation, ts_secs)
}

/// Like [`message`], for any id shape.
pub fn with_id(id: MessageId, conversation: &str, ts_secs: i64) -> Message {
    Message {
        content: format!("message {id}"),
        id,
        conversation_id: ConversationId::new(conversation),
        sender: Sender::new("user-1", "User One"),
        attachment: None,
        timestamp: DateTime::from_timestamp(ts_secs, 0).unwrap_or_default(),
        client_token: None,
    }
}

/// The server's confirmation of a local submission, echoing its token.
pub fn echo(
    id: i64,
    conversation: &str,
    ts_secs: i64,
    token: &ClientToken,
    content: &str,
) -> Message {
    Message {
        content: content.to_string(),
        client_token: Some(token.clone()),
        ..message(id, conversation, ts_secs)
    }
}
