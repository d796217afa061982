// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History fetch collaborator.

use async_trait::async_trait;

use crate::error::HistoryError;
use crate::types::{ConversationId, Credential, Message};

/// Fetches the stored message history of a conversation.
///
/// Pagination is the implementation's concern: the returned batch is the
/// full history it was willing to load. A failure is reported as an error,
/// never as an empty batch.
#[async_trait]
pub trait HistorySource: Send + Sync + 'static {
    async fn fetch_history(
        &self,
        conversation_id: &ConversationId,
        credential: &Credential,
    ) -> Result<Vec<Message>, HistoryError>;
}
