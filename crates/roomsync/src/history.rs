// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `roomsync history` command implementation.
//!
//! One-shot fetch of a conversation's history, printed in merged order.

use roomsync_config::RoomsyncConfig;
use roomsync_core::{ConversationId, Credential, Directory, HistorySource, RoomsyncError};
use roomsync_history::HttpHistorySource;
use roomsync_session::recompute;
use tracing::info;

use crate::render::format_message;

/// Runs the `roomsync history` command.
pub async fn run_history(
    config: &RoomsyncConfig,
    conversation_id: ConversationId,
    json: bool,
    directory: &dyn Directory,
    use_color: bool,
) -> Result<(), RoomsyncError> {
    let credential = config
        .server
        .token
        .as_deref()
        .map(Credential::new)
        .filter(|credential| !credential.is_empty())
        .ok_or(RoomsyncError::MissingCredential)?;

    let source = HttpHistorySource::new(config.server.api_url.clone(), &config.history)?;
    let batch = source.fetch_history(&conversation_id, &credential).await?;
    let messages = recompute(&batch, &[]);
    info!(%conversation_id, count = messages.len(), "history fetched");

    if json {
        let rendered = serde_json::to_string_pretty(&messages)
            .map_err(|e| RoomsyncError::Internal(format!("failed to encode messages: {e}")))?;
        println!("{rendered}");
    } else {
        for message in &messages {
            println!("{}", format_message(message, directory, use_color));
        }
    }
    Ok(())
}
