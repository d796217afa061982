// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock history source for deterministic session tests.
//!
//! Replies are scripted per conversation. A conversation can be held so its
//! fetches stay pending until released, which lets tests choose the order in
//! which concurrent fetches resolve.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use roomsync_core::{ConversationId, Credential, HistoryError, HistorySource, Message};

use crate::lock;

/// A scripted history response.
#[derive(Debug, Clone)]
pub enum HistoryReply {
    Messages(Vec<Message>),
    Unauthorized,
    ServerError(u16),
}

impl HistoryReply {
    fn into_result(self) -> Result<Vec<Message>, HistoryError> {
        match self {
            HistoryReply::Messages(messages) => Ok(messages),
            HistoryReply::Unauthorized => Err(HistoryError::Unauthorized { status: 401 }),
            HistoryReply::ServerError(status) => Err(HistoryError::Status {
                status,
                body: "mock failure".to_string(),
            }),
        }
    }
}

/// A scripted history source.
///
/// Each fetch pops the next reply scripted for its conversation; with none
/// scripted it returns an empty history.
#[derive(Default)]
pub struct MockHistory {
    replies: Mutex<HashMap<ConversationId, VecDeque<HistoryReply>>>,
    gates: Mutex<HashMap<ConversationId, Arc<Semaphore>>>,
    calls: Mutex<Vec<ConversationId>>,
}

impl MockHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the next reply for `conversation`.
    pub fn reply(&self, conversation: &str, reply: HistoryReply) {
        lock(&self.replies)
            .entry(ConversationId::new(conversation))
            .or_default()
            .push_back(reply);
    }

    /// Keep fetches for `conversation` pending until [`release`](Self::release).
    pub fn hold(&self, conversation: &str) {
        lock(&self.gates)
            .entry(ConversationId::new(conversation))
            .or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Let one held fetch for `conversation` complete.
    pub fn release(&self, conversation: &str) {
        if let Some(gate) = lock(&self.gates).get(&ConversationId::new(conversation)) {
            gate.add_permits(1);
        }
    }

    /// Conversation of every fetch, in call order.
    pub fn calls(&self) -> Vec<ConversationId> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl HistorySource for MockHistory {
    async fn fetch_history(
        &self,
        conversation_id: &ConversationId,
        _credential: &Credential,
    ) -> Result<Vec<Message>, HistoryError> {
        lock(&self.calls).push(conversation_id.clone());

        let gate = lock(&self.gates).get(conversation_id).cloned();
        if let Some(gate) = gate
            && let Ok(permit) = gate.acquire().await
        {
            permit.forget();
        }

        let reply = lock(&self.replies)
            .get_mut(conversation_id)
            .and_then(VecDeque::pop_front);
        reply.map_or(Ok(Vec::new()), HistoryReply::into_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use std::time::Duration;

    #[tokio::test]
    async fn scripted_replies_in_order() {
        let history = MockHistory::new();
        history.reply("a", HistoryReply::Messages(vec![fixtures::message(1, "a", 1)]));
        history.reply("a", HistoryReply::ServerError(503));

        let id = ConversationId::new("a");
        let cred = Credential::new("t");
        assert_eq!(history.fetch_history(&id, &cred).await.unwrap().len(), 1);
        assert!(matches!(
            history.fetch_history(&id, &cred).await,
            Err(HistoryError::Status { status: 503, .. })
        ));
        assert!(history.fetch_history(&id, &cred).await.unwrap().is_empty());
        assert_eq!(history.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn held_fetch_waits_for_release() {
        let history = Arc::new(MockHistory::new());
        history.hold("a");

        let task = {
            let history = Arc::clone(&history);
            tokio::spawn(async move {
                history
                    .fetch_history(&ConversationId::new("a"), &Credential::new("t"))
                    .await
            })
        };

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!task.is_finished());

        history.release("a");
        assert!(task.await.unwrap().unwrap().is_empty());
    }
}
