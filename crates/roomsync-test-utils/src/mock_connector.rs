// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock connector for deterministic transport tests.
//!
//! `MockConnector` implements `Connector` with a script of connect outcomes.
//! Every accepted connection yields a [`MockLink`] handle that tests use to
//! inject inbound frames, inspect outbound frames, and drop the connection.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::{sink, stream};
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use roomsync_core::{Binding, Connector, ConversationId, Link, Message, TransportError};

use crate::lock;

/// What the next `connect()` call does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// Establish a connection.
    Accept,
    /// Fail with a retryable error.
    Refuse,
    /// Fail with a credential rejection.
    Unauthorized,
    /// Never complete.
    Hang,
}

/// A scripted connector.
///
/// Outcomes are popped from a FIFO script. When the script is empty the
/// fallback outcome (`Refuse` unless changed) is used.
pub struct MockConnector {
    script: Mutex<VecDeque<ConnectOutcome>>,
    fallback: Mutex<ConnectOutcome>,
    attempts: AtomicUsize,
    conversations: Mutex<Vec<ConversationId>>,
    links: Mutex<Vec<MockLink>>,
    notify: Notify,
}

impl MockConnector {
    /// A connector that refuses every connection.
    pub fn new() -> Self {
        Self::with_script([])
    }

    /// A connector that plays `script` first, then refuses.
    pub fn with_script(script: impl IntoIterator<Item = ConnectOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: Mutex::new(ConnectOutcome::Refuse),
            attempts: AtomicUsize::new(0),
            conversations: Mutex::new(Vec::new()),
            links: Mutex::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Append an outcome to the script.
    pub fn push(&self, outcome: ConnectOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// Outcome used once the script is exhausted.
    pub fn set_fallback(&self, outcome: ConnectOutcome) {
        *lock(&self.fallback) = outcome;
    }

    /// Number of `connect()` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Conversation of every `connect()` call, in call order.
    pub fn conversations(&self) -> Vec<ConversationId> {
        lock(&self.conversations).clone()
    }

    /// Number of connections established so far.
    pub fn links_opened(&self) -> usize {
        lock(&self.links).len()
    }

    /// Handle of the `index`-th established connection, waiting for it if needed.
    pub async fn link(&self, index: usize) -> MockLink {
        loop {
            let notified = self.notify.notified();
            if let Some(link) = lock(&self.links).get(index) {
                return link.clone();
            }
            notified.await;
        }
    }

    /// Outbound frames written on every connection, in connection order.
    pub fn sent_frames(&self) -> Vec<String> {
        lock(&self.links).iter().flat_map(|l| l.sent()).collect()
    }

    fn next_outcome(&self) -> ConnectOutcome {
        lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| *lock(&self.fallback))
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, binding: &Binding) -> Result<Link, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        lock(&self.conversations).push(binding.conversation_id.clone());

        match self.next_outcome() {
            ConnectOutcome::Accept => {
                let (handle, link) = MockLink::pair();
                lock(&self.links).push(handle);
                self.notify.notify_waiters();
                Ok(link)
            }
            ConnectOutcome::Refuse => Err(TransportError::Refused {
                message: "mock refused".to_string(),
                source: None,
            }),
            ConnectOutcome::Unauthorized => Err(TransportError::Unauthorized {
                message: "mock rejected credential".to_string(),
            }),
            ConnectOutcome::Hang => std::future::pending().await,
        }
    }
}

/// Test-side handle to one mock connection.
#[derive(Clone)]
pub struct MockLink {
    inbound: mpsc::UnboundedSender<Result<String, TransportError>>,
    sent: Arc<Mutex<Vec<String>>>,
    sent_notify: Arc<Notify>,
    closed: CancellationToken,
}

impl MockLink {
    fn pair() -> (Self, Link) {
        let (inbound, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sent_notify = Arc::new(Notify::new());
        let closed = CancellationToken::new();

        let frames = stream::unfold((rx, closed.clone()), |(mut rx, closed)| async move {
            tokio::select! {
                biased;
                item = rx.recv() => item.map(|item| (item, (rx, closed))),
                _ = closed.cancelled() => None,
            }
        });

        let writer = sink::unfold(
            (Arc::clone(&sent), Arc::clone(&sent_notify), closed.clone()),
            |(sent, notify, closed), frame: String| async move {
                if closed.is_cancelled() {
                    return Err(TransportError::Closed);
                }
                lock(&sent).push(frame);
                notify.notify_waiters();
                Ok((sent, notify, closed))
            },
        );

        let handle = Self {
            inbound,
            sent,
            sent_notify,
            closed,
        };
        (handle, Link::new(Box::pin(writer), Box::pin(frames)))
    }

    /// Deliver a raw inbound frame.
    pub fn push_frame(&self, frame: impl Into<String>) {
        let _ = self.inbound.send(Ok(frame.into()));
    }

    /// Deliver a message event as a JSON frame.
    pub fn push_message(&self, message: &Message) {
        let frame = serde_json::to_string(message).expect("message serializes");
        self.push_frame(frame);
    }

    /// Make the read side report an error.
    pub fn fail(&self, error: TransportError) {
        let _ = self.inbound.send(Err(error));
    }

    /// Drop the connection as if the server went away.
    pub fn disconnect(&self) {
        self.closed.cancel();
    }

    pub fn is_disconnected(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Raw outbound frames written so far.
    pub fn sent(&self) -> Vec<String> {
        lock(&self.sent).clone()
    }

    /// The `message` field of every outbound frame that carries one.
    pub fn sent_texts(&self) -> Vec<String> {
        self.sent()
            .iter()
            .filter_map(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .filter_map(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
            .collect()
    }

    /// Wait until at least `count` outbound frames were written.
    pub async fn wait_sent(&self, count: usize) {
        loop {
            let notified = self.sent_notify.notified();
            if lock(&self.sent).len() >= count {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use roomsync_core::Credential;

    fn binding() -> Binding {
        Binding::new(ConversationId::new("room"), Credential::new("t"))
    }

    #[tokio::test]
    async fn script_then_fallback() {
        let connector = MockConnector::with_script([ConnectOutcome::Accept]);
        assert!(connector.connect(&binding()).await.is_ok());
        assert!(matches!(
            connector.connect(&binding()).await,
            Err(TransportError::Refused { .. })
        ));
        connector.set_fallback(ConnectOutcome::Unauthorized);
        assert!(matches!(
            connector.connect(&binding()).await,
            Err(TransportError::Unauthorized { .. })
        ));
        assert_eq!(connector.attempts(), 3);
        assert_eq!(connector.links_opened(), 1);
    }

    #[tokio::test]
    async fn link_carries_frames_both_ways() {
        let connector = MockConnector::with_script([ConnectOutcome::Accept]);
        let mut link = connector.connect(&binding()).await.unwrap();
        let handle = connector.link(0).await;

        handle.push_frame("in");
        assert_eq!(link.stream.next().await.unwrap().unwrap(), "in");

        link.sink.send(r#"{"message":"out"}"#.to_string()).await.unwrap();
        assert_eq!(handle.sent_texts(), vec!["out".to_string()]);
    }

    #[tokio::test]
    async fn disconnect_ends_stream_and_rejects_writes() {
        let connector = MockConnector::with_script([ConnectOutcome::Accept]);
        let mut link = connector.connect(&binding()).await.unwrap();
        let handle = connector.link(0).await;

        handle.disconnect();
        assert!(link.stream.next().await.is_none());
        assert!(link.sink.send("x".to_string()).await.is_err());
    }
}
