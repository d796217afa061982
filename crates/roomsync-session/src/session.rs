// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-conversation façade over channel, merge, and outbound queue.
//!
//! A [`ConversationSession`] is bound to at most one conversation at a time.
//! Every selection bumps a generation counter; channel callbacks and
//! history results are tagged with the generation they were started under
//! and anything tagged with an older generation is discarded on arrival.
//! This is what keeps a previous conversation's late events out of the
//! current view, independent of when the old channel finishes closing.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use roomsync_config::RoomsyncConfig;
use roomsync_core::{
    Binding, ChannelObserver, ClientToken, ConnectionState, Connector, ConversationId, Credential,
    CredentialProvider, HistoryError, HistorySource, Message, PendingMessage, RoomsyncError,
};
use roomsync_transport::{ChannelConfig, TransportChannel};

use crate::delivery::{AckPolicy, DeliveryQueue};
use crate::reconcile::ReconciliationEngine;
use crate::snapshot::{HistoryStatus, SessionSnapshot};

/// Runtime parameters of a session.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub channel: ChannelConfig,
    pub ack: AckPolicy,
}

impl SessionConfig {
    pub fn from_config(config: &RoomsyncConfig) -> Self {
        Self {
            channel: ChannelConfig::from_config(&config.reconnect),
            ack: AckPolicy::from_config(&config.delivery),
        }
    }
}

#[derive(Debug)]
enum ChannelEvent {
    Message(Message),
    State(ConnectionState),
}

/// Something that happened on a background task, tagged with the
/// selection it belongs to.
#[derive(Debug)]
enum SessionEvent {
    Channel {
        generation: u64,
        event: ChannelEvent,
    },
    History {
        generation: u64,
        fetch: u64,
        result: Result<Vec<Message>, HistoryError>,
    },
}

/// Observer handed to each channel; forwards callbacks into the session.
struct ForwardingObserver {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ForwardingObserver {
    fn forward(&self, event: ChannelEvent) {
        let _ = self.tx.send(SessionEvent::Channel {
            generation: self.generation,
            event,
        });
    }
}

impl ChannelObserver for ForwardingObserver {
    fn on_event(&self, message: Message) {
        self.forward(ChannelEvent::Message(message));
    }

    fn on_state_change(&self, state: ConnectionState) {
        self.forward(ChannelEvent::State(state));
    }
}

/// Owns the live channel, the merged sequence, and the outbound queue for
/// the selected conversation.
///
/// All mutation happens through `&mut self`. Background work (connection
/// supervision, history fetches) reports back through an internal event
/// queue drained by [`process_next`](Self::process_next). Every change is
/// published as a [`SessionSnapshot`] to [`subscribe`](Self::subscribe)
/// receivers.
///
/// Must be used from within a tokio runtime.
pub struct ConversationSession {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    history_source: Arc<dyn HistorySource>,
    credentials: Arc<dyn CredentialProvider>,

    generation: u64,
    fetch_seq: u64,
    conversation_id: Option<ConversationId>,
    channel: Option<TransportChannel>,
    history_task: Option<JoinHandle<()>>,

    engine: ReconciliationEngine,
    queue: DeliveryQueue,
    connection_state: ConnectionState,
    history_status: HistoryStatus,

    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl ConversationSession {
    pub fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        history_source: Arc<dyn HistorySource>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots, _) = watch::channel(SessionSnapshot::default());
        let queue = DeliveryQueue::new(config.ack);
        Self {
            config,
            connector,
            history_source,
            credentials,
            generation: 0,
            fetch_seq: 0,
            conversation_id: None,
            channel: None,
            history_task: None,
            engine: ReconciliationEngine::new(),
            queue,
            connection_state: ConnectionState::Disconnected,
            history_status: HistoryStatus::Idle,
            events_tx,
            events_rx,
            snapshots,
        }
    }

    /// Switch to `conversation_id`.
    ///
    /// Closes the previous channel, drops its merged view and any queued
    /// submissions, then starts a history fetch and opens a new channel.
    /// Selecting the current conversation again starts over the same way.
    /// Without a credential no channel is opened and the session reports
    /// `Failed`.
    pub fn select(&mut self, conversation_id: ConversationId) {
        self.teardown();
        info!(%conversation_id, generation = self.generation, "conversation selected");
        self.conversation_id = Some(conversation_id.clone());

        match self.current_credential() {
            Some(credential) => {
                self.start_history(conversation_id.clone(), credential.clone());
                self.open_channel(Binding::new(conversation_id, credential));
            }
            None => {
                warn!(%conversation_id, "no credential available, channel not opened");
                self.connection_state = ConnectionState::Failed;
                self.history_status =
                    HistoryStatus::Failed(RoomsyncError::MissingCredential.to_string());
            }
        }
        self.publish();
    }

    /// Submit outbound text to the selected conversation.
    ///
    /// Goes out immediately when the channel is open, otherwise waits in
    /// the queue until the next `Open` transition.
    pub fn send(&mut self, text: impl Into<String>) -> Result<PendingMessage, RoomsyncError> {
        if self.conversation_id.is_none() {
            return Err(RoomsyncError::NoConversation);
        }
        let pending = self.queue.submit(text, &self.channel);
        self.publish();
        Ok(pending)
    }

    /// Fetch history again for the selected conversation.
    ///
    /// A fetch still in flight is superseded; its result will be ignored.
    pub fn refresh_history(&mut self) -> Result<(), RoomsyncError> {
        let conversation_id = self
            .conversation_id
            .clone()
            .ok_or(RoomsyncError::NoConversation)?;
        let Some(credential) = self.current_credential() else {
            self.history_status =
                HistoryStatus::Failed(RoomsyncError::MissingCredential.to_string());
            self.publish();
            return Err(RoomsyncError::MissingCredential);
        };
        self.start_history(conversation_id, credential);
        self.publish();
        Ok(())
    }

    /// Requeue a submission whose acknowledgment timed out.
    pub fn retry(&mut self, token: &ClientToken) -> bool {
        let requeued = self.queue.retry(token, &self.channel);
        if requeued {
            self.publish();
        }
        requeued
    }

    /// Wait for the next background event and apply it.
    ///
    /// Returns `true` if the event belonged to the current selection.
    /// Cancel-safe: an event is either fully applied or left queued.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.apply(event),
            None => false,
        }
    }

    /// Apply every event that is already waiting, without blocking.
    pub fn process_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.apply(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Mark submissions whose echo did not arrive by `now` as failed.
    pub fn expire_acks(&mut self, now: Instant) -> Vec<ClientToken> {
        let expired = self.queue.expire(now);
        if !expired.is_empty() {
            self.publish();
        }
        expired
    }

    /// Earliest pending acknowledgment deadline.
    pub fn next_ack_deadline(&self) -> Option<Instant> {
        self.queue.next_deadline()
    }

    /// Close the channel and forget the selected conversation.
    pub fn close(&mut self) {
        self.teardown();
        self.conversation_id = None;
        self.publish();
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.conversation_id.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    pub fn messages(&self) -> &[Message] {
        self.engine.messages()
    }

    pub fn history_status(&self) -> &HistoryStatus {
        &self.history_status
    }

    pub fn pending(&self) -> Vec<PendingMessage> {
        self.queue.pending()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn current_credential(&self) -> Option<Credential> {
        self.credentials
            .credential()
            .filter(|credential| !credential.is_empty())
    }

    /// Drop interest in the current selection, then release its resources.
    fn teardown(&mut self) {
        self.generation += 1;
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
        self.engine.reset();
        self.queue.clear();
        self.connection_state = ConnectionState::Disconnected;
        self.history_status = HistoryStatus::Idle;
    }

    fn open_channel(&mut self, binding: Binding) {
        let observer = Arc::new(ForwardingObserver {
            generation: self.generation,
            tx: self.events_tx.clone(),
        });
        let channel = TransportChannel::open(
            binding,
            observer,
            Arc::clone(&self.connector),
            self.config.channel.clone(),
        );
        self.connection_state = channel.state();
        self.channel = Some(channel);
    }

    fn start_history(&mut self, conversation_id: ConversationId, credential: Credential) {
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
        self.fetch_seq += 1;
        let generation = self.generation;
        let fetch = self.fetch_seq;
        let source = Arc::clone(&self.history_source);
        let tx = self.events_tx.clone();

        debug!(%conversation_id, generation, fetch, "history fetch started");
        self.history_status = HistoryStatus::Loading;
        self.history_task = Some(tokio::spawn(async move {
            let result = source.fetch_history(&conversation_id, &credential).await;
            let _ = tx.send(SessionEvent::History {
                generation,
                fetch,
                result,
            });
        }));
    }

    fn apply(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Channel { generation, .. } | SessionEvent::History { generation, .. }
                if generation != self.generation =>
            {
                debug!(
                    generation,
                    current = self.generation,
                    "discarding event from a previous selection"
                );
                return false;
            }
            SessionEvent::Channel {
                event: ChannelEvent::State(state),
                ..
            } => self.on_state(state),
            SessionEvent::Channel {
                event: ChannelEvent::Message(message),
                ..
            } => {
                self.queue.confirm(&message);
                if !self.engine.admit(message) {
                    debug!("duplicate live event ignored");
                }
            }
            SessionEvent::History { fetch, result, .. } => {
                if fetch != self.fetch_seq {
                    debug!(fetch, current = self.fetch_seq, "discarding superseded history");
                    return false;
                }
                self.history_task = None;
                self.on_history(result);
            }
        }
        self.publish();
        true
    }

    fn on_state(&mut self, state: ConnectionState) {
        self.connection_state = state;
        match state {
            ConnectionState::Open => {
                self.queue.flush(&self.channel);
            }
            ConnectionState::Failed => {
                warn!(
                    conversation_id = ?self.conversation_id,
                    queued = self.queue.buffered(),
                    "live channel failed"
                );
            }
            _ => {}
        }
    }

    fn on_history(&mut self, result: Result<Vec<Message>, HistoryError>) {
        match result {
            Ok(batch) => {
                debug!(count = batch.len(), "history resolved");
                self.engine.absorb_history(batch);
                self.history_status = HistoryStatus::Loaded;
            }
            Err(e) => {
                warn!(error = %e, "history fetch failed");
                self.history_status = HistoryStatus::Failed(e.to_string());
            }
        }
    }

    fn publish(&self) {
        let snapshot = SessionSnapshot {
            conversation_id: self.conversation_id.clone(),
            messages: self.engine.messages().to_vec(),
            connection_state: self.connection_state,
            history: self.history_status.clone(),
            pending: self.queue.pending(),
        };
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        });
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        if let Some(task) = self.history_task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("conversation_id", &self.conversation_id)
            .field("generation", &self.generation)
            .field("connection_state", &self.connection_state)
            .field("history", &self.history_status)
            .finish_non_exhaustive()
    }
}
