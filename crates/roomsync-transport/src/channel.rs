// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live transport channel bound to one conversation.
//!
//! Each channel goes through states: Disconnected -> Connecting -> Open, with
//! Reconnecting between attempts after a transport failure and Failed once
//! the reconnect bound is exceeded or the credential is rejected.
//!
//! A single supervisor task owns the connection. It:
//! - establishes connections through the [`Connector`] with a timeout
//! - decodes inbound frames and forwards well-formed events to the observer
//! - writes outbound frames accepted by [`TransportChannel::send`]
//! - optionally treats a silent connection as dropped (staleness timer)
//! - schedules reconnects with bounded exponential backoff

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use roomsync_config::model::ReconnectConfig;
use roomsync_core::{
    Binding, ChannelObserver, CodecError, ConnectionState, Connector, ConversationId, Link,
    Message, TransportError,
};

use crate::backoff::ReconnectPolicy;
use crate::codec::decode_frame;

/// Runtime parameters of a channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub policy: ReconnectPolicy,
    /// Bound on a single connection establishment.
    pub connect_timeout: Duration,
    /// Silence after which an open connection is considered dropped.
    pub stale_after: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::from_config(&ReconnectConfig::default())
    }
}

impl ChannelConfig {
    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self {
            policy: ReconnectPolicy::from_config(config),
            connect_timeout: config.connect_timeout(),
            stale_after: config.stale_after(),
        }
    }
}

/// Handle to one live connection for a single (conversation, credential) binding.
///
/// Observer callbacks run on the channel's supervisor task in the order the
/// transport produced them. No callback is made during or after
/// [`close`](Self::close); callbacks must not close the channel themselves.
pub struct TransportChannel {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    conversation_id: ConversationId,
    observer: Arc<dyn ChannelObserver>,
    inner: Mutex<Inner>,
    /// Held while a callback runs so `close` can wait it out.
    emit: Mutex<()>,
}

struct Inner {
    state: ConnectionState,
    writer: Option<mpsc::UnboundedSender<String>>,
    closed: bool,
}

impl TransportChannel {
    /// Open a channel for `binding`.
    ///
    /// Connection establishment happens in the background; the returned
    /// handle starts in `Disconnected` and reports progress through the
    /// observer. An incomplete binding (empty conversation id or
    /// credential) yields a handle already in `Failed` with no task and no
    /// callbacks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(
        binding: Binding,
        observer: Arc<dyn ChannelObserver>,
        connector: Arc<dyn Connector>,
        config: ChannelConfig,
    ) -> Self {
        let cancel = CancellationToken::new();

        if !binding.is_complete() {
            warn!(
                conversation_id = %binding.conversation_id,
                "binding incomplete, channel not opened"
            );
            let shared = Shared::new(
                binding.conversation_id,
                observer,
                ConnectionState::Failed,
            );
            return Self {
                shared: Arc::new(shared),
                cancel,
                task: None,
            };
        }

        let shared = Arc::new(Shared::new(
            binding.conversation_id.clone(),
            observer,
            ConnectionState::Disconnected,
        ));
        let task = tokio::spawn(supervise(
            Arc::clone(&shared),
            binding,
            connector,
            config,
            cancel.clone(),
        ));

        Self {
            shared,
            cancel,
            task: Some(task),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.shared.conversation_id
    }

    /// Hand a raw frame to the open connection.
    ///
    /// Returns `true` only if the channel is `Open` and the frame was
    /// accepted for writing. Never blocks and never drops a frame without
    /// returning `false`.
    pub fn send(&self, raw: impl Into<String>) -> bool {
        let inner = self.shared.lock();
        if inner.closed || !inner.state.is_open() {
            return false;
        }
        match &inner.writer {
            Some(writer) => writer.send(raw.into()).is_ok(),
            None => false,
        }
    }

    /// Tear the channel down. Idempotent.
    ///
    /// Cancels any pending reconnect timer and the connection task. On
    /// return the state is `Disconnected` and no further callbacks will be
    /// made.
    pub fn close(&mut self) {
        {
            let _emit = self.shared.emit_guard();
            let mut inner = self.shared.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.state = ConnectionState::Disconnected;
            inner.writer = None;
        }
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        debug!(conversation_id = %self.shared.conversation_id, "channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl Drop for TransportChannel {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for TransportChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportChannel")
            .field("conversation_id", &self.shared.conversation_id)
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn new(
        conversation_id: ConversationId,
        observer: Arc<dyn ChannelObserver>,
        state: ConnectionState,
    ) -> Self {
        Self {
            conversation_id,
            observer,
            inner: Mutex::new(Inner {
                state,
                writer: None,
                closed: false,
            }),
            emit: Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_guard(&self) -> MutexGuard<'_, ()> {
        self.emit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a transition and notify the observer. Returns `false` once closed.
    fn set_state(&self, state: ConnectionState) -> bool {
        self.transition(state, None)
    }

    fn set_open(&self, writer: mpsc::UnboundedSender<String>) -> bool {
        self.transition(ConnectionState::Open, Some(writer))
    }

    fn transition(
        &self,
        state: ConnectionState,
        writer: Option<mpsc::UnboundedSender<String>>,
    ) -> bool {
        let _emit = self.emit_guard();
        {
            let mut inner = self.lock();
            if inner.closed {
                return false;
            }
            inner.writer = writer;
            if inner.state == state {
                return true;
            }
            inner.state = state;
        }
        debug!(conversation_id = %self.conversation_id, %state, "channel state changed");
        self.observer.on_state_change(state);
        true
    }

    /// Forward an inbound event. Returns `false` once closed.
    fn deliver(&self, message: Message) -> bool {
        let _emit = self.emit_guard();
        if self.lock().closed {
            return false;
        }
        self.observer.on_event(message);
        true
    }
}

/// Why a connection pump returned.
enum PumpExit {
    Cancelled,
    Dropped(TransportError),
}

/// Connection supervisor: connect, pump, back off, repeat until closed or failed.
async fn supervise(
    shared: Arc<Shared>,
    binding: Binding,
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    cancel: CancellationToken,
) {
    let conversation_id = binding.conversation_id.clone();
    let mut attempt: u32 = 0;

    loop {
        if !shared.set_state(ConnectionState::Connecting) {
            return;
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => return,
            result = tokio::time::timeout(config.connect_timeout, connector.connect(&binding)) => {
                result.unwrap_or(Err(TransportError::Timeout {
                    duration: config.connect_timeout,
                }))
            }
        };

        match outcome {
            Ok(link) => {
                attempt = 0;
                let (writer, outbound) = mpsc::unbounded_channel();
                if !shared.set_open(writer) {
                    return;
                }
                info!(%conversation_id, "channel open");

                match pump(&shared, link, outbound, config.stale_after, &cancel).await {
                    PumpExit::Cancelled => return,
                    PumpExit::Dropped(e) => {
                        warn!(%conversation_id, error = %e, "connection lost");
                    }
                }
            }
            Err(e) if e.is_terminal() => {
                error!(%conversation_id, error = %e, "credential rejected, not retrying");
                shared.set_state(ConnectionState::Failed);
                return;
            }
            Err(e) => {
                warn!(%conversation_id, attempt, error = %e, "connect failed");
            }
        }

        if !shared.set_state(ConnectionState::Reconnecting) {
            return;
        }

        attempt += 1;
        if config.policy.is_exhausted(attempt) {
            warn!(
                %conversation_id,
                max_attempts = config.policy.max_attempts,
                "reconnect attempts exhausted"
            );
            shared.set_state(ConnectionState::Failed);
            return;
        }

        let delay = config.policy.delay_for(attempt);
        debug!(
            %conversation_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "scheduling reconnect"
        );
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Move frames across one established connection until it ends.
///
/// Outbound frames are written before the next inbound frame is read, so a
/// frame accepted by [`TransportChannel::send`] is on the wire before a
/// closing stream is noticed.
async fn pump(
    shared: &Shared,
    link: Link,
    mut outbound: mpsc::UnboundedReceiver<String>,
    stale_after: Option<Duration>,
    cancel: &CancellationToken,
) -> PumpExit {
    let Link {
        mut sink,
        mut stream,
    } = link;
    let mut staleness = stale_after.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        (interval, period)
    });
    let mut last_inbound = Instant::now();

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break PumpExit::Cancelled,
            Some(raw) = outbound.recv() => {
                if let Err(e) = sink.send(raw).await {
                    break PumpExit::Dropped(e);
                }
            }
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    last_inbound = Instant::now();
                    if !handle_frame(shared, &text) {
                        break PumpExit::Cancelled;
                    }
                }
                Some(Err(e)) => break PumpExit::Dropped(e),
                None => break PumpExit::Dropped(TransportError::Closed),
            },
            _ = stale_tick(&mut staleness) => {
                if let Some((_, period)) = &staleness
                    && last_inbound.elapsed() >= *period
                {
                    break PumpExit::Dropped(TransportError::Protocol {
                        message: format!("no inbound frame for {period:?}"),
                        source: None,
                    });
                }
            }
        }
    };

    outbound.close();
    let mut unsent = 0;
    while outbound.try_recv().is_ok() {
        unsent += 1;
    }
    if unsent > 0 && matches!(exit, PumpExit::Dropped(_)) {
        warn!(unsent, "connection ended with accepted frames still unwritten");
    }
    exit
}

async fn stale_tick(staleness: &mut Option<(Interval, Duration)>) {
    match staleness {
        Some((interval, _)) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Decode one frame and forward its events. Returns `false` once closed.
fn handle_frame(shared: &Shared, frame: &str) -> bool {
    for decoded in decode_frame(frame) {
        match decoded {
            Ok(message) if message.conversation_id != shared.conversation_id => {
                warn!(
                    conversation_id = %shared.conversation_id,
                    event_conversation = %message.conversation_id,
                    id = %message.id,
                    "dropping event for another conversation"
                );
            }
            Ok(message) => {
                if !shared.deliver(message) {
                    return false;
                }
            }
            Err(CodecError::Empty) => {
                debug!(conversation_id = %shared.conversation_id, "ignoring empty frame");
            }
            Err(e) => {
                warn!(
                    conversation_id = %shared.conversation_id,
                    error = %e,
                    "dropping malformed frame"
                );
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsync_core::{Credential, MessageId};
    use roomsync_test_utils::{fixtures, ConnectOutcome, MockConnector, RecordingObserver};
    use tracing_test::traced_test;

    use ConnectionState::*;

    fn binding(conversation: &str) -> Binding {
        Binding::new(ConversationId::new(conversation), Credential::new("token"))
    }

    fn fast_config(max_attempts: u32) -> ChannelConfig {
        ChannelConfig {
            policy: ReconnectPolicy {
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
                multiplier: 2.0,
                max_attempts,
            },
            connect_timeout: Duration::from_secs(5),
            stale_after: None,
        }
    }

    fn open(
        conversation: &str,
        connector: &Arc<MockConnector>,
        observer: &Arc<RecordingObserver>,
        config: ChannelConfig,
    ) -> TransportChannel {
        TransportChannel::open(
            binding(conversation),
            observer.clone(),
            connector.clone(),
            config,
        )
    }

    #[tokio::test]
    async fn incomplete_binding_fails_without_task() {
        let connector = Arc::new(MockConnector::new());
        let observer = Arc::new(RecordingObserver::new());
        let empty_token = Binding::new(ConversationId::new("room"), Credential::new(""));
        let channel = TransportChannel::open(
            empty_token,
            observer.clone(),
            connector.clone(),
            fast_config(3),
        );

        assert_eq!(channel.state(), Failed);
        assert!(!channel.send("x"));
        tokio::task::yield_now().await;
        assert_eq!(connector.attempts(), 0);
        assert!(observer.states().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn connects_and_delivers_events_in_order() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
        let observer = Arc::new(RecordingObserver::new());
        let _channel = open("room", &connector, &observer, fast_config(3));

        let link = connector.link(0).await;
        observer.wait_for_state(Open).await;
        link.push_message(&fixtures::message(1, "room", 10));
        link.push_message(&fixtures::message(2, "room", 5));
        observer.wait_for_events(2).await;

        let ids: Vec<MessageId> = observer.events().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![MessageId::Number(1), MessageId::Number(2)]);
        assert_eq!(observer.states(), vec![Connecting, Open]);
    }

    #[tokio::test(start_paused = true)]
    async fn send_only_succeeds_while_open() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Hang]));
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(0));

        observer.wait_for_state(Connecting).await;
        assert!(!channel.send("early"));

        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(0));
        observer.wait_for_state(Open).await;
        assert!(channel.send("hello"));

        let link = connector.link(0).await;
        link.wait_sent(1).await;
        assert_eq!(link.sent(), vec!["hello".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_bound_reaches_failed() {
        let connector = Arc::new(MockConnector::new());
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(3));

        observer.wait_for_state(Failed).await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(connector.attempts(), 4);
        assert_eq!(
            observer.states(),
            vec![
                Connecting, Reconnecting, Connecting, Reconnecting, Connecting, Reconnecting,
                Connecting, Reconnecting, Failed
            ]
        );
        assert_eq!(channel.state(), Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_spacing_follows_policy() {
        let connector = Arc::new(MockConnector::new());
        let observer = Arc::new(RecordingObserver::new());
        let start = Instant::now();
        let _channel = open("room", &connector, &observer, fast_config(3));

        observer.wait_for_state(Failed).await;
        // 100 + 200 + 400 ms of backoff between the four attempts.
        assert!(start.elapsed() >= Duration::from_millis(700));
        assert!(start.elapsed() < Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn unauthorized_is_terminal() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Unauthorized]));
        let observer = Arc::new(RecordingObserver::new());
        let _channel = open("room", &connector, &observer, fast_config(5));

        observer.wait_for_state(Failed).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.attempts(), 1);
        assert_eq!(observer.states(), vec![Connecting, Failed]);
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_close_reconnects_and_resets_attempts() {
        let connector = Arc::new(MockConnector::with_script([
            ConnectOutcome::Accept,
            ConnectOutcome::Refuse,
            ConnectOutcome::Accept,
        ]));
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(2));

        connector.link(0).await.disconnect();
        let second = connector.link(1).await;
        observer.wait_for_state_count(Open, 2).await;

        assert_eq!(channel.state(), Open);
        assert_eq!(connector.attempts(), 3);

        // A fresh drop after a successful open starts counting from zero again.
        second.disconnect();
        observer.wait_for_state(Failed).await;
        assert_eq!(connector.attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_timeout_counts_as_failure() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Hang]));
        let observer = Arc::new(RecordingObserver::new());
        let _channel = open("room", &connector, &observer, fast_config(0));

        observer.wait_for_state(Failed).await;
        assert_eq!(observer.states(), vec![Connecting, Reconnecting, Failed]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_is_idempotent_and_silences_callbacks() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
        let observer = Arc::new(RecordingObserver::new());
        let mut channel = open("room", &connector, &observer, fast_config(3));

        let link = connector.link(0).await;
        observer.wait_for_state(Open).await;

        channel.close();
        channel.close();
        assert_eq!(channel.state(), Disconnected);
        assert!(channel.is_closed());
        assert!(!channel.send("late"));

        link.push_message(&fixtures::message(9, "room", 1));
        link.disconnect();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(observer.events().is_empty());
        assert_eq!(observer.states(), vec![Connecting, Open]);
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_cancels_pending_reconnect() {
        let connector = Arc::new(MockConnector::new());
        let observer = Arc::new(RecordingObserver::new());
        let mut channel = open("room", &connector, &observer, fast_config(10));

        observer.wait_for_state(Reconnecting).await;
        channel.close();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_connection_is_recycled() {
        let connector = Arc::new(MockConnector::with_script([
            ConnectOutcome::Accept,
            ConnectOutcome::Accept,
        ]));
        let observer = Arc::new(RecordingObserver::new());
        let config = ChannelConfig {
            stale_after: Some(Duration::from_secs(30)),
            ..fast_config(3)
        };
        let _channel = open("room", &connector, &observer, config);

        connector.link(0).await;
        observer.wait_for_state_count(Open, 2).await;
        assert_eq!(observer.states(), vec![Connecting, Open, Reconnecting, Connecting, Open]);
        assert_eq!(connector.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn accepted_frame_is_written_before_stream_error() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(3));
        observer.wait_for_state(Open).await;

        let link = connector.link(0).await;
        assert!(channel.send(r#"{"message":"last words"}"#));
        link.fail(TransportError::Closed);
        observer.wait_for_state(Reconnecting).await;

        assert_eq!(link.sent_texts(), vec!["last words"]);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn malformed_frames_are_logged_and_skipped() {
        let connector = Arc::new(MockConnector::with_script([ConnectOutcome::Accept]));
        let observer = Arc::new(RecordingObserver::new());
        let channel = open("room", &connector, &observer, fast_config(3));

        let link = connector.link(0).await;
        link.push_frame("{\"id\": oops");
        link.push_message(&fixtures::message(3, "other-room", 1));
        link.push_message(&fixtures::message(4, "room", 1));
        observer.wait_for_events(1).await;

        assert_eq!(observer.events()[0].id, MessageId::Number(4));
        assert_eq!(channel.state(), Open);
        assert!(logs_contain("dropping malformed frame"));
        assert!(logs_contain("dropping event for another conversation"));
    }
}
