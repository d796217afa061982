// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound staging for messages submitted while the channel is not open.
//!
//! Submissions go straight to the transport when it is open and nothing is
//! already waiting; otherwise they are buffered and flushed in submission
//! order once the channel reports `Open`. With echo acknowledgment enabled,
//! a sent submission stays `Queued` until the server echoes its client
//! token, and is marked `Failed` if no echo arrives within the timeout.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use roomsync_config::model::{AckMode, DeliveryConfig};
use roomsync_core::{ClientToken, ConnectionState, DeliveryStatus, Message, PendingMessage};
use roomsync_transport::{TransportChannel, encode_outbound};

/// Where outbound frames go.
pub trait Outbound {
    fn state(&self) -> ConnectionState;

    /// Hand one frame to the transport. `false` if it was not accepted.
    fn send(&self, raw: String) -> bool;
}

impl Outbound for TransportChannel {
    fn state(&self) -> ConnectionState {
        TransportChannel::state(self)
    }

    fn send(&self, raw: String) -> bool {
        TransportChannel::send(self, raw)
    }
}

impl Outbound for Option<TransportChannel> {
    fn state(&self) -> ConnectionState {
        self.as_ref()
            .map_or(ConnectionState::Disconnected, TransportChannel::state)
    }

    fn send(&self, raw: String) -> bool {
        self.as_ref().is_some_and(|channel| channel.send(raw))
    }
}

/// Acknowledgment settings of a [`DeliveryQueue`].
#[derive(Debug, Clone, Copy)]
pub struct AckPolicy {
    pub mode: AckMode,
    pub timeout: Duration,
}

impl AckPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            mode: config.ack_mode,
            timeout: Duration::from_secs(config.ack_timeout_secs),
        }
    }
}

impl Default for AckPolicy {
    fn default() -> Self {
        Self::from_config(&DeliveryConfig::default())
    }
}

struct InFlight {
    message: PendingMessage,
    deadline: Instant,
}

/// FIFO buffer of submissions for the current conversation.
pub struct DeliveryQueue {
    ack: AckPolicy,
    buffer: VecDeque<PendingMessage>,
    /// Transmitted, awaiting echo.
    in_flight: Vec<InFlight>,
    failed: Vec<PendingMessage>,
}

impl DeliveryQueue {
    pub fn new(ack: AckPolicy) -> Self {
        Self {
            ack,
            buffer: VecDeque::new(),
            in_flight: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Submit `text` for delivery.
    ///
    /// The returned record reflects the status right after submission:
    /// `Sent` if the transport accepted it (and no echo is awaited),
    /// `Queued` otherwise.
    pub fn submit(&mut self, text: impl Into<String>, out: &dyn Outbound) -> PendingMessage {
        let mut pending = PendingMessage::new(text);

        if !self.buffer.is_empty() {
            self.flush(out);
        }

        if self.buffer.is_empty() && out.state().is_open() && self.transmit(&pending, out) {
            self.mark_transmitted(&mut pending);
            return pending;
        }

        debug!(token = %pending.token, state = %out.state(), "submission buffered");
        self.buffer.push_back(pending.clone());
        pending
    }

    /// Send buffered submissions in order until one is not accepted.
    ///
    /// Returns the number of submissions handed to the transport.
    pub fn flush(&mut self, out: &dyn Outbound) -> usize {
        let mut flushed = 0;
        while let Some(front) = self.buffer.front() {
            if !out.state().is_open() || !self.transmit(front, out) {
                break;
            }
            if let Some(mut pending) = self.buffer.pop_front() {
                self.mark_transmitted(&mut pending);
                flushed += 1;
            }
        }
        if flushed > 0 {
            info!(flushed, remaining = self.buffer.len(), "flushed outbound queue");
        }
        flushed
    }

    /// Match a live event against awaited echoes.
    ///
    /// Returns the confirmed submission, now `Sent`.
    pub fn confirm(&mut self, message: &Message) -> Option<PendingMessage> {
        if self.ack.mode != AckMode::Echo {
            return None;
        }
        let token = message.client_token.as_ref()?;
        let index = self
            .in_flight
            .iter()
            .position(|entry| &entry.message.token == token)?;
        let mut confirmed = self.in_flight.remove(index).message;
        confirmed.status = DeliveryStatus::Sent;
        debug!(%token, message_id = %message.id, "submission acknowledged");
        Some(confirmed)
    }

    /// Mark every submission whose echo deadline passed as `Failed`.
    pub fn expire(&mut self, now: Instant) -> Vec<ClientToken> {
        let (overdue, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|entry| entry.deadline <= now);
        self.in_flight = waiting;

        overdue
            .into_iter()
            .map(|entry| {
                let mut message = entry.message;
                warn!(token = %message.token, "no acknowledgment before timeout");
                message.status = DeliveryStatus::Failed;
                let token = message.token.clone();
                self.failed.push(message);
                token
            })
            .collect()
    }

    /// Requeue a failed submission behind the current buffer and flush.
    ///
    /// Returns `false` if `token` names no failed submission.
    pub fn retry(&mut self, token: &ClientToken, out: &dyn Outbound) -> bool {
        let Some(index) = self.failed.iter().position(|m| &m.token == token) else {
            return false;
        };
        let mut message = self.failed.remove(index);
        message.status = DeliveryStatus::Queued;
        self.buffer.push_back(message);
        self.flush(out);
        true
    }

    /// Drop everything, for a conversation switch.
    pub fn clear(&mut self) {
        let dropped = self.buffer.len() + self.in_flight.len() + self.failed.len();
        self.buffer.clear();
        self.in_flight.clear();
        self.failed.clear();
        if dropped > 0 {
            debug!(dropped, "outbound queue cleared");
        }
    }

    /// Every submission not yet confirmed: failed first, then awaiting
    /// echo, then buffered, each group in submission order.
    pub fn pending(&self) -> Vec<PendingMessage> {
        self.failed
            .iter()
            .chain(self.in_flight.iter().map(|entry| &entry.message))
            .chain(self.buffer.iter())
            .cloned()
            .collect()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && self.in_flight.is_empty() && self.failed.is_empty()
    }

    /// Earliest echo deadline, if any submission awaits one.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.in_flight.iter().map(|entry| entry.deadline).min()
    }

    fn transmit(&self, pending: &PendingMessage, out: &dyn Outbound) -> bool {
        let token = (self.ack.mode == AckMode::Echo).then_some(&pending.token);
        out.send(encode_outbound(&pending.text, token))
    }

    fn mark_transmitted(&mut self, pending: &mut PendingMessage) {
        match self.ack.mode {
            AckMode::None => pending.status = DeliveryStatus::Sent,
            AckMode::Echo => {
                pending.status = DeliveryStatus::Queued;
                self.in_flight.push(InFlight {
                    message: pending.clone(),
                    deadline: Instant::now() + self.ack.timeout,
                });
            }
        }
    }
}
