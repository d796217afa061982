// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel observer that records every callback.

use std::sync::Mutex;

use tokio::sync::Notify;

use roomsync_core::{ChannelObserver, ConnectionState, Message};

use crate::lock;

/// Captures `on_event` and `on_state_change` calls in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Message>>,
    states: Mutex<Vec<ConnectionState>>,
    notify: Notify,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Message> {
        lock(&self.events).clone()
    }

    pub fn states(&self) -> Vec<ConnectionState> {
        lock(&self.states).clone()
    }

    pub fn last_state(&self) -> Option<ConnectionState> {
        lock(&self.states).last().copied()
    }

    /// Wait until `state` has been reported at least once.
    pub async fn wait_for_state(&self, state: ConnectionState) {
        self.wait_for_state_count(state, 1).await;
    }

    /// Wait until `state` has been reported at least `count` times.
    pub async fn wait_for_state_count(&self, state: ConnectionState, count: usize) {
        self.wait_until(|o| lock(&o.states).iter().filter(|s| **s == state).count() >= count)
            .await;
    }

    /// Wait until at least `count` events were delivered.
    pub async fn wait_for_events(&self, count: usize) {
        self.wait_until(|o| lock(&o.events).len() >= count).await;
    }

    async fn wait_until(&self, done: impl Fn(&Self) -> bool) {
        loop {
            let notified = self.notify.notified();
            if done(self) {
                return;
            }
            notified.await;
        }
    }
}

impl ChannelObserver for RecordingObserver {
    fn on_event(&self, message: Message) {
        lock(&self.events).push(message);
        self.notify.notify_waiters();
    }

    fn on_state_change(&self, state: ConnectionState) {
        lock(&self.states).push(state);
        self.notify.notify_waiters();
    }
}
