// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw connection establishment and the channel event contract.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

use crate::error::TransportError;
use crate::types::{Binding, ConnectionState, Message};

/// Write half of an established connection. Each item is one text frame.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Read half of an established connection. The stream ending means the
/// connection closed.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// One established bidirectional connection.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Link {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Link").finish_non_exhaustive()
    }
}

/// Opens raw connections for a binding.
///
/// Implementations return [`TransportError::Unauthorized`] when the server
/// rejects the credential so the caller can stop retrying.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, binding: &Binding) -> Result<Link, TransportError>;
}

/// Receiver of a live channel's notifications.
///
/// Both callbacks run on the channel's connection task, in the order the
/// transport produced them. After the channel is closed no further
/// callbacks are made.
pub trait ChannelObserver: Send + Sync + 'static {
    /// A well-formed inbound message event.
    fn on_event(&self, message: Message);

    /// A connection state transition.
    fn on_state_change(&self, state: ConnectionState);
}
