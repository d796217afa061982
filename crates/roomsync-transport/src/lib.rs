// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live transport channel for roomsync.
//!
//! A [`TransportChannel`] owns one connection to a single conversation,
//! reconnects with bounded exponential backoff, and reports connection
//! state and decoded inbound events to a
//! [`ChannelObserver`](roomsync_core::ChannelObserver). [`WsConnector`]
//! supplies WebSocket connections; tests substitute a mock connector.

pub mod backoff;
pub mod channel;
pub mod codec;
pub mod ws;

pub use backoff::ReconnectPolicy;
pub use channel::{ChannelConfig, TransportChannel};
pub use codec::{decode_frame, encode_outbound};
pub use ws::WsConnector;
