// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the roomsync synchronization core.
//!
//! Each layer has its own error enum so callers can react to the category
//! (a transport drop is recovered locally, an auth rejection is terminal,
//! a history failure never touches the live channel). [`RoomsyncError`]
//! unifies them for application-level code.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used at the application boundary.
#[derive(Debug, Error)]
pub enum RoomsyncError {
    /// Configuration errors (invalid values, unusable URLs).
    #[error("configuration error: {0}")]
    Config(String),

    /// Live channel errors.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// History fetch errors.
    #[error("history error: {0}")]
    History(#[from] HistoryError),

    /// Wire format errors.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// No credential is available for the requested operation.
    #[error("no credential available")]
    MissingCredential,

    /// An operation needs a selected conversation and none is.
    #[error("no conversation selected")]
    NoConversation,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors raised while establishing or using a live connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote end refused or failed the connection attempt.
    #[error("connection refused: {message}")]
    Refused {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The credential was rejected. Never retried.
    #[error("credential rejected: {message}")]
    Unauthorized { message: String },

    /// Connection establishment did not finish in time.
    #[error("connect timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The connection ended.
    #[error("connection closed")]
    Closed,

    /// The connection misbehaved at the protocol level (bad frame type, write failure).
    #[error("protocol error: {message}")]
    Protocol {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TransportError {
    /// Whether this error must stop the reconnect loop instead of scheduling a retry.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransportError::Unauthorized { .. })
    }
}

/// Errors raised by a history fetch. Distinct from an empty result.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The credential was rejected by the history endpoint.
    #[error("history request unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The endpoint answered with a non-success status.
    #[error("history endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request could not be sent or the body could not be read.
    #[error("history request failed: {message}")]
    Request {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The response body was not a recognizable message page.
    #[error("failed to decode history page: {message}")]
    Decode { message: String },
}

/// Errors raised while decoding an inbound frame.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The frame (or one of its lines) carried no payload.
    #[error("empty frame")]
    Empty,

    /// The payload was not a valid message event.
    #[error("malformed message event: {0}")]
    Malformed(#[from] serde_json::Error),
}
