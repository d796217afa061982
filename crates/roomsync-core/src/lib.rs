// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the roomsync conversation synchronization workspace.
//!
//! This crate provides the data model (messages, pending submissions,
//! connection states), the layered error types, and the collaborator traits
//! that the transport, history, and session crates are written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CodecError, HistoryError, RoomsyncError, TransportError};
pub use types::{
    Attachment, AttachmentKind, Binding, ClientToken, ConnectionState, ConversationId, Credential,
    DeliveryStatus, Message, MessageId, PendingMessage, Sender,
};

pub use traits::{
    ChannelObserver, Connector, CredentialCell, CredentialProvider, Directory, DirectoryEntry,
    HistorySource, InMemoryDirectory, Link,
};
