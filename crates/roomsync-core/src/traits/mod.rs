// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the synchronization core.
//!
//! Connection establishment, history fetch, credential lookup, and the
//! sender directory are supplied from outside the core. Async traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod connector;
pub mod credential;
pub mod directory;
pub mod history;

pub use connector::{ChannelObserver, Connector, FrameSink, FrameStream, Link};
pub use credential::{CredentialCell, CredentialProvider};
pub use directory::{Directory, DirectoryEntry, InMemoryDirectory};
pub use history::HistorySource;
