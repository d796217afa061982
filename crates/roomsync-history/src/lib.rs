// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP history collaborator for roomsync.
//!
//! Implements [`HistorySource`](roomsync_core::HistorySource) over the
//! conversation REST endpoint with cursor pagination.

pub mod client;
pub mod page;

pub use client::HttpHistorySource;
pub use page::Page;
