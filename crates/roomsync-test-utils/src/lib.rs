// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for roomsync integration tests.
//!
//! Provides scriptable collaborators for fast, deterministic tests without
//! a live server.
//!
//! # Components
//!
//! - [`MockConnector`] - Scripted connect outcomes with per-link handles
//! - [`MockHistory`] - Scripted history replies with optional resolution gates
//! - [`RecordingObserver`] - Captures channel callbacks for assertion
//! - [`fixtures`] - Message builders

use std::sync::{Mutex, MutexGuard, PoisonError};

pub mod fixtures;
pub mod mock_connector;
pub mod mock_history;
pub mod observer;

pub use mock_connector::{ConnectOutcome, MockConnector, MockLink};
pub use mock_history::{HistoryReply, MockHistory};
pub use observer::RecordingObserver;

/// Lock a mutex, ignoring poisoning from a panicked test thread.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
