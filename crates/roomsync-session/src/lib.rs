// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session for roomsync.
//!
//! Ties one live [`TransportChannel`](roomsync_transport::TransportChannel)
//! and one history fetch together per selected conversation:
//!
//! - [`ReconciliationEngine`] merges history and live events into a single
//!   deduplicated sequence ordered by (timestamp, id)
//! - [`DeliveryQueue`] buffers outbound submissions until the channel opens
//! - [`ConversationSession`] owns both plus the channel lifecycle
//! - [`SessionHandle`] runs a session on its own task
//!
//! Consumers read [`SessionSnapshot`]s from a watch subscription.

pub mod delivery;
pub mod handle;
pub mod reconcile;
pub mod session;
pub mod snapshot;

pub use delivery::{AckPolicy, DeliveryQueue, Outbound};
pub use handle::SessionHandle;
pub use reconcile::{ReconciliationEngine, recompute};
pub use session::{ConversationSession, SessionConfig};
pub use snapshot::{HistoryStatus, SessionSnapshot};
