// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Merge of fetched history and live events into one ordered sequence.
//!
//! The merged view is always recomputed from scratch over both inputs.
//! History and live events arrive in no particular order relative to each
//! other, and only a full recomputation converges regardless of which
//! source saw a message first.

use std::collections::HashSet;

use roomsync_core::{Message, MessageId};

/// Union `history` and `live` by id and sort by (timestamp, id).
///
/// When an id appears more than once the first occurrence wins, scanning
/// `history` before `live`. Pure and total: equal inputs give equal output.
pub fn recompute(history: &[Message], live: &[Message]) -> Vec<Message> {
    let mut seen: HashSet<&MessageId> = HashSet::with_capacity(history.len() + live.len());
    let mut merged: Vec<Message> = history
        .iter()
        .chain(live)
        .filter(|m| seen.insert(&m.id))
        .cloned()
        .collect();
    merged.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
    merged
}

/// Inputs and current output of the merge for one conversation.
///
/// Each id is stored once, in whichever input observed it first, so a copy
/// seen later never replaces the earlier copy or its position.
#[derive(Debug, Default)]
pub struct ReconciliationEngine {
    history: Vec<Message>,
    live: Vec<Message>,
    live_ids: HashSet<MessageId>,
    merged: Vec<Message>,
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a fetched history batch in.
    ///
    /// Batches accumulate: a refetch that omits a previously seen message
    /// does not remove it from the merged view. Ids already admitted live
    /// keep their live copy.
    pub fn absorb_history(&mut self, batch: Vec<Message>) {
        let mut known: HashSet<MessageId> = self.history.iter().map(|m| m.id.clone()).collect();
        for message in batch {
            if self.live_ids.contains(&message.id) || !known.insert(message.id.clone()) {
                continue;
            }
            self.history.push(message);
        }
        self.refresh();
    }

    /// Admit one live event. Returns `true` if the merged sequence changed.
    pub fn admit(&mut self, event: Message) -> bool {
        if self.live_ids.contains(&event.id) || self.history.iter().any(|m| m.id == event.id) {
            return false;
        }
        self.live_ids.insert(event.id.clone());
        self.live.push(event);
        self.refresh();
        true
    }

    /// Forget everything, for a conversation switch.
    pub fn reset(&mut self) {
        self.history.clear();
        self.live.clear();
        self.live_ids.clear();
        self.merged.clear();
    }

    /// The current merged sequence.
    pub fn messages(&self) -> &[Message] {
        &self.merged
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn live_len(&self) -> usize {
        self.live.len()
    }

    fn refresh(&mut self) {
        self.merged = recompute(&self.history, &self.live);
    }
}
