// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Room/user directory used for rendering only.

use std::collections::HashMap;

use crate::types::Sender;

/// Rendering details for a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

/// Resolves sender ids to display names and avatars.
///
/// Never consulted by reconciliation.
pub trait Directory: Send + Sync {
    fn resolve(&self, sender_id: &str) -> Option<DirectoryEntry>;

    /// Best label for a sender: directory name, wire name, then raw id.
    fn label_for(&self, sender: &Sender) -> String {
        self.resolve(&sender.id)
            .map(|e| e.display_name)
            .unwrap_or_else(|| sender.label().to_string())
    }
}

/// A directory backed by a map, filled by the surrounding application.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    entries: HashMap<String, DirectoryEntry>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sender_id: impl Into<String>, entry: DirectoryEntry) {
        self.entries.insert(sender_id.into(), entry);
    }
}

impl Directory for InMemoryDirectory {
    fn resolve(&self, sender_id: &str) -> Option<DirectoryEntry> {
        self.entries.get(sender_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_prefers_directory_then_wire_name() {
        let mut dir = InMemoryDirectory::new();
        dir.insert(
            "u1",
            DirectoryEntry {
                display_name: "Alice".into(),
                avatar_url: None,
            },
        );

        assert_eq!(dir.label_for(&Sender::new("u1", "alice_wire")), "Alice");
        assert_eq!(dir.label_for(&Sender::new("u2", "bob")), "bob");
        let bare = Sender {
            id: "u3".into(),
            name: None,
        };
        assert_eq!(dir.label_for(&bare), "u3");
    }
}
