// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History page wire format.
//!
//! Endpoints answer either with a bare array of message events or with an
//! envelope carrying a continuation cursor:
//! ```json
//! {"messages": [...], "next_cursor": "opaque-or-numeric"}
//! ```

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use roomsync_core::{HistoryError, Message};

/// One decoded page.
#[derive(Debug, Default)]
pub struct Page {
    pub messages: Vec<Message>,
    pub next_cursor: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageBody {
    Bare(Vec<Value>),
    Envelope {
        #[serde(alias = "items", alias = "data")]
        messages: Vec<Value>,
        #[serde(default, alias = "cursor", alias = "next")]
        next_cursor: Option<Value>,
    },
}

impl Page {
    /// Decode a response body. Individual malformed entries are skipped.
    pub fn parse(body: &str) -> Result<Self, HistoryError> {
        let parsed: PageBody = serde_json::from_str(body).map_err(|e| HistoryError::Decode {
            message: e.to_string(),
        })?;

        let (entries, cursor) = match parsed {
            PageBody::Bare(entries) => (entries, None),
            PageBody::Envelope {
                messages,
                next_cursor,
            } => (messages, next_cursor),
        };

        let messages = entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Message>(entry) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(error = %e, "skipping malformed history entry");
                    None
                }
            })
            .collect();

        Ok(Self {
            messages,
            next_cursor: cursor.and_then(cursor_string),
        })
    }
}

fn cursor_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str =
        r#"{"id": 1, "conversation_id": "r", "sender": "u", "content": "a", "timestamp": 1}"#;

    #[test]
    fn bare_array_has_no_cursor() {
        let page = Page::parse(&format!("[{EVENT}]")).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn envelope_with_numeric_cursor() {
        let body = format!(r#"{{"messages": [{EVENT}], "next_cursor": 42}}"#);
        let page = Page::parse(&body).unwrap();
        assert_eq!(page.next_cursor.as_deref(), Some("42"));
    }

    #[test]
    fn null_or_empty_cursor_ends_pagination() {
        let page = Page::parse(r#"{"messages": [], "next_cursor": null}"#).unwrap();
        assert!(page.next_cursor.is_none());
        let page = Page::parse(r#"{"messages": [], "next_cursor": ""}"#).unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let page = Page::parse(&format!(r#"[{EVENT}, {{"id": 2}}]"#)).unwrap();
        assert_eq!(page.messages.len(), 1);
    }

    #[test]
    fn non_page_body_is_decode_error() {
        let err = Page::parse(r#"{"error": "nope"}"#).unwrap_err();
        assert!(matches!(err, HistoryError::Decode { .. }));
    }
}
