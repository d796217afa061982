// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the transport, history, and session layers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier accepted on the wire for ids that may be integers or strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

/// Addressable chat context (conversation / room).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawId")]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<RawId> for ConversationId {
    fn from(raw: RawId) -> Self {
        Self(raw.into_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Server-assigned message identity; the sole deduplication key.
///
/// Numeric ids order before textual ids, numerically among themselves and
/// lexicographically among strings. This only matters for breaking timestamp
/// ties, where any total order keeps the merged sequence deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageId {
    Number(i64),
    Text(String),
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Number(n) => write!(f, "{n}"),
            MessageId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MessageId {
    fn from(n: i64) -> Self {
        MessageId::Number(n)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId::Text(s.to_string())
    }
}

/// Sender identity as carried on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSender")]
pub struct Sender {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Sender {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }

    /// Display name if present, otherwise the raw id.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Senders arrive either as a bare id or as `{ id, name }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSender {
    Bare(RawId),
    Full {
        id: RawId,
        #[serde(default, alias = "display_name", alias = "username")]
        name: Option<String>,
    },
}

impl From<RawSender> for Sender {
    fn from(raw: RawSender) -> Self {
        match raw {
            RawSender::Bare(id) => Sender {
                id: id.into_string(),
                name: None,
            },
            RawSender::Full { id, name } => Sender {
                id: id.into_string(),
                name,
            },
        }
    }
}

/// Kind of media attached to a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Audio,
    Video,
    #[serde(alias = "generic", alias = "document")]
    File,
}

/// Reference to an attachment hosted elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub url: String,
}

/// Client-generated correlation token for an outbound submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientToken(pub String);

impl ClientToken {
    /// Generate a fresh random token.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ClientToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The atomic unit exchanged and displayed.
///
/// Observed either in a history batch or as a single live event. Never
/// mutated client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    #[serde(alias = "conversationId", alias = "room_id")]
    pub conversation_id: ConversationId,
    pub sender: Sender,
    #[serde(alias = "body")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(with = "timestamp", alias = "created_at")]
    pub timestamp: DateTime<Utc>,
    /// Echo of the sender's correlation token, when the server supports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<ClientToken>,
}

impl Message {
    /// Sort key of the merged sequence: timestamp, then id.
    pub fn order_key(&self) -> (&DateTime<Utc>, &MessageId) {
        (&self.timestamp, &self.id)
    }
}

/// Flexible timestamp encoding: RFC 3339 strings or numeric epoch values.
///
/// Numbers with magnitude at or above 10^12 are read as milliseconds,
/// smaller ones as seconds. Serialization always writes RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    const MILLIS_THRESHOLD: f64 = 1_000_000_000_000.0;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Int(i64),
        Float(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = RawTimestamp::deserialize(deserializer)?;
        let parsed = match raw {
            RawTimestamp::Int(n) => from_epoch(n as f64),
            RawTimestamp::Float(f) => from_epoch(f),
            RawTimestamp::Text(s) => parse_text(&s),
        };
        parsed.ok_or_else(|| D::Error::custom("unrecognized timestamp"))
    }

    /// Parse an RFC 3339 string or a numeric epoch string.
    pub fn parse_text(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.with_timezone(&Utc));
        }
        s.parse::<f64>().ok().and_then(from_epoch)
    }

    /// Convert an epoch value in seconds or milliseconds.
    pub fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
        if !value.is_finite() {
            return None;
        }
        let millis = if value.abs() >= MILLIS_THRESHOLD {
            value
        } else {
            value * 1000.0
        };
        DateTime::from_timestamp_millis(millis.round() as i64)
    }
}

/// Authentication token for the live channel and history endpoint.
///
/// The secret never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Credential(Arc<SecretString>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(token.into())))
    }

    /// Reveal the token for placement in a header.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([redacted])")
    }
}

/// The (conversation, credential) pair that parameterizes one live channel.
///
/// Changing either element requires a full teardown and reopen.
#[derive(Debug, Clone)]
pub struct Binding {
    pub conversation_id: ConversationId,
    pub credential: Credential,
}

impl Binding {
    pub fn new(conversation_id: ConversationId, credential: Credential) -> Self {
        Self {
            conversation_id,
            credential,
        }
    }

    /// A binding can only be opened when both elements are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.conversation_id.is_empty() && !self.credential.is_empty()
    }
}

/// Connection health of a live channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Open,
    Reconnecting,
    Failed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == ConnectionState::Open
    }
}

/// Delivery status of a client-local outbound submission.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    /// Buffered (or awaiting acknowledgment) but not yet confirmed.
    Queued,
    /// Accepted by the transport (or confirmed by echo in acknowledgment mode).
    Sent,
    /// Acknowledgment did not arrive in time.
    Failed,
}

/// Client-local staging record for an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMessage {
    pub token: ClientToken,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl PendingMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            token: ClientToken::generate(),
            text: text.into(),
            created_at: Utc::now(),
            status: DeliveryStatus::Queued,
        }
    }
}
