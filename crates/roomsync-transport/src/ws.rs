// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WebSocket connector.
//!
//! Connects to `{ws_url}/{conversation_id}` with the credential as a bearer
//! token. Text frames (and UTF-8 binary frames) become inbound frames; a
//! close frame ends the stream.

use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, warn};

use roomsync_core::{Binding, Connector, ConversationId, Link, TransportError};

/// [`Connector`] over tokio-tungstenite.
#[derive(Debug, Clone)]
pub struct WsConnector {
    base_url: String,
}

impl WsConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Channel URL for one conversation.
    pub fn endpoint(&self, conversation_id: &ConversationId) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            conversation_id.as_str().trim()
        )
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, binding: &Binding) -> Result<Link, TransportError> {
        let url = self.endpoint(&binding.conversation_id);
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::Protocol {
                message: format!("invalid channel url `{url}`"),
                source: Some(Box::new(e)),
            })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", binding.credential.expose()))
            .map_err(|_| TransportError::Unauthorized {
                message: "credential is not a valid header value".to_string(),
            })?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        debug!(url = %url, "opening websocket");
        let (socket, _response) = connect_async(request).await.map_err(map_connect_error)?;
        let (sink, stream) = socket.split();

        let sink = sink
            .sink_map_err(|e| TransportError::Protocol {
                message: "websocket write failed".to_string(),
                source: Some(Box::new(e)),
            })
            .with(|text: String| {
                future::ready(Ok::<_, TransportError>(WsMessage::Text(text.into())))
            });

        let stream = stream.filter_map(|item| future::ready(inbound_frame(item)));

        Ok(Link::new(Box::pin(sink), Box::pin(stream)))
    }
}

/// Translate one websocket item into an inbound frame, skipping control frames.
fn inbound_frame(item: Result<WsMessage, WsError>) -> Option<Result<String, TransportError>> {
    match item {
        Ok(WsMessage::Text(text)) => Some(Ok(text.as_str().to_owned())),
        Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                warn!(len = bytes.len(), "ignoring non-UTF-8 binary frame");
                None
            }
        },
        Ok(WsMessage::Close(_)) => Some(Err(TransportError::Closed)),
        Ok(_) => None,
        Err(e) => Some(Err(TransportError::Protocol {
            message: "websocket read failed".to_string(),
            source: Some(Box::new(e)),
        })),
    }
}

fn map_connect_error(error: WsError) -> TransportError {
    let status = match &error {
        WsError::Http(response) => Some(response.status().as_u16()),
        _ => None,
    };
    match status {
        Some(code @ (401 | 403)) => TransportError::Unauthorized {
            message: format!("handshake rejected with HTTP {code}"),
        },
        _ => TransportError::Refused {
            message: error.to_string(),
            source: Some(Box::new(error)),
        },
    }
}
