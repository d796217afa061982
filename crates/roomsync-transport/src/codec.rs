// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire format of the live channel.
//!
//! Server -> Client, one or more JSON objects per frame, either compact and
//! newline-delimited or a single pretty-printed object:
//! ```json
//! {"id": 6, "conversation_id": "room-1", "sender": {"id": "u2", "name": "Bo"}, "content": "hi", "timestamp": 105}
//! ```
//!
//! Client -> Server:
//! ```json
//! {"message": "hello", "client_token": "optional-correlation-token"}
//! ```

use roomsync_core::{ClientToken, CodecError, Message};

/// Decode every JSON object carried by one inbound frame.
///
/// Objects are read back to back as a JSON stream, so one object may span
/// several lines. After a syntax error decoding resumes at the next line;
/// one bad line does not hide the objects around it. A frame with no
/// payload at all yields a single [`CodecError::Empty`].
pub fn decode_frame(frame: &str) -> Vec<Result<Message, CodecError>> {
    let mut decoded = Vec::new();
    let mut rest = frame;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let mut stream = serde_json::Deserializer::from_str(rest)
            .into_iter::<serde_json::Value>();
        match stream.next() {
            Some(Ok(value)) => {
                let consumed = stream.byte_offset();
                decoded.push(serde_json::from_value(value).map_err(CodecError::from));
                rest = &rest[consumed..];
            }
            Some(Err(e)) => {
                decoded.push(Err(CodecError::from(e)));
                rest = rest.split_once('\n').map_or("", |(_, next)| next);
            }
            None => break,
        }
    }

    if decoded.is_empty() {
        vec![Err(CodecError::Empty)]
    } else {
        decoded
    }
}

/// Encode an outbound submission.
pub fn encode_outbound(text: &str, token: Option<&ClientToken>) -> String {
    let mut frame = serde_json::json!({ "message": text });
    if let Some(token) = token {
        frame["client_token"] = serde_json::Value::String(token.0.clone());
    }
    frame.to_string()
}
