// SPDX-FileCopyrightText: 2026 Roomsync Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the conversation history endpoint.
//!
//! Provides [`HttpHistorySource`] which handles URL construction, bearer
//! authentication, cursor pagination, and transient error retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use roomsync_config::model::HistoryConfig;
use roomsync_core::{ConversationId, Credential, HistoryError, HistorySource, Message};

use crate::page::Page;

/// Fetches history from `{api_url}/conversations/{id}/messages`.
///
/// Pages are requested with `limit=<page_size>` and followed through
/// `before=<cursor>` until the server stops returning a cursor or
/// `max_pages` pages were loaded. Transient errors (429, 500, 502, 503)
/// are retried once per page.
#[derive(Debug, Clone)]
pub struct HttpHistorySource {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    max_pages: u32,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpHistorySource {
    pub fn new(base_url: impl Into<String>, config: &HistoryConfig) -> Result<Self, HistoryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| HistoryError::Request {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            page_size: config.page_size,
            max_pages: config.max_pages,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Overrides the pause before retrying a transient failure.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn page_url(
        &self,
        conversation_id: &ConversationId,
        cursor: Option<&str>,
    ) -> Result<Url, HistoryError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| HistoryError::Request {
            message: format!("invalid history url `{}`", self.base_url),
            source: Some(Box::new(e)),
        })?;
        url.path_segments_mut()
            .map_err(|()| HistoryError::Request {
                message: format!("history url `{}` cannot take a path", self.base_url),
                source: None,
            })?
            .pop_if_empty()
            .extend(["conversations", conversation_id.as_str(), "messages"]);
        url.query_pairs_mut()
            .append_pair("limit", &self.page_size.to_string());
        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("before", cursor);
        }
        Ok(url)
    }

    async fn fetch_page(
        &self,
        conversation_id: &ConversationId,
        credential: &Credential,
        cursor: Option<&str>,
    ) -> Result<Page, HistoryError> {
        let url = self.page_url(conversation_id, cursor)?;
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, %conversation_id, "retrying history request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .get(url.clone())
                .bearer_auth(credential.expose())
                .send()
                .await
                .map_err(|e| HistoryError::Request {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, %conversation_id, "history response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| HistoryError::Request {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return Page::parse(&body);
            }

            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                return Err(HistoryError::Unauthorized {
                    status: status.as_u16(),
                });
            }

            let body = response.text().await.unwrap_or_default();
            let error = HistoryError::Status {
                status: status.as_u16(),
                body,
            };
            if is_transient_error(status) && attempt < self.max_retries {
                last_error = Some(error);
                continue;
            }
            return Err(error);
        }

        Err(last_error.unwrap_or_else(|| HistoryError::Request {
            message: "history request failed after retries".into(),
            source: None,
        }))
    }
}

#[async_trait]
impl HistorySource for HttpHistorySource {
    async fn fetch_history(
        &self,
        conversation_id: &ConversationId,
        credential: &Credential,
    ) -> Result<Vec<Message>, HistoryError> {
        let mut messages = Vec::new();
        let mut cursor: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let page = self
                .fetch_page(conversation_id, credential, cursor.as_deref())
                .await?;
            let loaded = page.messages.len();
            messages.extend(page.messages);

            match page.next_cursor {
                Some(next) if loaded > 0 && cursor.as_deref() != Some(next.as_str()) => {
                    cursor = Some(next);
                }
                _ => break,
            }
            if page_number == self.max_pages {
                debug!(%conversation_id, max_pages = self.max_pages, "history page limit reached");
            }
        }

        debug!(%conversation_id, count = messages.len(), "history loaded");
        Ok(messages)
    }
}

/// Returns true for HTTP status codes worth one retry.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
    )
}
