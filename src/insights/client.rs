use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use url::Url;

use crate::api::types::InsightsEnvelope;
use crate::api::{HttpApi, InsightsSnapshot};
use crate::error::{ApiError, StreamError};
use crate::logging::log_stream_event;

use super::sse::SseDecoder;
use super::subscription::{ChannelGuard, SubscriptionHandle};
use super::{ErrorFn, InsightsSource, UpdateFn};

#[derive(Debug, Clone)]
pub struct HttpInsightsClient {
    api: HttpApi,
}

impl HttpInsightsClient {
    pub fn new(api: HttpApi) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &HttpApi {
        &self.api
    }
}

#[async_trait]
impl InsightsSource for HttpInsightsClient {
    async fn fetch_snapshot(&self, entity_id: &str) -> Result<InsightsSnapshot, ApiError> {
        let env: InsightsEnvelope<InsightsSnapshot> =
            self.api.get_json(&["campaigns", entity_id, "insights"]).await?;
        Ok(env.insights)
    }

    fn subscribe(&self, entity_id: &str, on_update: UpdateFn, on_error: ErrorFn) -> SubscriptionHandle {
        let guard = ChannelGuard::new();
        let url = self.api.endpoint(&["campaigns", entity_id, "insights", "stream"]);
        let task = tokio::spawn(pump(
            self.api.client().clone(),
            url,
            entity_id.to_string(),
            guard.clone(),
            on_update,
            on_error,
        ));
        let abort = task.abort_handle();
        SubscriptionHandle::new(entity_id, guard).on_release(move || abort.abort())
    }
}

/// Drives one stream to completion. Whatever ends it (server close, read
/// error, bad status) is terminal and reported once, unless the owner
/// released the handle first.
async fn pump(
    client: Client,
    url: Url,
    entity_id: String,
    guard: ChannelGuard,
    mut on_update: UpdateFn,
    on_error: ErrorFn,
) {
    let reason = match read_stream(&client, url, &entity_id, &guard, &mut on_update).await {
        Ok(()) => "server closed the stream".to_string(),
        Err(reason) => reason,
    };
    if guard.close() {
        log_stream_event("stream_failed", &entity_id, &reason);
        on_error(StreamError::new(&entity_id, reason));
    }
}

async fn read_stream(
    client: &Client,
    url: Url,
    entity_id: &str,
    guard: &ChannelGuard,
    on_update: &mut UpdateFn,
) -> Result<(), String> {
    let resp = client
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await
        .map_err(|e| format!("connect failed: {}", e))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(format!("HTTP {}", status));
    }
    let content_type = resp
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.starts_with("text/event-stream") {
        return Err(format!("unexpected content type {:?}", content_type));
    }
    log_stream_event("stream_opened", entity_id, status.as_str());

    let mut decoder = SseDecoder::new();
    let mut body = resp.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("read failed: {}", e))?;
        for event in decoder.push(&chunk) {
            if !guard.is_open() {
                return Ok(());
            }
            if !event.is_message() {
                log_stream_event("stream_event_ignored", entity_id, event.event.as_deref().unwrap_or(""));
                continue;
            }
            match serde_json::from_str::<InsightsSnapshot>(&event.data) {
                Ok(snapshot) => on_update(snapshot),
                Err(e) => log_stream_event("stream_message_dropped", entity_id, &e.to_string()),
            }
        }
    }
    Ok(())
}
