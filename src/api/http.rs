use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::Config;
use crate::error::ApiError;
use crate::logging::{v_str, ProfileScope};

use super::types::{AggregateInsights, Campaign, CampaignsPage, InsightsEnvelope};
use super::CampaignApi;

/// Thin reqwest wrapper bound to one API base address.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    base: Url,
    request_timeout: Duration,
}

impl HttpApi {
    pub fn new(cfg: &Config) -> Result<Self, ApiError> {
        let base = cfg.api_base_url()?;
        let client = Client::builder()
            .connect_timeout(cfg.connect_timeout())
            .build()
            .map_err(|e| ApiError::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base,
            request_timeout: cfg.request_timeout(),
        })
    }

    pub(crate) fn client(&self) -> &Client {
        &self.client
    }

    /// Appends `segments` to the base path. Each segment is percent-encoded,
    /// so opaque ids can never escape their path position.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Single GET, no retry. 404 maps to `NotFound`, any other non-2xx to `Network`.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments);
        let endpoint = url.path().to_string();
        let _scope = ProfileScope::with_context("http_get", &[("endpoint", v_str(&endpoint))]);

        let resp = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| ApiError::network(&endpoint, e))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { endpoint });
        }
        if !status.is_success() {
            return Err(ApiError::network(&endpoint, format!("HTTP {}", status)));
        }

        let body = resp.bytes().await.map_err(|e| ApiError::network(&endpoint, e))?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Parse {
            context: endpoint,
            source,
        })
    }
}

#[async_trait]
impl CampaignApi for HttpApi {
    async fn list_campaigns(&self) -> Result<CampaignsPage, ApiError> {
        self.get_json(&["campaigns"]).await
    }

    async fn get_campaign(&self, id: &str) -> Result<Campaign, ApiError> {
        self.get_json(&["campaigns", id]).await
    }

    async fn aggregate_insights(&self) -> Result<AggregateInsights, ApiError> {
        let env: InsightsEnvelope<AggregateInsights> = self.get_json(&["campaigns", "insights"]).await?;
        Ok(env.insights)
    }
}
