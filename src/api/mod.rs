use async_trait::async_trait;

use crate::error::ApiError;

pub mod http;
pub mod types;

pub use http::HttpApi;
pub use types::{AggregateInsights, Campaign, CampaignStatus, CampaignsPage, InsightsSnapshot};

/// Read-only campaign endpoints. Every call is a single request; non-2xx is a hard failure.
#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn list_campaigns(&self) -> Result<CampaignsPage, ApiError>;
    async fn get_campaign(&self, id: &str) -> Result<Campaign, ApiError>;
    async fn aggregate_insights(&self) -> Result<AggregateInsights, ApiError>;
}
