use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
}

impl CampaignStatus {
    pub const ALL: [CampaignStatus; 3] = [CampaignStatus::Active, CampaignStatus::Paused, CampaignStatus::Completed];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub brand_id: String,
    pub status: CampaignStatus,
    pub budget: f64,
    pub daily_budget: f64,
    pub platforms: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignsPage {
    pub campaigns: Vec<Campaign>,
    pub total: u64,
}

/// Point-in-time metrics for one campaign. Comes from either the fetch
/// endpoint or the push stream; both carry the same shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightsSnapshot {
    #[serde(rename = "campaign_id", alias = "entity_id")]
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub spend: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateInsights {
    pub timestamp: DateTime<Utc>,
    pub total_campaigns: u64,
    pub active_campaigns: u64,
    pub paused_campaigns: u64,
    pub completed_campaigns: u64,
    pub total_impressions: u64,
    pub total_clicks: u64,
    pub total_conversions: u64,
    pub total_spend: f64,
    pub avg_ctr: f64,
    pub avg_cpc: f64,
    pub avg_conversion_rate: f64,
}

/// `{ "insights": ... }` wrapper used by both insights endpoints.
#[derive(Debug, Deserialize)]
pub(crate) struct InsightsEnvelope<T> {
    pub insights: T,
}
