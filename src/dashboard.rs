//! Overview model: campaign list, aggregate insights and per-campaign
//! insights, with a staleness window and explicit refresh.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures_util::future::join_all;
use serde_json::json;

use crate::api::{AggregateInsights, Campaign, CampaignApi, CampaignStatus, InsightsSnapshot};
use crate::insights::InsightsSource;
use crate::logging::{log, log_fetch_failed, obj, Domain, Level, ProfileScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(CampaignStatus),
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 4] = [
        StatusFilter::All,
        StatusFilter::Only(CampaignStatus::Active),
        StatusFilter::Only(CampaignStatus::Paused),
        StatusFilter::Only(CampaignStatus::Completed),
    ];

    pub fn matches(&self, campaign: &Campaign) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => campaign.status == *status,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFilter::All => "all",
            StatusFilter::Only(status) => status.as_str(),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "active" => Ok(StatusFilter::Only(CampaignStatus::Active)),
            "paused" => Ok(StatusFilter::Only(CampaignStatus::Paused)),
            "completed" => Ok(StatusFilter::Only(CampaignStatus::Completed)),
            other => Err(format!("unknown status filter {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub all: usize,
    pub active: usize,
    pub paused: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn tally(campaigns: &[Campaign]) -> Self {
        let mut counts = StatusCounts {
            all: campaigns.len(),
            ..Default::default()
        };
        for c in campaigns {
            match c.status {
                CampaignStatus::Active => counts.active += 1,
                CampaignStatus::Paused => counts.paused += 1,
                CampaignStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }

    pub fn get(&self, filter: StatusFilter) -> usize {
        match filter {
            StatusFilter::All => self.all,
            StatusFilter::Only(CampaignStatus::Active) => self.active,
            StatusFilter::Only(CampaignStatus::Paused) => self.paused,
            StatusFilter::Only(CampaignStatus::Completed) => self.completed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub campaigns: Vec<Campaign>,
    pub total: u64,
    pub aggregate: AggregateInsights,
    /// Campaigns whose insights fetch failed are simply absent.
    pub insights: HashMap<String, InsightsSnapshot>,
    loaded_at: Instant,
}

impl Dashboard {
    pub async fn load<A, I>(api: &A, source: &I) -> Result<Self>
    where
        A: CampaignApi + ?Sized,
        I: InsightsSource + ?Sized,
    {
        let _scope = ProfileScope::new("dashboard_load");
        let (page, aggregate) = tokio::try_join!(
            async { api.list_campaigns().await.context("fetching campaigns") },
            async { api.aggregate_insights().await.context("fetching aggregate insights") },
        )?;

        let insights = load_campaign_insights(source, &page.campaigns).await;
        log(
            Level::Info,
            Domain::Dashboard,
            "loaded",
            obj(&[
                ("campaigns", json!(page.campaigns.len())),
                ("total", json!(page.total)),
                ("with_insights", json!(insights.len())),
            ]),
        );

        Ok(Self {
            campaigns: page.campaigns,
            total: page.total,
            aggregate,
            insights,
            loaded_at: Instant::now(),
        })
    }

    pub fn filtered(&self, filter: StatusFilter) -> Vec<&Campaign> {
        self.campaigns.iter().filter(|c| filter.matches(c)).collect()
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.campaigns)
    }

    pub fn campaign(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn age(&self) -> Duration {
        self.loaded_at.elapsed()
    }

    pub fn is_stale(&self, stale_after: Duration) -> bool {
        self.age() >= stale_after
    }

    pub async fn refresh<A, I>(&mut self, api: &A, source: &I) -> Result<()>
    where
        A: CampaignApi + ?Sized,
        I: InsightsSource + ?Sized,
    {
        *self = Self::load(api, source).await?;
        Ok(())
    }

    /// Reloads only when older than `stale_after`. Returns whether it reloaded.
    pub async fn refresh_if_stale<A, I>(&mut self, api: &A, source: &I, stale_after: Duration) -> Result<bool>
    where
        A: CampaignApi + ?Sized,
        I: InsightsSource + ?Sized,
    {
        if !self.is_stale(stale_after) {
            return Ok(false);
        }
        self.refresh(api, source).await?;
        Ok(true)
    }
}

/// Fetches every campaign's insights concurrently. Failures are logged and skipped.
pub async fn load_campaign_insights<I>(source: &I, campaigns: &[Campaign]) -> HashMap<String, InsightsSnapshot>
where
    I: InsightsSource + ?Sized,
{
    let results = join_all(campaigns.iter().map(|c| async move { (c.id.as_str(), source.fetch_snapshot(&c.id).await) })).await;

    let mut out = HashMap::with_capacity(results.len());
    for (id, result) in results {
        match result {
            Ok(snapshot) => {
                out.insert(id.to_string(), snapshot);
            }
            Err(err) => log_fetch_failed("insights", Some(id), &err.to_string()),
        }
    }
    out
}
