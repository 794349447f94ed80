//! Plain-text views for the terminal.

use std::fmt::Write;

use crate::api::{AggregateInsights, Campaign, InsightsSnapshot};
use crate::dashboard::{Dashboard, StatusFilter};
use crate::format::{
    format_count, format_cpc, format_currency, format_date, format_percentage, format_time, platform_label,
    status_label,
};
use crate::panel::PanelView;

const MISSING: &str = "—";

pub fn overview_cards(agg: &AggregateInsights) -> String {
    let cards = [
        ("Total Impressions", format_count(agg.total_impressions)),
        ("Total Clicks", format_count(agg.total_clicks)),
        ("Conversions", format_count(agg.total_conversions)),
        ("Total Spend", format_currency(agg.total_spend)),
        ("Avg CTR", format_percentage(agg.avg_ctr)),
        ("Avg Conv. Rate", format_percentage(agg.avg_conversion_rate)),
    ];
    let mut out = String::from("OVERVIEW\n");
    for (label, value) in cards {
        let _ = writeln!(out, "  {:<18} {:>14}", label, value);
    }
    out
}

fn platforms(c: &Campaign) -> String {
    c.platforms.iter().map(|p| platform_label(p)).collect::<Vec<_>>().join(", ")
}

pub fn campaign_table(dash: &Dashboard, filter: StatusFilter) -> String {
    let counts = dash.status_counts();
    let rows = dash.filtered(filter);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Active {}   Paused {}   Completed {}",
        counts.active, counts.paused, counts.completed
    );
    let _ = writeln!(out, "\nCAMPAIGNS ({})  filter: {} [{}]", rows.len(), filter.as_str(), counts.get(filter));
    let _ = writeln!(
        out,
        "{:<28} {:<10} {:<22} {:>10} {:>10} {:>12} {:>8} {:>7} {:>6}",
        "Campaign", "Status", "Platforms", "Budget", "Spend", "Impressions", "Clicks", "CTR", "Conv."
    );
    for c in rows {
        let insight = dash.insights.get(&c.id);
        let _ = writeln!(
            out,
            "{:<28} {:<10} {:<22} {:>10} {:>10} {:>12} {:>8} {:>7} {:>6}",
            truncate(&c.name, 28),
            status_label(c.status),
            truncate(&platforms(c), 22),
            format_currency(c.budget),
            cell(insight, |s| format_currency(s.spend)),
            cell(insight, |s| format_count(s.impressions)),
            cell(insight, |s| format_count(s.clicks)),
            cell(insight, |s| format_percentage(s.ctr)),
            cell(insight, |s| format_count(s.conversions)),
        );
    }
    out
}

fn cell(insight: Option<&InsightsSnapshot>, f: impl Fn(&InsightsSnapshot) -> String) -> String {
    insight.map(f).unwrap_or_else(|| MISSING.to_string())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
    t.push('…');
    t
}

pub fn detail_panel(campaign: &Campaign, view: &PanelView<'_>) -> String {
    let mut out = String::new();
    let live = if view.is_streaming() { "● Live  " } else { "" };
    let _ = writeln!(out, "{}Campaign Details", live);
    let _ = writeln!(out, "{}", campaign.name);
    let _ = writeln!(out, "{}  {}", status_label(campaign.status), platforms(campaign));
    let _ = writeln!(out, "ID: {}", campaign.id);
    let _ = writeln!(
        out,
        "Total Budget {}   Daily Budget {}",
        format_currency(campaign.budget),
        format_currency(campaign.daily_budget)
    );

    if let Some(err) = view.error {
        let _ = writeln!(out, "\nStream disconnected: {}", err);
    }

    if let Some(s) = view.snapshot {
        let suffix = if view.is_streaming() { " (updating live)" } else { "" };
        let _ = writeln!(out, "\nPERFORMANCE METRICS{}", suffix);
        let _ = writeln!(out, "  {:<12} {:>12}", "Impressions", format_count(s.impressions));
        let _ = writeln!(out, "  {:<12} {:>12}", "Clicks", format_count(s.clicks));
        let _ = writeln!(out, "  {:<12} {:>12}", "Conversions", format_count(s.conversions));
        let _ = writeln!(out, "  {:<12} {:>12}", "Spend", format_currency(s.spend));
        let _ = writeln!(
            out,
            "  CTR {}   CPC {}   Conv. Rate {}",
            format_percentage(s.ctr),
            format_cpc(s.cpc),
            format_percentage(s.conversion_rate)
        );
        let _ = writeln!(out, "  Last updated: {}", format_time(&s.timestamp));
    }

    let _ = writeln!(out, "\nCreated: {}", format_date(&campaign.created_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CampaignStatus;
    use crate::panel::PanelState;
    use chrono::{TimeZone, Utc};

    fn campaign() -> Campaign {
        Campaign {
            id: "c1".into(),
            name: "Spring Sale".into(),
            brand_id: "b1".into(),
            status: CampaignStatus::Active,
            budget: 5000.0,
            daily_budget: 250.0,
            platforms: vec!["meta".into(), "tiktok".into()],
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn snap() -> InsightsSnapshot {
        InsightsSnapshot {
            entity_id: "c1".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 1, 15, 10, 30, 0).unwrap(),
            impressions: 12000,
            clicks: 340,
            conversions: 21,
            spend: 845.6,
            ctr: 2.833,
            cpc: 2.487,
            conversion_rate: 6.18,
        }
    }

    #[test]
    fn stale_panel_shows_error_and_keeps_metrics() {
        let c = campaign();
        let s = snap();
        let view = PanelView {
            state: PanelState::Stale,
            entity_id: Some("c1"),
            snapshot: Some(&s),
            error: Some("Stream connection failed: reset"),
        };
        let text = detail_panel(&c, &view);
        assert!(text.contains("Stream disconnected: Stream connection failed: reset"));
        assert!(text.contains("12,000"));
        assert!(text.contains("CPC $2.49"));
        assert!(!text.contains("Live"));
        assert!(text.contains("Meta, Other"));
        assert!(text.contains("Created: January 1, 2025"));
    }

    #[test]
    fn loading_panel_has_no_metrics_block() {
        let c = campaign();
        let view = PanelView {
            state: PanelState::Loading,
            entity_id: Some("c1"),
            snapshot: None,
            error: None,
        };
        let text = detail_panel(&c, &view);
        assert!(text.starts_with("● Live"));
        assert!(!text.contains("PERFORMANCE METRICS"));
    }

    #[test]
    fn truncates_long_names() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
