//! Display helpers shared by the text views.

use chrono::{DateTime, Utc};

use crate::api::CampaignStatus;

/// Inserts `,` every three digits of an unsigned integer string.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Whole US dollars: `1234.5 -> "$1,235"`, `-50.0 -> "-$50"`.
pub fn format_currency(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    if rounded < 0.0 {
        format!("-${}", group_thousands(&digits))
    } else {
        format!("${}", group_thousands(&digits))
    }
}

/// Grouped, at most three fraction digits, trailing zeros dropped.
pub fn format_number(value: f64) -> String {
    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');

    let mut out = String::new();
    if value < 0.0 && (int_part != "0" || !frac.is_empty()) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

pub fn format_count(value: u64) -> String {
    group_thousands(&value.to_string())
}

pub fn format_percentage(value: f64) -> String {
    format!("{:.2}%", value)
}

pub fn format_cpc(value: f64) -> String {
    format!("${:.2}", value)
}

pub fn format_date(ts: &DateTime<Utc>) -> String {
    ts.format("%B %-d, %Y").to_string()
}

pub fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%H:%M:%S UTC").to_string()
}

pub fn status_label(status: CampaignStatus) -> &'static str {
    match status {
        CampaignStatus::Active => "Active",
        CampaignStatus::Paused => "Paused",
        CampaignStatus::Completed => "Completed",
    }
}

pub fn platform_label(platform: &str) -> &'static str {
    match platform {
        "meta" => "Meta",
        "google" => "Google",
        "linkedin" => "LinkedIn",
        _ => "Other",
    }
}
