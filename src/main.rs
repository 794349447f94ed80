use std::io::Write;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde_json::json;

use campaignpulse::api::{CampaignApi, HttpApi};
use campaignpulse::config::Config;
use campaignpulse::dashboard::{Dashboard, StatusFilter};
use campaignpulse::insights::HttpInsightsClient;
use campaignpulse::logging::{log, obj, v_str, Domain, Level};
use campaignpulse::panel::{Outcome, PanelController, PanelState};
use campaignpulse::render;

const USAGE: &str = "usage:\n  campaignpulse overview [all|active|paused|completed]\n  campaignpulse watch <campaign-id>";

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("overview");

    log(
        Level::Info,
        Domain::System,
        "startup",
        obj(&[("api_base", v_str(&cfg.api_base)), ("command", v_str(cmd))]),
    );

    let api = HttpApi::new(&cfg).context("building api client")?;
    let insights = HttpInsightsClient::new(api.clone());

    match cmd {
        "overview" => {
            let filter = match args.get(2) {
                Some(raw) => raw.parse::<StatusFilter>().map_err(anyhow::Error::msg)?,
                None => StatusFilter::All,
            };
            overview(&api, &insights, filter).await
        }
        "watch" => {
            let Some(id) = args.get(2) else {
                bail!("missing campaign id\n{}", USAGE);
            };
            watch(&api, insights, id).await
        }
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    }
}

async fn overview(api: &HttpApi, insights: &HttpInsightsClient, filter: StatusFilter) -> Result<()> {
    let dash = Dashboard::load(api, insights).await?;
    println!("{}", render::overview_cards(&dash.aggregate));
    println!("{}", render::campaign_table(&dash, filter));
    Ok(())
}

async fn watch(api: &HttpApi, insights: HttpInsightsClient, id: &str) -> Result<()> {
    let campaign = api
        .get_campaign(id)
        .await
        .with_context(|| format!("loading campaign {}", id))?;

    let mut panel = PanelController::new(Arc::new(insights));
    panel.select(&campaign.id);
    redraw(&render::detail_panel(&campaign, &panel.view()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log(Level::Info, Domain::System, "shutdown", obj(&[("reason", json!("ctrl_c"))]));
                panel.shutdown();
                return Ok(());
            }
            outcome = panel.process_next() => {
                if let Outcome::Applied(state) = outcome {
                    redraw(&render::detail_panel(&campaign, &panel.view()));
                    if state == PanelState::Stale {
                        // no reconnect: a new watch is needed to resume
                        panel.shutdown();
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn redraw(frame: &str) {
    let mut out = std::io::stdout();
    let _ = write!(out, "\x1b[2J\x1b[H{}", frame);
    let _ = out.flush();
}
