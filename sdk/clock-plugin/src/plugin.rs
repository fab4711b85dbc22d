//! Clock plugin handlers and background status task

use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeZone};
use lantern_sdk::{
    ActionRequest, Badge, ExecuteAction, InitialRequest, Manifest, Plugin, PluginConfig,
    PluginContext, PluginStatus, ResultsUpdate, SearchRequest, SearchResult,
};
use serde_json::{json, Value};
use tracing::debug;

/// Plugin id registered with the host
pub const PLUGIN_ID: &str = "clock";

/// Time formats offered, as `(id, label, strftime pattern)`
const FORMATS: &[(&str, &str, &str)] = &[
    ("time", "Local time", "%H:%M:%S"),
    ("date", "Date", "%Y-%m-%d"),
    ("iso8601", "ISO 8601", "%Y-%m-%dT%H:%M:%S%:z"),
    ("rfc2822", "RFC 2822", "%a, %d %b %Y %H:%M:%S %z"),
    ("unix", "Unix timestamp", "%s"),
    ("week", "ISO week", "%G-W%V"),
];

/// Identity registered with the host; `t:` routes queries straight here
pub fn manifest() -> Manifest {
    Manifest::new(PLUGIN_ID, "Clock")
        .description("Current time in common formats")
        .icon("clock")
        .prefix("t:")
}

/// Render the format with id `format_id`
pub fn render<Tz>(format_id: &str, now: &DateTime<Tz>) -> Option<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    FORMATS
        .iter()
        .find(|(id, _, _)| *id == format_id)
        .map(|(_, _, pattern)| now.format(pattern).to_string())
}

/// Results for `query`, matched case-insensitively against id and label
pub fn results_for<Tz>(query: &str, now: &DateTime<Tz>) -> Vec<SearchResult>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let needle = query.trim().to_lowercase();
    FORMATS
        .iter()
        .filter(|(id, label, _)| {
            needle.is_empty() || id.contains(&needle) || label.to_lowercase().contains(&needle)
        })
        .map(|(id, label, pattern)| {
            SearchResult::new(*id, now.format(pattern).to_string())
                .description(*label)
                .icon("clock")
                .verb("Copy")
        })
        .collect()
}

async fn on_initial(ctx: PluginContext, _req: InitialRequest) -> Result<()> {
    let update = ResultsUpdate::new(results_for("", &Local::now())).placeholder("Filter formats");
    ctx.push_results(update).await?;
    Ok(())
}

async fn on_search(_ctx: PluginContext, req: SearchRequest) -> Result<Value> {
    let results = results_for(&req.query, &Local::now());
    debug!(query = %req.query, matches = results.len(), "Search");
    Ok(json!({ "results": results }))
}

async fn on_action(ctx: PluginContext, req: ActionRequest) -> Result<()> {
    let text = render(&req.item_id, &Local::now())
        .ok_or_else(|| anyhow!("unknown time format '{}'", req.item_id))?;
    ctx.execute(&ExecuteAction::Copy { text }).await?;
    ctx.execute(&ExecuteAction::Close).await?;
    Ok(())
}

/// Push the current time as a status badge every `interval`
async fn status_ticker(ctx: PluginContext, interval: Duration) -> Result<()> {
    let shutdown = ctx.shutdown_token();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => return Ok(()),
            _ = ticker.tick() => {}
        }

        let now = Local::now().format("%H:%M").to_string();
        let status = PluginStatus::new().badges(vec![Badge::text(now)]);
        if let Err(e) = ctx.push_status(&status).await {
            if e.is_connection_closed() {
                return Ok(());
            }
            return Err(e.into());
        }
    }
}

/// Assemble the plugin
pub fn build(config: PluginConfig, interval: Duration) -> Plugin {
    Plugin::builder(manifest())
        .config(config)
        .on_initial(on_initial)
        .on_search(on_search)
        .on_action(on_action)
        .task("status", move |ctx| status_ticker(ctx, interval))
        .build()
}
