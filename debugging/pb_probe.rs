//! List records from a backend collection and print each as pretty JSON on its own line.
//! Usage:
//!   cargo run --bin pb_probe -- videos
//!   cargo run --bin pb_probe -- episodes abc123 season,episodeNumber
//! The optional second argument keeps only records whose JSON contains it.
//! Uses POCKETBASE_URL from the environment (.env supported).

use anyhow::{Context, Result};
use cinemax::config::Config;
use cinemax::pocketbase::{Collection, ListQuery, PocketBaseApi, PocketBaseClient};
use dotenvy::dotenv;
use std::env;

const PROBE_LIMIT: u32 = 20;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present for local runs.
    dotenv().ok();

    let mut args = env::args().skip(1);
    let collection: Collection = args
        .next()
        .context("Usage: pb_probe <collection> [contains] [sort]")?
        .parse()?;
    let needle = args.next().filter(|f| !f.trim().is_empty());
    let sort = args.next();

    let config = Config::from_env()?;
    let client = PocketBaseClient::new(&config.pocketbase_url, config.http_timeout)?;

    let mut query = ListQuery::new(1, PROBE_LIMIT);
    if let Some(sort) = &sort {
        query = query.sort(sort);
    }
    let token = env::var("POCKETBASE_TOKEN").ok();
    let mut page = client
        .list(collection, &query, token.as_deref())
        .await
        .with_context(|| format!("Failed to list {}", collection.as_str()))?;

    if let Some(needle) = &needle {
        page.items.retain(|item| item.to_string().contains(needle.as_str()));
    }

    println!(
        "{}: {} of {} records",
        collection.as_str(),
        page.items.len(),
        page.total_items
    );
    for item in page.items {
        let pretty = serde_json::to_string_pretty(&item)
            .context("Failed to render record as JSON")?;
        println!("{}", pretty);
    }

    Ok(())
}
