use anyhow::{Context, Result};
use serde_json::json;
use tracing::{info, warn};

use crate::models::WatchHistory;
use crate::pocketbase::{list_as, Collection, Filter, ListQuery, PocketBaseApi, MAX_PER_PAGE};
use crate::session::Session;

pub const HISTORY_PER_PAGE: u32 = 50;

/// Best effort: a failed write is logged and otherwise ignored.
pub async fn record_watch(api: &dyn PocketBaseApi, session: &Session, video_id: &str) {
    let body = json!({ "user": session.user.id, "video": video_id, "progress": 0 });
    if let Err(err) = api.create(Collection::WatchHistory, body, session.token()).await {
        warn!(video_id, "Could not record watch history: {:#}", err);
    }
}

pub async fn list(api: &dyn PocketBaseApi, session: &Session) -> Result<Vec<WatchHistory>> {
    let query = ListQuery::new(1, HISTORY_PER_PAGE)
        .filter(Filter::eq("user", session.user.id.as_str()))
        .sort("-updated")
        .expand("video,video.genre");
    let list = list_as::<WatchHistory>(api, Collection::WatchHistory, &query, session.token())
        .await
        .context("Failed to load watch history")?;
    Ok(list.items)
}

/// Deletes the user's history entries one by one; returns how many went.
pub async fn clear(api: &dyn PocketBaseApi, session: &Session) -> Result<usize> {
    let query = ListQuery::new(1, MAX_PER_PAGE).filter(Filter::eq("user", session.user.id.as_str()));
    let entries = list_as::<WatchHistory>(api, Collection::WatchHistory, &query, session.token())
        .await
        .context("Failed to load watch history")?;
    let mut removed = 0;
    for entry in &entries.items {
        api.delete(Collection::WatchHistory, &entry.id, session.token())
            .await
            .with_context(|| format!("Failed to delete history entry {}", entry.id))?;
        removed += 1;
    }
    info!(user_id = %session.user.id, removed, "Cleared watch history");
    Ok(removed)
}
