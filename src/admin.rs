use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::{User, Video};
use crate::pocketbase::{list_as, Collection, ListQuery, PocketBaseApi};
use crate::session::Session;

pub const RECENT_LIMIT: u32 = 5;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub videos: u64,
    pub users: u64,
    pub genres: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub section: String,
    pub stats: DashboardStats,
    pub recent_videos: Vec<Video>,
    pub recent_users: Vec<User>,
}

async fn count(api: &dyn PocketBaseApi, collection: Collection, token: Option<&str>) -> Result<u64> {
    let page = api
        .list(collection, &ListQuery::new(1, 1), token)
        .await
        .with_context(|| format!("Failed to count {}", collection.as_str()))?;
    Ok(page.total_items)
}

/// Callers check the admin role first.
pub async fn load_dashboard(api: &dyn PocketBaseApi, session: &Session, section: &str) -> Result<Dashboard> {
    let token = session.token();
    let recent = ListQuery::new(1, RECENT_LIMIT).sort("-created");
    let (videos, users, genres, recent_videos, recent_users) = tokio::try_join!(
        count(api, Collection::Videos, token),
        count(api, Collection::Users, token),
        count(api, Collection::Genres, token),
        list_as::<Video>(api, Collection::Videos, &recent, token),
        list_as::<User>(api, Collection::Users, &recent, token),
    )?;
    Ok(Dashboard {
        section: section.to_string(),
        stats: DashboardStats { videos, users, genres },
        recent_videos: recent_videos.items,
        recent_users: recent_users.items,
    })
}
