//! Everything the watch page shows for one video.
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, warn};

use crate::comments;
use crate::episodes::{group_by_season, select_current, series_episodes};
use crate::favorites;
use crate::history;
use crate::models::{Comment, Episode, Video, View};
use crate::pocketbase::{get_as, list_as, Collection, Filter, ListQuery, PocketBaseApi};
use crate::ratings::{load_stats, RatingStats};
use crate::session::Session;

pub const RELATED_LIMIT: u32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchView {
    pub video: Video,
    pub seasons: BTreeMap<u32, Vec<Episode>>,
    pub current_episode: Option<Episode>,
    pub comments: Vec<Comment>,
    pub related: Vec<Video>,
    pub ratings: Option<RatingStats>,
    pub is_favorite: bool,
}

async fn related_videos(api: &dyn PocketBaseApi, video: &Video) -> Result<Vec<Video>> {
    let Some(first_genre) = video.genre.first() else {
        return Ok(Vec::new());
    };
    let query = ListQuery::new(1, RELATED_LIMIT)
        .filter(Filter::and([
            Filter::contains("genre", first_genre.as_str()),
            Filter::not_eq("id", video.id.as_str()),
        ]))
        .sort("-created")
        .expand("genre");
    Ok(list_as::<Video>(api, Collection::Videos, &query, None).await?.items)
}

async fn record_view(api: &dyn PocketBaseApi, session: &Session, video_id: &str, episode: Option<&str>) {
    let view = View {
        video: video_id.to_string(),
        episodes: episode.map(str::to_string),
        user: session.user.id.clone(),
        session: Utc::now().timestamp_millis().to_string(),
    };
    let body = match serde_json::to_value(&view) {
        Ok(body) => body,
        Err(err) => {
            warn!(video_id, "Could not encode view: {}", err);
            return;
        }
    };
    if let Err(err) = api.create(Collection::Views, body, session.token()).await {
        warn!(video_id, "Could not record view: {:#}", err);
    }
}

/// Only a failure to load the video itself is an error; the surrounding
/// sections degrade to empty.
pub async fn load_watch(
    api: &dyn PocketBaseApi,
    video_id: &str,
    episode_id: Option<&str>,
    session: Option<&Session>,
) -> Result<WatchView> {
    let token = session.and_then(Session::token);
    let video: Video = get_as(api, Collection::Videos, video_id, Some("genre,createdBy"), token)
        .await
        .with_context(|| format!("Failed to load video {video_id}"))?;

    let (mut seasons, mut current_episode) = (BTreeMap::new(), None);
    if video.is_series() {
        match series_episodes(api, &video.id).await {
            Ok(episodes) => {
                current_episode = select_current(&episodes, episode_id).cloned();
                seasons = group_by_season(episodes);
            }
            Err(err) => error!("{:#}", err),
        }
    }

    let comments = comments::list(api, &video.id).await.unwrap_or_else(|err| {
        error!("{:#}", err);
        Vec::new()
    });
    let related = related_videos(api, &video).await.unwrap_or_else(|err| {
        error!(video_id, "Failed to load related videos: {:#}", err);
        Vec::new()
    });
    let ratings = match load_stats(api, &video.id, session).await {
        Ok(stats) => Some(stats),
        Err(err) => {
            error!("{:#}", err);
            None
        }
    };

    let mut is_favorite = false;
    if let Some(session) = session {
        is_favorite = favorites::is_favorite(api, session, &video.id)
            .await
            .unwrap_or_else(|err| {
                warn!(video_id, "Could not check favorite: {:#}", err);
                false
            });
        history::record_watch(api, session, &video.id).await;
        record_view(api, session, &video.id, current_episode.as_ref().map(|e| e.id.as_str())).await;
    }

    Ok(WatchView {
        video,
        seasons,
        current_episode,
        comments,
        related,
        ratings,
        is_favorite,
    })
}
