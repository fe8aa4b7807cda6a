use anyhow::{Context, Result};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error};

use crate::models::{Genre, Video};
use crate::pocketbase::{list_as, Collection, Filter, ListQuery, PocketBaseApi};

pub const GENRES_LIMIT: u32 = 50;
pub const VIDEOS_PER_GENRE: u32 = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreSection {
    pub genre: Genre,
    pub videos: Vec<Video>,
    pub movie_count: usize,
    pub series_count: usize,
}

impl GenreSection {
    fn new(genre: Genre, videos: Vec<Video>) -> Self {
        let series_count = videos.iter().filter(|v| v.is_series()).count();
        Self {
            movie_count: videos.len() - series_count,
            series_count,
            genre,
            videos,
        }
    }
}

async fn videos_in(api: &dyn PocketBaseApi, genre: &Genre) -> Vec<Video> {
    let query = ListQuery::new(1, VIDEOS_PER_GENRE)
        .filter(Filter::contains("genre", genre.id.as_str()))
        .sort("-created");
    match list_as::<Video>(api, Collection::Videos, &query, None).await {
        Ok(list) => list.items,
        Err(err) => {
            error!(genre = %genre.title, "Failed to load videos for genre: {:#}", err);
            Vec::new()
        }
    }
}

/// Genres by title, each with its newest videos.
pub async fn load_index(api: &dyn PocketBaseApi) -> Result<Vec<GenreSection>> {
    let query = ListQuery::new(1, GENRES_LIMIT).sort("title");
    let genres = list_as::<Genre>(api, Collection::Genres, &query, None)
        .await
        .context("Failed to load genres")?
        .items;
    debug!(count = genres.len(), "Loaded genres");

    let videos = join_all(genres.iter().map(|g| videos_in(api, g))).await;
    Ok(genres
        .into_iter()
        .zip(videos)
        .map(|(genre, videos)| GenreSection::new(genre, videos))
        .collect())
}
