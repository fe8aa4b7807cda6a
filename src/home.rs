use anyhow::Result;
use serde::Serialize;
use tracing::error;

use crate::models::{Video, VideoKind};
use crate::pocketbase::{list_as, Collection, Filter, ListQuery, PocketBaseApi};

pub const HOME_ROW: u32 = 8;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub movies: Vec<Video>,
    pub series: Vec<Video>,
}

async fn newest(api: &dyn PocketBaseApi, kind: VideoKind) -> Result<Vec<Video>> {
    let query = ListQuery::new(1, HOME_ROW)
        .filter(Filter::eq("type", kind.as_wire()))
        .sort("-created")
        .expand("genre,createdBy");
    Ok(list_as::<Video>(api, Collection::Videos, &query, None).await?.items)
}

/// Both rows load concurrently; a failing row comes back empty.
pub async fn load(api: &dyn PocketBaseApi) -> HomeView {
    let (movies, series) = tokio::join!(newest(api, VideoKind::Movie), newest(api, VideoKind::Series));
    let or_empty = |row: Result<Vec<Video>>, what: &str| {
        row.unwrap_or_else(|err| {
            error!("Failed to load {}: {:#}", what, err);
            Vec::new()
        })
    };
    HomeView {
        movies: or_empty(movies, "newest movies"),
        series: or_empty(series, "newest series"),
    }
}
