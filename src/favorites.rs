use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::models::Favorite;
use crate::pocketbase::{find_first, get_as, list_as, Collection, Filter, ListQuery, PocketBaseApi};
use crate::session::Session;
use crate::upsert::{
    pair_filter, pair_key, upsert_unique, upsert_while_locked, KeyedLocks, UniqueWrite,
};

pub const FAVORITES_PER_PAGE: u32 = 50;
const FAVORITE_EXPAND: &str = "video,video.genre";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FavoriteError {
    #[error("This favorite belongs to another user")]
    NotOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggled {
    Added,
    Removed,
}

pub async fn find(
    api: &dyn PocketBaseApi,
    session: &Session,
    video_id: &str,
) -> Result<Option<Favorite>> {
    find_first(
        api,
        Collection::Favorites,
        pair_filter(&session.user.id, video_id),
        session.token(),
    )
    .await
}

pub async fn is_favorite(api: &dyn PocketBaseApi, session: &Session, video_id: &str) -> Result<bool> {
    Ok(find(api, session, video_id).await?.is_some())
}

fn favorite_write(session: &Session, video_id: &str) -> UniqueWrite {
    UniqueWrite::for_pair(
        Collection::Favorites,
        &session.user.id,
        video_id,
        json!({ "video": video_id, "user": session.user.id }),
    )
}

/// Adding twice leaves a single record.
pub async fn add(
    api: &dyn PocketBaseApi,
    locks: &KeyedLocks,
    session: &Session,
    video_id: &str,
) -> Result<()> {
    upsert_unique(api, locks, favorite_write(session, video_id), session.token())
        .await
        .with_context(|| format!("Failed to add video {video_id} to favorites"))?;
    info!(video_id, user_id = %session.user.id, "Added favorite");
    Ok(())
}

pub async fn remove(api: &dyn PocketBaseApi, session: &Session, video_id: &str) -> Result<bool> {
    let Some(existing) = find(api, session, video_id).await? else {
        return Ok(false);
    };
    api.delete(Collection::Favorites, &existing.id, session.token())
        .await
        .with_context(|| format!("Failed to remove favorite {}", existing.id))?;
    info!(video_id, user_id = %session.user.id, "Removed favorite");
    Ok(true)
}

/// The whole check-then-write runs under the pair's lock.
pub async fn toggle(
    api: &dyn PocketBaseApi,
    locks: &KeyedLocks,
    session: &Session,
    video_id: &str,
) -> Result<Toggled> {
    let lock = locks
        .lock_for(&pair_key(Collection::Favorites, &session.user.id, video_id))
        .await;
    let _guard = lock.lock().await;

    if remove(api, session, video_id).await? {
        return Ok(Toggled::Removed);
    }
    upsert_while_locked(api, favorite_write(session, video_id), session.token())
        .await
        .with_context(|| format!("Failed to add video {video_id} to favorites"))?;
    info!(video_id, user_id = %session.user.id, "Added favorite");
    Ok(Toggled::Added)
}

pub async fn list(api: &dyn PocketBaseApi, session: &Session) -> Result<Vec<Favorite>> {
    let query = ListQuery::new(1, FAVORITES_PER_PAGE)
        .filter(Filter::eq("user", session.user.id.as_str()))
        .sort("-created")
        .expand(FAVORITE_EXPAND);
    let list = list_as::<Favorite>(api, Collection::Favorites, &query, session.token())
        .await
        .context("Failed to load favorites")?;
    Ok(list.items)
}

/// Deletes a favorite by its own id, refusing records owned by someone else.
pub async fn remove_by_id(api: &dyn PocketBaseApi, session: &Session, favorite_id: &str) -> Result<()> {
    let favorite: Favorite = get_as(api, Collection::Favorites, favorite_id, None, session.token())
        .await
        .with_context(|| format!("Failed to load favorite {favorite_id}"))?;
    if favorite.user != session.user.id {
        warn!(favorite_id, user_id = %session.user.id, "Refused to remove another user's favorite");
        return Err(FavoriteError::NotOwner.into());
    }
    api.delete(Collection::Favorites, favorite_id, session.token())
        .await
        .with_context(|| format!("Failed to remove favorite {favorite_id}"))?;
    info!(favorite_id, user_id = %session.user.id, "Removed favorite by id");
    Ok(())
}
