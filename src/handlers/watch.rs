use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::json;

use super::auth::CurrentSession;
use super::extract::JsonBody;
use super::{ok, ok_with, Failure, HandlerResult};
use crate::app::AppState;
use crate::comments;
use crate::favorites::{self, Toggled};
use crate::notify::{stars_phrase, Notification};
use crate::ratings::{load_stats, remove_rating, submit_rating, Stars};
use crate::watch::load_watch;

#[derive(Debug, Deserialize)]
pub struct RatingForm {
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub content: String,
}

pub async fn watch(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> HandlerResult {
    let view = load_watch(state.api.as_ref(), &id, None, session.as_ref())
        .await
        .map_err(|e| Failure::from_error("Could not load the video", &e))?;
    Ok(ok(view))
}

pub async fn watch_episode(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path((id, episode_id)): Path<(String, String)>,
) -> HandlerResult {
    let view = load_watch(state.api.as_ref(), &id, Some(&episode_id), session.as_ref())
        .await
        .map_err(|e| Failure::from_error("Could not load the video", &e))?;
    Ok(ok(view))
}

pub async fn ratings(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> HandlerResult {
    let stats = load_stats(state.api.as_ref(), &id, session.as_ref())
        .await
        .map_err(|e| Failure::from_error("Could not load ratings", &e))?;
    Ok(ok(stats))
}

/// Anonymous callers are turned away before any backend call.
pub async fn rate(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
    JsonBody(form): JsonBody<RatingForm>,
) -> HandlerResult {
    let session = current.require("rate this video")?;
    let stars = Stars::new(form.rating)
        .map_err(|e| Failure::bad_request("Invalid rating", e.to_string()))?;
    let outcome = submit_rating(state.api.as_ref(), &state.locks, &session, &id, stars)
        .await
        .map_err(|e| Failure::from_error("Could not save your rating", &e))?;
    let notification = Notification::info(outcome.kind.title(), stars_phrase(stars.get()));
    Ok(ok_with(outcome, notification))
}

pub async fn unrate(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> HandlerResult {
    let session = current.require("rate this video")?;
    let stats = remove_rating(state.api.as_ref(), &session, &id)
        .await
        .map_err(|e| Failure::from_error("Could not remove your rating", &e))?;
    match stats {
        Some(stats) => Ok(ok_with(stats, Notification::info("Rating removed", "Your rating was removed"))),
        None => Err(Failure::new(
            axum::http::StatusCode::NOT_FOUND,
            Notification::error("Nothing to remove", "You have not rated this video"),
        )),
    }
}

pub async fn toggle_favorite(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
) -> HandlerResult {
    let session = current.require("add videos to favorites")?;
    let toggled = favorites::toggle(state.api.as_ref(), &state.locks, &session, &id)
        .await
        .map_err(|e| Failure::from_error("Could not update favorites", &e))?;
    let notification = match toggled {
        Toggled::Added => Notification::info("Added to favorites", "The video was added to your favorites"),
        Toggled::Removed => {
            Notification::info("Removed from favorites", "The video was removed from your favorites")
        }
    };
    Ok(ok_with(
        json!({ "result": toggled, "isFavorite": toggled == Toggled::Added }),
        notification,
    ))
}

pub async fn post_comment(
    State(state): State<AppState>,
    current: CurrentSession,
    Path(id): Path<String>,
    JsonBody(form): JsonBody<CommentForm>,
) -> HandlerResult {
    let session = current.require("leave comments")?;
    let comment = comments::post(state.api.as_ref(), &session, &id, &form.content)
        .await
        .map_err(|e| Failure::from_error("Could not post comment", &e))?;
    Ok(ok_with(comment, Notification::info("Comment posted", "Thanks for sharing")))
}
