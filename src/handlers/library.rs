use axum::extract::{Path, State};
use serde_json::json;

use super::auth::SignedIn;
use super::{ok, ok_with, Failure, HandlerResult};
use crate::app::AppState;
use crate::notify::Notification;
use crate::{favorites, history};

pub async fn favorites(State(state): State<AppState>, SignedIn(session): SignedIn) -> HandlerResult {
    let items = favorites::list(state.api.as_ref(), &session)
        .await
        .map_err(|e| Failure::from_error("Could not load favorites", &e))?;
    Ok(ok(items))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    Path(favorite_id): Path<String>,
) -> HandlerResult {
    favorites::remove_by_id(state.api.as_ref(), &session, &favorite_id)
        .await
        .map_err(|e| Failure::from_error("Could not remove favorite", &e))?;
    Ok(ok_with(
        json!({ "removed": favorite_id }),
        Notification::info("Removed from favorites", "The video was removed from your favorites"),
    ))
}

pub async fn history(State(state): State<AppState>, SignedIn(session): SignedIn) -> HandlerResult {
    let items = history::list(state.api.as_ref(), &session)
        .await
        .map_err(|e| Failure::from_error("Could not load watch history", &e))?;
    Ok(ok(items))
}

pub async fn clear_history(State(state): State<AppState>, SignedIn(session): SignedIn) -> HandlerResult {
    let removed = history::clear(state.api.as_ref(), &session)
        .await
        .map_err(|e| Failure::from_error("Could not clear watch history", &e))?;
    Ok(ok_with(
        json!({ "removed": removed }),
        Notification::info("History cleared", "Your watch history is empty"),
    ))
}
