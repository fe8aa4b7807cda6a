use axum::extract::{Path, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::CurrentSession;
use super::extract::QueryParams;
use super::{ok, ok_with, Failure, HandlerResult};
use crate::app::AppState;
use crate::episodes::{group_by_season, series_episodes};
use crate::notify::Notification;
use crate::routes::{authorize, AccessDecision, Route};
use crate::search::{
    movies_page, search_page, series_page, year_options, CatalogPage, CatalogSort, SearchFilters,
    SearchParams,
};
use crate::{genres, home};

#[derive(Debug, Deserialize)]
pub struct ResolveParams {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolvedRoute {
    route: Route,
    access: crate::routes::Access,
    decision: AccessDecision,
}

pub async fn health() -> &'static str {
    "OK"
}

/// Routing answers are always 200; the decision says what to render.
pub async fn resolve(
    CurrentSession(session): CurrentSession,
    QueryParams(params): QueryParams<ResolveParams>,
) -> HandlerResult {
    let route = Route::resolve(&params.path);
    let decision = authorize(&route, session.as_ref().map(|s| &s.user));
    let notification = match &decision {
        AccessDecision::Allowed => None,
        AccessDecision::SignInRequired { .. } => {
            Some(Notification::sign_in_required("view this page"))
        }
        AccessDecision::Denied => Some(Notification::access_denied()),
    };
    let view = ResolvedRoute {
        access: route.access(),
        route,
        decision,
    };
    Ok(match notification {
        Some(n) => ok_with(view, n),
        None => ok(view),
    })
}

pub async fn home(State(state): State<AppState>) -> HandlerResult {
    Ok(ok(home::load(state.api.as_ref()).await))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogView {
    #[serde(flatten)]
    page: CatalogPage,
    years: Vec<i32>,
}

fn catalog(page: CatalogPage) -> CatalogView {
    CatalogView {
        page,
        years: year_options(Utc::now().date_naive()),
    }
}

pub async fn movies(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> HandlerResult {
    let filters = SearchFilters::from_params(&params);
    let sort = CatalogSort::parse(params.sort.as_deref());
    let page = movies_page(state.api.as_ref(), &filters, sort, params.page.unwrap_or(1))
        .await
        .map_err(|e| Failure::from_error("Could not load movies", &e))?;
    Ok(ok(catalog(page)))
}

pub async fn series(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> HandlerResult {
    let filters = SearchFilters::from_params(&params);
    let page = series_page(state.api.as_ref(), &filters, params.page.unwrap_or(1))
        .await
        .map_err(|e| Failure::from_error("Could not load series", &e))?;
    Ok(ok(catalog(page)))
}

pub async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
) -> HandlerResult {
    let filters = SearchFilters::from_params(&params);
    let page = search_page(state.api.as_ref(), &filters, params.page.unwrap_or(1))
        .await
        .map_err(|e| Failure::from_error("Search failed", &e))?;
    Ok(ok(catalog(page)))
}

pub async fn episodes(State(state): State<AppState>, Path(id): Path<String>) -> HandlerResult {
    let episodes = series_episodes(state.api.as_ref(), &id)
        .await
        .map_err(|e| Failure::from_error("Could not load episodes", &e))?;
    Ok(ok(json!({
        "total": episodes.len(),
        "seasons": group_by_season(episodes),
    })))
}

pub async fn genres(State(state): State<AppState>) -> HandlerResult {
    let sections = genres::load_index(state.api.as_ref())
        .await
        .map_err(|e| Failure::from_error("Could not load genres", &e))?;
    Ok(ok(sections))
}

pub async fn not_found() -> Failure {
    Failure::not_found()
}
