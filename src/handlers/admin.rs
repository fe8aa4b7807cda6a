use axum::extract::{Path, State};

use super::auth::RequireAdmin;
use super::{ok, Failure, HandlerResult};
use crate::admin::load_dashboard;
use crate::app::AppState;
use crate::session::Session;

pub async fn dashboard(State(state): State<AppState>, RequireAdmin(session): RequireAdmin) -> HandlerResult {
    section_view(&state, &session, "").await
}

pub async fn section(
    State(state): State<AppState>,
    RequireAdmin(session): RequireAdmin,
    Path(rest): Path<String>,
) -> HandlerResult {
    section_view(&state, &session, &rest).await
}

async fn section_view(state: &AppState, session: &Session, section: &str) -> HandlerResult {
    let dashboard = load_dashboard(state.api.as_ref(), session, section)
        .await
        .map_err(|e| Failure::from_error("Could not load the dashboard", &e))?;
    Ok(ok(dashboard))
}
