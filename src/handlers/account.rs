use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::auth::{CurrentSession, SignedIn};
use super::extract::JsonBody;
use super::{ok, ok_with, Failure, HandlerResult};
use crate::app::AppState;
use crate::models::User;
use crate::notify::Notification;
use crate::preferences::UserSettings;
use crate::session::{self, AuthError, ProfileUpdate, RegistrationForm, Session};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
struct SignedInView<'a> {
    token: &'a str,
    user: &'a User,
}

fn signed_in(session: &Session, notification: Notification) -> axum::response::Response {
    ok_with(
        SignedInView {
            token: &session.token,
            user: &session.user,
        },
        notification,
    )
}

fn auth_failure(title: &str, err: AuthError) -> Failure {
    let status = match err {
        AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
        AuthError::Rejected(_) => StatusCode::UNAUTHORIZED,
    };
    Failure::new(status, Notification::error(title, err.to_string()))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginForm>,
) -> HandlerResult {
    let session = session::sign_in(state.api.as_ref(), &state.sessions, &form.email, &form.password)
        .await
        .map_err(|e| auth_failure("Sign in failed", e))?;
    let welcome = format!("Welcome back, {}", session.user.display_name());
    Ok(signed_in(&session, Notification::info("Signed in", welcome)))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<RegistrationForm>,
) -> HandlerResult {
    let session = session::sign_up(state.api.as_ref(), &state.sessions, &form)
        .await
        .map_err(|e| auth_failure("Registration failed", e))?;
    Ok(signed_in(
        &session,
        Notification::info("Account created", "Welcome to CinemaMax"),
    ))
}

pub async fn logout(State(state): State<AppState>, CurrentSession(current): CurrentSession) -> HandlerResult {
    if let Some(current) = current {
        session::sign_out(&state.sessions, &current.token).await;
    }
    Ok(ok_with(
        json!({ "signedOut": true }),
        Notification::info("Signed out", "See you soon"),
    ))
}

pub async fn profile(SignedIn(session): SignedIn) -> HandlerResult {
    Ok(ok(session.user))
}

pub async fn update_profile(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> HandlerResult {
    if update.username.trim().is_empty() {
        return Err(Failure::bad_request("Profile not saved", "Username cannot be empty"));
    }
    let user = session::update_profile(state.api.as_ref(), &state.sessions, &session, &update)
        .await
        .map_err(|e| Failure::from_error("Profile not saved", &e))?;
    Ok(ok_with(user, Notification::info("Profile updated", "Your changes have been saved")))
}

pub async fn settings(State(state): State<AppState>, SignedIn(session): SignedIn) -> HandlerResult {
    Ok(ok(state.settings.get(&session.user.id).await))
}

pub async fn save_settings(
    State(state): State<AppState>,
    SignedIn(session): SignedIn,
    JsonBody(settings): JsonBody<UserSettings>,
) -> HandlerResult {
    let saved = state
        .settings
        .save(&session.user.id, settings)
        .await
        .map_err(|e| Failure::from_error("Settings not saved", &e))?;
    Ok(ok_with(saved, Notification::info("Settings saved", "Your preferences have been updated")))
}
