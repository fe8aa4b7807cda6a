//! Session extractors resolving `Authorization: Bearer <token>`.
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::authorization::Bearer;
use headers::Authorization;
use std::convert::Infallible;
use tracing::warn;

use super::Failure;
use crate::app::AppState;
use crate::session::{resolve, Session};

/// The caller's session, if the request carries a valid token.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Option<Session>);

impl CurrentSession {
    /// The session, or a "Sign in to {action}" failure.
    pub fn require(self, action: &str) -> Result<Session, Failure> {
        self.0.ok_or_else(|| Failure::sign_in_required(action))
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Ok(TypedHeader(Authorization(bearer))) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await
        else {
            return Ok(CurrentSession(None));
        };
        let session = resolve(state.api.as_ref(), &state.sessions, bearer.token()).await;
        Ok(CurrentSession(session))
    }
}

/// Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct SignedIn(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for SignedIn {
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = match CurrentSession::from_request_parts(parts, state).await {
            Ok(current) => current,
            Err(never) => match never {},
        };
        session
            .map(SignedIn)
            .ok_or_else(|| Failure::sign_in_required("continue"))
    }
}

/// 401 when anonymous, 403 when signed in without the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Session);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let SignedIn(session) = SignedIn::from_request_parts(parts, state).await?;
        if !session.user.is_admin() {
            warn!(user_id = %session.user.id, path = %parts.uri.path(), "Non-admin tried the admin area");
            return Err(Failure::access_denied());
        }
        Ok(RequireAdmin(session))
    }
}
