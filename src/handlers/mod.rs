//! HTTP handlers and the JSON envelope every view travels in.
//!
//! Success: `{"status":"ok","data":...,"notification"?:...}`.
//! Failure: `{"status":"error","notification":{...}}` with a matching status
//! code. Handlers never bubble errors up to axum.
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::comments::CommentError;
use crate::favorites::FavoriteError;
use crate::notify::Notification;
use crate::pocketbase::api_error;
use crate::ratings::RatingError;
use crate::session::RegistrationError;

pub mod account;
pub mod admin;
pub mod auth;
pub mod catalog;
pub mod extract;
pub mod library;
pub mod watch;

#[derive(Debug, Serialize)]
struct Envelope<T: Serialize> {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification: Option<Notification>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    Json(Envelope {
        status: "ok",
        data: Some(data),
        notification: None,
    })
    .into_response()
}

pub fn ok_with<T: Serialize>(data: T, notification: Notification) -> Response {
    Json(Envelope {
        status: "ok",
        data: Some(data),
        notification: Some(notification),
    })
    .into_response()
}

/// A failed request, already shaped for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub status: StatusCode,
    pub notification: Notification,
}

pub type HandlerResult = Result<Response, Failure>;

impl Failure {
    pub fn new(status: StatusCode, notification: Notification) -> Self {
        Self {
            status,
            notification,
        }
    }

    pub fn bad_request(title: &str, description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, Notification::error(title, description))
    }

    pub fn sign_in_required(action: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, Notification::sign_in_required(action))
    }

    pub fn access_denied() -> Self {
        Self::new(StatusCode::FORBIDDEN, Notification::access_denied())
    }

    pub fn not_found() -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            Notification::error("Page not found", "The page you are looking for does not exist"),
        )
    }

    /// Logs the failure and turns it into a notification. Validation errors
    /// keep their own message; backend errors keep their status class.
    pub fn from_error(title: &str, err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<CommentError>() {
            return Self::bad_request(title, e.to_string());
        }
        if let Some(e) = err.downcast_ref::<RatingError>() {
            return Self::bad_request(title, e.to_string());
        }
        if let Some(e) = err.downcast_ref::<RegistrationError>() {
            return Self::bad_request(title, e.to_string());
        }
        if let Some(e) = err.downcast_ref::<FavoriteError>() {
            return Self::new(StatusCode::FORBIDDEN, Notification::error(title, e.to_string()));
        }
        error!("{}: {:#}", title, err);
        let status = match api_error(err) {
            Some(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Some(e) if e.status == 401 => {
                return Self::new(
                    StatusCode::UNAUTHORIZED,
                    Notification::error(title, "Your session has expired. Please sign in again"),
                );
            }
            Some(e) if e.status == 403 => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, Notification::error(title, "Please try again later"))
    }
}

impl From<JsonRejection> for Failure {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            rejection.status(),
            Notification::error("Invalid request", rejection.body_text()),
        )
    }
}

impl From<QueryRejection> for Failure {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            rejection.status(),
            Notification::error("Invalid request", rejection.body_text()),
        )
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            status: "error",
            data: None,
            notification: Some(self.notification),
        };
        (self.status, Json(body)).into_response()
    }
}
