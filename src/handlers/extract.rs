//! `Json` and `Query` whose rejections use the error envelope.
use axum::extract::{FromRequest, FromRequestParts};

use super::Failure;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Failure))]
pub struct JsonBody<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(Failure))]
pub struct QueryParams<T>(pub T);
