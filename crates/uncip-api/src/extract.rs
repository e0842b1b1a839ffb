//! Request extractors whose rejections render as [`ApiError`].
//!
//! Drop-in replacements for axum's `Json`, `Path` and `Query`: a malformed
//! body, path segment or query string becomes a 400 with the usual JSON
//! `{ "error": ... }` body.

use axum::{
  extract::{FromRequest, FromRequestParts},
  response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response { axum::Json(self.0).into_response() }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct Path<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct Query<T>(pub T);
