//! Request extractors
//!
//! Wrappers over axum's `Json`, `Path` and `Query` whose rejections become
//! [`ServiceError::Validation`], so malformed bodies and ids get the same
//! `{"error": ..}` body as every other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ServiceError;

/// JSON request body.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ServiceError))]
pub struct AppJson<T>(pub T);

/// Typed path segment, e.g. the `:id` in `/products/:id`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ServiceError))]
pub struct AppPath<T>(pub T);

/// Query string parameters.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ServiceError))]
pub struct AppQuery<T>(pub T);
