/// API route handlers, one module per resource
///
/// - `health`: health check
/// - `auth`: register, login, me, logout
/// - `tenants`: tenant read/update/list and usage
/// - `users`: tenant membership management
/// - `projects`: project CRUD
/// - `tasks`: task CRUD and status changes
///
/// Handlers receive the caller's
/// [`AuthContext`](tenantdesk_shared::auth::context::AuthContext) from the
/// auth layer and pass every target through
/// [`tenantdesk_shared::gate`] before touching storage.

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod tenants;
pub mod users;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;
use tenantdesk_shared::auth::password;
use uuid::Uuid;

/// Body returned by delete endpoints
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: Uuid,
    pub deleted: bool,
}

impl Deleted {
    pub fn new(id: Uuid) -> Self {
        Self { id, deleted: true }
    }
}

/// JSON body whose rejections render as [`ApiError`]
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// Path parameters whose rejections render as [`ApiError`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct PathParam<T>(pub T);

/// Query string whose rejections render as [`ApiError`]
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Applies the password policy, reported against the `password` field
pub(crate) fn check_password_strength(candidate: &str) -> ApiResult<()> {
    password::validate_password_strength(candidate)
        .map_err(|message| ApiError::ValidationError(vec![ValidationErrorDetail::new("password", message)]))
}

/// Rejects an update that would write nothing
pub(crate) fn ensure_not_empty(is_empty: bool) -> ApiResult<()> {
    if is_empty {
        return Err(ApiError::BadRequest("No fields to update".to_string()));
    }
    Ok(())
}
