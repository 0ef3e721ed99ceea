/// Authentication endpoints
///
/// - `POST /v1/auth/register`: create a tenant and its first admin
/// - `POST /v1/auth/login`: exchange credentials for a token
/// - `GET /v1/auth/me`: the caller's user and tenant
/// - `POST /v1/auth/logout`: revoke the presented token

use super::{check_password_strength, JsonBody};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenantdesk_shared::{
    auth::{context::AuthContext, jwt, password, policy::Action},
    gate::{self, GateError},
    models::{
        revoked_token::RevokedToken,
        tenant::{CreateTenant, SubscriptionPlan, Tenant, TenantStatus},
        user::{normalize_email, CreateUser, Role, User},
    },
    scope::{ResourceKind, ResourceRef},
};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Tenant name must be 1-255 characters"))]
    pub tenant_name: String,

    /// Lowercase letters, digits and hyphens; checked by [`is_valid_subdomain`]
    pub subdomain: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Full name must be 1-255 characters"))]
    pub full_name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token plus the identity it was issued for
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: User,
    pub tenant: Tenant,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub tenant: Tenant,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: &'static str,
}

/// Subdomain label: 3-63 characters of `[a-z0-9-]`, no leading or
/// trailing hyphen
pub fn is_valid_subdomain(subdomain: &str) -> bool {
    let len = subdomain.len();
    (3..=63).contains(&len)
        && subdomain
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !subdomain.starts_with('-')
        && !subdomain.ends_with('-')
}

fn issue_session(state: &AppState, user: User, tenant: Tenant) -> ApiResult<SessionResponse> {
    let ttl = state.config.token_ttl();
    let token = jwt::issue(user.id, tenant.id, user.role, ttl, state.jwt_secret())?;

    Ok(SessionResponse {
        token,
        token_type: "Bearer",
        expires_at: Utc::now() + ttl,
        user,
        tenant,
    })
}

/// Registers a new tenant together with its tenant_admin
///
/// ```text
/// POST /v1/auth/register
///
/// {
///   "tenant_name": "Acme",
///   "subdomain": "acme",
///   "email": "admin@acme.test",
///   "password": "Str0ng!Pass",
///   "full_name": "Ada Admin"
/// }
/// ```
///
/// The tenant starts on the free plan with the catalog's ceilings. Both rows
/// are written in one transaction.
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: email or subdomain already taken
pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    req.validate()?;

    let subdomain = req.subdomain.trim().to_lowercase();
    if !is_valid_subdomain(&subdomain) {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "subdomain",
            "Subdomain must be 3-63 lowercase letters, digits or hyphens",
        )]));
    }
    check_password_strength(&req.password)?;

    let password_hash = password::hash_password_async(req.password).await?;
    let limits = state.plans().limits(SubscriptionPlan::Free);

    let mut tx = state.db.begin().await?;

    let tenant = Tenant::create(
        &mut *tx,
        CreateTenant {
            name: req.tenant_name.trim().to_string(),
            subdomain,
            status: TenantStatus::Active,
            plan: SubscriptionPlan::Free,
            max_users: limits.max_users,
            max_projects: limits.max_projects,
        },
    )
    .await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            tenant_id: tenant.id,
            email: normalize_email(&req.email),
            password_hash,
            full_name: req.full_name.trim().to_string(),
            role: Role::TenantAdmin,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        tenant_id = %tenant.id,
        user_id = %user.id,
        subdomain = %tenant.subdomain,
        "Tenant registered"
    );

    Ok(ApiResponse::created(issue_session(&state, user, tenant)?))
}

/// Exchanges email and password for a token
///
/// ```text
/// POST /v1/auth/login
///
/// { "email": "admin@acme.test", "password": "Str0ng!Pass" }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: unknown email or wrong password (indistinguishable)
/// - `403 Forbidden`: account disabled or tenant suspended
pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> ApiResult<ApiResponse<SessionResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password_async(req.password, user.password_hash.clone()).await? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is disabled".to_string()));
    }

    let tenant = Tenant::find_by_id(&state.db, user.tenant_id)
        .await?
        .ok_or_else(|| ApiError::InternalError(format!("User {} has no tenant", user.id)))?;

    if !tenant.status.allows_login() {
        return Err(ApiError::Forbidden("Tenant is suspended".to_string()));
    }

    User::update_last_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, tenant_id = %tenant.id, "User logged in");

    Ok(ApiResponse::success(issue_session(&state, user, tenant)?))
}

/// Returns the caller's user and tenant
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<MeResponse>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::User(auth.user_id), Action::ReadSelf).await?;

    let user = User::find_by_id(&mut *conn, auth.user_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::User))?;
    let tenant = Tenant::find_by_id(&mut *conn, user.tenant_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Tenant))?;

    Ok(ApiResponse::success(MeResponse { user, tenant }))
}

/// Revokes the presented token until its natural expiry
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<ApiResponse<LogoutResponse>> {
    RevokedToken::revoke(&state.db, auth.token_id, auth.user_id, auth.expires_at).await?;

    let purged = RevokedToken::purge_expired(&state.db).await?;
    if purged > 0 {
        tracing::debug!(purged, "Purged expired revocations");
    }

    tracing::info!(user_id = %auth.user_id, token_id = %auth.token_id, "User logged out");

    Ok(ApiResponse::success(LogoutResponse {
        message: "Logged out successfully",
    }))
}
