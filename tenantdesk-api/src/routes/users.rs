/// User management endpoints
///
/// - `POST /v1/tenants/:tenant_id/users`: add a user (quota-checked)
/// - `GET /v1/tenants/:tenant_id/users`: list users, optional `role` filter
/// - `PUT /v1/users/:user_id`: profile, role and activation changes
/// - `DELETE /v1/users/:user_id`: remove a user

use super::{check_password_strength, ensure_not_empty, Deleted, JsonBody, PathParam, QueryParams};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use serde::Deserialize;
use tenantdesk_shared::{
    auth::{context::AuthContext, password, policy::Action},
    gate::{self, GateError},
    models::{
        user::{normalize_email, CreateUser, Role, UpdateUser, User},
        Page, PageParams,
    },
    scope::{ResourceKind, ResourceRef},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    #[validate(length(min = 1, max = 255, message = "Full name must be 1-255 characters"))]
    pub full_name: String,

    /// Defaults to `user`
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Full name must be 1-255 characters"))]
    pub full_name: Option<String>,

    pub role: Option<Role>,

    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Every permission the update needs
    pub fn required_actions(&self) -> Vec<Action> {
        let mut actions = vec![Action::UpdateUserProfile];
        if let Some(role) = self.role {
            actions.push(Action::ChangeUserRole(role));
        }
        if self.is_active.is_some() {
            actions.push(Action::ChangeUserStatus);
        }
        actions
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<Role>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListUsersQuery {
    fn page(&self) -> PageParams {
        PageParams {
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// Only a super_admin may modify or remove a super_admin
fn protect_super_admin(auth: &AuthContext, target: &User) -> ApiResult<()> {
    if target.role.is_super_admin() && !auth.is_super_admin() {
        tracing::warn!(
            user_id = %auth.user_id,
            target = %target.id,
            "Attempt to modify a super_admin rejected"
        );
        return Err(ApiError::Forbidden("Insufficient permissions".to_string()));
    }
    Ok(())
}

/// Adds a user to a tenant
///
/// ```text
/// POST /v1/tenants/:tenant_id/users
///
/// {
///   "email": "dev@acme.test",
///   "password": "Str0ng!Pass",
///   "full_name": "Dev One",
///   "role": "user"
/// }
/// ```
///
/// The quota check and the insert share one transaction, so concurrent
/// requests cannot push the tenant past `max_users`.
///
/// # Errors
///
/// - `403 Forbidden`: caller may not add users with this role
/// - `404 Not Found`: no such tenant, or not the caller's
/// - `409 Conflict`: email taken, or the user ceiling is reached
pub async fn add_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(tenant_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<AddUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    check_password_strength(&req.password)?;

    // Hash before taking the quota lock
    let password_hash = password::hash_password_async(req.password).await?;

    let mut tx = state.db.begin().await?;
    let admission = gate::admit(
        &mut tx,
        &auth,
        ResourceRef::Tenant(tenant_id),
        Action::AddUser(req.role),
    )
    .await?;

    let user = User::create(
        &mut *tx,
        CreateUser {
            tenant_id: admission.tenant_id,
            email: normalize_email(&req.email),
            password_hash,
            full_name: req.full_name.trim().to_string(),
            role: req.role,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        %tenant_id,
        user_id = %user.id,
        role = %user.role,
        added_by = %auth.user_id,
        "User added"
    );

    Ok(ApiResponse::created(user))
}

pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(tenant_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<ListUsersQuery>,
) -> ApiResult<ApiResponse<Page<User>>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Tenant(tenant_id), Action::ListUsers).await?;

    let (limit, offset) = query.page().normalized();
    let items = User::list_by_tenant(&mut *conn, tenant_id, query.role, limit, offset).await?;
    let total = User::count_by_tenant(&mut *conn, tenant_id, query.role).await?;

    Ok(ApiResponse::success(Page::new(items, total, limit, offset)))
}

/// Updates a user
///
/// A plain user may change their own `full_name` only. Setting `role` or
/// `is_active` needs an admin; granting `super_admin` needs a super_admin.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(user_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateUserRequest>,
) -> ApiResult<ApiResponse<User>> {
    req.validate()?;
    ensure_not_empty(req.full_name.is_none() && req.role.is_none() && req.is_active.is_none())?;

    let actions = req.required_actions();

    let mut tx = state.db.begin().await?;
    gate::admit_all(&mut tx, &auth, ResourceRef::User(user_id), &actions).await?;

    let target = User::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::User))?;
    protect_super_admin(&auth, &target)?;

    let user = User::update(
        &mut *tx,
        user_id,
        UpdateUser {
            full_name: req.full_name.map(|n| n.trim().to_string()),
            role: req.role,
            is_active: req.is_active,
        },
    )
    .await?
    .ok_or(GateError::NotFound(ResourceKind::User))?;

    tx.commit().await?;

    tracing::info!(
        %user_id,
        updated_by = %auth.user_id,
        role = %user.role,
        is_active = user.is_active,
        "User updated"
    );

    Ok(ApiResponse::success(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(user_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    let mut tx = state.db.begin().await?;
    gate::admit(&mut tx, &auth, ResourceRef::User(user_id), Action::DeleteUser).await?;

    if user_id == auth.user_id {
        return Err(ApiError::BadRequest("Cannot delete your own account".to_string()));
    }

    let target = User::find_by_id(&mut *tx, user_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::User))?;
    protect_super_admin(&auth, &target)?;

    if !User::delete(&mut *tx, user_id).await? {
        return Err(GateError::NotFound(ResourceKind::User).into());
    }

    tx.commit().await?;

    tracing::info!(%user_id, deleted_by = %auth.user_id, "User deleted");

    Ok(ApiResponse::success(Deleted::new(user_id)))
}
