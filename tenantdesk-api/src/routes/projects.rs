/// Project endpoints
///
/// Projects belong to the caller's tenant. A super_admin may act on another
/// tenant by passing `tenant_id` (body on create, query on list); for anyone
/// else a foreign `tenant_id` resolves to `404`.

use super::{ensure_not_empty, Deleted, JsonBody, PathParam, QueryParams};
use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::{extract::State, Extension};
use serde::Deserialize;
use tenantdesk_shared::{
    auth::{context::AuthContext, policy::Action},
    gate::{self, GateError},
    models::{
        project::{CreateProject, Project, ProjectStatus, UpdateProject},
        Page, PageParams,
    },
    scope::{ResourceKind, ResourceRef},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Target tenant; defaults to the caller's
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Project name must be 1-255 characters"))]
    pub name: Option<String>,

    pub description: Option<String>,

    pub status: Option<ProjectStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListProjectsQuery {
    pub status: Option<ProjectStatus>,
    pub tenant_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Tenant a request addresses
fn target_tenant(auth: &AuthContext, requested: Option<Uuid>) -> Uuid {
    requested.unwrap_or(auth.tenant_id)
}

/// Creates a project
///
/// ```text
/// POST /v1/projects
///
/// { "name": "Roadmap", "description": "Q3 planning" }
/// ```
///
/// # Errors
///
/// - `404 Not Found`: foreign `tenant_id`
/// - `409 Conflict`: project ceiling reached
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    req.validate()?;
    let tenant_id = target_tenant(&auth, req.tenant_id);

    let mut tx = state.db.begin().await?;
    let admission =
        gate::admit(&mut tx, &auth, ResourceRef::Tenant(tenant_id), Action::CreateProject).await?;

    let project = Project::create(
        &mut *tx,
        CreateProject {
            tenant_id: admission.tenant_id,
            name: req.name.trim().to_string(),
            description: req.description,
            created_by: auth.user_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        project_id = %project.id,
        %tenant_id,
        created_by = %auth.user_id,
        "Project created"
    );

    Ok(ApiResponse::created(project))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    QueryParams(query): QueryParams<ListProjectsQuery>,
) -> ApiResult<ApiResponse<Page<Project>>> {
    let tenant_id = target_tenant(&auth, query.tenant_id);

    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Tenant(tenant_id), Action::ReadProject).await?;

    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .normalized();

    let items = Project::list_by_tenant(&mut *conn, tenant_id, query.status, limit, offset).await?;
    let total = Project::count_by_tenant(&mut *conn, tenant_id, query.status).await?;

    Ok(ApiResponse::success(Page::new(items, total, limit, offset)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(project_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Project>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Project(project_id), Action::ReadProject).await?;

    let project = Project::find_by_id(&mut *conn, project_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Project))?;

    Ok(ApiResponse::success(project))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(project_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateProjectRequest>,
) -> ApiResult<ApiResponse<Project>> {
    req.validate()?;
    ensure_not_empty(req.name.is_none() && req.description.is_none() && req.status.is_none())?;

    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Project(project_id), Action::UpdateProject).await?;

    let project = Project::update(
        &mut *conn,
        project_id,
        UpdateProject {
            name: req.name.map(|n| n.trim().to_string()),
            description: req.description,
            status: req.status,
        },
    )
    .await?
    .ok_or(GateError::NotFound(ResourceKind::Project))?;

    Ok(ApiResponse::success(project))
}

/// Deletes a project and, through the foreign key cascade, its tasks
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(project_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Project(project_id), Action::DeleteProject).await?;

    if !Project::delete(&mut *conn, project_id).await? {
        return Err(GateError::NotFound(ResourceKind::Project).into());
    }

    tracing::info!(%project_id, deleted_by = %auth.user_id, "Project deleted");

    Ok(ApiResponse::success(Deleted::new(project_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tenantdesk_shared::models::user::Role;

    fn context() -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            role: Role::User,
            token_id: Uuid::new_v4(),
            expires_at: Utc::now() + Duration::hours(1),
        }
    }

    #[test]
    fn test_target_tenant_defaults_to_caller() {
        let auth = context();
        assert_eq!(target_tenant(&auth, None), auth.tenant_id);

        let other = Uuid::new_v4();
        assert_eq!(target_tenant(&auth, Some(other)), other);
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateProjectRequest {
            name: String::new(),
            description: None,
            tenant_id: None,
        };
        assert!(req.validate().is_err());
    }
}
