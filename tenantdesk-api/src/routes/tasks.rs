/// Task endpoints
///
/// Tasks are addressed through their project on create/list and directly by
/// id otherwise; either way the gate walks task → project → tenant.

use super::{ensure_not_empty, Deleted, JsonBody, PathParam, QueryParams};
use crate::{app::AppState, error::ApiResult, response::ApiResponse};
use axum::{extract::State, Extension};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use sqlx::PgConnection;
use tenantdesk_shared::{
    auth::{context::AuthContext, policy::Action},
    gate::{self, GateError},
    models::{
        task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, UpdateTask},
        Page, PageParams,
    },
    scope::{self, ResourceKind, ResourceRef},
};
use uuid::Uuid;
use validator::Validate;

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    pub priority: TaskPriority,

    pub assigned_to: Option<Uuid>,

    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Task title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub priority: Option<TaskPriority>,

    /// `null` unassigns
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to: Option<Option<Uuid>>,

    /// `null` clears the due date
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl UpdateTaskRequest {
    fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to.is_none()
            && self.due_date.is_none()
    }
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Rejects an assignee that is not a user of `tenant_id`
///
/// Missing users and users of other tenants get the same message.
async fn check_assignee(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    assignee: Uuid,
) -> Result<(), GateError> {
    match scope::resolve_tenant(conn, ResourceRef::User(assignee)).await? {
        Some(owner) if owner == tenant_id => Ok(()),
        _ => Err(GateError::Validation(
            "Assignee not found in this tenant".to_string(),
        )),
    }
}

/// Creates a task in a project
///
/// ```text
/// POST /v1/projects/:project_id/tasks
///
/// { "title": "Draft plan", "priority": "high", "due_date": "2025-03-01" }
/// ```
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(project_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    req.validate()?;

    let mut conn = state.db.acquire().await?;
    let admission =
        gate::admit(&mut conn, &auth, ResourceRef::Project(project_id), Action::CreateTask).await?;

    if let Some(assignee) = req.assigned_to {
        check_assignee(&mut conn, admission.tenant_id, assignee).await?;
    }

    let task = Task::create(
        &mut *conn,
        CreateTask {
            project_id,
            tenant_id: admission.tenant_id,
            title: req.title.trim().to_string(),
            description: req.description,
            priority: req.priority,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
        },
    )
    .await?;

    tracing::info!(
        task_id = %task.id,
        %project_id,
        tenant_id = %admission.tenant_id,
        "Task created"
    );

    Ok(ApiResponse::created(task))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(project_id): PathParam<Uuid>,
    QueryParams(query): QueryParams<ListTasksQuery>,
) -> ApiResult<ApiResponse<Page<Task>>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Project(project_id), Action::ReadTask).await?;

    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
    };
    let (limit, offset) = PageParams {
        limit: query.limit,
        offset: query.offset,
    }
    .normalized();

    let items = Task::list_by_project(&mut *conn, project_id, filter, limit, offset).await?;
    let total = Task::count_by_project(&mut *conn, project_id, filter).await?;

    Ok(ApiResponse::success(Page::new(items, total, limit, offset)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(task_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Task>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Task(task_id), Action::ReadTask).await?;

    let task = Task::find_by_id(&mut *conn, task_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Task))?;

    Ok(ApiResponse::success(task))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(task_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> ApiResult<ApiResponse<Task>> {
    req.validate()?;
    ensure_not_empty(req.is_empty())?;

    let mut conn = state.db.acquire().await?;
    let admission =
        gate::admit(&mut conn, &auth, ResourceRef::Task(task_id), Action::UpdateTask).await?;

    if let Some(Some(assignee)) = req.assigned_to {
        check_assignee(&mut conn, admission.tenant_id, assignee).await?;
    }

    let task = Task::update(
        &mut *conn,
        task_id,
        UpdateTask {
            title: req.title.map(|t| t.trim().to_string()),
            description: req.description,
            status: req.status,
            priority: req.priority,
            assigned_to: req.assigned_to,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or(GateError::NotFound(ResourceKind::Task))?;

    Ok(ApiResponse::success(task))
}

/// Sets a task's status
///
/// Any status may follow any other. Repeating the current status changes
/// nothing, `updated_at` included.
pub async fn set_task_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(task_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<SetStatusRequest>,
) -> ApiResult<ApiResponse<Task>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Task(task_id), Action::UpdateTask).await?;

    let task = Task::set_status(&mut *conn, task_id, req.status)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Task))?;

    tracing::debug!(%task_id, status = ?task.status, "Task status set");

    Ok(ApiResponse::success(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(task_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Deleted>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Task(task_id), Action::DeleteTask).await?;

    if !Task::delete(&mut *conn, task_id).await? {
        return Err(GateError::NotFound(ResourceKind::Task).into());
    }

    Ok(ApiResponse::success(Deleted::new(task_id)))
}
