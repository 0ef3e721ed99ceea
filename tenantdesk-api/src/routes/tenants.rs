/// Tenant endpoints
///
/// - `GET /v1/tenants`: all tenants (super_admin)
/// - `GET /v1/tenants/:tenant_id`: one tenant (tenant_admin, super_admin)
/// - `PUT /v1/tenants/:tenant_id`: rename or change plan; status, ceiling
///   overrides and plan-driven ceiling resets are super_admin only
/// - `GET /v1/tenants/:tenant_id/usage`: counts against ceilings

use super::{ensure_not_empty, JsonBody, PathParam, QueryParams};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    response::ApiResponse,
};
use axum::{extract::State, Extension};
use serde::Deserialize;
use tenantdesk_shared::{
    auth::{context::AuthContext, policy::Action},
    gate::{self, GateError},
    models::{
        tenant::{SubscriptionPlan, Tenant, TenantStatus, UpdateTenant},
        Page, PageParams,
    },
    plans::PlanCatalog,
    quota::{self, TenantUsage},
    scope::{ResourceKind, ResourceRef},
};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTenantRequest {
    #[validate(length(min = 1, max = 255, message = "Tenant name must be 1-255 characters"))]
    pub name: Option<String>,

    pub subscription_plan: Option<SubscriptionPlan>,

    pub status: Option<TenantStatus>,

    #[validate(range(min = 1, message = "max_users must be at least 1"))]
    pub max_users: Option<i32>,

    #[validate(range(min = 0, message = "max_projects must not be negative"))]
    pub max_projects: Option<i32>,
}

impl UpdateTenantRequest {
    /// Whether the request touches fields reserved for platform administration
    pub fn is_administrative(&self) -> bool {
        self.status.is_some() || self.max_users.is_some() || self.max_projects.is_some()
    }

    /// Builds the update
    ///
    /// With `reset_ceilings`, a plan change also sets the catalog ceilings
    /// for the new plan. Explicit ceilings in the request win over the
    /// catalog.
    pub fn into_update(self, catalog: &PlanCatalog, reset_ceilings: bool) -> UpdateTenant {
        let plan_limits = self
            .subscription_plan
            .filter(|_| reset_ceilings)
            .map(|plan| catalog.limits(plan));

        UpdateTenant {
            name: self.name.map(|n| n.trim().to_string()),
            subscription_plan: self.subscription_plan,
            status: self.status,
            max_users: self.max_users.or(plan_limits.map(|l| l.max_users)),
            max_projects: self.max_projects.or(plan_limits.map(|l| l.max_projects)),
        }
    }
}

/// Lists every tenant, newest first
pub async fn list_tenants(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    QueryParams(page): QueryParams<PageParams>,
) -> ApiResult<ApiResponse<Page<Tenant>>> {
    gate::require(&auth, Action::ListTenants)?;

    let (limit, offset) = page.normalized();
    let items = Tenant::list(&state.db, limit, offset).await?;
    let total = Tenant::count(&state.db).await?;

    Ok(ApiResponse::success(Page::new(items, total, limit, offset)))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(tenant_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<Tenant>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Tenant(tenant_id), Action::ReadTenant).await?;

    let tenant = Tenant::find_by_id(&mut *conn, tenant_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Tenant))?;

    Ok(ApiResponse::success(tenant))
}

/// Updates a tenant
///
/// ```text
/// PUT /v1/tenants/:tenant_id
///
/// { "name": "Acme Inc", "subscription_plan": "pro" }
/// ```
///
/// When a super_admin changes `subscription_plan`, `max_users` and
/// `max_projects` are reset to the plan's catalog values. A tenant_admin's
/// plan change leaves the ceilings as they are. Lowering a ceiling below the current count is
/// allowed; existing rows stay, further creations are refused.
///
/// # Errors
///
/// - `400 Bad Request`: empty or invalid update
/// - `403 Forbidden`: role may not change these fields
/// - `404 Not Found`: no such tenant, or not the caller's
pub async fn update_tenant(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(tenant_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpdateTenantRequest>,
) -> ApiResult<ApiResponse<Tenant>> {
    req.validate()?;

    let mut actions = vec![Action::UpdateTenant];
    if req.is_administrative() {
        actions.push(Action::AdministerTenant);
    }

    let data = req.into_update(state.plans(), auth.is_super_admin());
    ensure_not_empty(data.is_empty())?;
    if data.name.as_deref() == Some("") {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "name",
            "Tenant name must be 1-255 characters",
        )]));
    }

    let mut conn = state.db.acquire().await?;
    gate::admit_all(&mut conn, &auth, ResourceRef::Tenant(tenant_id), &actions).await?;

    let tenant = Tenant::update(&mut *conn, tenant_id, data)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Tenant))?;

    tracing::info!(
        %tenant_id,
        updated_by = %auth.user_id,
        plan = tenant.subscription_plan.as_str(),
        status = tenant.status.as_str(),
        "Tenant updated"
    );

    Ok(ApiResponse::success(tenant))
}

/// Current user/project counts against the tenant's ceilings
pub async fn get_usage(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    PathParam(tenant_id): PathParam<Uuid>,
) -> ApiResult<ApiResponse<TenantUsage>> {
    let mut conn = state.db.acquire().await?;
    gate::admit(&mut conn, &auth, ResourceRef::Tenant(tenant_id), Action::ReadTenant).await?;

    let usage = quota::usage(&mut conn, tenant_id)
        .await?
        .ok_or(GateError::NotFound(ResourceKind::Tenant))?;

    Ok(ApiResponse::success(usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UpdateTenantRequest {
        UpdateTenantRequest {
            name: None,
            subscription_plan: None,
            status: None,
            max_users: None,
            max_projects: None,
        }
    }

    #[test]
    fn test_plan_change_resets_ceilings() {
        let catalog = PlanCatalog::default();
        let update = UpdateTenantRequest {
            subscription_plan: Some(SubscriptionPlan::Pro),
            ..request()
        }
        .into_update(&catalog, true);

        let pro = catalog.limits(SubscriptionPlan::Pro);
        assert_eq!(update.max_users, Some(pro.max_users));
        assert_eq!(update.max_projects, Some(pro.max_projects));
    }

    #[test]
    fn test_explicit_ceiling_wins_over_plan() {
        let catalog = PlanCatalog::default();
        let update = UpdateTenantRequest {
            subscription_plan: Some(SubscriptionPlan::Pro),
            max_users: Some(2),
            ..request()
        }
        .into_update(&catalog, true);

        assert_eq!(update.max_users, Some(2));
        assert_eq!(
            update.max_projects,
            Some(catalog.limits(SubscriptionPlan::Pro).max_projects)
        );
    }

    #[test]
    fn test_plan_change_keeps_ceilings_without_reset() {
        let update = UpdateTenantRequest {
            subscription_plan: Some(SubscriptionPlan::Enterprise),
            ..request()
        }
        .into_update(&PlanCatalog::default(), false);

        assert_eq!(update.subscription_plan, Some(SubscriptionPlan::Enterprise));
        assert_eq!(update.max_users, None);
        assert_eq!(update.max_projects, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_rename_is_not_administrative() {
        let req = UpdateTenantRequest {
            name: Some("Acme".to_string()),
            subscription_plan: Some(SubscriptionPlan::Enterprise),
            ..request()
        };
        assert!(!req.is_administrative());

        let req = UpdateTenantRequest {
            status: Some(TenantStatus::Suspended),
            ..request()
        };
        assert!(req.is_administrative());
    }

    #[test]
    fn test_ceiling_validation() {
        let req = UpdateTenantRequest {
            max_users: Some(0),
            max_projects: Some(-1),
            ..request()
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("max_users"));
        assert!(errors.field_errors().contains_key("max_projects"));
    }

    #[test]
    fn test_empty_request_builds_empty_update() {
        assert!(request().into_update(&PlanCatalog::default(), true).is_empty());
    }
}
