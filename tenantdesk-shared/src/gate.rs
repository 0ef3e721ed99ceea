/// Authorization gate
///
/// Every operation on a tenant-owned resource passes through here, in a
/// fixed order:
///
/// 1. [`authenticate`]: verify the bearer token, reject revoked or stale
///    tokens → `Unauthenticated`
/// 2. resolve the target's owning tenant → `NotFound`
/// 3. tenant scope: the caller's tenant, unless super_admin → `NotFound`
/// 4. role policy for each requested action → `Forbidden`
/// 5. for creations, the quota check → `QuotaExceeded`
///
/// Steps 2-5 are [`admit`] / [`admit_all`]. Steps 2 and 3 fail with the same
/// error, so a caller outside the tenant cannot tell a missing resource from
/// someone else's.
///
/// For creations, pass an open transaction. The quota lock taken in step 5
/// is held until the handler's insert commits.
///
/// # Example
///
/// ```no_run
/// use tenantdesk_shared::auth::context::AuthContext;
/// use tenantdesk_shared::auth::policy::Action;
/// use tenantdesk_shared::gate::{self, GateError};
/// use tenantdesk_shared::models::project::{CreateProject, Project};
/// use tenantdesk_shared::scope::ResourceRef;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool, auth: AuthContext) -> Result<Project, GateError> {
/// let mut tx = pool.begin().await?;
/// let admission = gate::admit(
///     &mut tx,
///     &auth,
///     ResourceRef::Tenant(auth.tenant_id),
///     Action::CreateProject,
/// )
/// .await?;
///
/// let project = Project::create(
///     &mut *tx,
///     CreateProject {
///         tenant_id: admission.tenant_id,
///         name: "Roadmap".to_string(),
///         description: None,
///         created_by: auth.user_id,
///     },
/// )
/// .await?;
/// tx.commit().await?;
/// # Ok(project)
/// # }
/// ```

use crate::auth::context::{extract_bearer, AuthContext};
use crate::auth::jwt::{self, JwtError};
use crate::auth::policy::{can_perform, Action, ScopeFacts};
use crate::models::revoked_token::RevokedToken;
use crate::models::tenant::TenantStatus;
use crate::models::user::Role;
use crate::quota::{self, QuotaError, ResourceClass};
use crate::scope::{self, ResourceKind, ResourceRef};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// SQLSTATE for a statement cancelled by `statement_timeout`
const QUERY_CANCELED: &str = "57014";

/// SQLSTATE for a unique constraint violation
const UNIQUE_VIOLATION: &str = "23505";

/// SQLSTATE for a foreign key violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Typed rejection from the gate or the storage behind it
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Missing, invalid, expired, revoked or stale token
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but the role does not allow the action
    #[error("{0}")]
    Forbidden(String),

    /// Absent, or outside the caller's tenant
    #[error("{0} not found")]
    NotFound(ResourceKind),

    #[error("{} limit reached for this plan", .class.as_str())]
    QuotaExceeded {
        class: ResourceClass,
        limit: i64,
        current: i64,
    },

    #[error("{0}")]
    Validation(String),

    /// Uniqueness violation
    #[error("{0}")]
    Conflict(String),

    /// Storage did not answer within its bound
    #[error("Storage operation timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for GateError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => GateError::Timeout,
            sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
                Some(QUERY_CANCELED) => GateError::Timeout,
                Some(UNIQUE_VIOLATION) => {
                    GateError::Conflict(conflict_message(db_err.constraint()).to_string())
                }
                Some(FOREIGN_KEY_VIOLATION) => missing_reference(db_err.constraint()),
                _ => GateError::Internal(err.to_string()),
            },
            _ => GateError::Internal(err.to_string()),
        }
    }
}

impl From<QuotaError> for GateError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitExceeded {
                class,
                limit,
                current,
            } => GateError::QuotaExceeded {
                class,
                limit,
                current,
            },
            QuotaError::TenantNotFound(_) => GateError::NotFound(ResourceKind::Tenant),
            QuotaError::DatabaseError(err) => err.into(),
        }
    }
}

impl From<JwtError> for GateError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => GateError::Unauthenticated("Token has expired".to_string()),
            JwtError::CreateError(msg) => GateError::Internal(msg),
            JwtError::ValidationError(_) | JwtError::InvalidIssuer => {
                GateError::Unauthenticated("Invalid token".to_string())
            }
        }
    }
}

/// Rejection for a write whose referenced row vanished after admission
///
/// A deleted project or tenant reads as `NotFound`; a deleted assignee gets
/// the same message as an assignee from another tenant.
pub fn missing_reference(constraint: Option<&str>) -> GateError {
    match constraint {
        Some(c) if c.contains("assigned_to") => {
            GateError::Validation("Assignee not found in this tenant".to_string())
        }
        Some(c) if c.contains("project") => GateError::NotFound(ResourceKind::Project),
        Some(c) if c.contains("created_by") => GateError::NotFound(ResourceKind::User),
        _ => GateError::NotFound(ResourceKind::Tenant),
    }
}

/// Client-facing message for a unique violation
pub fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("email") => "Email already exists",
        Some(c) if c.contains("subdomain") => "Subdomain already taken",
        _ => "Resource already exists",
    }
}

/// Outcome of a successful admission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Tenant that owns the target
    pub tenant_id: Uuid,

    /// How the target relates to the caller
    pub facts: ScopeFacts,
}

/// Caller state as currently stored
#[derive(sqlx::FromRow)]
struct Principal {
    tenant_id: Uuid,
    role: Role,
    is_active: bool,
    tenant_status: TenantStatus,
}

/// Step 1: turns an `Authorization` header value into an [`AuthContext`]
///
/// Besides the signature and lifetime checks, the token is rejected when it
/// was revoked by logout, when its user no longer exists, or when the user's
/// tenant or role no longer match the claims. Deactivated users and
/// suspended tenants get `Forbidden`.
pub async fn authenticate(
    pool: &PgPool,
    authorization: Option<&str>,
    secret: &str,
) -> Result<AuthContext, GateError> {
    let header = authorization
        .ok_or_else(|| GateError::Unauthenticated("Missing authorization header".to_string()))?;
    let token = extract_bearer(header)
        .ok_or_else(|| GateError::Unauthenticated("Expected Bearer token".to_string()))?;

    let claims = jwt::validate(token, secret)?;

    if RevokedToken::is_revoked(pool, claims.jti).await? {
        tracing::debug!(token_id = %claims.jti, "Rejected revoked token");
        return Err(GateError::Unauthenticated("Token has been revoked".to_string()));
    }

    let principal = sqlx::query_as::<_, Principal>(
        "SELECT u.tenant_id, u.role, u.is_active, t.status AS tenant_status \
         FROM users u JOIN tenants t ON t.id = u.tenant_id \
         WHERE u.id = $1",
    )
    .bind(claims.sub)
    .fetch_optional(pool)
    .await?;

    let stale = || GateError::Unauthenticated("Token is no longer valid".to_string());
    let principal = principal.ok_or_else(stale)?;

    if principal.tenant_id != claims.tenant || principal.role != claims.role {
        tracing::debug!(user_id = %claims.sub, "Rejected token with outdated claims");
        return Err(stale());
    }
    if !principal.is_active {
        return Err(GateError::Forbidden("Account is disabled".to_string()));
    }
    if !principal.tenant_status.allows_login() {
        return Err(GateError::Forbidden("Tenant is suspended".to_string()));
    }

    Ok(AuthContext::from_claims(&claims))
}

/// Step 4 for one action against already-established facts
pub fn authorize(ctx: &AuthContext, action: Action, facts: ScopeFacts) -> Result<(), GateError> {
    if can_perform(ctx.role, action, facts) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %ctx.user_id,
        tenant_id = %ctx.tenant_id,
        role = %ctx.role,
        action = action.as_str(),
        "Action denied by role policy"
    );
    Err(GateError::Forbidden("Insufficient permissions".to_string()))
}

/// Role check for actions with no target resource (e.g. listing tenants)
pub fn require(ctx: &AuthContext, action: Action) -> Result<(), GateError> {
    authorize(ctx, action, ScopeFacts::default())
}

/// Steps 2-5 for a single action
pub async fn admit(
    conn: &mut PgConnection,
    ctx: &AuthContext,
    target: ResourceRef,
    action: Action,
) -> Result<Admission, GateError> {
    admit_all(conn, ctx, target, &[action]).await
}

/// Steps 2-5 for several actions on one target
///
/// Used when one request implies several permissions, e.g. a user update
/// that changes both profile fields and the role. Every action must pass.
pub async fn admit_all(
    conn: &mut PgConnection,
    ctx: &AuthContext,
    target: ResourceRef,
    actions: &[Action],
) -> Result<Admission, GateError> {
    let tenant_id = scope::resolve_tenant(conn, target)
        .await?
        .ok_or(GateError::NotFound(target.kind()))?;

    let same_tenant = tenant_id == ctx.tenant_id;
    if !same_tenant && !ctx.is_super_admin() {
        tracing::warn!(
            user_id = %ctx.user_id,
            caller_tenant = %ctx.tenant_id,
            %target,
            "Cross-tenant access rejected"
        );
        return Err(GateError::NotFound(target.kind()));
    }

    let same_user = matches!(target, ResourceRef::User(id) if id == ctx.user_id);
    let facts = ScopeFacts::new(same_tenant, same_user);

    for action in actions {
        authorize(ctx, *action, facts)?;
    }

    for class in actions.iter().filter_map(Action::quota_class) {
        quota::check_and_count(conn, tenant_id, class).await?;
    }

    tracing::debug!(
        user_id = %ctx.user_id,
        %tenant_id,
        %target,
        actions = ?actions.iter().map(Action::as_str).collect::<Vec<_>>(),
        "Request admitted"
    );

    Ok(Admission { tenant_id, facts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn context(role: Role) -> AuthContext {
        AuthContext::from_claims(&jwt::Claims::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            role,
            Duration::hours(1),
        ))
    }

    #[test]
    fn test_require_list_tenants() {
        assert!(require(&context(Role::SuperAdmin), Action::ListTenants).is_ok());
        assert!(matches!(
            require(&context(Role::TenantAdmin), Action::ListTenants),
            Err(GateError::Forbidden(_))
        ));
        assert!(matches!(
            require(&context(Role::User), Action::ListTenants),
            Err(GateError::Forbidden(_))
        ));
    }

    #[test]
    fn test_authorize_self_elevation() {
        let ctx = context(Role::User);
        let myself = ScopeFacts::new(true, true);

        assert!(authorize(&ctx, Action::UpdateUserProfile, myself).is_ok());
        assert!(matches!(
            authorize(&ctx, Action::ChangeUserRole(Role::TenantAdmin), myself),
            Err(GateError::Forbidden(_))
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(GateError::NotFound(ResourceKind::Project).to_string(), "Project not found");
        assert_eq!(
            GateError::QuotaExceeded {
                class: ResourceClass::Users,
                limit: 2,
                current: 2
            }
            .to_string(),
            "User limit reached for this plan"
        );
    }

    #[test]
    fn test_quota_error_conversion() {
        let err: GateError = QuotaError::LimitExceeded {
            class: ResourceClass::Projects,
            limit: 3,
            current: 3,
        }
        .into();
        assert!(matches!(
            err,
            GateError::QuotaExceeded {
                class: ResourceClass::Projects,
                limit: 3,
                current: 3
            }
        ));

        let err: GateError = QuotaError::TenantNotFound(Uuid::new_v4()).into();
        assert!(matches!(err, GateError::NotFound(ResourceKind::Tenant)));
    }

    #[test]
    fn test_jwt_error_conversion() {
        assert!(matches!(
            GateError::from(JwtError::Expired),
            GateError::Unauthenticated(msg) if msg == "Token has expired"
        ));
        assert!(matches!(
            GateError::from(JwtError::InvalidIssuer),
            GateError::Unauthenticated(_)
        ));
    }

    #[test]
    fn test_storage_error_conversion() {
        assert!(matches!(GateError::from(sqlx::Error::PoolTimedOut), GateError::Timeout));
        assert!(matches!(
            GateError::from(sqlx::Error::RowNotFound),
            GateError::Internal(_)
        ));
    }

    #[test]
    fn test_conflict_messages() {
        assert_eq!(conflict_message(Some("users_email_key")), "Email already exists");
        assert_eq!(conflict_message(Some("tenants_subdomain_key")), "Subdomain already taken");
        assert_eq!(conflict_message(None), "Resource already exists");
    }

    #[test]
    fn test_missing_reference_classification() {
        assert!(matches!(
            missing_reference(Some("tasks_assigned_to_fkey")),
            GateError::Validation(msg) if msg == "Assignee not found in this tenant"
        ));
        assert!(matches!(
            missing_reference(Some("tasks_project_fkey")),
            GateError::NotFound(ResourceKind::Project)
        ));
        assert!(matches!(
            missing_reference(Some("projects_created_by_fkey")),
            GateError::NotFound(ResourceKind::User)
        ));
        assert!(matches!(
            missing_reference(Some("users_tenant_id_fkey")),
            GateError::NotFound(ResourceKind::Tenant)
        ));
    }
}
