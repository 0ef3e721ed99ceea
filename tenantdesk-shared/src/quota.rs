/// Quota enforcement for per-tenant resource ceilings
///
/// Each tenant row carries `max_users` and `max_projects`. A creation is
/// admitted only while the current count is strictly below the ceiling.
/// Ceilings are checked at insertion time only; lowering one never removes
/// existing rows.
///
/// # Concurrency
///
/// [`check_and_count`] takes a row lock on the tenant (`SELECT ... FOR
/// UPDATE`) before counting. Run it inside the same transaction as the
/// insert it guards and commit afterwards: concurrent creations for one
/// tenant then serialize on that lock, and the count each one sees already
/// includes every committed predecessor.
///
/// # Example
///
/// ```no_run
/// use tenantdesk_shared::quota::{check_and_count, ResourceClass};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, tenant_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let mut tx = pool.begin().await?;
/// check_and_count(&mut tx, tenant_id, ResourceClass::Projects).await?;
/// // insert the project using `&mut *tx` ...
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use sqlx::PgConnection;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Quota enforcement error
#[derive(Debug)]
pub enum QuotaError {
    /// Ceiling reached
    LimitExceeded {
        class: ResourceClass,
        limit: i64,
        current: i64,
    },

    DatabaseError(sqlx::Error),

    TenantNotFound(Uuid),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::LimitExceeded {
                class,
                limit,
                current,
            } => write!(f, "{} limit exceeded ({}/{})", class.as_str(), current, limit),
            QuotaError::DatabaseError(err) => write!(f, "Database error: {}", err),
            QuotaError::TenantNotFound(id) => write!(f, "Tenant not found: {}", id),
        }
    }
}

impl std::error::Error for QuotaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QuotaError::DatabaseError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for QuotaError {
    fn from(err: sqlx::Error) -> Self {
        QuotaError::DatabaseError(err)
    }
}

/// Quota-limited resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    Users,
    Projects,
}

impl ResourceClass {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceClass::Users => "User",
            ResourceClass::Projects => "Project",
        }
    }

    fn ceiling_query(&self) -> &'static str {
        match self {
            ResourceClass::Users => "SELECT max_users FROM tenants WHERE id = $1 FOR UPDATE",
            ResourceClass::Projects => "SELECT max_projects FROM tenants WHERE id = $1 FOR UPDATE",
        }
    }

    fn count_query(&self) -> &'static str {
        match self {
            ResourceClass::Users => "SELECT COUNT(*) FROM users WHERE tenant_id = $1",
            ResourceClass::Projects => "SELECT COUNT(*) FROM projects WHERE tenant_id = $1",
        }
    }
}

/// Result of comparing a count with its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheckResult {
    /// Whether one more row may be created
    pub allowed: bool,

    pub current: i64,

    pub limit: i64,

    /// How many more rows fit
    pub remaining: i64,
}

impl QuotaCheckResult {
    pub fn evaluate(current: i64, limit: i64) -> Self {
        QuotaCheckResult {
            allowed: current < limit,
            current,
            limit,
            remaining: (limit - current).max(0),
        }
    }
}

/// Usage report for one tenant
#[derive(Debug, Clone, Serialize)]
pub struct TenantUsage {
    pub tenant_id: Uuid,
    pub users: QuotaCheckResult,
    pub projects: QuotaCheckResult,
}

async fn count(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    class: ResourceClass,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(class.count_query())
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await
}

/// Locks the tenant row and admits one more `class` row if below the ceiling
///
/// # Errors
///
/// - `LimitExceeded` when `current >= limit`
/// - `TenantNotFound` when the tenant row is gone
/// - `DatabaseError` on storage failure
pub async fn check_and_count(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    class: ResourceClass,
) -> Result<QuotaCheckResult, QuotaError> {
    let limit: Option<i32> = sqlx::query_scalar(class.ceiling_query())
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    let limit = limit.ok_or(QuotaError::TenantNotFound(tenant_id))?;
    let current = count(conn, tenant_id, class).await?;
    let result = QuotaCheckResult::evaluate(current, i64::from(limit));

    if !result.allowed {
        tracing::warn!(
            %tenant_id,
            class = class.as_str(),
            current,
            limit,
            "Quota ceiling reached"
        );
        return Err(QuotaError::LimitExceeded {
            class,
            limit: result.limit,
            current: result.current,
        });
    }

    tracing::debug!(
        %tenant_id,
        class = class.as_str(),
        current,
        limit,
        "Quota check passed"
    );

    Ok(result)
}

/// Reports current usage against the ceilings without locking
///
/// Returns `None` when the tenant does not exist.
pub async fn usage(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> Result<Option<TenantUsage>, sqlx::Error> {
    let limits: Option<(i32, i32)> =
        sqlx::query_as("SELECT max_users, max_projects FROM tenants WHERE id = $1")
            .bind(tenant_id)
            .fetch_optional(&mut *conn)
            .await?;

    let Some((max_users, max_projects)) = limits else {
        return Ok(None);
    };

    let users = count(conn, tenant_id, ResourceClass::Users).await?;
    let projects = count(conn, tenant_id, ResourceClass::Projects).await?;

    Ok(Some(TenantUsage {
        tenant_id,
        users: QuotaCheckResult::evaluate(users, i64::from(max_users)),
        projects: QuotaCheckResult::evaluate(projects, i64::from(max_projects)),
    }))
}
