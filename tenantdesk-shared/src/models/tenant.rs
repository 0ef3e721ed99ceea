/// Tenant model and database operations
///
/// A tenant is an isolated customer organization. It owns users, projects
/// and tasks, and carries the quota ceilings that bound how many users and
/// projects it may hold.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tenants (
///     id UUID PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     subdomain VARCHAR(63) NOT NULL UNIQUE,
///     status tenant_status NOT NULL DEFAULT 'active',
///     subscription_plan subscription_plan NOT NULL DEFAULT 'free',
///     max_users INTEGER NOT NULL,
///     max_projects INTEGER NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use tenantdesk_shared::models::tenant::{CreateTenant, SubscriptionPlan, Tenant, TenantStatus};
/// use tenantdesk_shared::plans::PlanCatalog;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let limits = PlanCatalog::default().limits(SubscriptionPlan::Free);
/// let tenant = Tenant::create(
///     &pool,
///     CreateTenant {
///         name: "Acme Corp".to_string(),
///         subdomain: "acme".to_string(),
///         status: TenantStatus::Active,
///         plan: SubscriptionPlan::Free,
///         max_users: limits.max_users,
///         max_projects: limits.max_projects,
///     },
/// )
/// .await?;
/// println!("Created tenant: {}", tenant.id);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;
use uuid::Uuid;

/// Lifecycle status of a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tenant_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Suspended,
    Trial,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Suspended => "suspended",
            TenantStatus::Trial => "trial",
        }
    }

    /// Whether members of the tenant may sign in
    pub fn allows_login(&self) -> bool {
        !matches!(self, TenantStatus::Suspended)
    }
}

/// Subscription plan
///
/// The plan determines the default quota ceilings (see [`crate::plans`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_plan", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    /// Parses plan from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "free" => Some(SubscriptionPlan::Free),
            "pro" => Some(SubscriptionPlan::Pro),
            "enterprise" => Some(SubscriptionPlan::Enterprise),
            _ => None,
        }
    }
}

/// Tenant row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    /// Unique tenant ID (UUID v4)
    pub id: Uuid,

    /// Organization name
    pub name: String,

    /// Globally unique subdomain chosen at registration
    pub subdomain: String,

    pub status: TenantStatus,

    pub subscription_plan: SubscriptionPlan,

    /// Ceiling on the number of users, checked at insertion time
    pub max_users: i32,

    /// Ceiling on the number of projects, checked at insertion time
    pub max_projects: i32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new tenant
#[derive(Debug, Clone)]
pub struct CreateTenant {
    pub name: String,
    pub subdomain: String,
    pub status: TenantStatus,
    pub plan: SubscriptionPlan,
    pub max_users: i32,
    pub max_projects: i32,
}

/// Input for updating an existing tenant
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateTenant {
    pub name: Option<String>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub status: Option<TenantStatus>,
    pub max_users: Option<i32>,
    pub max_projects: Option<i32>,
}

impl UpdateTenant {
    /// True when nothing would be written
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.subscription_plan.is_none()
            && self.status.is_none()
            && self.max_users.is_none()
            && self.max_projects.is_none()
    }
}

const TENANT_COLUMNS: &str = "id, name, subdomain, status, subscription_plan, max_users, \
                              max_projects, created_at, updated_at";

impl Tenant {
    /// Creates a new tenant
    ///
    /// # Errors
    ///
    /// Returns a database error if the subdomain is already taken
    /// (constraint `tenants_subdomain_key`) or the connection fails.
    pub async fn create<'e, E>(executor: E, data: CreateTenant) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO tenants (id, name, subdomain, status, subscription_plan, max_users, max_projects) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {}",
            TENANT_COLUMNS
        );

        sqlx::query_as::<_, Tenant>(&query)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.subdomain)
            .bind(data.status)
            .bind(data.plan)
            .bind(data.max_users)
            .bind(data.max_projects)
            .fetch_one(executor)
            .await
    }

    /// Finds a tenant by ID
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use tenantdesk_shared::models::tenant::Tenant;
    /// # use sqlx::PgPool;
    /// # use uuid::Uuid;
    /// # async fn example(pool: PgPool, tenant_id: Uuid) -> Result<(), sqlx::Error> {
    /// if let Some(tenant) = Tenant::find_by_id(&pool, tenant_id).await? {
    ///     println!("Found tenant: {}", tenant.name);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS);

        sqlx::query_as::<_, Tenant>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Finds a tenant by its subdomain
    pub async fn find_by_subdomain<'e, E>(
        executor: E,
        subdomain: &str,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!("SELECT {} FROM tenants WHERE subdomain = $1", TENANT_COLUMNS);

        sqlx::query_as::<_, Tenant>(&query)
            .bind(subdomain)
            .fetch_optional(executor)
            .await
    }

    /// Updates an existing tenant
    ///
    /// Only `Some` fields in `data` are written. Returns `None` when the
    /// tenant does not exist.
    pub async fn update<'e, E>(
        executor: E,
        id: Uuid,
        data: UpdateTenant,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let mut query = String::from("UPDATE tenants SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if data.subscription_plan.is_some() {
            bind_count += 1;
            query.push_str(&format!(", subscription_plan = ${}", bind_count));
        }
        if data.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if data.max_users.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_users = ${}", bind_count));
        }
        if data.max_projects.is_some() {
            bind_count += 1;
            query.push_str(&format!(", max_projects = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {}", TENANT_COLUMNS));

        let mut q = sqlx::query_as::<_, Tenant>(&query).bind(id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(plan) = data.subscription_plan {
            q = q.bind(plan);
        }
        if let Some(status) = data.status {
            q = q.bind(status);
        }
        if let Some(max_users) = data.max_users {
            q = q.bind(max_users);
        }
        if let Some(max_projects) = data.max_projects {
            q = q.bind(max_projects);
        }

        q.fetch_optional(executor).await
    }

    /// Lists tenants, newest first
    pub async fn list<'e, E>(executor: E, limit: i64, offset: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {} FROM tenants ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            TENANT_COLUMNS
        );

        sqlx::query_as::<_, Tenant>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await
    }

    /// Counts all tenants
    pub async fn count<'e, E>(executor: E) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_scalar("SELECT COUNT(*) FROM tenants")
            .fetch_one(executor)
            .await
    }

    /// Hard-deletes a tenant and everything it owns
    ///
    /// Not reachable from the API; used by test fixtures.
    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
