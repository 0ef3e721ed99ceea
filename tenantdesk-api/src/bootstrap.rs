/// Startup provisioning of the platform operator
///
/// When `SUPER_ADMIN_EMAIL` and `SUPER_ADMIN_PASSWORD` are set, startup
/// makes sure a `platform` tenant and a super_admin with that email exist.
/// Running it again is a no-op; an existing account is never modified.

use crate::config::SuperAdminConfig;
use sqlx::PgPool;
use tenantdesk_shared::{
    auth::password,
    models::{
        tenant::{CreateTenant, SubscriptionPlan, Tenant, TenantStatus},
        user::{CreateUser, Role, User},
    },
    plans::PlanCatalog,
};

/// Subdomain of the tenant that hosts platform operators
pub const PLATFORM_SUBDOMAIN: &str = "platform";

/// What [`ensure_super_admin`] found or did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Created,
    AlreadyPresent,
}

/// Ensures the configured super_admin exists
///
/// # Errors
///
/// Fails when the password does not meet the policy, when the email
/// belongs to an account that is not a super_admin, or on storage errors.
pub async fn ensure_super_admin(
    pool: &PgPool,
    admin: &SuperAdminConfig,
    plans: &PlanCatalog,
) -> anyhow::Result<BootstrapOutcome> {
    if let Some(existing) = User::find_by_email(pool, &admin.email).await? {
        if existing.role != Role::SuperAdmin {
            anyhow::bail!(
                "SUPER_ADMIN_EMAIL {} belongs to an existing {} account",
                existing.email,
                existing.role
            );
        }
        tracing::debug!(user_id = %existing.id, "Super admin already present");
        return Ok(BootstrapOutcome::AlreadyPresent);
    }

    password::validate_password_strength(&admin.password)
        .map_err(|e| anyhow::anyhow!("SUPER_ADMIN_PASSWORD rejected: {}", e))?;
    let password_hash = password::hash_password_async(admin.password.clone()).await?;

    let mut tx = pool.begin().await?;

    let tenant = match Tenant::find_by_subdomain(&mut *tx, PLATFORM_SUBDOMAIN).await? {
        Some(tenant) => tenant,
        None => {
            let limits = plans.limits(SubscriptionPlan::Enterprise);
            Tenant::create(
                &mut *tx,
                CreateTenant {
                    name: "Platform".to_string(),
                    subdomain: PLATFORM_SUBDOMAIN.to_string(),
                    status: TenantStatus::Active,
                    plan: SubscriptionPlan::Enterprise,
                    max_users: limits.max_users,
                    max_projects: limits.max_projects,
                },
            )
            .await?
        }
    };

    let user = User::create(
        &mut *tx,
        CreateUser {
            tenant_id: tenant.id,
            email: admin.email.clone(),
            password_hash,
            full_name: "Platform Administrator".to_string(),
            role: Role::SuperAdmin,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user.id, tenant_id = %tenant.id, "Super admin created");
    Ok(BootstrapOutcome::Created)
}
