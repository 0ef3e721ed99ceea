/// Scope resolution: which tenant owns a resource
///
/// Users and projects carry their tenant directly. Tasks are resolved via
/// their project, so a task whose project has disappeared never resolves on
/// its own. Resolution is read-only and always happens before any decision
/// that depends on tenant identity.
///
/// ```text
/// Task ──project_id──▶ Project ──tenant_id──▶ Tenant
/// User ──tenant_id──▶ Tenant
/// ```
///
/// # Example
///
/// ```no_run
/// use tenantdesk_shared::scope::{resolve_tenant, ResourceRef};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, task_id: Uuid) -> Result<(), sqlx::Error> {
/// let mut conn = pool.acquire().await?;
/// match resolve_tenant(&mut conn, ResourceRef::Task(task_id)).await? {
///     Some(tenant_id) => println!("task belongs to {}", tenant_id),
///     None => println!("no such task"),
/// }
/// # Ok(())
/// # }
/// ```

use sqlx::PgConnection;
use std::fmt;
use uuid::Uuid;

/// Kind of addressable resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Tenant,
    User,
    Project,
    Task,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Tenant => "Tenant",
            ResourceKind::User => "User",
            ResourceKind::Project => "Project",
            ResourceKind::Task => "Task",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a resource by kind and ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Tenant(Uuid),
    User(Uuid),
    Project(Uuid),
    Task(Uuid),
}

impl ResourceRef {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRef::Tenant(_) => ResourceKind::Tenant,
            ResourceRef::User(_) => ResourceKind::User,
            ResourceRef::Project(_) => ResourceKind::Project,
            ResourceRef::Task(_) => ResourceKind::Task,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ResourceRef::Tenant(id)
            | ResourceRef::User(id)
            | ResourceRef::Project(id)
            | ResourceRef::Task(id) => *id,
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.id())
    }
}

/// Outcome of one lookup along the ownership chain
enum Hop {
    /// Reached the owning tenant
    Tenant(Uuid),

    /// Continue with the parent resource
    Parent(ResourceRef),

    /// Resource (or a link in its chain) does not exist
    Missing,
}

async fn step(conn: &mut PgConnection, resource: ResourceRef) -> Result<Hop, sqlx::Error> {
    let hop = match resource {
        ResourceRef::Tenant(id) => {
            sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(Hop::Tenant)
        }
        ResourceRef::User(id) => {
            sqlx::query_scalar::<_, Uuid>("SELECT tenant_id FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(Hop::Tenant)
        }
        ResourceRef::Project(id) => {
            sqlx::query_scalar::<_, Uuid>("SELECT tenant_id FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(Hop::Tenant)
        }
        ResourceRef::Task(id) => {
            sqlx::query_scalar::<_, Uuid>("SELECT project_id FROM tasks WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?
                .map(|project_id| Hop::Parent(ResourceRef::Project(project_id)))
        }
    };

    Ok(hop.unwrap_or(Hop::Missing))
}

/// Resolves the tenant that owns `resource`
///
/// Returns `Ok(None)` when the resource, or any parent on its ownership
/// chain, does not exist.
pub async fn resolve_tenant(
    conn: &mut PgConnection,
    resource: ResourceRef,
) -> Result<Option<Uuid>, sqlx::Error> {
    let mut current = resource;

    loop {
        match step(conn, current).await? {
            Hop::Tenant(tenant_id) => {
                tracing::trace!(%resource, %tenant_id, "Resolved resource scope");
                return Ok(Some(tenant_id));
            }
            Hop::Parent(parent) => {
                tracing::trace!(%resource, via = %parent, "Following ownership chain");
                current = parent;
            }
            Hop::Missing => {
                tracing::trace!(%resource, missing = %current, "Resource scope unresolved");
                return Ok(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_ref_accessors() {
        let id = Uuid::new_v4();
        let task = ResourceRef::Task(id);

        assert_eq!(task.kind(), ResourceKind::Task);
        assert_eq!(task.id(), id);
        assert_eq!(task.to_string(), format!("Task({})", id));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ResourceKind::Project.to_string(), "Project");
        assert_eq!(ResourceRef::User(Uuid::nil()).kind().as_str(), "User");
    }
}
