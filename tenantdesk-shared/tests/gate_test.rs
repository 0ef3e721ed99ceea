//! Database-backed tests for scope resolution, quota enforcement and the
//! authorization gate.
//!
//! Require `DATABASE_URL`; each test returns early without it.

use chrono::Duration;
use futures::future::join_all;
use sqlx::PgPool;
use tenantdesk_shared::auth::context::AuthContext;
use tenantdesk_shared::auth::jwt;
use tenantdesk_shared::auth::policy::Action;
use tenantdesk_shared::db::{migrations, pool};
use tenantdesk_shared::gate::{self, GateError};
use tenantdesk_shared::models::project::{CreateProject, Project};
use tenantdesk_shared::models::revoked_token::RevokedToken;
use tenantdesk_shared::models::task::{CreateTask, Task, TaskPriority};
use tenantdesk_shared::models::tenant::{CreateTenant, SubscriptionPlan, Tenant, TenantStatus};
use tenantdesk_shared::models::user::{CreateUser, Role, User};
use tenantdesk_shared::quota::{self, QuotaError, ResourceClass};
use tenantdesk_shared::scope::{self, ResourceKind, ResourceRef};
use uuid::Uuid;

const SECRET: &str = "gate-test-secret-at-least-32-bytes-long";

async fn test_pool() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };

    let pool = pool::create_pool(pool::DatabaseConfig {
        url,
        ..Default::default()
    })
    .await
    .expect("connect");
    migrations::run_migrations(&pool).await.expect("migrate");
    Some(pool)
}

async fn create_tenant(pool: &PgPool, max_users: i32, max_projects: i32) -> Tenant {
    let suffix = Uuid::new_v4().simple().to_string();
    Tenant::create(
        pool,
        CreateTenant {
            name: format!("Gate {}", &suffix[..8]),
            subdomain: format!("gate-{}", suffix),
            status: TenantStatus::Active,
            plan: SubscriptionPlan::Free,
            max_users,
            max_projects,
        },
    )
    .await
    .unwrap()
}

async fn create_user(pool: &PgPool, tenant_id: Uuid, role: Role) -> User {
    User::create(
        pool,
        CreateUser {
            tenant_id,
            email: format!("gate-{}@tenantdesk.test", Uuid::new_v4()),
            password_hash: "unused".to_string(),
            full_name: "Gate User".to_string(),
            role,
        },
    )
    .await
    .unwrap()
}

fn context_for(user: &User) -> AuthContext {
    AuthContext::from_claims(&jwt::Claims::new(
        user.id,
        user.tenant_id,
        user.role,
        Duration::hours(1),
    ))
}

#[tokio::test]
async fn test_resolve_follows_ownership_chain() {
    let Some(pool) = test_pool().await else { return };
    let tenant = create_tenant(&pool, 5, 3).await;
    let user = create_user(&pool, tenant.id, Role::TenantAdmin).await;

    let project = Project::create(
        &pool,
        CreateProject {
            tenant_id: tenant.id,
            name: "Chain".to_string(),
            description: None,
            created_by: user.id,
        },
    )
    .await
    .unwrap();
    let task = Task::create(
        &pool,
        CreateTask {
            project_id: project.id,
            tenant_id: tenant.id,
            title: "Leaf".to_string(),
            description: None,
            priority: TaskPriority::Low,
            assigned_to: None,
            due_date: None,
        },
    )
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    for target in [
        ResourceRef::Tenant(tenant.id),
        ResourceRef::User(user.id),
        ResourceRef::Project(project.id),
        ResourceRef::Task(task.id),
    ] {
        assert_eq!(
            scope::resolve_tenant(&mut conn, target).await.unwrap(),
            Some(tenant.id),
            "{}",
            target
        );
    }

    assert_eq!(
        scope::resolve_tenant(&mut conn, ResourceRef::Task(Uuid::new_v4()))
            .await
            .unwrap(),
        None
    );

    Tenant::delete(&pool, tenant.id).await.unwrap();
}

#[tokio::test]
async fn test_task_tenant_must_match_project() {
    let Some(pool) = test_pool().await else { return };
    let owner = create_tenant(&pool, 5, 3).await;
    let other = create_tenant(&pool, 5, 3).await;
    let user = create_user(&pool, owner.id, Role::TenantAdmin).await;

    let project = Project::create(
        &pool,
        CreateProject {
            tenant_id: owner.id,
            name: "Guarded".to_string(),
            description: None,
            created_by: user.id,
        },
    )
    .await
    .unwrap();

    // The composite foreign key refuses a task whose tenant differs from its project's
    let result = Task::create(
        &pool,
        CreateTask {
            project_id: project.id,
            tenant_id: other.id,
            title: "Misfiled".to_string(),
            description: None,
            priority: TaskPriority::Medium,
            assigned_to: None,
            due_date: None,
        },
    )
    .await;
    assert!(matches!(
        result.map_err(GateError::from),
        Err(GateError::NotFound(ResourceKind::Project))
    ));

    Tenant::delete(&pool, owner.id).await.unwrap();
    Tenant::delete(&pool, other.id).await.unwrap();
}

#[tokio::test]
async fn test_vanished_references_are_not_internal_errors() {
    let Some(pool) = test_pool().await else { return };
    let tenant = create_tenant(&pool, 5, 3).await;
    let user = create_user(&pool, tenant.id, Role::TenantAdmin).await;

    let project = Project::create(
        &pool,
        CreateProject {
            tenant_id: tenant.id,
            name: "Shortlived".to_string(),
            description: None,
            created_by: user.id,
        },
    )
    .await
    .unwrap();

    let task = |project_id, assigned_to| CreateTask {
        project_id,
        tenant_id: tenant.id,
        title: "Orphan".to_string(),
        description: None,
        priority: TaskPriority::Medium,
        assigned_to,
        due_date: None,
    };

    // Assignee deleted between the check and the insert
    let result = Task::create(&pool, task(project.id, Some(Uuid::new_v4()))).await;
    assert!(matches!(
        result.map_err(GateError::from),
        Err(GateError::Validation(msg)) if msg == "Assignee not found in this tenant"
    ));

    // Project deleted between admission and the insert
    assert!(Project::delete(&pool, project.id).await.unwrap());
    let result = Task::create(&pool, task(project.id, None)).await;
    assert!(matches!(
        result.map_err(GateError::from),
        Err(GateError::NotFound(ResourceKind::Project))
    ));

    Tenant::delete(&pool, tenant.id).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_quota_checks_serialize() {
    let Some(pool) = test_pool().await else { return };
    let tenant = create_tenant(&pool, 10, 2).await;
    let creator = create_user(&pool, tenant.id, Role::TenantAdmin).await;

    let attempts = (0..6).map(|i| {
        let pool = pool.clone();
        let tenant_id = tenant.id;
        let created_by = creator.id;
        tokio::spawn(async move {
            let mut tx = pool.begin().await?;
            quota::check_and_count(&mut tx, tenant_id, ResourceClass::Projects).await?;
            Project::create(
                &mut *tx,
                CreateProject {
                    tenant_id,
                    name: format!("Racer {}", i),
                    description: None,
                    created_by,
                },
            )
            .await?;
            tx.commit().await?;
            Ok::<_, QuotaError>(())
        })
    });

    let outcomes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let admitted = outcomes.iter().filter(|r| r.is_ok()).count();
    let refused = outcomes
        .iter()
        .filter(|r| {
            matches!(
                r,
                Err(QuotaError::LimitExceeded {
                    class: ResourceClass::Projects,
                    limit: 2,
                    current: 2
                })
            )
        })
        .count();
    assert_eq!(admitted, 2);
    assert_eq!(refused, 4);

    let mut conn = pool.acquire().await.unwrap();
    let usage = quota::usage(&mut conn, tenant.id).await.unwrap().unwrap();
    assert_eq!(usage.projects.current, 2);
    assert!(!usage.projects.allowed);
    assert_eq!(usage.users.current, 1);

    Tenant::delete(&pool, tenant.id).await.unwrap();
}

#[tokio::test]
async fn test_admit_hides_foreign_resources() {
    let Some(pool) = test_pool().await else { return };
    let home = create_tenant(&pool, 5, 3).await;
    let away = create_tenant(&pool, 5, 3).await;
    let caller = create_user(&pool, home.id, Role::TenantAdmin).await;
    let stranger = create_user(&pool, away.id, Role::User).await;
    let ctx = context_for(&caller);

    let mut conn = pool.acquire().await.unwrap();

    let foreign = gate::admit(&mut conn, &ctx, ResourceRef::User(stranger.id), Action::DeleteUser).await;
    let missing = gate::admit(&mut conn, &ctx, ResourceRef::User(Uuid::new_v4()), Action::DeleteUser).await;
    assert!(matches!(foreign, Err(GateError::NotFound(ResourceKind::User))));
    assert!(matches!(missing, Err(GateError::NotFound(ResourceKind::User))));

    let admission = gate::admit(&mut conn, &ctx, ResourceRef::Tenant(home.id), Action::ListUsers)
        .await
        .unwrap();
    assert_eq!(admission.tenant_id, home.id);
    assert!(admission.facts.same_tenant);

    // A super admin passes the tenant check
    let root = create_user(&pool, home.id, Role::SuperAdmin).await;
    let admission = gate::admit(
        &mut conn,
        &context_for(&root),
        ResourceRef::User(stranger.id),
        Action::DeleteUser,
    )
    .await
    .unwrap();
    assert_eq!(admission.tenant_id, away.id);
    assert!(!admission.facts.same_tenant);

    drop(conn);
    Tenant::delete(&pool, home.id).await.unwrap();
    Tenant::delete(&pool, away.id).await.unwrap();
}

#[tokio::test]
async fn test_authenticate_rejects_revoked_and_stale_tokens() {
    let Some(pool) = test_pool().await else { return };
    let tenant = create_tenant(&pool, 5, 3).await;
    let user = create_user(&pool, tenant.id, Role::User).await;

    let claims = jwt::Claims::new(user.id, tenant.id, Role::User, Duration::hours(1));
    let header = format!("Bearer {}", jwt::create_token(&claims, SECRET).unwrap());

    let ctx = gate::authenticate(&pool, Some(&header), SECRET).await.unwrap();
    assert_eq!(ctx.user_id, user.id);
    assert_eq!(ctx.token_id, claims.jti);

    assert!(matches!(
        gate::authenticate(&pool, None, SECRET).await,
        Err(GateError::Unauthenticated(_))
    ));
    assert!(matches!(
        gate::authenticate(&pool, Some(&header), "another-secret-that-is-32-bytes-long").await,
        Err(GateError::Unauthenticated(_))
    ));

    // Claimed role no longer matches storage
    let forged = jwt::issue(user.id, tenant.id, Role::TenantAdmin, Duration::hours(1), SECRET).unwrap();
    assert!(matches!(
        gate::authenticate(&pool, Some(&format!("Bearer {}", forged)), SECRET).await,
        Err(GateError::Unauthenticated(_))
    ));

    RevokedToken::revoke(&pool, claims.jti, user.id, claims.expires_at())
        .await
        .unwrap();
    assert!(matches!(
        gate::authenticate(&pool, Some(&header), SECRET).await,
        Err(GateError::Unauthenticated(msg)) if msg == "Token has been revoked"
    ));

    Tenant::delete(&pool, tenant.id).await.unwrap();
}
