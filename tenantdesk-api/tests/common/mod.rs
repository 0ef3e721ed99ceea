//! Common test utilities for integration tests
//!
//! Tests need a PostgreSQL database in `DATABASE_URL`. When it is unset,
//! [`TestContext::new`] returns `None` and the test returns early.
//!
//! Each context registers its own tenants with unique subdomains and emails
//! and deletes them in [`TestContext::cleanup`], so tests can share one
//! database and run in parallel.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Mutex;
use tenantdesk_api::app::{build_router, AppState};
use tenantdesk_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use tenantdesk_shared::models::tenant::{Tenant, UpdateTenant};
use tenantdesk_shared::plans::PlanCatalog;
use tower::Service as _;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "Str0ng!Pass";

/// A registered tenant and its first admin
#[derive(Debug, Clone)]
pub struct TenantFixture {
    pub tenant_id: Uuid,
    pub admin_id: Uuid,
    pub admin_email: String,
    pub admin_token: String,
}

/// A user added to a tenant, with a fresh login token
#[derive(Debug, Clone)]
pub struct UserFixture {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    tenants: Mutex<Vec<Uuid>>,
}

fn test_config(database_url: String) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
            production: false,
        },
        database: DatabaseConfig {
            url: database_url,
            max_connections: 10,
            acquire_timeout_seconds: 5,
            statement_timeout_ms: Some(5000),
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiration_hours: 1,
        },
        plans: PlanCatalog::default(),
        super_admin: None,
    }
}

fn unique_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

impl TestContext {
    /// Connects, migrates and builds the router; `None` without a database
    pub async fn new() -> Option<Self> {
        dotenvy::dotenv().ok();

        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping integration test");
            return None;
        };

        let config = test_config(database_url);
        let db = tenantdesk_shared::db::pool::create_pool(config.pool_config())
            .await
            .expect("connect to test database");

        tenantdesk_shared::db::migrations::run_migrations(&db)
            .await
            .expect("run migrations");

        let app = build_router(AppState::new(db.clone(), config.clone()));

        Some(TestContext {
            db,
            app,
            config,
            tenants: Mutex::new(Vec::new()),
        })
    }

    /// Sends a request and returns the status and parsed JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!(
                    "non-JSON body for {}: {}",
                    status,
                    String::from_utf8_lossy(&bytes)
                )
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers a tenant through the API
    pub async fn register_tenant(&self) -> TenantFixture {
        let suffix = unique_suffix();
        let email = format!("admin-{}@tenantdesk.test", suffix);

        let (status, body) = self
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(json!({
                    "tenant_name": format!("Tenant {}", suffix),
                    "subdomain": format!("t-{}", suffix),
                    "email": email,
                    "password": TEST_PASSWORD,
                    "full_name": "Tenant Admin"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let data = &body["data"];
        let tenant_id: Uuid = data["tenant"]["id"].as_str().unwrap().parse().unwrap();
        self.tenants.lock().unwrap().push(tenant_id);

        TenantFixture {
            tenant_id,
            admin_id: data["user"]["id"].as_str().unwrap().parse().unwrap(),
            admin_email: email,
            admin_token: data["token"].as_str().unwrap().to_string(),
        }
    }

    /// Overrides a tenant's ceilings directly in storage
    pub async fn set_limits(&self, tenant_id: Uuid, max_users: i32, max_projects: i32) {
        Tenant::update(
            &self.db,
            tenant_id,
            UpdateTenant {
                max_users: Some(max_users),
                max_projects: Some(max_projects),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    }

    /// Adds a user through the API and logs them in
    pub async fn add_user(&self, tenant: &TenantFixture, role: &str) -> UserFixture {
        let email = format!("user-{}@tenantdesk.test", unique_suffix());

        let (status, body) = self
            .post(
                &format!("/v1/tenants/{}/users", tenant.tenant_id),
                &tenant.admin_token,
                json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                    "full_name": "Team Member",
                    "role": role
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "add user failed: {}", body);

        let id = body["data"]["id"].as_str().unwrap().parse().unwrap();
        let token = self.login(&email, TEST_PASSWORD).await;

        UserFixture { id, email, token }
    }

    pub async fn login(&self, email: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .post("/v1/projects", token, json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);

        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    /// Deletes every tenant this context registered (cascades to their data)
    pub async fn cleanup(&self) {
        let tenants: Vec<Uuid> = self.tenants.lock().unwrap().drain(..).collect();
        for tenant_id in tenants {
            Tenant::delete(&self.db, tenant_id).await.unwrap();
        }
    }
}
