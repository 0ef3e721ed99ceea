/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use tenantdesk_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = tenantdesk_api::app::build_router(AppState::new(pool, config));
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tenantdesk_shared::gate;
use tenantdesk_shared::plans::PlanCatalog;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Holds the pool and configuration only. Tenant, user and quota state is
/// always read from the database.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.config.plans
    }
}

/// Builds the complete router
///
/// ```text
/// /health                              GET     public
/// /v1/auth/register                    POST    public
/// /v1/auth/login                       POST    public
/// /v1/auth/me                          GET
/// /v1/auth/logout                      POST
/// /v1/tenants                          GET     super_admin
/// /v1/tenants/:tenant_id               GET PUT
/// /v1/tenants/:tenant_id/usage         GET
/// /v1/tenants/:tenant_id/users         GET POST
/// /v1/users/:user_id                   PUT DELETE
/// /v1/projects                         GET POST
/// /v1/projects/:project_id             GET PUT DELETE
/// /v1/projects/:project_id/tasks       GET POST
/// /v1/tasks/:task_id                   GET PUT DELETE
/// /v1/tasks/:task_id/status            PATCH
/// ```
///
/// Everything except `/health`, register and login runs behind
/// [`jwt_auth_layer`].
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let session_routes = Router::new()
        .route("/me", get(routes::auth::me))
        .route("/logout", post(routes::auth::logout));

    let tenant_routes = Router::new()
        .route("/", get(routes::tenants::list_tenants))
        .route(
            "/:tenant_id",
            get(routes::tenants::get_tenant).put(routes::tenants::update_tenant),
        )
        .route("/:tenant_id/usage", get(routes::tenants::get_usage))
        .route(
            "/:tenant_id/users",
            get(routes::users::list_users).post(routes::users::add_user),
        );

    let user_routes = Router::new().route(
        "/:user_id",
        put(routes::users::update_user).delete(routes::users::delete_user),
    );

    let project_routes = Router::new()
        .route(
            "/",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/:project_id",
            get(routes::projects::get_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/:project_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        );

    let task_routes = Router::new()
        .route(
            "/:task_id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:task_id/status", patch(routes::tasks::set_task_status));

    let protected_routes = Router::new()
        .nest("/auth", session_routes)
        .nest("/tenants", tenant_routes)
        .nest("/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes)
        .merge(protected_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        if config.api.production {
            tracing::warn!("CORS allows any origin in production");
        }
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Authenticates the bearer token and injects the
/// [`tenantdesk_shared::auth::context::AuthContext`] into request extensions
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let auth = gate::authenticate(&state.db, authorization, state.jwt_secret()).await?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
