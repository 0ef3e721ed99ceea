/// Configuration management for the API server
///
/// Loaded from environment variables (and a `.env` file in development).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `DATABASE_ACQUIRE_TIMEOUT_SECONDS`: wait for a pooled connection (default: 5)
/// - `DATABASE_STATEMENT_TIMEOUT_MS`: per-statement limit, 0 disables (default: 5000)
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `API_PORT`: port to bind to (default: 8080)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default: *)
/// - `PRODUCTION`: `true` in production deployments (default: false)
/// - `JWT_SECRET`: token signing secret, at least 32 characters (required)
/// - `JWT_EXPIRATION_HOURS`: token lifetime (default: 24)
/// - `SUPER_ADMIN_EMAIL` / `SUPER_ADMIN_PASSWORD`: optional platform operator
///   ensured at startup
/// - `PLAN__<PLAN>__MAX_USERS` / `PLAN__<PLAN>__MAX_PROJECTS`: plan ceilings
/// - `RUST_LOG`, `LOG_FORMAT`: logging (see `main.rs`)
///
/// # Example
///
/// ```no_run
/// use tenantdesk_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;
use tenantdesk_shared::auth::jwt::DEFAULT_TOKEN_TTL_HOURS;
use tenantdesk_shared::db::pool;
use tenantdesk_shared::plans::PlanCatalog;

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub plans: PlanCatalog,

    /// Platform operator to ensure at startup, if configured
    pub super_admin: Option<SuperAdminConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,

    /// `None` disables the statement timeout
    pub statement_timeout_ms: Option<u64>,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HS256 signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    pub expiration_hours: i64,
}

/// Credentials for the bootstrap super admin
#[derive(Debug, Clone)]
pub struct SuperAdminConfig {
    pub email: String,
    pub password: String,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value: {}", key, e)),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Fails when a required variable is missing, a value does not parse,
    /// or `JWT_SECRET` is shorter than 32 characters.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LEN
            );
        }

        let expiration_hours = env_or("JWT_EXPIRATION_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if expiration_hours <= 0 {
            anyhow::bail!("JWT_EXPIRATION_HOURS must be positive");
        }

        let statement_timeout_ms = match env_or::<u64>("DATABASE_STATEMENT_TIMEOUT_MS", 5000)? {
            0 => None,
            ms => Some(ms),
        };

        let super_admin = match (env::var("SUPER_ADMIN_EMAIL"), env::var("SUPER_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(SuperAdminConfig { email, password }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("API_PORT", 8080)?,
                cors_origins: parse_origins(
                    &env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
                production: env_or("PRODUCTION", false)?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10)?,
                acquire_timeout_seconds: env_or("DATABASE_ACQUIRE_TIMEOUT_SECONDS", 5)?,
                statement_timeout_ms,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours,
            },
            plans: PlanCatalog::from_env()?,
            super_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for [`tenantdesk_shared::db::pool::create_pool`]
    pub fn pool_config(&self) -> pool::DatabaseConfig {
        pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            acquire_timeout_seconds: self.database.acquire_timeout_seconds,
            statement_timeout_ms: self.database.statement_timeout_ms,
            ..Default::default()
        }
    }

    /// Lifetime of issued identity tokens
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.expiration_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 4,
                acquire_timeout_seconds: 2,
                statement_timeout_ms: Some(1000),
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                expiration_hours: 24,
            },
            plans: PlanCatalog::default(),
            super_admin: None,
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(sample().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_pool_config() {
        let pool = sample().pool_config();
        assert_eq!(pool.max_connections, 4);
        assert_eq!(pool.acquire_timeout_seconds, 2);
        assert_eq!(pool.statement_timeout_ms, Some(1000));
        assert_eq!(pool.url, "postgresql://localhost/test");
    }

    #[test]
    fn test_token_ttl() {
        assert_eq!(sample().token_ttl(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins("https://a.example.com, https://b.example.com,,"),
            vec!["https://a.example.com", "https://b.example.com"]
        );
        assert!(parse_origins("").is_empty());
    }
}
