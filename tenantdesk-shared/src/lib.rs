//! # TenantDesk Shared Library
//!
//! Core of the TenantDesk multi-tenant workspace manager: identity, the role
//! policy, tenant scope resolution, quota enforcement and the authorization
//! gate that runs them in front of every resource operation, plus the
//! models and database plumbing they operate on.
//!
//! ## Modules
//!
//! - `auth`: tokens, password hashing, role policy, caller context
//! - `scope`: maps a resource back to its owning tenant
//! - `quota`: per-tenant user/project ceilings
//! - `gate`: authenticate, resolve, scope-check, authorize, quota-check
//! - `plans`: plan → ceiling catalog
//! - `models`: tenants, users, projects, tasks, revoked tokens
//! - `db`: connection pool and migrations

pub mod auth;
pub mod db;
pub mod gate;
pub mod models;
pub mod plans;
pub mod quota;
pub mod scope;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
