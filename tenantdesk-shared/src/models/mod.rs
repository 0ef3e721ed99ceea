/// Database models for TenantDesk
///
/// Every model follows the same conventions:
/// - Plain structs deriving `sqlx::FromRow` for reads
/// - `Create*` / `Update*` input structs
/// - Associated async functions generic over `sqlx::PgExecutor`, so the same
///   query runs against a pool, a pooled connection, or an open transaction
///
/// Tenant scoping is not enforced here. Callers go through
/// [`crate::gate`] first; the models only read and write rows.

pub mod project;
pub mod revoked_token;
pub mod task;
pub mod tenant;
pub mod user;

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page a caller may request
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Pagination parameters as supplied by a caller
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageParams {
    /// Clamps the parameters to a valid `(limit, offset)` pair
    pub fn normalized(&self) -> (i64, i64) {
        let limit = self
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// One page of a listing together with the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, limit: i64, offset: i64) -> Self {
        Self {
            items,
            total,
            limit,
            offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults() {
        let params = PageParams::default();
        assert_eq!(params.normalized(), (DEFAULT_PAGE_LIMIT, 0));
    }

    #[test]
    fn test_page_params_clamped() {
        let params = PageParams {
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(params.normalized(), (MAX_PAGE_LIMIT, 0));

        let params = PageParams {
            limit: Some(0),
            offset: Some(40),
        };
        assert_eq!(params.normalized(), (1, 40));
    }
}
