/// Authenticated caller context
///
/// Built by [`crate::gate::authenticate`] once per request and handed to
/// handlers through request extensions.
///
/// ```
/// use tenantdesk_shared::auth::context::AuthContext;
///
/// async fn handler(auth: AuthContext) -> String {
///     format!("User {} acting in tenant {} as {}", auth.user_id, auth.tenant_id, auth.role)
/// }
/// ```

use super::jwt::Claims;
use crate::models::user::Role;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub role: Role,

    /// `jti` of the presented token
    pub token_id: Uuid,

    pub expires_at: DateTime<Utc>,
}

impl AuthContext {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: claims.tenant,
            role: claims.role,
            token_id: claims.jti,
            expires_at: claims.expires_at(),
        }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role.is_super_admin()
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header value
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
pub fn extract_bearer(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer("bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("Basic dXNlcjpwYXNz"), None);
        assert_eq!(extract_bearer("Bearer "), None);
        assert_eq!(extract_bearer("Bearer"), None);
        assert_eq!(extract_bearer(""), None);
    }

    #[test]
    fn test_from_claims() {
        let claims = Claims::new(Uuid::new_v4(), Uuid::new_v4(), Role::TenantAdmin, Duration::hours(1));
        let ctx = AuthContext::from_claims(&claims);

        assert_eq!(ctx.user_id, claims.sub);
        assert_eq!(ctx.tenant_id, claims.tenant);
        assert_eq!(ctx.token_id, claims.jti);
        assert_eq!(ctx.expires_at.timestamp(), claims.exp);
        assert!(!ctx.is_super_admin());
    }
}
