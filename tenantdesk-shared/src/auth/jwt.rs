/// Identity token issue and validation
///
/// Tokens are HS256-signed JWTs carrying who the bearer is, which tenant
/// they act in, and their role. They are stateless; the only server-side
/// state is the logout deny-list consulted by [`crate::gate::authenticate`].
///
/// # Claims
///
/// Registered claim names are used where one exists:
///
/// - `sub`: subject (user ID)
/// - `iat`: issued at (Unix timestamp)
/// - `exp`: expires at (Unix timestamp)
/// - `nbf`: not before
/// - `iss`: always `"tenantdesk"`
/// - `jti`: token ID, the key for revocation
///
/// plus `tenant` (tenant ID) and `role`.
///
/// # Example
///
/// ```
/// use tenantdesk_shared::auth::jwt::{issue, validate};
/// use tenantdesk_shared::models::user::Role;
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "an-example-secret-of-at-least-32-bytes";
/// let user_id = Uuid::new_v4();
/// let token = issue(user_id, Uuid::new_v4(), Role::User, Duration::hours(24), secret)?;
///
/// let claims = validate(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use crate::models::user::Role;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed issuer claim
pub const ISSUER: &str = "tenantdesk";

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Invalid token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token issuer")]
    InvalidIssuer,
}

/// Decoded, verified token contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Tenant the subject belongs to
    pub tenant: Uuid,

    pub role: Role,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expires at (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    pub iss: String,

    /// Token ID
    pub jti: Uuid,
}

impl Claims {
    /// Creates claims valid from now for `ttl`
    pub fn new(user_id: Uuid, tenant_id: Uuid, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            tenant: tenant_id,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            nbf: now.timestamp(),
            iss: ISSUER.to_string(),
            jti: Uuid::new_v4(),
        }
    }

    /// True once the current time reaches `exp`
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// Signs `claims` with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a token for a user
pub fn issue(
    user_id: Uuid,
    tenant_id: Uuid,
    role: Role,
    ttl: Duration,
    secret: &str,
) -> Result<String, JwtError> {
    create_token(&Claims::new(user_id, tenant_id, role, ttl), secret)
}

/// Verifies signature, issuer and lifetime and returns the claims
///
/// Expiry is strict: a token is rejected from the second `exp` is reached,
/// with no leeway.
pub fn validate(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "sub", "iss"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    let claims = token_data.claims;
    if claims.is_expired() {
        return Err(JwtError::Expired);
    }

    Ok(claims)
}
