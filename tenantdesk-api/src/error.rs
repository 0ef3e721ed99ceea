/// Error handling for the API server
///
/// Handlers return `Result<T, ApiError>`. Every error renders as
/// `{"success": false, "error": "<message>"}` with the status code of its
/// kind:
///
/// | Variant | Status |
/// |---|---|
/// | `BadRequest`, `ValidationError` | 400 |
/// | `Unauthorized` | 401 |
/// | `Forbidden` | 403 |
/// | `NotFound` | 404 |
/// | `Conflict`, `QuotaExceeded` | 409 |
/// | `InternalError` | 500 |
/// | `ServiceUnavailable` | 503 |
///
/// # Example
///
/// ```
/// use tenantdesk_api::error::{ApiError, ApiResult};
///
/// fn parse_limit(raw: &str) -> ApiResult<i64> {
///     raw.parse()
///         .map_err(|_| ApiError::BadRequest("limit must be a number".to_string()))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use tenantdesk_shared::auth::jwt::JwtError;
use tenantdesk_shared::auth::password::PasswordError;
use tenantdesk_shared::gate::GateError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400), e.g. an empty update
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404), also used for resources of another tenant
    NotFound(String),

    /// Conflict (409), e.g. duplicate email
    Conflict(String),

    /// Plan ceiling reached (409)
    QuotaExceeded(String),

    /// Field validation failed (400)
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

impl ValidationErrorDetail {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure envelope
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::QuotaExceeded(msg) => write!(f, "Quota exceeded: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) | ApiError::QuotaExceeded(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Message shown to the client
    fn client_message(self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::QuotaExceeded(msg)
            | ApiError::ServiceUnavailable(msg) => msg,
            ApiError::ValidationError(errors) => errors
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorBody {
            success: false,
            error: self.client_message(),
        });

        (status, body).into_response()
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Unauthenticated(msg) => ApiError::Unauthorized(msg),
            GateError::Forbidden(msg) => ApiError::Forbidden(msg),
            err @ GateError::NotFound(_) => ApiError::NotFound(err.to_string()),
            err @ GateError::QuotaExceeded { .. } => ApiError::QuotaExceeded(err.to_string()),
            GateError::Validation(msg) => ApiError::BadRequest(msg),
            GateError::Conflict(msg) => ApiError::Conflict(msg),
            err @ GateError::Timeout => ApiError::ServiceUnavailable(err.to_string()),
            GateError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

/// Storage errors go through the gate's classification
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        GateError::from(err).into()
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        GateError::from(err).into()
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    ValidationErrorDetail::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| "Validation failed".to_string()),
                    )
                })
            })
            .collect();

        // HashMap order is unstable
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tenantdesk_shared::quota::ResourceClass;
    use tenantdesk_shared::scope::ResourceKind;
    use validator::Validate;

    async fn render(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("User not found".to_string());
        assert_eq!(err.to_string(), "Not found: User not found");
    }

    #[tokio::test]
    async fn test_failure_envelope() {
        let (status, body) = render(ApiError::Forbidden("Insufficient permissions".into())).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            json!({"success": false, "error": "Insufficient permissions"})
        );
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let (status, body) =
            render(ApiError::InternalError("relation \"users\" does not exist".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[test]
    fn test_gate_error_status_mapping() {
        let cases = [
            (GateError::Unauthenticated("x".into()), StatusCode::UNAUTHORIZED),
            (GateError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (GateError::NotFound(ResourceKind::Project), StatusCode::NOT_FOUND),
            (
                GateError::QuotaExceeded {
                    class: ResourceClass::Users,
                    limit: 2,
                    current: 2,
                },
                StatusCode::CONFLICT,
            ),
            (GateError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (GateError::Conflict("x".into()), StatusCode::CONFLICT),
            (GateError::Timeout, StatusCode::SERVICE_UNAVAILABLE),
            (GateError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (gate_err, expected) in cases {
            assert_eq!(ApiError::from(gate_err).status_code(), expected);
        }
    }

    #[tokio::test]
    async fn test_not_found_message_names_kind() {
        let err: ApiError = GateError::NotFound(ResourceKind::Task).into();
        let (_, body) = render(err).await;
        assert_eq!(body["error"], "Task not found");
    }

    #[test]
    fn test_pool_timeout_is_unavailable() {
        let err: ApiError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[derive(Validate)]
    struct Sample {
        #[validate(email(message = "Invalid email format"))]
        email: String,
        #[validate(length(min = 1, message = "Name is required"))]
        name: String,
    }

    #[tokio::test]
    async fn test_validation_errors_are_joined() {
        let sample = Sample {
            email: "nope".to_string(),
            name: String::new(),
        };
        let err: ApiError = sample.validate().unwrap_err().into();

        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "email: Invalid email format; name: Name is required"
        );
    }
}
