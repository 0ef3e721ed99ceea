/// Success envelope for API responses
///
/// Every successful handler returns `{"success": true, "data": ...}`.
/// Failures use the matching shape from [`crate::error::ApiError`].
///
/// # Example
///
/// ```
/// use tenantdesk_api::response::ApiResponse;
///
/// async fn handler() -> ApiResponse<Vec<&'static str>> {
///     ApiResponse::success(vec!["a", "b"])
/// }
/// ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct Envelope<T> {
    success: bool,
    data: T,
}

/// Successful response carrying `data` with a status code
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status_code: StatusCode,
}

impl<T> ApiResponse<T> {
    /// 200 OK
    pub fn success(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::OK,
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self {
            data,
            status_code: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let body = Json(Envelope {
            success: true,
            data: self.data,
        });

        (self.status_code, body).into_response()
    }
}
