// =============================================================================
// Bearer Token Authentication — Axum Extractor
// =============================================================================
//
// Validates `Authorization: Bearer <token>` against the
// `SCREENER_ADMIN_TOKEN` environment variable.  Comparison is constant time.
//
//   async fn handler(_auth: AuthBearer, ...) { ... }
//
// A missing, malformed or wrong token short-circuits with 403 before the
// handler body runs.  When no token is configured every request is refused.
// =============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Environment variable holding the admin token.
pub const ADMIN_TOKEN_ENV: &str = "SCREENER_ADMIN_TOKEN";

/// Compare two byte slices in constant time.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Validated bearer token.
pub struct AuthBearer(pub String);

/// Rejection type returned when authentication fails.
#[derive(Debug)]
pub struct AuthRejection {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message,
        });
        (self.status, axum::Json(body)).into_response()
    }
}

/// Check an `Authorization` header value against `expected`.
fn check_bearer(header: Option<&str>, expected: &str) -> Result<String, AuthRejection> {
    if expected.is_empty() {
        warn!("{ADMIN_TOKEN_ENV} is not set, authenticated requests are rejected");
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Server authentication not configured",
        });
    }

    let token = match header.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            warn!("Missing or malformed Authorization header");
            return Err(AuthRejection {
                status: StatusCode::FORBIDDEN,
                message: "Missing or invalid authorization token",
            });
        }
    };

    if !constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        warn!("Invalid admin token presented");
        return Err(AuthRejection {
            status: StatusCode::FORBIDDEN,
            message: "Invalid authorization token",
        });
    }

    Ok(token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Read per request so the token can rotate without a restart.
        let expected = std::env::var(ADMIN_TOKEN_ENV).unwrap_or_default();
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        check_bearer(header, &expected).map(AuthBearer)
    }
}
