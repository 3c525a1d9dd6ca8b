//! Identity boundary
//!
//! Authentication itself is handled by the fronting gateway; this extractor
//! trusts its injected headers. A missing identity is the one failure class
//! surfaced as a hard 401 before any routing logic runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use ladle_core::UserIdentity;

use crate::routes::ErrorBody;

/// Authenticated caller, extracted from gateway-injected headers
pub struct AuthUser(pub UserIdentity);

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match header_value(parts, "x-user-id") {
            Some(id) => Ok(AuthUser(UserIdentity {
                id,
                email: header_value(parts, "x-user-email"),
                name: header_value(parts, "x-user-name"),
            })),
            None => Err((
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "authentication required".to_string(),
                }),
            )),
        }
    }
}
