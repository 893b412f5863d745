use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Require `Authorization: Bearer <key>` when an API key is configured.
pub async fn admin_auth_middleware(
    State(api_key): State<Option<Arc<str>>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = api_key else {
        return Ok(next.run(request).await);
    };

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*expected);

    if authorized {
        Ok(next.run(request).await)
    } else {
        tracing::warn!(path = %request.uri().path(), "Unauthorized config API request");
        Err(StatusCode::UNAUTHORIZED)
    }
}
