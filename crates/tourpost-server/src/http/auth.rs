use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use super::JsonResponse;

/// Bearer token auth middleware. Skips `/health`. Short-circuits if auth is disabled.
pub async fn check(req: Request, next: Next, auth_enabled: bool, token: Option<String>) -> Response {
    if !auth_enabled || req.uri().path() == "/health" {
        return next.run(req).await;
    }

    let Some(expected) = token.as_deref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(JsonResponse::<()>::err("Auth enabled but no token configured")),
        )
            .into_response();
    };

    // None: no header. Some(false): wrong token.
    let authorized = req.headers().get(header::AUTHORIZATION).map(|value| {
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            == Some(expected)
    });

    match authorized {
        Some(true) => next.run(req).await,
        Some(false) => (StatusCode::UNAUTHORIZED, Json(JsonResponse::<()>::err("Invalid token")))
            .into_response(),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(JsonResponse::<()>::err("Missing Authorization header")),
        )
            .into_response(),
    }
}
