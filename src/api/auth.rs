//! Caller identity
//!
//! Tokens are checked by the auth proxy in front of this service, which
//! forwards the caller as `x-user-*` headers.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;
use crate::service::{Actor, Role};

pub const USER_ID: &str = "x-user-id";
pub const USER_NAME: &str = "x-user-name";
pub const USER_EMAIL: &str = "x-user-email";
pub const USER_ROLE: &str = "x-user-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim).filter(|v| !v.is_empty())
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(serde_json::json!({"success": false, "message": "Not authenticated"}))).into_response()
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let user_id = header(headers, USER_ID)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(unauthorized)?;
        let role = match header(headers, USER_ROLE) {
            Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::Customer,
        };
        Ok(Actor {
            user_id,
            name: header(headers, USER_NAME).unwrap_or_default().to_string(),
            email: header(headers, USER_EMAIL).unwrap_or_default().to_string(),
            role,
        })
    }
}
