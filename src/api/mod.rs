use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::{Bytes, Full};
use axum::http::header::COOKIE;
use axum::http::{HeaderMap, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use cookie::Cookie;
use serde_json::json;

use crate::cache::ImageCache;
use crate::contact::ContactStore;
use crate::gate::{AdmissionPolicy, FixedWindowGate};
use crate::token::TokenIssuer;
use crate::upstream::ImageProvider;

pub mod contact;
pub mod image;
pub mod token;

/// Shared state behind every handler. The provider and contact store
/// sit behind trait objects so tests can swap in stubs.
pub struct Context {
    pub gate: Box<dyn AdmissionPolicy>,
    pub cache: ImageCache,
    pub provider: Arc<dyn ImageProvider>,
    pub tokens: TokenIssuer,
    pub contacts: Arc<dyn ContactStore>,
    pub contact_limiter: FixedWindowGate,
}

pub enum AppError {
    Unauthorized,
    Forbidden,
    RateLimited,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(inner: anyhow::Error) -> Self {
        AppError::Internal(inner)
    }
}

impl IntoResponse for AppError {
    type Body = Full<Bytes>;
    type BodyError = Infallible;

    fn into_response(self) -> Response<Self::Body> {
        let (status, error_message) = match self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid access token".to_owned(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_owned()),
            AppError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, "Too many requests".to_owned())
            }
            AppError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let body = Json(json!({
            "type": "error",
            "message": error_message,
        }));

        (status, body).into_response()
    }
}

/// First value of a cookie with the given name, across however many
/// Cookie headers the client sent
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|raw| Cookie::parse(raw.trim()).ok())
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_owned())
}

/// Client identity as seen through the reverse proxy, falling back
/// to the socket address for direct connections
pub fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
