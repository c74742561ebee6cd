use std::sync::Arc;

use axum::body::{Bytes, Full};
use axum::extract::Extension;
use axum::http::header::{HeaderValue, SET_COOKIE};
use axum::http::{HeaderMap, Response, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::api::{cookie_value, AppError, Context};
use crate::token::ACCESS_COOKIE_NAME;

/// Called on page load: mints a fresh access token and hands it back
/// as the HTTP-only cookie the image endpoint expects
pub async fn issue_token(
    Extension(ctx): Extension<Arc<Context>>,
) -> Result<Response<Full<Bytes>>, AppError> {
    let token = ctx.tokens.issue()?;
    let cookie = ctx.tokens.access_cookie(token);
    let mut response = (StatusCode::OK, Json(json!({ "ok": true }))).into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|err| AppError::Internal(err.into()))?,
    );
    Ok(response)
}

/// Every verification failure looks identical from the outside
pub async fn verify_token(
    Extension(ctx): Extension<Arc<Context>>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    let token = cookie_value(&headers, ACCESS_COOKIE_NAME).ok_or(AppError::Unauthorized)?;
    ctx.tokens
        .verify(&token)
        .map_err(|_| AppError::Unauthorized)?;
    Ok(StatusCode::NO_CONTENT)
}
