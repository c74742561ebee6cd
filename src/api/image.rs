use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Bytes, Full};
use axum::extract::{ConnectInfo, Extension, Query};
use axum::http::header::{HeaderName, HeaderValue, ACCEPT_LANGUAGE, SET_COOKIE, USER_AGENT};
use axum::http::{HeaderMap, Response, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Json;
use log::{error, warn};
use serde::Deserialize;

use crate::api::{cookie_value, forwarded_ip, AppError, Context};
use crate::fallback;
use crate::gate::ClientRequest;
use crate::models::{DenyReason, Dimensions, ImageResponse, DEFAULT_DIMENSIONS};
use crate::token::ACCESS_COOKIE_NAME;

const X_IMAGE_SOURCE: &str = "x-image-source";
const X_CACHE_STATUS: &str = "x-cache-status";

#[derive(Debug, Deserialize)]
pub struct ImageQuery {
    pub dim: Option<String>,
}

fn header_str<'a>(headers: &'a HeaderMap, name: HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn append_cookie(
    response: &mut Response<Full<Bytes>>,
    cookie: cookie::Cookie<'static>,
) -> Result<(), AppError> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|err| AppError::Internal(err.into()))?;
    response.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

fn tag_source(response: &mut Response<Full<Bytes>>, source: &'static str, status: &'static str) {
    let headers = response.headers_mut();
    headers.insert(
        HeaderName::from_static(X_IMAGE_SOURCE),
        HeaderValue::from_static(source),
    );
    headers.insert(
        HeaderName::from_static(X_CACHE_STATUS),
        HeaderValue::from_static(status),
    );
}

/// Degraded path for denied requests: bot-ish denials are hard 403s,
/// rate limits get masked with a previously served image when the
/// client still has one
fn deny(headers: &HeaderMap, reason: DenyReason) -> Result<Response<Full<Bytes>>, AppError> {
    match reason {
        DenyReason::Bot | DenyReason::Shield | DenyReason::HostingIp => {
            warn!("Blocked image request ({:?})", reason);
            Err(AppError::Forbidden)
        }
        _ => {
            let pool = fallback::read_pool(headers);
            match fallback::pick(&pool) {
                Some(record) => Ok((
                    StatusCode::OK,
                    Json(ImageResponse::Ratelimit {
                        image: record.clone(),
                    }),
                )
                    .into_response()),
                None => Err(AppError::RateLimited),
            }
        }
    }
}

/// The image gateway: token check, gate, cache, upstream, fallback
/// cookie, in that order
pub async fn get_image(
    Extension(ctx): Extension<Arc<Context>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    Query(query): Query<ImageQuery>,
    headers: HeaderMap,
) -> Result<Response<Full<Bytes>>, AppError> {
    let token = cookie_value(&headers, ACCESS_COOKIE_NAME).ok_or(AppError::Unauthorized)?;
    ctx.tokens
        .verify(&token)
        .map_err(|_| AppError::Unauthorized)?;

    let ip = forwarded_ip(&headers).unwrap_or_else(|| addr.ip());
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let client = ClientRequest {
        ip,
        user_agent: header_str(&headers, USER_AGENT),
        accept_language: header_str(&headers, ACCEPT_LANGUAGE),
        path_and_query,
    };
    let decision = ctx.gate.evaluate(&client);
    if !decision.allowed {
        return deny(&headers, decision.reason);
    }

    let orientation = query
        .dim
        .as_deref()
        .map(Dimensions::parse)
        .unwrap_or(DEFAULT_DIMENSIONS)
        .orientation();

    // every successful serve, cached or fresh, also becomes the
    // client's newest rate limit mask
    let pool_size = fallback::pool_size(&headers);

    if let Some(record) = ctx.cache.get(orientation) {
        let fallback_cookie = fallback::next_cookie(pool_size, &record)?;
        let mut response =
            (StatusCode::OK, Json(ImageResponse::Success { image: record })).into_response();
        tag_source(&mut response, "cache", "HIT");
        append_cookie(&mut response, fallback_cookie)?;
        return Ok(response);
    }

    let record = match ctx.provider.fetch_random(orientation).await {
        Ok(record) => record,
        Err(err) => {
            error!("Failed to fetch image from Unsplash: {:?}", err);
            return Ok((
                StatusCode::OK,
                Json(ImageResponse::Error {
                    message: "Failed to fetch image from Unsplash".to_owned(),
                }),
            )
                .into_response());
        }
    };
    ctx.cache.put(orientation, record.clone());

    let fallback_cookie = fallback::next_cookie(pool_size, &record)?;
    let mut response = (
        StatusCode::OK,
        Json(ImageResponse::Success { image: record }),
    )
        .into_response();
    tag_source(&mut response, "unsplash", "MISS");
    append_cookie(&mut response, fallback_cookie)?;
    Ok(response)
}
