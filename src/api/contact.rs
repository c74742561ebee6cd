use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Extension, Form};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use log::{error, info};
use serde_json::json;

use crate::api::{forwarded_ip, AppError, Context};
use crate::contact::ContactSubmission;

/// Contact form handler. Persistence failures stay server-side; the
/// client only ever sees the success discriminator.
///
/// `Form` must run before `HeaderMap`: the header extractor takes the
/// headers out of the request, and form parsing still needs to see
/// the content type.
pub async fn submit_contact(
    Extension(ctx): Extension<Arc<Context>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Form(submission): Form<ContactSubmission>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let ip = forwarded_ip(&headers).unwrap_or_else(|| addr.ip());
    if !ctx.contact_limiter.check_at(ip, Utc::now()).allowed {
        return Err(AppError::RateLimited);
    }

    match ctx.contacts.save(&submission).await {
        Ok(()) => {
            info!(
                "Contact submission from {} <{}> ({})",
                submission.name, submission.email, ip
            );
            Ok(Json(json!({ "success": true })))
        }
        Err(err) => {
            error!("Failed to store contact submission: {:?}", err);
            Ok(Json(json!({ "success": false })))
        }
    }
}
