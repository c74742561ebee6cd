use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::{AddExtensionLayer, Router};
use log::info;

use crate::api::contact::submit_contact;
use crate::api::image::get_image;
use crate::api::token::{issue_token, verify_token};
use crate::api::Context;

pub fn build_router(ctx: Arc<Context>) -> Router {
    Router::new()
        .route("/get-image", get(get_image))
        .route("/token", get(issue_token))
        .route("/token/verify", get(verify_token))
        .route("/contact", post(submit_contact))
        .layer(AddExtensionLayer::new(ctx))
}

pub async fn run_server(ctx: Arc<Context>, port: u16) {
    info!("Starting server on port {}", port);
    let router = build_router(ctx);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    axum::Server::bind(&addr)
        .serve(router.into_make_service_with_connect_info::<SocketAddr, _>())
        .await
        .unwrap();
}
