use async_trait::async_trait;
use thiserror::Error;

use crate::models::{ImageRecord, Orientation};
use crate::request::HttpError;

pub use unsplash::UnsplashProvider;

mod unsplash;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Error formatting URL")]
    Url,
    #[error("Failed to process response from upstream")]
    HttpError(#[from] HttpError),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        UpstreamError::HttpError(HttpError::ReqwestError(err))
    }
}

/// The photo source behind the image endpoint. A failed fetch is
/// normalized into [UpstreamError] and never retried here; the
/// handler owns cache population so cache policy stays in one place.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn fetch_random(&self, orientation: Orientation) -> Result<ImageRecord, UpstreamError>;
}
