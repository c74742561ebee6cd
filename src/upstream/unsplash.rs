use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::models::{ImageRecord, Orientation};
use crate::request::parse_successful_response;
use crate::upstream::{ImageProvider, UpstreamError};

const URL_ROOT: &str = "https://api.unsplash.com/photos/random";

/// Unsplash asks for a hard bound on request time; anything slower
/// than this is treated as unavailable
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Search vocabulary for the background image. Repetition is the
/// weighting mechanism, a term listed twice is twice as likely to be
/// picked.
const SEARCH_TERMS: [&str; 13] = [
    "nature",
    "nature",
    "landscape",
    "landscape",
    "technology",
    "ocean",
    "ocean",
    "mountains",
    "mountains",
    "forest",
    "forest",
    "city",
    "space",
];

fn random_search_term() -> &'static str {
    SEARCH_TERMS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("nature")
}

#[derive(Debug, Deserialize)]
pub struct UnsplashUrls {
    pub regular: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashUserLinks {
    pub html: String,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashUser {
    pub name: String,
    pub links: UnsplashUserLinks,
}

#[derive(Debug, Deserialize)]
pub struct UnsplashPhoto {
    pub urls: UnsplashUrls,
    pub user: UnsplashUser,
}

pub struct UnsplashProvider {
    client: Arc<Client>,
    access_key: String,
    app_id: String,
}

impl UnsplashProvider {
    pub fn new(client: Arc<Client>, access_key: String, app_id: String) -> Self {
        Self {
            client,
            access_key,
            app_id,
        }
    }

    fn headers(&self) -> Result<HeaderMap, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("accept-version"),
            HeaderValue::from_static("v1"),
        );
        headers.insert(
            HeaderName::from_static("authorization"),
            HeaderValue::from_str(&format!("Client-ID {}", self.access_key))
                .map_err(|_| UpstreamError::Url)?,
        );
        headers.insert(
            HeaderName::from_static("user-agent"),
            HeaderValue::from_str(&format!("PortfolioApp/1.0 (App ID: {})", self.app_id))
                .map_err(|_| UpstreamError::Url)?,
        );
        Ok(headers)
    }

    fn random_photo_url(&self, orientation: Orientation) -> Result<Url, UpstreamError> {
        let term = random_search_term();
        debug!("Requesting a random {} '{}' image", orientation, term);
        Url::parse_with_params(
            URL_ROOT,
            &[
                ("content_filter", "high"),
                ("orientation", &orientation.to_string()),
                ("query", term),
            ],
        )
        .ok()
        .ok_or(UpstreamError::Url)
    }
}

#[async_trait]
impl ImageProvider for UnsplashProvider {
    async fn fetch_random(&self, orientation: Orientation) -> Result<ImageRecord, UpstreamError> {
        let url = self.random_photo_url(orientation)?;
        let response = self
            .client
            .get(url.as_str())
            .headers(self.headers()?)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|err| {
                error!("Unsplash request failed: {:?}", err);
                err
            })?;
        let photo = parse_successful_response::<UnsplashPhoto>(response).await?;
        Ok(ImageRecord {
            url: photo.urls.regular,
            author_name: photo.user.name,
            author_profile_url: photo.user.links.html,
            retrieved_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn search_terms_stay_inside_the_vocabulary() {
        let vocabulary = SEARCH_TERMS.iter().collect::<HashSet<_>>();
        for _ in 0..100 {
            assert!(vocabulary.contains(&random_search_term()));
        }
    }

    #[test]
    fn repeated_terms_carry_more_weight() {
        // "nature" appears twice, "space" once
        let nature = SEARCH_TERMS.iter().filter(|term| **term == "nature").count();
        let space = SEARCH_TERMS.iter().filter(|term| **term == "space").count();
        assert_eq!(nature, 2 * space);
    }

    #[test]
    fn parses_the_fields_served_to_clients() {
        let payload = serde_json::json!({
            "id": "Dwu85P9SOIk",
            "urls": {
                "raw": "https://images.unsplash.com/photo-123?raw",
                "regular": "https://images.unsplash.com/photo-123?w=1080"
            },
            "user": {
                "name": "Ansel Adams",
                "links": { "html": "https://unsplash.com/@ansel" }
            },
            "likes": 24
        });
        let photo = serde_json::from_value::<UnsplashPhoto>(payload).unwrap();
        assert_eq!(photo.urls.regular, "https://images.unsplash.com/photo-123?w=1080");
        assert_eq!(photo.user.name, "Ansel Adams");
        assert_eq!(photo.user.links.html, "https://unsplash.com/@ansel");
    }
}
