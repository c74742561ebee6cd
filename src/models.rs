use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Default when the `dim` query parameter is missing or doesn't
/// match the expected pattern
pub const DEFAULT_DIMENSIONS: Dimensions = Dimensions {
    width: 1920,
    height: 1080,
};

lazy_static! {
    static ref DIMENSION_PATTERN: Regex = Regex::new(r"^(\d{3,4})x(\d{3,4})$").unwrap();
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Parses a "<width>x<height>" string with 3-4 digit components,
    /// falling back to 1920x1080 on anything else
    pub fn parse(raw: &str) -> Self {
        DIMENSION_PATTERN
            .captures(raw)
            .and_then(|captures| {
                let width = captures.get(1)?.as_str().parse().ok()?;
                let height = captures.get(2)?.as_str().parse().ok()?;
                Some(Dimensions { width, height })
            })
            .unwrap_or(DEFAULT_DIMENSIONS)
    }

    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Landscape
        } else if self.height > self.width {
            Orientation::Portrait
        } else {
            Orientation::Squarish
        }
    }
}

/// Serialized names double as the Unsplash `orientation` query values
#[derive(Display, Debug, Hash, Copy, Clone, Serialize, EnumString, PartialEq, Eq)]
pub enum Orientation {
    #[strum(serialize = "landscape")]
    Landscape,
    #[strum(serialize = "portrait")]
    Portrait,
    #[strum(serialize = "squarish")]
    Squarish,
}

/// A single image as served to the client. Immutable once created,
/// a newer fetch supersedes it instead of mutating it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub url: String,
    pub author_name: String,
    pub author_profile_url: String,
    pub retrieved_at: DateTime<Utc>,
}

/// The only three shapes a response body can take. The `type` tag is
/// what clients discriminate on
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ImageResponse {
    Success { image: ImageRecord },
    Ratelimit { image: ImageRecord },
    Error { message: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DenyReason {
    None,
    RateLimit,
    Bot,
    Shield,
    HostingIp,
}

/// Outcome of a single gate evaluation, never persisted
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub reason: DenyReason,
}

impl RateDecision {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: DenyReason::None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}
