use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use cookie::{Cookie, SameSite};
use rand::seq::SliceRandom;

use crate::models::ImageRecord;
use crate::token::IMAGE_ENDPOINT_PATH;

/// Client-side pool of previously served images, one cookie per
/// record with an incrementing suffix. The pool is only read when the
/// gate denies a request; pruning is the browser's job through the
/// cookie expiry.
pub const FALLBACK_COOKIE_PREFIX: &str = "bg_fallback_";
pub const FALLBACK_COOKIE_TTL_DAYS: i64 = 1;

fn decode_record(value: &str) -> Option<ImageRecord> {
    let bytes = base64::decode(value).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Collects every fallback record the client sent. Cookies that
/// don't decode are skipped rather than failing the request.
pub fn read_pool(headers: &HeaderMap) -> Vec<ImageRecord> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|raw| Cookie::parse(raw.trim()).ok())
        .filter(|cookie| cookie.name().starts_with(FALLBACK_COOKIE_PREFIX))
        .filter_map(|cookie| decode_record(cookie.value()))
        .collect()
}

/// How many fallback cookies the client holds, by name alone. Used
/// for the next suffix, so a cookie that no longer decodes still
/// keeps its slot instead of being overwritten.
pub fn pool_size(headers: &HeaderMap) -> usize {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|raw| Cookie::parse(raw.trim()).ok())
        .filter(|cookie| cookie.name().starts_with(FALLBACK_COOKIE_PREFIX))
        .count()
}

/// Uniform pick over the whole pool; an empty pool is the caller's
/// hard-error case
pub fn pick(pool: &[ImageRecord]) -> Option<&ImageRecord> {
    pool.choose(&mut rand::thread_rng())
}

/// The next cookie to append after a successful serve. Client-visible
/// on purpose, the frontend reads these too.
pub fn next_cookie(pool_size: usize, record: &ImageRecord) -> anyhow::Result<Cookie<'static>> {
    let payload = base64::encode(serde_json::to_vec(record)?);
    Ok(
        Cookie::build(format!("{}{}", FALLBACK_COOKIE_PREFIX, pool_size), payload)
            .path(IMAGE_ENDPOINT_PATH)
            .same_site(SameSite::Lax)
            .max_age(time::Duration::days(FALLBACK_COOKIE_TTL_DAYS))
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Utc;

    fn record(url: &str) -> ImageRecord {
        ImageRecord {
            url: url.to_owned(),
            author_name: "Someone".to_owned(),
            author_profile_url: "https://unsplash.com/@someone".to_owned(),
            retrieved_at: Utc::now(),
        }
    }

    fn headers_with(cookies: &[Cookie]) -> HeaderMap {
        let joined = cookies
            .iter()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect::<Vec<_>>()
            .join("; ");
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&joined).unwrap());
        headers
    }

    #[test]
    fn served_records_survive_the_cookie_round_trip() {
        let first = next_cookie(0, &record("a")).unwrap();
        let second = next_cookie(1, &record("b")).unwrap();
        let pool = read_pool(&headers_with(&[first, second]));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool[0].url, "a");
        assert_eq!(pool[1].url, "b");
    }

    #[test]
    fn unrelated_and_broken_cookies_are_ignored() {
        let good = next_cookie(0, &record("a")).unwrap();
        let mut headers = headers_with(&[good]);
        headers.append(
            COOKIE,
            HeaderValue::from_static("session=abc; bg_fallback_1=%%%not-base64%%%"),
        );
        let pool = read_pool(&headers);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool[0].url, "a");
    }

    #[test]
    fn broken_cookies_still_reserve_their_suffix() {
        let good = next_cookie(0, &record("a")).unwrap();
        let mut headers = headers_with(&[good]);
        headers.append(
            COOKIE,
            HeaderValue::from_static("session=abc; bg_fallback_1=%%%not-base64%%%"),
        );
        // only one record decodes, but the next suffix must be 2 so
        // the broken cookie isn't clobbered
        assert_eq!(read_pool(&headers).len(), 1);
        assert_eq!(pool_size(&headers), 2);
        let next = next_cookie(pool_size(&headers), &record("c")).unwrap();
        assert_eq!(next.name(), "bg_fallback_2");
    }

    #[test]
    fn picking_from_an_empty_pool_is_absent() {
        assert!(pick(&[]).is_none());
    }

    #[test]
    fn picks_come_from_the_pool() {
        let pool = vec![record("a"), record("b"), record("c")];
        for _ in 0..50 {
            let picked = pick(&pool).unwrap();
            assert!(pool.contains(picked));
        }
    }

    #[test]
    fn cookie_suffix_tracks_the_pool_size() {
        let cookie = next_cookie(4, &record("a")).unwrap();
        assert_eq!(cookie.name(), "bg_fallback_4");
        assert_eq!(cookie.path(), Some(IMAGE_ENDPOINT_PATH));
    }
}
