use chrono::{DateTime, Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TOKEN_AUDIENCE: &str = "folio-web";
pub const TOKEN_ISSUER: &str = "folio";
pub const TOKEN_SUBJECT: &str = "img-access";
pub const TOKEN_TTL_SECONDS: i64 = 3600;

pub const ACCESS_COOKIE_NAME: &str = "img_access";
/// The access cookie never travels outside the image endpoint
pub const IMAGE_ENDPOINT_PATH: &str = "/get-image";

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub aud: String,
    pub iss: String,
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    /// Random per-token value so two tokens minted in the same second
    /// for the same context still differ
    pub nonce: String,
}

/// Expired, forged and malformed tokens all collapse into this one
/// outcome on purpose; callers get no diagnostics to probe against
#[derive(Error, Debug)]
#[error("Invalid token")]
pub struct InvalidToken;

pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    secure_cookies: bool,
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill(&mut bytes);
    base64::encode(bytes)
}

impl TokenIssuer {
    pub fn new(secret: &str, secure_cookies: bool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // the cache TTL is already generous, an expired token should
        // not squeak through on leeway
        validation.leeway = 0;
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.sub = Some(TOKEN_SUBJECT.to_owned());
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            secure_cookies,
        }
    }

    pub fn issue(&self) -> anyhow::Result<String> {
        self.issue_at(Utc::now())
    }

    pub fn issue_at(&self, now: DateTime<Utc>) -> anyhow::Result<String> {
        let claims = AccessClaims {
            aud: TOKEN_AUDIENCE.to_owned(),
            iss: TOKEN_ISSUER.to_owned(),
            sub: TOKEN_SUBJECT.to_owned(),
            exp: (now + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
            iat: now.timestamp(),
            nonce: random_nonce(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<(), InvalidToken> {
        decode::<AccessClaims>(token, &self.decoding, &self.validation)
            .map(|_| ())
            .map_err(|err| {
                debug!("Rejected access token: {}", err);
                InvalidToken
            })
    }

    /// HTTP-only cookie carrying the token, scoped to the image
    /// endpoint and marked secure outside local development
    pub fn access_cookie(&self, token: String) -> Cookie<'static> {
        Cookie::build(ACCESS_COOKIE_NAME, token)
            .path(IMAGE_ENDPOINT_PATH)
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Strict)
            .max_age(time::Duration::seconds(TOKEN_TTL_SECONDS))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-long-enough-to-sign-with";

    #[test]
    fn issued_tokens_verify_before_expiry() {
        let issuer = TokenIssuer::new(SECRET, false);
        let token = issuer.issue().unwrap();
        assert!(issuer.verify(&token).is_ok());
    }

    #[test]
    fn rapid_issuance_yields_distinct_tokens() {
        let issuer = TokenIssuer::new(SECRET, false);
        let now = Utc::now();
        let first = issuer.issue_at(now).unwrap();
        let second = issuer.issue_at(now).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, false);
        let token = issuer
            .issue_at(Utc::now() - Duration::seconds(2 * TOKEN_TTL_SECONDS))
            .unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn tokens_signed_with_another_secret_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, false);
        let impostor = TokenIssuer::new("a-completely-different-secret-entirely", false);
        let token = impostor.issue().unwrap();
        assert!(issuer.verify(&token).is_err());
    }

    #[test]
    fn altered_claims_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, false);
        let now = Utc::now();
        for (aud, iss, sub) in &[
            ("other-audience", TOKEN_ISSUER, TOKEN_SUBJECT),
            (TOKEN_AUDIENCE, "other-issuer", TOKEN_SUBJECT),
            (TOKEN_AUDIENCE, TOKEN_ISSUER, "other-subject"),
        ] {
            let claims = AccessClaims {
                aud: (*aud).to_owned(),
                iss: (*iss).to_owned(),
                sub: (*sub).to_owned(),
                exp: (now + Duration::seconds(TOKEN_TTL_SECONDS)).timestamp(),
                iat: now.timestamp(),
                nonce: random_nonce(),
            };
            let token = encode(
                &Header::default(),
                &claims,
                &EncodingKey::from_secret(SECRET.as_bytes()),
            )
            .unwrap();
            assert!(issuer.verify(&token).is_err());
        }
    }

    #[test]
    fn structurally_broken_tokens_are_rejected() {
        let issuer = TokenIssuer::new(SECRET, false);
        assert!(issuer.verify("").is_err());
        assert!(issuer.verify("not.a.jwt").is_err());
    }

    #[test]
    fn access_cookie_is_locked_down() {
        let issuer = TokenIssuer::new(SECRET, true);
        let cookie = issuer.access_cookie("token".to_owned());
        assert_eq!(cookie.name(), ACCESS_COOKIE_NAME);
        assert_eq!(cookie.path(), Some(IMAGE_ENDPOINT_PATH));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
    }
}
