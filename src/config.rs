use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context};

use crate::gate::GatePolicy;

/// Everything the process needs from the environment, read once at
/// boot. Secrets live here instead of being pulled lazily from
/// global state.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub unsplash_access_key: String,
    pub unsplash_app_id: String,
    pub token_secret: String,
    pub gate_policy: GatePolicy,
    pub production: bool,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("Missing {} environment variable", key))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_owned())
                .parse()
                .context("PORT must be a number")?,
            database_url: required("DATABASE_URL")?,
            unsplash_access_key: required("UNSPLASH_ACCESS_KEY")?,
            unsplash_app_id: required("UNSPLASH_APP_ID")?,
            token_secret: required("TOKEN_SECRET")?,
            gate_policy: match env::var("GATE_POLICY") {
                Ok(raw) => GatePolicy::from_str(&raw)
                    .map_err(|_| anyhow!("Unknown GATE_POLICY '{}'", raw))?,
                Err(_) => GatePolicy::FixedWindow,
            },
            production: env::var("APP_ENV")
                .map(|value| value == "production")
                .unwrap_or(false),
        })
    }
}
