use std::sync::Arc;

use folio::api::Context;
use folio::cache::ImageCache;
use folio::config::Config;
use folio::contact::{PgContactStore, CONTACT_WINDOW_MAX_SUBMISSIONS, CONTACT_WINDOW_SECONDS};
use folio::gate::{build_gate, FixedWindowGate};
use folio::server::run_server;
use folio::token::TokenIssuer;
use folio::upstream::UnsplashProvider;
use folio::{db, dotenv};
use reqwest::Client;

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let pool = db::connect(&config.database_url).await?;
    let client = Arc::new(Client::new());
    let ctx = Arc::new(Context {
        gate: build_gate(config.gate_policy),
        cache: ImageCache::default(),
        provider: Arc::new(UnsplashProvider::new(
            client,
            config.unsplash_access_key.clone(),
            config.unsplash_app_id.clone(),
        )),
        tokens: TokenIssuer::new(&config.token_secret, config.production),
        contacts: Arc::new(PgContactStore::new(pool)),
        contact_limiter: FixedWindowGate::new(
            CONTACT_WINDOW_MAX_SUBMISSIONS,
            CONTACT_WINDOW_SECONDS,
        ),
    });
    run_server(ctx, config.port).await;
    Ok(())
}

#[tokio::main]
async fn main() {
    better_panic::install();
    dotenv().ok();
    env_logger::init();

    match run().await {
        Ok(_) => {}
        Err(err) => eprintln!("{:?}", err),
    };
}
