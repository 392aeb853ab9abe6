use std::sync::Arc;

use tracing::warn;

use aab_core::{
    config::Config,
    errors::Error,
    pipeline::Pipeline,
    ports::{LinkShortener, PassthroughShortener},
};
use aab_yourls::YourlsClient;

mod health;

#[tokio::main]
async fn main() -> Result<(), aab_core::Error> {
    aab_core::logging::init("aab")?;

    let cfg = Arc::new(Config::load()?);

    // One shared client for resolution + page fetches; per-request timeouts
    // are applied by the pipeline stages.
    let http = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| Error::External(format!("http client build failed: {e}")))?;

    let shortener: Arc<dyn LinkShortener> = match YourlsClient::from_config(&cfg) {
        Some(client) => Arc::new(client),
        None => {
            warn!("YOURLS_API_URL/YOURLS_SIGNATURE not set; links stay unshortened");
            Arc::new(PassthroughShortener)
        }
    };

    let pipeline = Pipeline::new(cfg.clone(), http, shortener);

    tokio::spawn(health::serve(cfg.health_port));

    aab_telegram::router::run_polling(cfg, pipeline)
        .await
        .map_err(|e| Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
