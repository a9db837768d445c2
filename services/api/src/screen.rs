use std::time::Duration;

use clap::Args;
use serde_json::Value;
use tokio::time::Instant;
use tracing::warn;

use screening_relay::config::AppConfig;
use screening_relay::error::AppError;
use screening_relay::workflows::screening::{EntitySubmission, ScreeningServiceError};

use crate::infra::build_screening_service;

#[derive(Args, Debug)]
pub(crate) struct ScreenArgs {
    /// Name of the entity to screen
    #[arg(long)]
    pub(crate) entity_name: String,
    /// Optional date of birth (YYYY-MM-DD)
    #[arg(long)]
    pub(crate) date_of_birth: Option<String>,
    /// Optional country of residence or registration
    #[arg(long)]
    pub(crate) country: Option<String>,
    /// Provider option to dispatch to (e.g. openai, deepseek, llama)
    #[arg(long, default_value = "openai")]
    pub(crate) provider: String,
    /// Base URL of the relay server to poll for the result
    #[arg(long, default_value = "http://127.0.0.1:3000")]
    pub(crate) server: String,
    /// Give up and clear the pending slot after this many seconds
    #[arg(long)]
    pub(crate) timeout_secs: Option<u64>,
}

/// Command-line submission client: submit, then poll on a fixed interval
/// until the provider callback lands or polling fails. No automatic retry
/// after a failure; the user resubmits.
pub(crate) async fn run_screen(args: ScreenArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_screening_service(&config)?;

    let submission = EntitySubmission {
        entity_name: args.entity_name,
        date_of_birth: args.date_of_birth,
        country: args.country,
    };
    let receipt = service.submit(&args.provider, submission).await?;

    println!(
        "screening request {} dispatched to {}",
        receipt.request_id, receipt.provider
    );
    println!("waiting for the provider callback...");

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|err| ScreeningServiceError::Dispatch(err.into()))?;
    let poll_url = format!(
        "{}/api/listen/{}",
        args.server.trim_end_matches('/'),
        receipt.request_id
    );
    let deadline = args
        .timeout_secs
        .map(|secs| Instant::now() + Duration::from_secs(secs));
    let mut ticker =
        tokio::time::interval(Duration::from_secs(config.screening.poll_interval_secs.max(1)));

    loop {
        ticker.tick().await;

        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                clear_slot(&http, &poll_url).await;
                println!("no result before the timeout; pending slot cleared");
                return Ok(());
            }
        }

        let body = match poll_once(&http, &poll_url).await {
            Ok(body) => body,
            Err(err) => {
                // Polling stops on the first failure; clean up the slot so the
                // abandoned result does not linger in the store.
                clear_slot(&http, &poll_url).await;
                return Err(AppError::Screening(ScreeningServiceError::Dispatch(
                    err.into(),
                )));
            }
        };

        if body["data"].is_null() {
            continue;
        }

        println!(
            "{}",
            serde_json::to_string_pretty(&body["data"])
                .unwrap_or_else(|_| body["data"].to_string())
        );
        if !config.screening.poll_mode.consumes() {
            clear_slot(&http, &poll_url).await;
        }
        return Ok(());
    }
}

async fn poll_once(http: &reqwest::Client, url: &str) -> Result<Value, reqwest::Error> {
    http.get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await
}

/// Best-effort cleanup; a failed DELETE only costs an orphaned slot.
async fn clear_slot(http: &reqwest::Client, url: &str) {
    if let Err(err) = http.delete(url).send().await {
        warn!(error = %err, "failed to clear pending slot");
    }
}
