mod api;
mod appsettings;
mod clock;
mod repository;
mod scheduling;
mod storage;
mod task;

#[cfg(test)]
mod test_utils;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use appsettings::AppSettings;
use clock::SystemClock;
use repository::TaskRepository;
use scheduling::{DueReminderScanner, LogDeliveryChannel, ReminderScheduler};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const SCANNER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = AppSettings::load().context("Failed to load settings")?;
    init_logging(&settings.logging.level);

    let cors = api::cors_layer(&settings.server.frontend_origin).with_context(|| {
        format!("Invalid server.frontend_origin {:?}", settings.server.frontend_origin)
    })?;
    log::info!("Allowing cross-origin requests from {}", settings.server.frontend_origin);

    let storage = storage::open(&settings.storage).context("Failed to open task storage")?;
    let clock = Arc::new(SystemClock);
    let shutdown = CancellationToken::new();

    let scanner = Arc::new(DueReminderScanner::new(
        storage.clone(),
        Arc::new(LogDeliveryChannel),
        clock.clone(),
        settings.scanner.timezone()?,
    ));
    let scanner_handle =
        ReminderScheduler::spawn(scanner, settings.scanner.interval(), shutdown.clone());

    let verifier = api::StaticTokenVerifier::new(settings.auth.tokens);
    if verifier.is_empty() {
        log::warn!("No auth tokens configured, every API request will be rejected");
    } else {
        log::info!("Loaded {} auth token(s)", verifier.len());
    }

    let state = api::AppState {
        repository: TaskRepository::new(storage, clock),
        verifier: Arc::new(verifier),
    };

    let address = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let served = api::serve(listener, state, cors, shutdown.clone()).await;

    shutdown.cancel();
    scanner_handle.shutdown(SCANNER_SHUTDOWN_TIMEOUT).await;

    served
}

fn init_logging(default_level: &str) {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.to_owned());

    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();
}

async fn cancel_on_ctrl_c(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {err}");
        return;
    }

    log::info!("Received Ctrl+C, shutting down");
    shutdown.cancel();
}
