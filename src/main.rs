use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::RngExt;
use tracing::{info, warn};

use windradar::alerts::AlertCheckJob;
use windradar::clock::SystemClock;
use windradar::config::AlertsConfig;
use windradar::notify::{EmailNotifier, FanoutNotifier, LogNotifier, Notifier};
use windradar::{App, OpenMeteoClient, Store, WindRadarConfig, logging, web};

fn notifier() -> Arc<dyn Notifier> {
    let fanout = FanoutNotifier::default().with(Arc::new(LogNotifier));
    match EmailNotifier::from_env() {
        Ok(email) => Arc::new(fanout.with(Arc::new(email))),
        Err(e) => {
            info!("E-mail notifications disabled: {e}");
            Arc::new(fanout)
        }
    }
}

async fn check_alerts_periodically(check: Arc<AlertCheckJob>, config: AlertsConfig) {
    let interval = Duration::from_secs(u64::from(config.check_interval_minutes) * 60);
    tokio::time::sleep(Duration::from_secs(u64::from(config.initial_delay_minutes) * 60)).await;

    loop {
        match check.run_now().await {
            Ok(report) => info!(?report, "Periodic alert check done"),
            Err(e) => warn!("Periodic alert check failed: {e}"),
        }
        let jitter: f64 = rand::rng().random_range(0.9..1.1);
        tokio::time::sleep(interval.mul_f64(jitter)).await;
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WindRadarConfig::load_from_path(config_path)?;
    logging::init(&config.logging)?;

    let store = Store::open(&config.storage.path)
        .with_context(|| format!("Failed to open store at {}", config.storage.path))?;
    let client = Arc::new(OpenMeteoClient::new(&config.weather)?);
    let app = Arc::new(
        App::assemble(
            &config,
            store,
            client.clone(),
            client,
            notifier(),
            Arc::new(SystemClock),
        )
        .await?,
    );

    let checker = tokio::spawn(check_alerts_periodically(
        app.check.clone(),
        config.alerts.clone(),
    ));
    let served = web::run(app, config.server.port, shutdown_signal()).await;
    checker.abort();
    served
}
