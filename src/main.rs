//! Inflation dashboard - headless runner
//!
//! Mounts one dashboard against the configured metrics endpoint and logs
//! every published snapshot. Useful for watching the refresh pipeline
//! without a terminal UI.
//!
//! Module structure:
//! - `domain/` - Metric types, envelope validation, normalization
//! - `io/` - Metrics endpoint client
//! - `services/` - Refresh scheduler, dashboard state machine
//! - `infra/` - Config, Metrics

use clap::Parser;
use inflation_dashboard::infra::{Config, Metrics};
use inflation_dashboard::io::{FetchClient, MetricsSource};
use inflation_dashboard::services::Dashboard;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Inflation dashboard - polls the metrics endpoint and logs dashboard state
#[derive(Parser, Debug)]
#[command(name = "inflation-dashboard", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/dev.toml")]
    config: String,

    /// Select this category right after mounting
    #[arg(long)]
    select: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(
        version = %env!("CARGO_PKG_VERSION"),
        git = %env!("GIT_HASH"),
        "inflation-dashboard starting"
    );

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        endpoint = %config.endpoint_url(),
        timeout_ms = %config.endpoint_timeout_ms(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let source: Arc<dyn MetricsSource> = Arc::new(FetchClient::new(&config, metrics.clone())?);

    let mut dashboard = Dashboard::mount(source, metrics.clone());
    if let Some(label) = args.select.as_deref() {
        dashboard.select_category(label);
    }
    let mut snapshots = dashboard.subscribe();
    dashboard.start();

    // Periodic fetch metrics report
    let metrics_interval = config.metrics_interval_secs().max(1);
    let reporter = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(metrics_interval));
        interval.tick().await;
        loop {
            interval.tick().await;
            metrics.report().log();
        }
    });

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = snapshots.borrow_and_update().clone();
                for metric in state.selected_metrics() {
                    info!(
                        metric = %metric.id,
                        title = %metric.title,
                        value = %metric.formatted_value(),
                        units = %metric.units.as_deref().unwrap_or(""),
                        change = %metric.formatted_change(),
                        points = %metric.historical_data.len(),
                        last_updated = %metric.last_updated_or_unknown(),
                        "metric"
                    );
                }
                info!(
                    loading = %state.loading,
                    selected = ?state.selected_category,
                    categories = ?state.categories.labels().collect::<Vec<_>>(),
                    error = ?state.error_message(),
                    data_as_of = ?state.data_as_of,
                    "dashboard_state"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown_signal_received");
                break;
            }
        }
    }

    dashboard.unmount();
    reporter.abort();

    info!("inflation-dashboard shutdown complete");
    Ok(())
}
