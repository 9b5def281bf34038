//! Simulator entry point.

use document_store::{InMemoryDocumentStore, PostgresDocumentStore};
use simulator::{SimulationSummary, SimulatorConfig, run_simulation};
use sqlx::postgres::PgPoolOptions;
use stats::InMemoryMetricsRecorder;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, abandoning simulation");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, abandoning simulation");
        }
    }
}

async fn run(config: &SimulatorConfig) -> simulator::Result<SimulationSummary> {
    let recorder = InMemoryMetricsRecorder::new();
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(u32::try_from(config.clients).unwrap_or(u32::MAX).max(1) + 1)
                .connect(url)
                .await?;
            let store = PostgresDocumentStore::new(pool);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL document store");
            run_simulation(store, config, recorder).await
        }
        None => {
            tracing::info!("using in-memory document store");
            run_simulation(InMemoryDocumentStore::new(), config, recorder).await
        }
    }
}

#[tokio::main]
async fn main() {
    // 1. Load configuration
    let config = SimulatorConfig::from_env();

    // 2. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Run until done or interrupted
    let outcome = tokio::select! {
        outcome = run(&config) => outcome,
        () = shutdown_signal() => return,
    };

    match outcome {
        Ok(summary) => {
            tracing::info!(
                stats = ?summary.stats,
                carts = ?summary.carts,
                orders = summary.orders,
                expired = summary.expired,
                expire_failures = summary.expire_failures.len(),
                "simulation finished, stock conserved"
            );
            println!("{}", summary.report);
            println!("{}", metrics_handle.render());
        }
        Err(e) => {
            tracing::error!(error = %e, "simulation failed");
            std::process::exit(1);
        }
    }
}
