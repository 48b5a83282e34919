//! pv-safe - a cluster-admission safety gate for persistent storage.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Creates the Kubernetes client and read-only cluster reader
//! - Probes for the optional snapshot schema
//! - Starts the health server and the TLS admission server

use std::path::Path;
use std::sync::Arc;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use pv_safe::cluster::KubeClusterReader;
use pv_safe::health::{HealthState, run_health_server};
use pv_safe::risk::RiskCalculator;
use pv_safe::snapshot::SnapshotProbe;
use pv_safe::webhook::WebhookState;
use pv_safe::{WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, run_webhook_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pv_safe=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    info!("Starting pv-safe admission gate");

    // Create Kubernetes client (read-only credentials are sufficient)
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    let reader = Arc::new(KubeClusterReader::new(client));

    // Discover the optional snapshot schema once; the gate runs either way
    let probe = SnapshotProbe::init(reader.clone()).await;
    info!(
        snapshot_support = probe.is_available(),
        "Snapshot probe initialised"
    );
    let calculator = RiskCalculator::new(reader, probe);

    // Start health server immediately (probes should work during startup)
    let health_state = Arc::new(HealthState::new());
    let health_handle = {
        let health_state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state).await {
                error!("Health server error: {}", e);
            }
        })
    };

    if !Path::new(WEBHOOK_CERT_PATH).exists() || !Path::new(WEBHOOK_KEY_PATH).exists() {
        return Err(format!(
            "TLS certificate or key missing ({} / {}); the admission server cannot start without TLS",
            WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH
        )
        .into());
    }

    let state = Arc::new(WebhookState::new(calculator, health_state.clone()));
    let webhook_handle = tokio::spawn(async move {
        if let Err(e) = run_webhook_server(state, WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH).await {
            error!("Webhook server error: {}", e);
        }
    });

    health_state.set_ready(true).await;
    info!("Admission gate ready");

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, shutting down");
            health_state.set_ready(false).await;
        }
    }

    info!("Admission gate stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the gate cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
