//! Admission webhook server.
//!
//! Serves the validating admission endpoint over TLS.
//!
//! To enable the gate:
//! 1. Provision TLS certificates (e.g. via cert-manager)
//! 2. Create a ValidatingWebhookConfiguration pointing at /validate
//! 3. Mount the TLS certificate secret at /etc/webhook/certs/
//!
//! The registration should use failurePolicy=Fail: this handler fails open
//! on engine errors, so the fail-closed stance for an unreachable handler
//! lives at the registration boundary.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use thiserror::Error;
use tracing::{error, info};

use crate::cluster::ClusterReader;
use crate::health::HealthState;
use crate::risk::RiskCalculator;
use crate::webhook::admission::handle_admission_request;

/// Default path to webhook TLS certificate
pub const WEBHOOK_CERT_PATH: &str = "/etc/webhook/certs/tls.crt";
/// Default path to webhook TLS private key
pub const WEBHOOK_KEY_PATH: &str = "/etc/webhook/certs/tls.key";
/// Default webhook server port
pub const WEBHOOK_PORT: u16 = 8443;

/// Shared state for webhook handlers
pub struct WebhookState<R> {
    /// The risk engine
    pub calculator: RiskCalculator<R>,
    /// Health state holding the admission metrics
    pub health: Arc<HealthState>,
}

impl<R: ClusterReader> WebhookState<R> {
    pub fn new(calculator: RiskCalculator<R>, health: Arc<HealthState>) -> Self {
        Self { calculator, health }
    }
}

/// Create the webhook router.
///
/// `POST /validate` carries the admission traffic; `/healthz` and `/readyz`
/// answer the registration's probes on the same TLS port. Non-POST methods
/// on /validate get 405 from the method router, unknown paths 404.
pub fn create_webhook_router<R: ClusterReader + 'static>(state: Arc<WebhookState<R>>) -> Router {
    Router::new()
        .route("/validate", post(validate::<R>))
        .route("/healthz", get(ok))
        .route("/readyz", get(ok))
        .with_state(state)
}

async fn ok() -> &'static str {
    "OK"
}

/// Validating admission webhook handler
async fn validate<R: ClusterReader + 'static>(
    State(state): State<Arc<WebhookState<R>>>,
    Json(review): Json<AdmissionReview<DynamicObject>>,
) -> impl IntoResponse {
    let request: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(request) => request,
        Err(e) => {
            error!(error = %e, "Failed to extract admission request");
            return (
                StatusCode::BAD_REQUEST,
                Json(
                    AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e))
                        .into_review(),
                ),
            );
        }
    };

    let response =
        handle_admission_request(&state.calculator, &state.health.metrics, &request).await;

    (StatusCode::OK, Json(response.into_review()))
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
    /// Server error
    #[error("Webhook server error: {0}")]
    Server(String),
}

/// Run the webhook server with TLS.
///
/// Binds to 0.0.0.0:8443 and serves the /validate endpoint. TLS
/// certificates are loaded from the paths specified.
pub async fn run_webhook_server<R: ClusterReader + 'static>(
    state: Arc<WebhookState<R>>,
    cert_path: &str,
    key_path: &str,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(PathBuf::from(cert_path), PathBuf::from(key_path))
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], WEBHOOK_PORT));
    info!(port = WEBHOOK_PORT, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
