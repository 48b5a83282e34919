//! Health server for Kubernetes probes and Prometheus metrics.
//!
//! Provides on the plaintext port:
//! - `/healthz` - Liveness probe (always returns 200 if server is running)
//! - `/readyz` - Readiness probe (returns 200 once startup completed)
//! - `/metrics` - Prometheus metrics endpoint
//!
//! The TLS admission port serves its own `/healthz`/`/readyz` for the
//! webhook registration; this server exists for probes and scraping without
//! touching the admission path.

use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabel, EncodeLabelSet, LabelSetEncoder};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::sync::RwLock;
use tracing::info;

/// Health server port
pub const HEALTH_PORT: u16 = 8080;

/// Labels for admission request metrics (operation + kind)
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct RequestLabels {
    pub operation: String,
    pub kind: String,
}

impl EncodeLabelSet for RequestLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("operation", self.operation.as_str()).encode(encoder.encode_label())?;
        ("kind", self.kind.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Labels for per-kind verdict metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct KindLabels {
    pub kind: String,
}

impl EncodeLabelSet for KindLabels {
    fn encode(&self, mut encoder: LabelSetEncoder<'_>) -> Result<(), std::fmt::Error> {
        ("kind", self.kind.as_str()).encode(encoder.encode_label())?;
        Ok(())
    }
}

/// Shared metrics for the admission gate
pub struct Metrics {
    /// Admission requests seen, by operation and kind
    pub admission_requests_total: Family<RequestLabels, Counter>,
    /// Deletions denied, by kind
    pub deletions_blocked_total: Family<KindLabels, Counter>,
    /// Deletions allowed through the bypass label, by kind
    pub bypasses_total: Family<KindLabels, Counter>,
    /// Assessments that failed and fell back to allow
    pub assessment_errors_total: Counter,
    /// Risk assessment duration
    pub assessment_duration_seconds: Histogram,
    /// Prometheus registry
    registry: Registry,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with registered metrics
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let admission_requests_total = Family::<RequestLabels, Counter>::default();
        registry.register(
            "pvsafe_admission_requests",
            "Total number of admission requests processed",
            admission_requests_total.clone(),
        );

        let deletions_blocked_total = Family::<KindLabels, Counter>::default();
        registry.register(
            "pvsafe_deletions_blocked",
            "Total number of deletions denied as risky",
            deletions_blocked_total.clone(),
        );

        let bypasses_total = Family::<KindLabels, Counter>::default();
        registry.register(
            "pvsafe_bypasses",
            "Total number of deletions allowed via the force-delete label",
            bypasses_total.clone(),
        );

        let assessment_errors_total = Counter::default();
        registry.register(
            "pvsafe_assessment_errors",
            "Total number of risk assessments that failed and were allowed",
            assessment_errors_total.clone(),
        );

        let assessment_duration_seconds = Histogram::new(exponential_buckets(0.001, 2.0, 15));
        registry.register(
            "pvsafe_assessment_duration_seconds",
            "Duration of risk assessments in seconds",
            assessment_duration_seconds.clone(),
        );

        Self {
            admission_requests_total,
            deletions_blocked_total,
            bypasses_total,
            assessment_errors_total,
            assessment_duration_seconds,
            registry,
        }
    }

    /// Record a processed admission request
    pub fn record_request(&self, operation: &str, kind: &str) {
        self.admission_requests_total
            .get_or_create(&RequestLabels {
                operation: operation.to_string(),
                kind: kind.to_string(),
            })
            .inc();
    }

    /// Record a denied deletion
    pub fn record_blocked(&self, kind: &str) {
        self.deletions_blocked_total
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    /// Record a bypass-label deletion
    pub fn record_bypass(&self, kind: &str) {
        self.bypasses_total
            .get_or_create(&KindLabels {
                kind: kind.to_string(),
            })
            .inc();
    }

    /// Record a failed assessment (allowed through)
    pub fn record_assessment_error(&self) {
        self.assessment_errors_total.inc();
    }

    /// Record the duration of an assessment
    pub fn observe_assessment_duration(&self, duration_secs: f64) {
        self.assessment_duration_seconds.observe(duration_secs);
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        if encode(&mut buffer, &self.registry).is_err() {
            tracing::error!("Failed to encode metrics");
            return "# Error encoding metrics".to_string();
        }
        buffer
    }
}

/// Shared state for the health server
pub struct HealthState {
    /// Whether startup completed (probe initialised, servers listening)
    ready: RwLock<bool>,
    /// Metrics registry
    pub metrics: Metrics,
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new() -> Self {
        Self {
            ready: RwLock::new(false),
            metrics: Metrics::new(),
        }
    }

    /// Mark the gate as ready or not ready
    pub async fn set_ready(&self, ready: bool) {
        *self.ready.write().await = ready;
    }

    /// Check if the gate is ready
    pub async fn is_ready(&self) -> bool {
        *self.ready.read().await
    }
}

/// Liveness probe handler
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Readiness probe handler
async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready().await {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

/// Metrics handler
async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let body = state.metrics.encode();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

/// Create the health server router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the health server
///
/// Binds to 0.0.0.0:8080 and serves health/metrics endpoints.
pub async fn run_health_server(state: Arc<HealthState>) -> Result<(), std::io::Error> {
    let app = create_router(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], HEALTH_PORT));
    info!(port = HEALTH_PORT, "Starting health server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
