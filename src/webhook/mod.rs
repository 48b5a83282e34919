//! Webhook module: admission protocol adapter and TLS server.
//!
//! `admission` holds the per-request decision pipeline; `server` holds the
//! HTTP plumbing. The adapter is the only code that touches the wire
//! protocol; everything behind it works on engine types.

pub mod admission;
mod server;

pub use admission::{ASSESS_TIMEOUT, handle_admission_request};
pub use server::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    create_webhook_router, run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
