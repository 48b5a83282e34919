//! pv-safe library crate
//!
//! A validating admission webhook that blocks deletions of PersistentVolumes,
//! PersistentVolumeClaims, and Namespaces when they would permanently lose
//! data. This module exports the cluster reader, snapshot probe, risk engine,
//! and the webhook adapter.

pub mod cluster;
pub mod error;
pub mod health;
pub mod risk;
pub mod snapshot;
pub mod webhook;

pub use error::{Error, Result};
pub use health::HealthState;
pub use webhook::{
    WEBHOOK_CERT_PATH, WEBHOOK_KEY_PATH, WEBHOOK_PORT, WebhookError, WebhookState,
    run_webhook_server,
};

/// Label that forces a deletion through the gate.
///
/// Recognised only with the exact value `"true"`, and only on the object
/// named by the request. Labelling first and deleting second is deliberate:
/// two operator actions, and a persistent audit trail on the object.
pub const FORCE_DELETE_LABEL: &str = "pv-safe.io/force-delete";
