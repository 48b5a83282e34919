//! Error types for cluster reads and risk assessment.
//!
//! The taxonomy distinguishes "not found" from transport failures from the
//! snapshot schema being absent, because the engine reacts differently to
//! each: not-found and transport errors propagate to the adapter, while a
//! missing snapshot schema degrades to a plain negative.

use std::time::Duration;
use thiserror::Error;

/// Error type for cluster reads and risk assessment
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Requested object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    /// The VolumeSnapshot CRDs are not installed in this cluster
    #[error("volume snapshot API is not available (CSI snapshot CRDs may not be installed)")]
    SnapshotApiUnavailable,

    /// Risk assessment exceeded its per-request deadline
    #[error("risk assessment timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Check if this error indicates a not-found condition
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }

    /// Check if this error means the snapshot schema is absent
    pub fn is_schema_absent(&self) -> bool {
        matches!(self, Error::SnapshotApiUnavailable)
    }
}

/// Result type alias for gate operations
pub type Result<T> = std::result::Result<T, Error>;
