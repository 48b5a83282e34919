//! Risk assessment for persistent-storage deletions.
//!
//! This module is the decision core of the webhook: given an object
//! identifier and read-only cluster access, it answers whether deleting the
//! object would destroy data, and explains the verdict.

pub mod engine;
pub mod messages;

use serde::Serialize;

pub use engine::RiskCalculator;

/// Result of analysing the risk of a deletion
#[derive(Clone, Debug, Default, Serialize)]
pub struct RiskAssessment {
    /// Whether the deletion would lose data
    pub is_risky: bool,
    /// PVCs that would lose data; non-empty whenever `is_risky` is true
    pub risky_pvcs: Vec<RiskyPvc>,
    /// Human-readable verdict explanation
    pub message: String,
    /// Remediation instructions appended to deny messages
    pub suggestion: String,
}

impl RiskAssessment {
    /// Create a not-risky assessment with a "why safe" message
    pub fn safe(message: impl Into<String>) -> Self {
        Self {
            is_risky: false,
            message: message.into(),
            ..Default::default()
        }
    }
}

/// A PVC whose data would be lost by the assessed deletion.
///
/// PV deletions synthesise one of these from the PV's claim reference so the
/// operator can locate the original data; the claim coordinates are empty
/// when the PV was never bound.
#[derive(Clone, Debug, Serialize)]
pub struct RiskyPvc {
    pub name: String,
    pub namespace: String,
    pub pv_name: String,
    /// Why this PVC is at risk
    pub reason: String,
    pub has_snapshot: bool,
    pub snapshot_name: Option<String>,
}
