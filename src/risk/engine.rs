//! The deletion risk engine.
//!
//! Three assessment entry points, one per object kind. The engine is pure
//! given its reader and probe: it holds no mutable state, never writes to
//! the cluster, and the same cluster state always yields the same verdict.
//!
//! Conservative defaults throughout: unknown reclaim policies are risky,
//! unresolvable snapshot classes are not Retain, and a PVC whose PV cannot
//! be verified during a namespace sweep is recorded as risky rather than
//! skipped.

use std::sync::Arc;

use k8s_openapi::api::core::v1::PersistentVolume;
use tracing::{debug, warn};

use crate::cluster::types::ReclaimPolicy;
use crate::cluster::{bound_pv_name, is_bound, ClusterReader};
use crate::error::{Error, Result};
use crate::risk::messages;
use crate::risk::{RiskAssessment, RiskyPvc};
use crate::snapshot::{SnapshotDescriptor, SnapshotProbe};

/// Reason recorded when a bound PVC's PV cannot be fetched during a
/// namespace sweep
const UNVERIFIED_PV_REASON: &str = "could not verify PV; refusing";

/// Analyses deletion risk for PVs, PVCs, and namespaces.
///
/// Immutable after construction and shared across concurrent requests.
pub struct RiskCalculator<R> {
    reader: Arc<R>,
    snapshots: SnapshotProbe<R>,
}

impl<R: ClusterReader> RiskCalculator<R> {
    pub fn new(reader: Arc<R>, snapshots: SnapshotProbe<R>) -> Self {
        Self { reader, snapshots }
    }

    /// Assess the deletion of a PV.
    ///
    /// Only an explicit Retain reclaim policy proves preservation intent;
    /// Delete and unknown policies are risky. Risky verdicts synthesise a
    /// record of the previously bound claim, when the PV has one, so the
    /// operator can locate the original data.
    pub async fn assess_pv_deletion(&self, pv_name: &str) -> Result<RiskAssessment> {
        let pv = self.reader.get_pv(pv_name).await?;

        let policy = ReclaimPolicy::of(&pv);
        if policy == ReclaimPolicy::Retain {
            return Ok(RiskAssessment::safe(format!(
                "PV '{}' has Retain reclaim policy",
                pv_name
            )));
        }

        let claim_ref = pv.spec.as_ref().and_then(|spec| spec.claim_ref.as_ref());
        let risky = RiskyPvc {
            name: claim_ref
                .and_then(|claim| claim.name.clone())
                .unwrap_or_default(),
            namespace: claim_ref
                .and_then(|claim| claim.namespace.clone())
                .unwrap_or_default(),
            pv_name: pv_name.to_string(),
            reason: format!("PV has {} reclaim policy, no snapshot found", policy),
            has_snapshot: false,
            snapshot_name: None,
        };

        Ok(RiskAssessment {
            is_risky: true,
            message: messages::pv_block_message(pv_name, &risky),
            suggestion: messages::pv_suggestions(pv_name),
            risky_pvcs: vec![risky],
        })
    }

    /// Assess the deletion of a PVC.
    ///
    /// Unbound PVCs have nothing to lose. Bound PVCs are safe when their PV
    /// retains, or when a ready snapshot with a Retain-policy class exists
    /// in the same namespace.
    pub async fn assess_pvc_deletion(&self, namespace: &str, name: &str) -> Result<RiskAssessment> {
        let pvc = self.reader.get_pvc(namespace, name).await?;

        if !is_bound(&pvc) {
            return Ok(RiskAssessment::safe(format!(
                "PVC {}/{} is not bound to a PV",
                namespace, name
            )));
        }

        let Some(pv_name) = bound_pv_name(&pvc) else {
            // Bound phase with no volume name is inconsistent state
            return Err(Error::NotFound {
                kind: "PersistentVolume",
                name: format!("bound to PVC {}/{}", namespace, name),
            });
        };
        let pv = self.reader.get_pv(pv_name).await?;

        let (is_risky, reason, snapshot) = self.pvc_risk(namespace, name, &pv).await;
        if !is_risky {
            return Ok(RiskAssessment::safe(reason));
        }

        let risky = RiskyPvc {
            name: name.to_string(),
            namespace: namespace.to_string(),
            pv_name: pv_name.to_string(),
            reason,
            has_snapshot: snapshot.is_some(),
            snapshot_name: snapshot.map(|s| s.name),
        };

        Ok(RiskAssessment {
            is_risky: true,
            message: messages::pvc_block_message(&risky),
            suggestion: messages::pvc_suggestions(namespace, name, pv_name),
            risky_pvcs: vec![risky],
        })
    }

    /// Assess the deletion of a namespace by sweeping its PVCs.
    ///
    /// The namespace is risky iff at least one Bound PVC is risky. Unbound
    /// PVCs are skipped. A bound PVC whose PV cannot be fetched is recorded
    /// as risky: the sweep refuses to guess. The risky list preserves the
    /// listing order; the verdict itself does not depend on it.
    pub async fn assess_namespace_deletion(&self, namespace: &str) -> Result<RiskAssessment> {
        let pvcs = self.reader.list_pvcs(namespace).await?;

        if pvcs.is_empty() {
            return Ok(RiskAssessment::safe(format!(
                "Namespace {} has no PVCs",
                namespace
            )));
        }

        let mut risky_pvcs = Vec::new();
        for pvc in &pvcs {
            if !is_bound(pvc) {
                continue;
            }
            let pvc_name = pvc.metadata.name.as_deref().unwrap_or_default();

            let pv = match bound_pv_name(pvc) {
                Some(pv_name) => match self.reader.get_pv(pv_name).await {
                    Ok(pv) => pv,
                    Err(e) => {
                        warn!(
                            namespace = %namespace,
                            pvc = %pvc_name,
                            pv = %pv_name,
                            error = %e,
                            "Could not fetch bound PV during namespace sweep, recording PVC as risky"
                        );
                        risky_pvcs.push(unverified_pvc(pvc_name, namespace, pv_name));
                        continue;
                    }
                },
                None => {
                    risky_pvcs.push(unverified_pvc(pvc_name, namespace, ""));
                    continue;
                }
            };

            let (is_risky, reason, snapshot) = self.pvc_risk(namespace, pvc_name, &pv).await;
            if is_risky {
                risky_pvcs.push(RiskyPvc {
                    name: pvc_name.to_string(),
                    namespace: namespace.to_string(),
                    pv_name: pv.metadata.name.clone().unwrap_or_default(),
                    reason,
                    has_snapshot: snapshot.is_some(),
                    snapshot_name: snapshot.map(|s| s.name),
                });
            }
        }

        if risky_pvcs.is_empty() {
            return Ok(RiskAssessment::default());
        }

        Ok(RiskAssessment {
            is_risky: true,
            message: messages::namespace_block_message(namespace, &risky_pvcs),
            suggestion: messages::namespace_suggestions(namespace, &risky_pvcs),
            risky_pvcs,
        })
    }

    /// Shared tail of the PVC decision tree: given the bound PV, decide
    /// whether the PVC is risky and why.
    ///
    /// Snapshot lookup failures degrade to "no snapshot"; the engine never
    /// fabricates safety out of an error.
    async fn pvc_risk(
        &self,
        namespace: &str,
        pvc_name: &str,
        pv: &PersistentVolume,
    ) -> (bool, String, Option<SnapshotDescriptor>) {
        let policy = ReclaimPolicy::of(pv);
        if policy == ReclaimPolicy::Retain {
            return (false, "PV has Retain reclaim policy".to_string(), None);
        }

        match self
            .snapshots
            .has_ready_retain_snapshot(namespace, pvc_name)
            .await
        {
            Ok(Some(snapshot)) => {
                let reason = format!(
                    "Ready VolumeSnapshot '{}' exists with Retain policy",
                    snapshot.name
                );
                (false, reason, Some(snapshot))
            }
            Ok(None) => (
                true,
                format!("PV has {} reclaim policy, no snapshot found", policy),
                None,
            ),
            Err(e) => {
                debug!(
                    namespace = %namespace,
                    pvc = %pvc_name,
                    error = %e,
                    "Snapshot lookup failed, treating as no snapshot"
                );
                (
                    true,
                    format!("PV has {} reclaim policy, no snapshot found", policy),
                    None,
                )
            }
        }
    }
}

fn unverified_pvc(name: &str, namespace: &str, pv_name: &str) -> RiskyPvc {
    RiskyPvc {
        name: name.to_string(),
        namespace: namespace.to_string(),
        pv_name: pv_name.to_string(),
        reason: UNVERIFIED_PV_REASON.to_string(),
        has_snapshot: false,
        snapshot_name: None,
    }
}
