//! Discovery and querying of the optional CSI snapshot schema.
//!
//! The VolumeSnapshot CRDs may not be installed. The probe attempts a single
//! list at startup and records the outcome; when the schema is missing (or
//! the probe cannot tell), every later query answers negatively and the
//! engine falls back to reclaim-policy-only decisions.

use std::sync::Arc;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use tracing::{debug, info, warn};

use crate::cluster::types::DeletionPolicy;
use crate::cluster::ClusterReader;
use crate::error::Result;

/// Namespace used for the init-time discovery list; only the schema's
/// presence matters, not the contents
const PROBE_NAMESPACE: &str = "default";

/// Metadata of a snapshot that satisfied (or was considered for) a query
#[derive(Clone, Debug)]
pub struct SnapshotDescriptor {
    pub name: String,
    pub namespace: String,
    pub source_pvc: String,
    pub deletion_policy: DeletionPolicy,
    pub creation_timestamp: Option<Time>,
    pub restore_size: Option<String>,
}

/// Probe over the optional snapshot schema.
///
/// The `available` flag is written once at init and read without
/// synchronisation afterwards; the probe is shared immutably across requests.
pub struct SnapshotProbe<R> {
    reader: Arc<R>,
    available: bool,
}

impl<R: ClusterReader> SnapshotProbe<R> {
    /// Discover whether the snapshot schema is installed.
    ///
    /// Any init failure leaves the probe permanently negative; the webhook
    /// keeps running with reclaim-policy-only assessment.
    pub async fn init(reader: Arc<R>) -> Self {
        let available = match reader.list_snapshots(PROBE_NAMESPACE).await {
            Ok(_) => {
                info!("Volume snapshot API detected, snapshot-aware assessment enabled");
                true
            }
            Err(e) if e.is_schema_absent() => {
                warn!("Volume snapshot CRDs not installed, snapshot support disabled");
                false
            }
            Err(e) => {
                warn!(error = %e, "Snapshot API probe failed, snapshot support disabled");
                false
            }
        };
        Self { reader, available }
    }

    /// Whether the snapshot schema was detected at init
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Look for a ready snapshot of the given PVC whose snapshot class has a
    /// Retain deletion policy.
    ///
    /// Matching is namespace-scoped: a snapshot in another namespace never
    /// satisfies this PVC. Snapshots without a resolvable class policy count
    /// as Unknown, which is not Retain. The first acceptable snapshot wins.
    ///
    /// Callers treat `Err` as "no snapshot": the engine never fabricates
    /// safety out of a failed lookup.
    pub async fn has_ready_retain_snapshot(
        &self,
        namespace: &str,
        pvc_name: &str,
    ) -> Result<Option<SnapshotDescriptor>> {
        if !self.available {
            return Ok(None);
        }

        let snapshots = self.reader.list_snapshots(namespace).await?;

        let mut considered = 0usize;
        for snapshot in snapshots
            .iter()
            .filter(|s| s.source_pvc.as_deref() == Some(pvc_name))
        {
            considered += 1;
            if !snapshot.ready {
                continue;
            }

            let deletion_policy = match &snapshot.class_name {
                Some(class_name) => match self.reader.get_snapshot_class(class_name).await {
                    Ok(class) => class.deletion_policy,
                    Err(e) => {
                        debug!(
                            snapshot = %snapshot.name,
                            class = %class_name,
                            error = %e,
                            "Could not resolve snapshot class, treating policy as Unknown"
                        );
                        DeletionPolicy::Unknown
                    }
                },
                None => DeletionPolicy::Unknown,
            };

            if deletion_policy == DeletionPolicy::Retain {
                return Ok(Some(SnapshotDescriptor {
                    name: snapshot.name.clone(),
                    namespace: snapshot.namespace.clone(),
                    source_pvc: pvc_name.to_string(),
                    deletion_policy,
                    creation_timestamp: snapshot.creation_timestamp.clone(),
                    restore_size: snapshot.restore_size.clone(),
                }));
            }
        }

        debug!(
            namespace = %namespace,
            pvc = %pvc_name,
            considered,
            "No ready snapshot with Retain policy found"
        );
        Ok(None)
    }
}
