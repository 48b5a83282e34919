//! Test fixtures: an in-memory cluster implementing `ClusterReader`.
//!
//! `FakeCluster` is populated through builder-style methods and supports
//! error injection (per-PV transport failures, per-namespace snapshot list
//! failures, a missing snapshot schema, and artificial latency) so tests can
//! exercise every branch of the decision trees without a live API server.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    ObjectReference, PersistentVolume, PersistentVolumeClaim, PersistentVolumeClaimSpec,
    PersistentVolumeClaimStatus, PersistentVolumeSpec,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::core::ErrorResponse;

use pv_safe::cluster::types::{DeletionPolicy, VolumeSnapshot, VolumeSnapshotClass};
use pv_safe::cluster::ClusterReader;
use pv_safe::error::{Error, Result};
use pv_safe::risk::RiskCalculator;
use pv_safe::snapshot::SnapshotProbe;

/// In-memory cluster state for tests.
///
/// # Example
/// ```ignore
/// let cluster = FakeCluster::new()
///     .with_pv("pv-2", Some("Delete"), Some(("prod", "db")))
///     .with_pvc("prod", "db", "Bound", Some("pv-2"));
/// ```
#[derive(Default)]
pub struct FakeCluster {
    pvs: HashMap<String, PersistentVolume>,
    pvcs: Vec<PersistentVolumeClaim>,
    snapshots: Vec<VolumeSnapshot>,
    classes: HashMap<String, VolumeSnapshotClass>,
    snapshot_schema_installed: bool,
    failing_pvs: HashSet<String>,
    failing_snapshot_namespaces: HashSet<String>,
    latency: Option<Duration>,
}

impl FakeCluster {
    /// Create an empty cluster with the snapshot schema installed
    pub fn new() -> Self {
        Self {
            snapshot_schema_installed: true,
            ..Default::default()
        }
    }

    /// Remove the snapshot schema; every snapshot list answers 404
    pub fn without_snapshot_schema(mut self) -> Self {
        self.snapshot_schema_installed = false;
        self
    }

    /// Add a PV with the given reclaim policy and optional claim reference
    pub fn with_pv(
        mut self,
        name: &str,
        reclaim_policy: Option<&str>,
        claim: Option<(&str, &str)>,
    ) -> Self {
        self.pvs.insert(
            name.to_string(),
            PersistentVolume {
                metadata: ObjectMeta {
                    name: Some(name.to_string()),
                    ..Default::default()
                },
                spec: Some(PersistentVolumeSpec {
                    persistent_volume_reclaim_policy: reclaim_policy.map(str::to_string),
                    claim_ref: claim.map(|(namespace, claim_name)| ObjectReference {
                        namespace: Some(namespace.to_string()),
                        name: Some(claim_name.to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        self
    }

    /// Add a PVC; listing order follows insertion order
    pub fn with_pvc(mut self, namespace: &str, name: &str, phase: &str, volume: Option<&str>) -> Self {
        self.pvcs.push(PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                volume_name: volume.map(str::to_string),
                ..Default::default()
            }),
            status: Some(PersistentVolumeClaimStatus {
                phase: Some(phase.to_string()),
                ..Default::default()
            }),
        });
        self
    }

    /// Add a VolumeSnapshot
    pub fn with_snapshot(
        mut self,
        namespace: &str,
        name: &str,
        source_pvc: &str,
        ready: bool,
        class: Option<&str>,
    ) -> Self {
        self.snapshots.push(VolumeSnapshot {
            name: name.to_string(),
            namespace: namespace.to_string(),
            source_pvc: Some(source_pvc.to_string()),
            ready,
            class_name: class.map(str::to_string),
            creation_timestamp: None,
            restore_size: None,
        });
        self
    }

    /// Add a VolumeSnapshotClass with the given deletion policy
    pub fn with_snapshot_class(mut self, name: &str, deletion_policy: &str) -> Self {
        self.classes.insert(
            name.to_string(),
            VolumeSnapshotClass {
                name: name.to_string(),
                deletion_policy: DeletionPolicy::parse(Some(deletion_policy)),
            },
        );
        self
    }

    /// Make `get_pv` for this name fail with a transport error
    pub fn with_failing_pv(mut self, name: &str) -> Self {
        self.failing_pvs.insert(name.to_string());
        self
    }

    /// Make snapshot listing in this namespace fail with a transport error
    pub fn with_failing_snapshot_list(mut self, namespace: &str) -> Self {
        self.failing_snapshot_namespaces.insert(namespace.to_string());
        self
    }

    /// Delay every read by the given duration
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

fn transport_error(message: &str) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".to_string(),
        message: message.to_string(),
        reason: "InternalError".to_string(),
        code: 500,
    }))
}

#[async_trait]
impl ClusterReader for FakeCluster {
    async fn get_pv(&self, name: &str) -> Result<PersistentVolume> {
        self.simulate_latency().await;
        if self.failing_pvs.contains(name) {
            return Err(transport_error("injected PV read failure"));
        }
        self.pvs.get(name).cloned().ok_or(Error::NotFound {
            kind: "PersistentVolume",
            name: name.to_string(),
        })
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim> {
        self.simulate_latency().await;
        self.pvcs
            .iter()
            .find(|pvc| {
                pvc.metadata.namespace.as_deref() == Some(namespace)
                    && pvc.metadata.name.as_deref() == Some(name)
            })
            .cloned()
            .ok_or(Error::NotFound {
                kind: "PersistentVolumeClaim",
                name: format!("{}/{}", namespace, name),
            })
    }

    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>> {
        self.simulate_latency().await;
        Ok(self
            .pvcs
            .iter()
            .filter(|pvc| pvc.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_snapshots(&self, namespace: &str) -> Result<Vec<VolumeSnapshot>> {
        self.simulate_latency().await;
        if !self.snapshot_schema_installed {
            return Err(Error::SnapshotApiUnavailable);
        }
        if self.failing_snapshot_namespaces.contains(namespace) {
            return Err(transport_error("injected snapshot list failure"));
        }
        Ok(self
            .snapshots
            .iter()
            .filter(|snapshot| snapshot.namespace == namespace)
            .cloned()
            .collect())
    }

    async fn get_snapshot_class(&self, name: &str) -> Result<VolumeSnapshotClass> {
        self.simulate_latency().await;
        if !self.snapshot_schema_installed {
            return Err(Error::SnapshotApiUnavailable);
        }
        self.classes.get(name).cloned().ok_or(Error::NotFound {
            kind: "VolumeSnapshotClass",
            name: name.to_string(),
        })
    }
}

/// Build a risk calculator over the fake, running the probe init
pub async fn calculator(cluster: FakeCluster) -> RiskCalculator<FakeCluster> {
    let reader = Arc::new(cluster);
    let probe = SnapshotProbe::init(reader.clone()).await;
    RiskCalculator::new(reader, probe)
}
