//! Read-only cluster access for the risk engine.
//!
//! The engine never talks to the API server directly; it goes through the
//! `ClusterReader` capability, which covers exactly the five reads the
//! decision trees need. The production implementation is `KubeClusterReader`;
//! tests substitute an in-memory reader.

pub mod kube_reader;
pub mod types;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};

use crate::error::Result;

pub use kube_reader::KubeClusterReader;
pub use types::{
    DeletionPolicy, ReclaimPolicy, VolumeSnapshot, VolumeSnapshotClass, bound_pv_name, is_bound,
};

/// Read-only view of the cluster state consulted during risk assessment.
///
/// Each call is a single round-trip with no internal retries; timeout policy
/// belongs to the caller. Implementations must never mutate cluster state.
#[async_trait]
pub trait ClusterReader: Send + Sync {
    /// Fetch a PersistentVolume by name
    async fn get_pv(&self, name: &str) -> Result<PersistentVolume>;

    /// Fetch a PersistentVolumeClaim by namespace and name
    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim>;

    /// List all PersistentVolumeClaims in a namespace
    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>>;

    /// List all VolumeSnapshots in a namespace.
    ///
    /// Returns `Error::SnapshotApiUnavailable` when the snapshot CRDs are
    /// not installed.
    async fn list_snapshots(&self, namespace: &str) -> Result<Vec<VolumeSnapshot>>;

    /// Fetch a VolumeSnapshotClass by name
    async fn get_snapshot_class(&self, name: &str) -> Result<VolumeSnapshotClass>;
}
