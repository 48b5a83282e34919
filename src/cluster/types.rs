//! Parsed views over cluster storage objects.
//!
//! PVs and PVCs arrive as typed `k8s-openapi` objects; the snapshot schema
//! is optional and only reachable dynamically, so its objects are parsed
//! out of `DynamicObject` into the small views defined here. Policy values
//! outside the known set map to `Unknown`, which is never treated as safe.

use std::fmt;

use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::core::DynamicObject;
use serde_json::Value;

/// PVC phase value indicating an active binding to a PV
const PHASE_BOUND: &str = "Bound";

/// Reclaim policy of a PersistentVolume
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReclaimPolicy {
    /// Backing storage survives release of the claim
    Retain,
    /// Backing storage is destroyed on release
    Delete,
    /// Unset or unrecognised policy
    Unknown,
}

impl ReclaimPolicy {
    /// Read the reclaim policy from a PV, mapping unset/unrecognised values
    /// to `Unknown`
    pub fn of(pv: &PersistentVolume) -> Self {
        match pv
            .spec
            .as_ref()
            .and_then(|spec| spec.persistent_volume_reclaim_policy.as_deref())
        {
            Some("Retain") => ReclaimPolicy::Retain,
            Some("Delete") => ReclaimPolicy::Delete,
            _ => ReclaimPolicy::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReclaimPolicy::Retain => "Retain",
            ReclaimPolicy::Delete => "Delete",
            ReclaimPolicy::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ReclaimPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deletion policy of a VolumeSnapshotClass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeletionPolicy {
    /// Snapshot data survives deletion of the snapshot object
    Retain,
    /// Snapshot data is destroyed with the snapshot object
    Delete,
    /// Unset, unresolvable, or unrecognised policy
    Unknown,
}

impl DeletionPolicy {
    /// Parse a deletion policy string, mapping unrecognised values to
    /// `Unknown`
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("Retain") => DeletionPolicy::Retain,
            Some("Delete") => DeletionPolicy::Delete,
            _ => DeletionPolicy::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionPolicy::Retain => "Retain",
            DeletionPolicy::Delete => "Delete",
            DeletionPolicy::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check whether a PVC is in the Bound phase
pub fn is_bound(pvc: &PersistentVolumeClaim) -> bool {
    pvc.status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some(PHASE_BOUND)
}

/// Name of the PV a PVC is bound to, when set
pub fn bound_pv_name(pvc: &PersistentVolumeClaim) -> Option<&str> {
    pvc.spec
        .as_ref()
        .and_then(|spec| spec.volume_name.as_deref())
        .filter(|name| !name.is_empty())
}

/// Read-only view of a VolumeSnapshot object
#[derive(Clone, Debug)]
pub struct VolumeSnapshot {
    pub name: String,
    pub namespace: String,
    /// Declared source PVC (`spec.source.persistentVolumeClaimName`)
    pub source_pvc: Option<String>,
    /// `status.readyToUse`; false when unset
    pub ready: bool,
    /// `spec.volumeSnapshotClassName`
    pub class_name: Option<String>,
    pub creation_timestamp: Option<Time>,
    /// `status.restoreSize`
    pub restore_size: Option<String>,
}

impl VolumeSnapshot {
    /// Parse a snapshot view out of a dynamically fetched object
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            namespace: obj.metadata.namespace.clone().unwrap_or_default(),
            source_pvc: obj
                .data
                .pointer("/spec/source/persistentVolumeClaimName")
                .and_then(Value::as_str)
                .map(str::to_string),
            ready: obj
                .data
                .pointer("/status/readyToUse")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            class_name: obj
                .data
                .pointer("/spec/volumeSnapshotClassName")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            creation_timestamp: obj.metadata.creation_timestamp.clone(),
            restore_size: obj
                .data
                .pointer("/status/restoreSize")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Read-only view of a VolumeSnapshotClass object
#[derive(Clone, Debug)]
pub struct VolumeSnapshotClass {
    pub name: String,
    pub deletion_policy: DeletionPolicy,
}

impl VolumeSnapshotClass {
    /// Parse a snapshot class view out of a dynamically fetched object
    pub fn from_dynamic(obj: &DynamicObject) -> Self {
        Self {
            name: obj.metadata.name.clone().unwrap_or_default(),
            deletion_policy: DeletionPolicy::parse(
                obj.data.get("deletionPolicy").and_then(Value::as_str),
            ),
        }
    }
}
