//! Kubernetes-backed implementation of the cluster reader.
//!
//! Core objects are fetched through typed APIs. The snapshot schema is
//! optional, so it is reached through `Api<DynamicObject>` built from its
//! group-version-kind at runtime; a cluster without the CRDs answers 404,
//! which maps to `Error::SnapshotApiUnavailable` instead of failing startup.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{PersistentVolume, PersistentVolumeClaim};
use kube::api::{Api, ListParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;

use crate::cluster::types::{VolumeSnapshot, VolumeSnapshotClass};
use crate::cluster::ClusterReader;
use crate::error::{Error, Result};

/// API group of the CSI snapshot schema
const SNAPSHOT_GROUP: &str = "snapshot.storage.k8s.io";
/// Schema version the reader speaks
const SNAPSHOT_VERSION: &str = "v1";

/// Cluster reader backed by the Kubernetes API.
///
/// Holds only stateless clients and pre-computed API resource descriptors;
/// safe to share across requests.
#[derive(Clone)]
pub struct KubeClusterReader {
    client: Client,
    snapshot_resource: ApiResource,
    snapshot_class_resource: ApiResource,
}

impl KubeClusterReader {
    pub fn new(client: Client) -> Self {
        let snapshot_resource = ApiResource::from_gvk(&GroupVersionKind::gvk(
            SNAPSHOT_GROUP,
            SNAPSHOT_VERSION,
            "VolumeSnapshot",
        ));
        let snapshot_class_resource = ApiResource::from_gvk(&GroupVersionKind::gvk(
            SNAPSHOT_GROUP,
            SNAPSHOT_VERSION,
            "VolumeSnapshotClass",
        ));
        Self {
            client,
            snapshot_resource,
            snapshot_class_resource,
        }
    }
}

#[async_trait]
impl ClusterReader for KubeClusterReader {
    async fn get_pv(&self, name: &str) -> Result<PersistentVolume> {
        let api: Api<PersistentVolume> = Api::all(self.client.clone());
        match api.get(name).await {
            Ok(pv) => Ok(pv),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::NotFound {
                kind: "PersistentVolume",
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<PersistentVolumeClaim> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        match api.get(name).await {
            Ok(pvc) => Ok(pvc),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::NotFound {
                kind: "PersistentVolumeClaim",
                name: format!("{}/{}", namespace, name),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>> {
        let api: Api<PersistentVolumeClaim> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_snapshots(&self, namespace: &str) -> Result<Vec<VolumeSnapshot>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.snapshot_resource);
        match api.list(&ListParams::default()).await {
            Ok(list) => Ok(list
                .items
                .iter()
                .map(VolumeSnapshot::from_dynamic)
                .collect()),
            // 404 on the resource itself: the CRDs are not installed
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::SnapshotApiUnavailable),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_snapshot_class(&self, name: &str) -> Result<VolumeSnapshotClass> {
        let api: Api<DynamicObject> =
            Api::all_with(self.client.clone(), &self.snapshot_class_resource);
        match api.get(name).await {
            Ok(obj) => Ok(VolumeSnapshotClass::from_dynamic(&obj)),
            Err(kube::Error::Api(e)) if e.code == 404 => Err(Error::NotFound {
                kind: "VolumeSnapshotClass",
                name: name.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}
