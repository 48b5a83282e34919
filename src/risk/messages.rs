//! Block messages and remediation instructions.
//!
//! Deny responses carry two parts: a headline explaining what was blocked
//! and why, and a remediation block listing the safe alternatives in a
//! stable order (snapshot, reclaim-policy change, labelled force delete).
//! Command templates interpolate only identifiers observed on the cluster.

use std::fmt::Write;

use crate::risk::RiskyPvc;
use crate::FORCE_DELETE_LABEL;

/// Headline for a blocked namespace deletion, enumerating the risky PVCs in
/// listing order
pub fn namespace_block_message(namespace: &str, risky_pvcs: &[RiskyPvc]) -> String {
    let mut msg = format!(
        "DELETION BLOCKED: Namespace '{}' contains {} PVC(s) that would lose data permanently\n\n",
        namespace,
        risky_pvcs.len()
    );
    msg.push_str("Risky PVCs:\n");
    for risky in risky_pvcs {
        let _ = writeln!(msg, "  - {}: {}", risky.name, risky.reason);
    }
    msg
}

/// Headline for a blocked PVC deletion
pub fn pvc_block_message(risky: &RiskyPvc) -> String {
    format!(
        "DELETION BLOCKED: PVC '{}/{}' would lose data permanently\n\nReason: {}\n",
        risky.namespace, risky.name, risky.reason
    )
}

/// Headline for a blocked PV deletion, naming the previously bound claim
/// when the PV has one
pub fn pv_block_message(pv_name: &str, risky: &RiskyPvc) -> String {
    let mut msg = format!(
        "DELETION BLOCKED: PV '{}' would lose data permanently\n\nReason: {}\n",
        pv_name, risky.reason
    );
    if !risky.namespace.is_empty() && !risky.name.is_empty() {
        let _ = writeln!(msg, "Bound to: {}/{}", risky.namespace, risky.name);
    }
    msg
}

/// Remediation block for a blocked PVC deletion
pub fn pvc_suggestions(namespace: &str, pvc_name: &str, pv_name: &str) -> String {
    format!(
        "\nTo safely delete this PVC:\n\
         \x20 1. Create a VolumeSnapshot of the data\n\
         \x20 2. OR change PV reclaim policy to Retain:\n\
         \x20    kubectl patch pv {pv_name} -p '{{\"spec\":{{\"persistentVolumeReclaimPolicy\":\"Retain\"}}}}'\n\
         \n\
         \x20 3. OR force delete (will lose data):\n\
         \x20    kubectl label pvc {pvc_name} -n {namespace} {label}=true\n\
         \x20    kubectl delete pvc {pvc_name} -n {namespace}\n\
         \n\
         \x20 4. Then retry the deletion\n",
        label = FORCE_DELETE_LABEL,
    )
}

/// Remediation block for a blocked namespace deletion, naming every
/// offending PV
pub fn namespace_suggestions(namespace: &str, risky_pvcs: &[RiskyPvc]) -> String {
    let mut msg = String::from("\nTo safely delete this resource:\n");
    msg.push_str("  1. Create VolumeSnapshots for the PVCs\n");
    msg.push_str("  2. OR change PV reclaim policy to Retain:\n");
    for risky in risky_pvcs.iter().filter(|r| !r.pv_name.is_empty()) {
        let _ = writeln!(
            msg,
            "     kubectl patch pv {} -p '{{\"spec\":{{\"persistentVolumeReclaimPolicy\":\"Retain\"}}}}'",
            risky.pv_name
        );
    }
    msg.push_str("\n  3. OR force delete (will lose data):\n");
    let _ = writeln!(
        msg,
        "     kubectl label namespace {} {}=true",
        namespace, FORCE_DELETE_LABEL
    );
    let _ = writeln!(msg, "     kubectl delete namespace {}", namespace);
    msg.push_str("\n  4. Then retry the deletion\n");
    msg
}

/// Remediation block for a blocked PV deletion
pub fn pv_suggestions(pv_name: &str) -> String {
    format!(
        "\nTo safely delete this PV:\n\
         \x20 1. Create a VolumeSnapshot of the data\n\
         \x20 2. OR change reclaim policy to Retain:\n\
         \x20    kubectl patch pv {pv_name} -p '{{\"spec\":{{\"persistentVolumeReclaimPolicy\":\"Retain\"}}}}'\n\
         \n\
         \x20 3. OR force delete (will lose data):\n\
         \x20    kubectl label pv {pv_name} {label}=true\n\
         \x20    kubectl delete pv {pv_name}\n\
         \n\
         \x20 4. Then retry the deletion\n",
        label = FORCE_DELETE_LABEL,
    )
}
