//! The admission decision pipeline.
//!
//! Turns one `AdmissionRequest` into one `AdmissionResponse`:
//! non-DELETE operations pass straight through, the bypass label
//! short-circuits with an audit event, and DELETE requests for the three
//! guarded kinds are routed to the risk engine under a per-request deadline.
//!
//! Engine failures allow the request with an explanatory message. Blocking
//! on internal inconsistency would punish operators for platform flakiness;
//! the externally configured fail-closed registration covers the case where
//! this handler is unreachable entirely.

use std::time::{Duration, Instant};

use kube::core::admission::{AdmissionRequest, AdmissionResponse, Operation};
use kube::core::{DynamicObject, Status};
use tracing::{info, warn};

use crate::cluster::ClusterReader;
use crate::error::{Error, Result};
use crate::health::Metrics;
use crate::risk::{RiskAssessment, RiskCalculator};
use crate::FORCE_DELETE_LABEL;

/// Per-request deadline for the engine, inside the 10-second transport
/// budget the webhook registration imposes
pub const ASSESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Process one admission request and produce the verdict.
///
/// The response always echoes the request uid.
pub async fn handle_admission_request<R: ClusterReader>(
    calculator: &RiskCalculator<R>,
    metrics: &Metrics,
    request: &AdmissionRequest<DynamicObject>,
) -> AdmissionResponse {
    let kind = request.kind.kind.as_str();
    let namespace = request.namespace.as_deref().unwrap_or_default();
    let name = request.name.as_str();
    let username = request.user_info.username.as_deref().unwrap_or_default();

    info!(
        uid = %request.uid,
        operation = operation_name(&request.operation),
        kind = %kind,
        namespace = %namespace,
        name = %name,
        user = %username,
        groups = ?request.user_info.groups,
        "Admission request received"
    );
    metrics.record_request(operation_name(&request.operation), kind);

    // Only deletions are assessed
    if request.operation != Operation::Delete {
        return allow_with_message(request, "Request allowed");
    }

    log_deletion(kind, namespace, name, username);

    if bypass_requested(request) {
        warn!(
            uid = %request.uid,
            kind = %kind,
            namespace = %namespace,
            name = %name,
            user = %username,
            "BYPASS: force-delete label present, allowing deletion despite potential data loss"
        );
        metrics.record_bypass(kind);
        return allow_with_message(
            request,
            &format!("Deletion allowed via bypass label {}", FORCE_DELETE_LABEL),
        );
    }

    let started = Instant::now();
    let assessment = match kind {
        "Namespace" => with_deadline(calculator.assess_namespace_deletion(name)).await,
        "PersistentVolumeClaim" => {
            with_deadline(calculator.assess_pvc_deletion(namespace, name)).await
        }
        "PersistentVolume" => with_deadline(calculator.assess_pv_deletion(name)).await,
        other => {
            info!(uid = %request.uid, kind = %other, "Unguarded resource kind, allowing");
            return AdmissionResponse::from(request);
        }
    };
    metrics.observe_assessment_duration(started.elapsed().as_secs_f64());

    match assessment {
        Err(e) => {
            warn!(
                uid = %request.uid,
                kind = %kind,
                namespace = %namespace,
                name = %name,
                error = %e,
                "Risk assessment failed, allowing (fail-open at the engine boundary)"
            );
            metrics.record_assessment_error();
            allow_with_message(request, &format!("Risk assessment error (allowed): {}", e))
        }
        Ok(assessment) if assessment.is_risky => {
            warn!(
                uid = %request.uid,
                kind = %kind,
                namespace = %namespace,
                name = %name,
                user = %username,
                risky_pvcs = assessment.risky_pvcs.len(),
                "BLOCKING: risky deletion detected"
            );
            metrics.record_blocked(kind);
            deny_forbidden(
                request,
                format!("{}{}", assessment.message, assessment.suggestion),
            )
        }
        Ok(assessment) => {
            info!(
                uid = %request.uid,
                kind = %kind,
                namespace = %namespace,
                name = %name,
                reason = %assessment.message,
                "ALLOWING: deletion is safe"
            );
            if assessment.message.is_empty() {
                allow_with_message(request, "Deletion allowed - safe operation")
            } else {
                allow_with_message(request, &assessment.message)
            }
        }
    }
}

/// Check the object being deleted for the exact bypass label value.
///
/// The object is carried in `old_object` for DELETE operations. A missing
/// old object or missing labels is a plain negative, never an error.
fn bypass_requested(request: &AdmissionRequest<DynamicObject>) -> bool {
    let Some(old_object) = &request.old_object else {
        return false;
    };
    old_object
        .metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(FORCE_DELETE_LABEL))
        .is_some_and(|value| value == "true")
}

/// Run an assessment under the per-request deadline
async fn with_deadline<F>(assess: F) -> Result<RiskAssessment>
where
    F: Future<Output = Result<RiskAssessment>>,
{
    match tokio::time::timeout(ASSESS_TIMEOUT, assess).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout(ASSESS_TIMEOUT)),
    }
}

/// Per-kind audit event for attempted deletions of guarded resources
fn log_deletion(kind: &str, namespace: &str, name: &str, username: &str) {
    match kind {
        "Namespace" => info!(
            namespace = %name,
            user = %username,
            "DELETE Namespace detected"
        ),
        "PersistentVolumeClaim" => info!(
            pvc = %format_args!("{}/{}", namespace, name),
            user = %username,
            "DELETE PVC detected"
        ),
        "PersistentVolume" => info!(
            pv = %name,
            user = %username,
            "DELETE PV detected"
        ),
        _ => info!(
            kind = %kind,
            namespace = %namespace,
            name = %name,
            user = %username,
            "DELETE detected"
        ),
    }
}

fn allow_with_message(request: &AdmissionRequest<DynamicObject>, message: &str) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    response.result.message = message.to_string();
    response
}

fn deny_forbidden(request: &AdmissionRequest<DynamicObject>, message: String) -> AdmissionResponse {
    let mut response = AdmissionResponse::from(request);
    response.allowed = false;
    response.result = Status::failure(&message, "Forbidden").with_code(403);
    response
}

fn operation_name(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}
