//! REST API handlers.
//!
//! Each handler calls the orchestrator and returns the record as JSON.
//! Failures use `{"error": "<message>"}` bodies.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tokio::task::spawn_blocking;
use tracing::error;

use sdv_core::NodeConfig;
use sdv_orchestrator::{Orchestrator, OrchestratorError, OrchestratorResult};
use sdv_state::{NodeSpec, ServiceInstance, ServiceStatus};

use crate::ApiState;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ErrorBody {
            error: msg.to_string(),
        }),
    )
}

fn status_for(err: &OrchestratorError) -> StatusCode {
    match err {
        OrchestratorError::TemplateNotFound(_) | OrchestratorError::InvalidNode(_) => {
            StatusCode::BAD_REQUEST
        }
        OrchestratorError::ServiceNotFound(_) | OrchestratorError::NodeNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        OrchestratorError::DuplicateNode(_) | OrchestratorError::NodeInUse { .. } => {
            StatusCode::CONFLICT
        }
        OrchestratorError::Config(_) | OrchestratorError::Journal(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn orchestrator_error(err: OrchestratorError) -> Response {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, "request failed");
    }
    error_response(&err.to_string(), status).into_response()
}

/// Run a mutation on the blocking pool. Journaled mutations commit to disk
/// while holding the snapshot gate, which must not stall the async workers.
async fn mutate<T, F>(state: &ApiState, op: F) -> Result<OrchestratorResult<T>, Response>
where
    T: Send + 'static,
    F: FnOnce(&Orchestrator) -> OrchestratorResult<T> + Send + 'static,
{
    let orchestrator = state.orchestrator.clone();
    spawn_blocking(move || op(&orchestrator)).await.map_err(|e| {
        error!(error = %e, "mutation task failed");
        error_response("Internal error", StatusCode::INTERNAL_SERVER_ERROR).into_response()
    })
}

// ── Nodes ──────────────────────────────────────────────────────

/// GET /api/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.list_nodes())
}

/// GET /api/nodes/{id}
pub async fn get_node(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.orchestrator.get_node(&id) {
        Ok(node) => Json(node).into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// POST /api/nodes
pub async fn register_node(
    State(state): State<ApiState>,
    Json(config): Json<NodeConfig>,
) -> impl IntoResponse {
    let spec = NodeSpec::from(&config);
    let outcome = match mutate(&state, move |o| o.register_node(spec)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    match outcome {
        Ok(node) => (StatusCode::CREATED, Json(node)).into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// DELETE /api/nodes/{id}
pub async fn remove_node(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = match mutate(&state, move |o| o.remove_node(&id)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    match outcome {
        Ok(_) => Json(serde_json::json!({ "message": "Node removed" })).into_response(),
        Err(e) => orchestrator_error(e),
    }
}

// ── Services ───────────────────────────────────────────────────

/// GET /api/services
pub async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.list_services())
}

/// GET /api/services/{id}
pub async fn get_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.orchestrator.get_service(&id) {
        Ok(service) => Json(service).into_response(),
        Err(e) => orchestrator_error(e),
    }
}

/// Deploy request body.
#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub template: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub service: ServiceInstance,
    pub deployed: bool,
}

/// POST /api/services
///
/// Responds 201 whether or not placement succeeded; `deployed` tells which.
pub async fn create_service(
    State(state): State<ApiState>,
    Json(req): Json<DeployRequest>,
) -> impl IntoResponse {
    let Some(template) = req.template else {
        return error_response("Invalid service template", StatusCode::BAD_REQUEST)
            .into_response();
    };
    let outcome = match mutate(&state, move |o| o.deploy(&template)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    match outcome {
        Ok(service) => {
            let deployed = service.status == ServiceStatus::Running;
            (StatusCode::CREATED, Json(DeployResponse { service, deployed })).into_response()
        }
        Err(OrchestratorError::TemplateNotFound(_)) => {
            error_response("Invalid service template", StatusCode::BAD_REQUEST).into_response()
        }
        Err(e) => orchestrator_error(e),
    }
}

/// DELETE /api/services/{id}
pub async fn delete_service(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let outcome = match mutate(&state, move |o| o.undeploy(&id)).await {
        Ok(outcome) => outcome,
        Err(response) => return response,
    };
    match outcome {
        Ok(_) => Json(serde_json::json!({ "message": "Service deleted" })).into_response(),
        Err(OrchestratorError::ServiceNotFound(_)) => {
            error_response("Service not found", StatusCode::NOT_FOUND).into_response()
        }
        Err(e) => orchestrator_error(e),
    }
}

// ── Templates and stats ────────────────────────────────────────

/// GET /api/templates
pub async fn list_templates(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.list_templates())
}

/// GET /api/stats
pub async fn get_stats(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.orchestrator.stats())
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let snapshot = state.orchestrator.snapshot();
    let body = sdv_metrics::render_prometheus(&snapshot.nodes, &snapshot.stats);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::to_bytes;
    use sdv_core::{Domain, MAX_NODE_MEMORY_MB, Millicores, default_fleet};
    use sdv_state::StateStore;

    fn test_state() -> ApiState {
        let orchestrator = Orchestrator::new(&default_fleet()).unwrap();
        ApiState {
            orchestrator: Arc::new(orchestrator),
        }
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn deploy_req(template: &str) -> Json<DeployRequest> {
        Json(DeployRequest {
            template: Some(template.to_string()),
        })
    }

    #[tokio::test]
    async fn list_nodes_returns_fleet() {
        let resp = list_nodes(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(json[0]["id"], "node-1");
        assert_eq!(json[0]["total_cpu"], 4.0);
    }

    #[tokio::test]
    async fn create_service_places_template() {
        let state = test_state();
        let resp = create_service(State(state.clone()), deploy_req("gps_positioning"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = body_json(resp).await;
        assert_eq!(json["deployed"], true);
        assert_eq!(json["service"]["status"], "running");
        assert_eq!(json["service"]["deployed_node"], "node-1");
        assert_eq!(state.orchestrator.list_services().len(), 1);
    }

    #[tokio::test]
    async fn create_service_unknown_template() {
        let resp = create_service(State(test_state()), deploy_req("warp_drive"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "Invalid service template");
    }

    #[tokio::test]
    async fn create_service_missing_template() {
        let resp = create_service(State(test_state()), Json(DeployRequest { template: None }))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_service_then_not_found() {
        let state = test_state();
        let svc = state.orchestrator.deploy("poi_search").unwrap();

        let resp = delete_service(State(state.clone()), Path(svc.id.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["message"], "Service deleted");

        let resp = delete_service(State(state), Path(svc.id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn get_service_by_id() {
        let state = test_state();
        let svc = state.orchestrator.deploy("route_planning").unwrap();

        let resp = get_service(State(state.clone()), Path(svc.id.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["id"], svc.id);

        let resp = get_service(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stats_shape() {
        let state = test_state();
        state.orchestrator.deploy("map_rendering").unwrap();

        let json = body_json(get_stats(State(state)).await.into_response()).await;
        assert_eq!(json["resources"]["nodes"], 3);
        assert_eq!(json["services"]["running"], 1);
        assert_eq!(json["services"]["total"], 1);
    }

    #[tokio::test]
    async fn templates_in_load_order() {
        let json = body_json(list_templates(State(test_state())).await.into_response()).await;
        let keys: Vec<_> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["key"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(keys[0], "gps_positioning");
        assert_eq!(keys.len(), 5);
    }

    #[tokio::test]
    async fn register_and_remove_node() {
        let state = test_state();
        let config = NodeConfig {
            id: "body-1".to_string(),
            name: "Body Control Module".to_string(),
            domain: Domain::BodyControl,
            cpu_cores: Millicores::from_millis(1000),
            memory_mb: 2048,
            has_gpu: false,
            network_bandwidth_mbps: 100,
        };

        let resp = register_node(State(state.clone()), Json(config.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body_json(resp).await["domain"], "Body Control");

        let resp = register_node(State(state.clone()), Json(config))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = remove_node(State(state.clone()), Path("body-1".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_node(State(state), Path("body-1".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn oversized_node_is_bad_request() {
        let config = NodeConfig {
            id: "huge".to_string(),
            name: "Oversized ECU".to_string(),
            domain: Domain::Generic,
            cpu_cores: Millicores::from_millis(1000),
            memory_mb: MAX_NODE_MEMORY_MB + 1,
            has_gpu: false,
            network_bandwidth_mbps: 100,
        };
        let resp = register_node(State(test_state()), Json(config))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn journaled_deploy_and_delete() {
        let journal = StateStore::open_in_memory().unwrap();
        let orchestrator = Orchestrator::with_journal(&default_fleet(), journal.clone()).unwrap();
        let state = ApiState {
            orchestrator: Arc::new(orchestrator),
        };

        let resp = create_service(State(state.clone()), deploy_req("poi_search"))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let id = body_json(resp).await["service"]["id"]
            .as_str()
            .unwrap()
            .to_string();
        assert_eq!(journal.list_services().unwrap().len(), 1);

        let resp = delete_service(State(state), Path(id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(journal.list_services().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_busy_node_conflicts() {
        let state = test_state();
        state.orchestrator.deploy("gps_positioning").unwrap();

        let resp = remove_node(State(state), Path("node-1".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let resp = prometheus_metrics(State(test_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
