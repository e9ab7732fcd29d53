//! sdv-api: REST API for the SDV fleet orchestrator.
//!
//! Provides the axum routes the fleet dashboard polls and calls.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/nodes` | List nodes |
//! | POST | `/api/nodes` | Register a node |
//! | GET | `/api/nodes/{id}` | Get a node |
//! | DELETE | `/api/nodes/{id}` | Remove an idle node |
//! | GET | `/api/services` | List services |
//! | POST | `/api/services` | Deploy a template |
//! | GET | `/api/services/{id}` | Get a service |
//! | DELETE | `/api/services/{id}` | Undeploy a service |
//! | GET | `/api/templates` | List templates |
//! | GET | `/api/stats` | Fleet statistics |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sdv_orchestrator::Orchestrator;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the complete router (REST + metrics) with tracing and CORS.
pub fn build_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    let api_routes = Router::new()
        .route("/nodes", get(handlers::list_nodes).post(handlers::register_node))
        .route("/nodes/{id}", get(handlers::get_node).delete(handlers::remove_node))
        .route("/services", get(handlers::list_services).post(handlers::create_service))
        .route("/services/{id}", get(handlers::get_service).delete(handlers::delete_service))
        .route("/templates", get(handlers::list_templates))
        .route("/stats", get(handlers::get_stats));

    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
