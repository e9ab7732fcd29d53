//! The orchestrator API: one entry point composing every component.
//!
//! Each operation is a single logical transaction. Mutations hold the
//! shared side of a snapshot gate and still run in parallel with each other
//! (node locks serialize them per node); snapshot reads and node
//! registration take the exclusive side so they never observe or expose a
//! transaction half-applied.

use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::{error, info, warn};

use sdv_core::{FleetConfig, check_node_capacity};
use sdv_placement::PlacementEngine;
use sdv_state::{
    Node, NodeRegistry, NodeSpec, ServiceInstance, ServiceTemplate, StateStore, TemplateCatalog,
};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::ServiceRegistry;
use crate::stats::FleetStats;

/// Nodes, services, and stats taken under one gate acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct FleetSnapshot {
    pub nodes: Vec<Node>,
    pub services: Vec<ServiceInstance>,
    pub stats: FleetStats,
}

pub struct Orchestrator {
    gate: RwLock<()>,
    nodes: Arc<NodeRegistry>,
    catalog: Arc<TemplateCatalog>,
    services: ServiceRegistry,
    journal: Option<StateStore>,
    strategy: &'static str,
}

impl Orchestrator {
    /// Build an in-memory orchestrator from a fleet configuration.
    pub fn new(config: &FleetConfig) -> OrchestratorResult<Self> {
        Self::build(config, None)
    }

    /// Build an orchestrator backed by a journal and replay it: operator
    /// nodes first, then services in creation order.
    pub fn with_journal(config: &FleetConfig, journal: StateStore) -> OrchestratorResult<Self> {
        let orchestrator = Self::build(config, Some(journal.clone()))?;

        for spec in journal.list_nodes()? {
            let id = spec.id.clone();
            if let Err(e) = orchestrator.nodes.register(spec) {
                warn!(node = %id, error = %e, "skipping journaled node");
            }
        }
        orchestrator.services.restore()?;
        Ok(orchestrator)
    }

    fn build(config: &FleetConfig, journal: Option<StateStore>) -> OrchestratorResult<Self> {
        config.validate()?;

        let nodes = Arc::new(NodeRegistry::with_nodes(
            config.nodes.iter().map(NodeSpec::from),
        )?);
        let catalog = Arc::new(TemplateCatalog::new(
            config.templates.iter().map(ServiceTemplate::from),
        )?);
        let engine = PlacementEngine::from_kind(config.placement.strategy);
        let strategy = engine.strategy_name();

        info!(
            nodes = nodes.len(),
            templates = catalog.len(),
            strategy,
            journal = journal.is_some(),
            "orchestrator initialized"
        );

        Ok(Self {
            gate: RwLock::new(()),
            services: ServiceRegistry::new(
                Arc::clone(&catalog),
                Arc::clone(&nodes),
                engine,
                journal.clone(),
            ),
            nodes,
            catalog,
            journal,
            strategy,
        })
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Every node in registration order.
    pub fn list_nodes(&self) -> Vec<Node> {
        let _snapshot = self.gate.write().expect("snapshot gate");
        self.nodes.list()
    }

    pub fn get_node(&self, node_id: &str) -> OrchestratorResult<Node> {
        Ok(self.nodes.get(node_id)?)
    }

    /// Every service in creation order.
    pub fn list_services(&self) -> Vec<ServiceInstance> {
        let _snapshot = self.gate.write().expect("snapshot gate");
        self.services.list()
    }

    pub fn get_service(&self, service_id: &str) -> OrchestratorResult<ServiceInstance> {
        self.services.get(service_id)
    }

    pub fn list_templates(&self) -> Vec<ServiceTemplate> {
        self.catalog.list()
    }

    pub fn stats(&self) -> FleetStats {
        self.snapshot().stats
    }

    /// Nodes, services, and the stats derived from them, all consistent.
    pub fn snapshot(&self) -> FleetSnapshot {
        let (nodes, services) = {
            let _snapshot = self.gate.write().expect("snapshot gate");
            (self.nodes.list(), self.services.list())
        };
        let stats = FleetStats::aggregate(&nodes, &services);
        FleetSnapshot {
            nodes,
            services,
            stats,
        }
    }

    // ── Services ───────────────────────────────────────────────────

    /// Deploy an instance of a template. The returned record is `running`
    /// or, when no node fits, `failed` with a reason.
    pub fn deploy(&self, template_key: &str) -> OrchestratorResult<ServiceInstance> {
        let _txn = self.gate.read().expect("snapshot gate");
        self.services.deploy(template_key)
    }

    pub fn undeploy(&self, service_id: &str) -> OrchestratorResult<ServiceInstance> {
        let _txn = self.gate.read().expect("snapshot gate");
        self.services.undeploy(service_id)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Add a node at runtime. Journaled when a journal is attached.
    ///
    /// Holds the exclusive side of the gate so no deploy can land on the
    /// node before its journal entry commits; a failed commit therefore
    /// always finds the node idle and removes it again.
    pub fn register_node(&self, spec: NodeSpec) -> OrchestratorResult<Node> {
        if spec.id.trim().is_empty() {
            return Err(OrchestratorError::InvalidNode("node id must not be empty".into()));
        }
        check_node_capacity(&spec.id, spec.cpu, spec.memory_mb)
            .map_err(|e| OrchestratorError::InvalidNode(e.to_string()))?;

        let _txn = self.gate.write().expect("snapshot gate");
        let node_id = spec.id.clone();
        self.nodes.register(spec.clone())?;

        if let Some(journal) = &self.journal
            && let Err(e) = journal.put_node(&spec)
        {
            error!(node = %node_id, error = %e, "failed to journal node, rolling back");
            if let Err(rollback) = self.nodes.remove(&node_id) {
                error!(
                    node = %node_id,
                    error = %rollback,
                    "rollback failed, node stays registered without a journal entry"
                );
            }
            return Err(OrchestratorError::Journal(e));
        }

        Ok(self.nodes.get(&node_id)?)
    }

    /// Remove an idle node. Refused while any running service is placed on it.
    pub fn remove_node(&self, node_id: &str) -> OrchestratorResult<NodeSpec> {
        let _txn = self.gate.read().expect("snapshot gate");
        let spec = self.nodes.remove(node_id)?;

        if let Some(journal) = &self.journal
            && let Err(e) = journal.delete_node(node_id)
        {
            error!(node = %node_id, error = %e, "failed to delete journaled node");
        }
        Ok(spec)
    }
}
