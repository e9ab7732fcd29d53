//! Domain records for nodes, templates, and service instances.
//!
//! Snapshots handed out by the registries are plain owned copies; nothing
//! here aliases a registry's internal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sdv_core::{
    Domain, Millicores, NodeConfig, NodeId, ResourceRequirements, ServiceId, TemplateConfig,
    TemplateKey, utilization_percent,
};

use crate::pool::Headroom;

// ── Node ──────────────────────────────────────────────────────────

/// Static description of a vehicle compute node, as registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: NodeId,
    pub name: String,
    pub domain: Domain,
    pub cpu: Millicores,
    pub memory_mb: u64,
    pub has_gpu: bool,
    pub network_bandwidth_mbps: u32,
}

impl From<&NodeConfig> for NodeSpec {
    fn from(cfg: &NodeConfig) -> Self {
        Self {
            id: cfg.id.clone(),
            name: cfg.name.clone(),
            domain: cfg.domain,
            cpu: cfg.cpu_cores,
            memory_mb: cfg.memory_mb,
            has_gpu: cfg.has_gpu,
            network_bandwidth_mbps: cfg.network_bandwidth_mbps,
        }
    }
}

/// Utilization percentages, one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    pub cpu: f64,
    pub memory: f64,
}

/// Point-in-time view of a node and its ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub domain: Domain,
    pub total_cpu: Millicores,
    pub available_cpu: Millicores,
    pub total_memory: u64,
    pub available_memory: u64,
    pub has_gpu: bool,
    pub network_bandwidth: u32,
    pub utilization: Utilization,
    pub deployed_services: Vec<ServiceId>,
}

impl Node {
    pub fn used_cpu(&self) -> Millicores {
        self.total_cpu.saturating_sub(self.available_cpu)
    }

    pub fn used_memory(&self) -> u64 {
        self.total_memory.saturating_sub(self.available_memory)
    }

    /// What the node could still accept at the time of the snapshot.
    pub fn headroom(&self) -> Headroom {
        Headroom {
            cpu: self.available_cpu,
            memory_mb: self.available_memory,
            has_gpu: self.has_gpu,
            network_bandwidth_mbps: self.network_bandwidth,
        }
    }

    pub(crate) fn utilization_of(
        total_cpu: Millicores,
        available_cpu: Millicores,
        total_memory: u64,
        available_memory: u64,
    ) -> Utilization {
        Utilization {
            cpu: utilization_percent(
                total_cpu.saturating_sub(available_cpu).millis().into(),
                total_cpu.millis().into(),
            ),
            memory: utilization_percent(
                total_memory.saturating_sub(available_memory).into(),
                total_memory.into(),
            ),
        }
    }
}

// ── Template ──────────────────────────────────────────────────────

/// A named, reusable service definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTemplate {
    pub key: TemplateKey,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub domain: Domain,
    pub requirements: ResourceRequirements,
}

impl From<&TemplateConfig> for ServiceTemplate {
    fn from(cfg: &TemplateConfig) -> Self {
        Self {
            key: cfg.key.clone(),
            name: cfg.name.clone(),
            service_type: cfg.service_type.clone(),
            domain: cfg.domain,
            requirements: cfg.requirements(),
        }
    }
}

// ── Service ───────────────────────────────────────────────────────

/// Lifecycle status of a service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Pending,
    Running,
    Failed,
}

/// Why a service could not be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The fleet has no nodes.
    NoNodes,
    /// A GPU is required and no node has one.
    NoGpu,
    /// No hardware-compatible node offers the required link bandwidth.
    InsufficientBandwidth,
    /// Hardware matches somewhere, but no node has enough free CPU/memory.
    InsufficientCapacity,
    /// The node a journaled service ran on is gone or can no longer fit it.
    NodeUnavailable,
}

impl FailureReason {
    pub fn describe(&self) -> &'static str {
        match self {
            FailureReason::NoNodes => "fleet has no nodes",
            FailureReason::NoGpu => "no node with a GPU",
            FailureReason::InsufficientBandwidth => "no node with enough network bandwidth",
            FailureReason::InsufficientCapacity => "no node with enough free cpu and memory",
            FailureReason::NodeUnavailable => "assigned node unavailable",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A deployment of a template, live or failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: ServiceId,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub template: TemplateKey,
    pub status: ServiceStatus,
    /// Node holding this service's reservation. Lookup only.
    pub deployed_node: Option<NodeId>,
    /// Copied from the template at deploy time.
    pub requirements: ResourceRequirements,
    pub created_at: DateTime<Utc>,
    pub failure_reason: Option<FailureReason>,
}

impl ServiceInstance {
    /// A fresh, not-yet-placed instance of `template`.
    pub fn pending(id: ServiceId, template: &ServiceTemplate, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: template.name.clone(),
            service_type: template.service_type.clone(),
            template: template.key.clone(),
            status: ServiceStatus::Pending,
            deployed_node: None,
            requirements: template.requirements,
            created_at,
            failure_reason: None,
        }
    }

    pub fn mark_running(&mut self, node_id: NodeId) {
        self.status = ServiceStatus::Running;
        self.deployed_node = Some(node_id);
        self.failure_reason = None;
    }

    pub fn mark_failed(&mut self, reason: FailureReason) {
        self.status = ServiceStatus::Failed;
        self.deployed_node = None;
        self.failure_reason = Some(reason);
    }

    /// Node holding a live reservation for this instance, if any.
    pub fn reserved_on(&self) -> Option<&str> {
        match self.status {
            ServiceStatus::Running => self.deployed_node.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_template() -> ServiceTemplate {
        ServiceTemplate {
            key: "route_planning".to_string(),
            name: "Route Planning Service".to_string(),
            service_type: "navigation".to_string(),
            domain: Domain::Infotainment,
            requirements: ResourceRequirements::new(Millicores::from_millis(1500), 2048, false)
                .with_bandwidth(100),
        }
    }

    #[test]
    fn pending_copies_template_fields() {
        let t = sample_template();
        let svc = ServiceInstance::pending("svc-1".to_string(), &t, Utc::now());
        assert_eq!(svc.status, ServiceStatus::Pending);
        assert_eq!(svc.name, t.name);
        assert_eq!(svc.service_type, "navigation");
        assert_eq!(svc.template, "route_planning");
        assert_eq!(svc.requirements, t.requirements);
        assert!(svc.deployed_node.is_none());
    }

    #[test]
    fn transitions_set_node_and_reason() {
        let t = sample_template();
        let mut svc = ServiceInstance::pending("svc-1".to_string(), &t, Utc::now());

        svc.mark_running("node-2".to_string());
        assert_eq!(svc.reserved_on(), Some("node-2"));

        svc.mark_failed(FailureReason::NodeUnavailable);
        assert_eq!(svc.status, ServiceStatus::Failed);
        assert!(svc.deployed_node.is_none());
        assert_eq!(svc.reserved_on(), None);
        assert_eq!(svc.failure_reason, Some(FailureReason::NodeUnavailable));
    }

    #[test]
    fn service_json_shape() {
        let t = sample_template();
        let svc = ServiceInstance::pending("svc-1".to_string(), &t, Utc::now());
        let json = serde_json::to_value(&svc).unwrap();

        assert_eq!(json["type"], "navigation");
        assert_eq!(json["status"], "pending");
        assert!(json["deployed_node"].is_null());
        assert_eq!(json["requirements"]["cpu_cores"], 1.5);
        assert_eq!(json["requirements"]["memory_mb"], 2048);
        assert_eq!(json["requirements"]["gpu_required"], false);
    }

    #[test]
    fn utilization_of_half_used_node() {
        let u = Node::utilization_of(
            Millicores::from_millis(4000),
            Millicores::from_millis(2000),
            8192,
            6144,
        );
        assert_eq!(u.cpu, 50.0);
        assert_eq!(u.memory, 25.0);
    }
}
