//! Per-node resource ledger.
//!
//! A `ResourcePool` tracks total vs. available CPU and memory and the list
//! of services holding a reservation. It has no locking of its own; the
//! `NodeRegistry` keeps each pool behind a mutex so check-and-debit is a
//! single critical section.

use thiserror::Error;
use tracing::warn;

use sdv_core::{Millicores, ResourceRequirements, ServiceId};

use crate::types::{Node, NodeSpec};

/// Why a node turned a requirement down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("gpu required but node has none")]
    GpuMissing,

    #[error("needs {requested} Mbps, node link offers {capacity} Mbps")]
    InsufficientBandwidth { requested: u32, capacity: u32 },

    #[error("needs {requested} cpu cores, {available} available")]
    InsufficientCpu {
        requested: Millicores,
        available: Millicores,
    },

    #[error("needs {requested} MB memory, {available} MB available")]
    InsufficientMemory { requested: u64, available: u64 },
}

/// Capacity a node can still hand out, plus the hardware it offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Headroom {
    pub cpu: Millicores,
    pub memory_mb: u64,
    pub has_gpu: bool,
    pub network_bandwidth_mbps: u32,
}

impl Headroom {
    /// Check a requirement against this headroom. Hardware first, then
    /// capacity, so the reported rejection is the least curable one.
    pub fn admit(&self, req: &ResourceRequirements) -> Result<(), Rejection> {
        if req.gpu_required && !self.has_gpu {
            return Err(Rejection::GpuMissing);
        }
        if req.network_bandwidth_mbps > self.network_bandwidth_mbps {
            return Err(Rejection::InsufficientBandwidth {
                requested: req.network_bandwidth_mbps,
                capacity: self.network_bandwidth_mbps,
            });
        }
        if req.cpu_cores > self.cpu {
            return Err(Rejection::InsufficientCpu {
                requested: req.cpu_cores,
                available: self.cpu,
            });
        }
        if req.memory_mb > self.memory_mb {
            return Err(Rejection::InsufficientMemory {
                requested: req.memory_mb,
                available: self.memory_mb,
            });
        }
        Ok(())
    }
}

/// Ledger of one node's capacity.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    total_cpu: Millicores,
    available_cpu: Millicores,
    total_memory_mb: u64,
    available_memory_mb: u64,
    has_gpu: bool,
    network_bandwidth_mbps: u32,
    deployed: Vec<ServiceId>,
}

impl ResourcePool {
    /// A pool with everything available.
    pub fn new(spec: &NodeSpec) -> Self {
        Self {
            total_cpu: spec.cpu,
            available_cpu: spec.cpu,
            total_memory_mb: spec.memory_mb,
            available_memory_mb: spec.memory_mb,
            has_gpu: spec.has_gpu,
            network_bandwidth_mbps: spec.network_bandwidth_mbps,
            deployed: Vec::new(),
        }
    }

    pub fn headroom(&self) -> Headroom {
        Headroom {
            cpu: self.available_cpu,
            memory_mb: self.available_memory_mb,
            has_gpu: self.has_gpu,
            network_bandwidth_mbps: self.network_bandwidth_mbps,
        }
    }

    pub fn available_cpu(&self) -> Millicores {
        self.available_cpu
    }

    pub fn available_memory_mb(&self) -> u64 {
        self.available_memory_mb
    }

    pub fn deployed(&self) -> &[ServiceId] {
        &self.deployed
    }

    pub fn is_idle(&self) -> bool {
        self.deployed.is_empty()
    }

    /// Check and debit in one step. On rejection nothing changes.
    pub fn try_reserve(
        &mut self,
        service_id: &str,
        req: &ResourceRequirements,
    ) -> Result<(), Rejection> {
        self.headroom().admit(req)?;
        // admit() guarantees both subtractions stay in range.
        self.available_cpu = self.available_cpu.saturating_sub(req.cpu_cores);
        self.available_memory_mb = self.available_memory_mb.saturating_sub(req.memory_mb);
        self.deployed.push(service_id.to_string());
        Ok(())
    }

    /// Credit a reservation back. Returns false, changing nothing, when
    /// `service_id` holds no reservation here.
    pub fn release(&mut self, service_id: &str, req: &ResourceRequirements) -> bool {
        let Some(pos) = self.deployed.iter().position(|id| id == service_id) else {
            return false;
        };
        self.deployed.remove(pos);

        let cpu = self.available_cpu.saturating_add(req.cpu_cores);
        let memory = self.available_memory_mb.saturating_add(req.memory_mb);
        if cpu > self.total_cpu || memory > self.total_memory_mb {
            warn!(
                service = %service_id,
                "resource inconsistency: release would exceed node capacity, clamping"
            );
        }
        self.available_cpu = cpu.min(self.total_cpu);
        self.available_memory_mb = memory.min(self.total_memory_mb);
        true
    }

    /// Copy the ledger out as a node snapshot.
    pub fn snapshot(&self, spec: &NodeSpec) -> Node {
        Node {
            id: spec.id.clone(),
            name: spec.name.clone(),
            domain: spec.domain,
            total_cpu: self.total_cpu,
            available_cpu: self.available_cpu,
            total_memory: self.total_memory_mb,
            available_memory: self.available_memory_mb,
            has_gpu: self.has_gpu,
            network_bandwidth: self.network_bandwidth_mbps,
            utilization: Node::utilization_of(
                self.total_cpu,
                self.available_cpu,
                self.total_memory_mb,
                self.available_memory_mb,
            ),
            deployed_services: self.deployed.clone(),
        }
    }
}
