//! NodeRegistry: the fleet of vehicle compute nodes.
//!
//! Each node's `ResourcePool` sits behind its own `Mutex`, so reservations
//! on the same node are linearizable while different nodes proceed in
//! parallel. The node list itself is behind an `RwLock` that is only taken
//! for writing when a node is registered or removed. Locks are always taken
//! fleet first, then pool.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use tracing::{debug, info, warn};

use sdv_core::{NodeId, ResourceRequirements};

use crate::error::{StateError, StateResult};
use crate::pool::{Rejection, ResourcePool};
use crate::types::{Node, NodeSpec};

/// Outcome of a reservation attempt on a known node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Reserved,
    Rejected(Rejection),
}

impl Reservation {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Reservation::Reserved)
    }
}

struct NodeSlot {
    spec: NodeSpec,
    pool: Mutex<ResourcePool>,
}

impl NodeSlot {
    fn snapshot(&self) -> Node {
        self.pool.lock().expect("node pool lock").snapshot(&self.spec)
    }
}

#[derive(Default)]
struct Fleet {
    /// Registration order; placement iterates in this order.
    slots: Vec<NodeSlot>,
    index: HashMap<NodeId, usize>,
}

impl Fleet {
    fn get(&self, node_id: &str) -> Option<&NodeSlot> {
        self.index.get(node_id).map(|&i| &self.slots[i])
    }

    fn reindex(&mut self) {
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (slot.spec.id.clone(), i))
            .collect();
    }
}

/// Owns every node record and its resource ledger.
#[derive(Default)]
pub struct NodeRegistry {
    fleet: RwLock<Fleet>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from node specs, in order.
    pub fn with_nodes<I>(specs: I) -> StateResult<Self>
    where
        I: IntoIterator<Item = NodeSpec>,
    {
        let registry = Self::new();
        for spec in specs {
            registry.register(spec)?;
        }
        Ok(registry)
    }

    /// Add a node with all of its capacity available.
    pub fn register(&self, spec: NodeSpec) -> StateResult<()> {
        let mut fleet = self.fleet.write().expect("fleet lock");
        if fleet.index.contains_key(&spec.id) {
            return Err(StateError::DuplicateNode(spec.id));
        }
        info!(
            node = %spec.id,
            domain = %spec.domain,
            cpu = %spec.cpu,
            memory_mb = spec.memory_mb,
            gpu = spec.has_gpu,
            "node registered"
        );
        let pool = Mutex::new(ResourcePool::new(&spec));
        let position = fleet.slots.len();
        fleet.index.insert(spec.id.clone(), position);
        fleet.slots.push(NodeSlot { spec, pool });
        Ok(())
    }

    /// Remove an idle node. Refused while any service holds a reservation.
    pub fn remove(&self, node_id: &str) -> StateResult<NodeSpec> {
        let mut fleet = self.fleet.write().expect("fleet lock");
        let position = *fleet
            .index
            .get(node_id)
            .ok_or_else(|| StateError::NodeNotFound(node_id.to_string()))?;

        {
            let pool = fleet.slots[position].pool.lock().expect("node pool lock");
            if !pool.is_idle() {
                return Err(StateError::NodeInUse {
                    node: node_id.to_string(),
                    services: pool.deployed().len(),
                });
            }
        }

        let slot = fleet.slots.remove(position);
        fleet.reindex();
        info!(node = %node_id, "node removed");
        Ok(slot.spec)
    }

    /// Snapshots of every node, in registration order.
    pub fn list(&self) -> Vec<Node> {
        let fleet = self.fleet.read().expect("fleet lock");
        fleet.slots.iter().map(|slot| slot.snapshot()).collect()
    }

    pub fn get(&self, node_id: &str) -> StateResult<Node> {
        let fleet = self.fleet.read().expect("fleet lock");
        fleet
            .get(node_id)
            .map(|slot| slot.snapshot())
            .ok_or_else(|| StateError::NodeNotFound(node_id.to_string()))
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.fleet.read().expect("fleet lock").index.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.fleet.read().expect("fleet lock").slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Atomically check `req` against the node and debit it on success.
    ///
    /// The node's lock is held across the check and the debit, so two
    /// concurrent reservations can never jointly overcommit a node. The
    /// fleet read lock is held until the debit lands, so `remove` cannot
    /// detach the node in between.
    pub fn try_reserve(
        &self,
        node_id: &str,
        service_id: &str,
        req: &ResourceRequirements,
    ) -> StateResult<Reservation> {
        let fleet = self.fleet.read().expect("fleet lock");
        let slot = fleet
            .get(node_id)
            .ok_or_else(|| StateError::NodeNotFound(node_id.to_string()))?;
        let mut pool = slot.pool.lock().expect("node pool lock");
        match pool.try_reserve(service_id, req) {
            Ok(()) => {
                debug!(
                    node = %node_id,
                    service = %service_id,
                    available_cpu = %pool.available_cpu(),
                    available_memory_mb = pool.available_memory_mb(),
                    "reserved"
                );
                Ok(Reservation::Reserved)
            }
            Err(rejection) => {
                debug!(node = %node_id, service = %service_id, %rejection, "reservation rejected");
                Ok(Reservation::Rejected(rejection))
            }
        }
    }

    /// Credit a reservation back to its node.
    ///
    /// Returns `Ok(false)` if the service held no reservation on the node;
    /// that is logged as a resource inconsistency and otherwise ignored.
    pub fn release(
        &self,
        node_id: &str,
        service_id: &str,
        req: &ResourceRequirements,
    ) -> StateResult<bool> {
        let fleet = self.fleet.read().expect("fleet lock");
        let slot = fleet
            .get(node_id)
            .ok_or_else(|| StateError::NodeNotFound(node_id.to_string()))?;
        let released = slot
            .pool
            .lock()
            .expect("node pool lock")
            .release(service_id, req);
        if released {
            debug!(node = %node_id, service = %service_id, "released");
        } else {
            warn!(
                node = %node_id,
                service = %service_id,
                "resource inconsistency: no reservation to release"
            );
        }
        Ok(released)
    }
}
