//! ServiceRegistry: lifecycle of deployed service instances.
//!
//! A deploy resolves the template, asks the placement engine to reserve a
//! node, and records the outcome: `running` with the debit applied, or
//! `failed` with no debit. Undeploy removes the record and credits the node
//! it ran on. Records are kept in creation order, keyed by a sequence number
//! that doubles as the journal key.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use sdv_core::ServiceId;
use sdv_placement::{Infeasible, PlacementEngine};
use sdv_state::{
    FailureReason, NodeRegistry, Reservation, ServiceInstance, ServiceStatus, StateStore,
    TemplateCatalog,
};

use crate::error::{OrchestratorError, OrchestratorResult};

#[derive(Default)]
struct ServiceTable {
    records: BTreeMap<u64, ServiceInstance>,
    by_id: HashMap<ServiceId, u64>,
}

impl ServiceTable {
    fn insert(&mut self, seq: u64, instance: ServiceInstance) {
        self.by_id.insert(instance.id.clone(), seq);
        self.records.insert(seq, instance);
    }

    fn remove(&mut self, service_id: &str) -> Option<(u64, ServiceInstance)> {
        let seq = self.by_id.remove(service_id)?;
        self.records.remove(&seq).map(|instance| (seq, instance))
    }
}

/// Owns every service instance record.
pub struct ServiceRegistry {
    catalog: Arc<TemplateCatalog>,
    nodes: Arc<NodeRegistry>,
    engine: PlacementEngine,
    journal: Option<StateStore>,
    next_seq: AtomicU64,
    table: RwLock<ServiceTable>,
}

impl ServiceRegistry {
    pub fn new(
        catalog: Arc<TemplateCatalog>,
        nodes: Arc<NodeRegistry>,
        engine: PlacementEngine,
        journal: Option<StateStore>,
    ) -> Self {
        Self {
            catalog,
            nodes,
            engine,
            journal,
            next_seq: AtomicU64::new(1),
            table: RwLock::new(ServiceTable::default()),
        }
    }

    /// Create an instance of `template_key` and try to place it.
    ///
    /// Infeasible placement is reported through the returned record's
    /// `failed` status, not as an error.
    pub fn deploy(&self, template_key: &str) -> OrchestratorResult<ServiceInstance> {
        let template = self
            .catalog
            .get(template_key)
            .ok_or_else(|| OrchestratorError::TemplateNotFound(template_key.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let mut instance = ServiceInstance::pending(id, template, Utc::now());
        debug!(service = %instance.id, template = %template_key, "service pending");

        match self
            .engine
            .place(&self.nodes, &instance.id, &instance.requirements)
        {
            Ok(node_id) => instance.mark_running(node_id),
            Err(Infeasible { reason }) => instance.mark_failed(reason),
        }

        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        if let Some(journal) = &self.journal
            && let Err(e) = journal.put_service(seq, &instance)
        {
            error!(service = %instance.id, error = %e, "failed to journal service, rolling back");
            self.release_reservation(&instance);
            return Err(OrchestratorError::Journal(e));
        }

        match instance.status {
            ServiceStatus::Running => info!(
                service = %instance.id,
                template = %template_key,
                node = instance.deployed_node.as_deref().unwrap_or_default(),
                "service running"
            ),
            _ => warn!(
                service = %instance.id,
                template = %template_key,
                reason = ?instance.failure_reason,
                "service failed"
            ),
        }

        self.table
            .write()
            .expect("service table lock")
            .insert(seq, instance.clone());
        Ok(instance)
    }

    /// Remove a service and credit its node. Returns the removed record.
    pub fn undeploy(&self, service_id: &str) -> OrchestratorResult<ServiceInstance> {
        let (seq, instance) = self
            .table
            .write()
            .expect("service table lock")
            .remove(service_id)
            .ok_or_else(|| OrchestratorError::ServiceNotFound(service_id.to_string()))?;

        self.release_reservation(&instance);

        if let Some(journal) = &self.journal
            && let Err(e) = journal.delete_service(seq)
        {
            // The record is already gone in memory; a stale journal entry is
            // re-validated against the ledger on the next restore.
            error!(service = %service_id, error = %e, "failed to delete journaled service");
        }

        info!(service = %service_id, status = ?instance.status, "service undeployed");
        Ok(instance)
    }

    /// All records in creation order.
    pub fn list(&self) -> Vec<ServiceInstance> {
        self.table
            .read()
            .expect("service table lock")
            .records
            .values()
            .cloned()
            .collect()
    }

    pub fn get(&self, service_id: &str) -> OrchestratorResult<ServiceInstance> {
        let table = self.table.read().expect("service table lock");
        table
            .by_id
            .get(service_id)
            .and_then(|seq| table.records.get(seq))
            .cloned()
            .ok_or_else(|| OrchestratorError::ServiceNotFound(service_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.table.read().expect("service table lock").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild the table from the journal, re-reserving every running
    /// service on its recorded node. Returns how many records were restored.
    ///
    /// A running record whose node is gone or can no longer fit it comes
    /// back as `failed` and the journal is rewritten to match.
    pub fn restore(&self) -> OrchestratorResult<usize> {
        let Some(journal) = &self.journal else {
            return Ok(0);
        };

        let mut restored = 0;
        for (seq, mut instance) in journal.list_services()? {
            self.next_seq.fetch_max(seq + 1, Ordering::Relaxed);

            if self
                .table
                .read()
                .expect("service table lock")
                .by_id
                .contains_key(&instance.id)
            {
                warn!(service = %instance.id, seq, "duplicate journaled service, skipping");
                continue;
            }

            let revived = match (instance.status, instance.deployed_node.clone()) {
                (ServiceStatus::Running, Some(node_id)) => {
                    self.rereserve(&node_id, &instance)
                }
                (ServiceStatus::Failed, _) => true,
                _ => false,
            };
            if !revived {
                instance.mark_failed(FailureReason::NodeUnavailable);
                journal.put_service(seq, &instance)?;
            }

            debug!(service = %instance.id, seq, status = ?instance.status, "service restored");
            self.table
                .write()
                .expect("service table lock")
                .insert(seq, instance);
            restored += 1;
        }

        if restored > 0 {
            info!(restored, "service journal replayed");
        }
        Ok(restored)
    }

    fn rereserve(&self, node_id: &str, instance: &ServiceInstance) -> bool {
        match self
            .nodes
            .try_reserve(node_id, &instance.id, &instance.requirements)
        {
            Ok(Reservation::Reserved) => true,
            Ok(Reservation::Rejected(rejection)) => {
                warn!(service = %instance.id, node = %node_id, %rejection, "journaled service no longer fits");
                false
            }
            Err(e) => {
                warn!(service = %instance.id, node = %node_id, error = %e, "journaled service lost its node");
                false
            }
        }
    }

    fn release_reservation(&self, instance: &ServiceInstance) {
        let Some(node_id) = instance.reserved_on() else {
            return;
        };
        if let Err(e) = self
            .nodes
            .release(node_id, &instance.id, &instance.requirements)
        {
            warn!(
                service = %instance.id,
                node = %node_id,
                error = %e,
                "resource inconsistency: node missing on release"
            );
        }
    }
}
