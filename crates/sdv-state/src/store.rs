//! StateStore: redb-backed journal of service records and operator nodes.
//!
//! The registries stay authoritative in memory; the journal only lets a
//! restarted daemon rebuild them. Supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, StorageBackend};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe journal backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent journal at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory journal (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let store = Self::open_with_backend(redb::backends::InMemoryBackend::new())?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create a journal over a caller-supplied redb storage backend.
    pub fn open_with_backend(backend: impl StorageBackend) -> StateResult<Self> {
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(SERVICES).map_err(map_err!(Table))?;
        txn.open_table(NODES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Services ───────────────────────────────────────────────────

    /// Insert or overwrite the record at `seq`.
    pub fn put_service(&self, seq: u64, service: &ServiceInstance) -> StateResult<()> {
        let value = serde_json::to_vec(service).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            table
                .insert(seq, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(seq, service = %service.id, "service journaled");
        Ok(())
    }

    /// Delete the record at `seq`. Returns true if it existed.
    pub fn delete_service(&self, seq: u64) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
            existed = table.remove(seq).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(seq, existed, "service record deleted");
        Ok(existed)
    }

    /// All journaled services with their sequence numbers, oldest first.
    pub fn list_services(&self) -> StateResult<Vec<(u64, ServiceInstance)>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(SERVICES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            let service: ServiceInstance =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push((key.value(), service));
        }
        Ok(results)
    }

    // ── Nodes ──────────────────────────────────────────────────────

    /// Insert or update an operator-registered node.
    pub fn put_node(&self, node: &NodeSpec) -> StateResult<()> {
        let value = serde_json::to_vec(node).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            table
                .insert(node.id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// List all operator-registered nodes.
    pub fn list_nodes(&self) -> StateResult<Vec<NodeSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(NODES).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let node: NodeSpec =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(node);
        }
        Ok(results)
    }

    /// Delete a node by ID. Returns true if it existed.
    pub fn delete_node(&self, node_id: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(NODES).map_err(map_err!(Table))?;
            existed = table.remove(node_id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sdv_core::{Domain, Millicores, ResourceRequirements};

    fn test_template() -> ServiceTemplate {
        ServiceTemplate {
            key: "poi_search".to_string(),
            name: "POI Search Service".to_string(),
            service_type: "discovery".to_string(),
            domain: Domain::Infotainment,
            requirements: ResourceRequirements::new(Millicores::from_millis(1000), 1024, false),
        }
    }

    fn test_service(id: &str) -> ServiceInstance {
        let mut svc = ServiceInstance::pending(id.to_string(), &test_template(), Utc::now());
        svc.mark_running("node-1".to_string());
        svc
    }

    fn test_node(id: &str) -> NodeSpec {
        NodeSpec {
            id: id.to_string(),
            name: "Body Control Module".to_string(),
            domain: Domain::BodyControl,
            cpu: Millicores::from_millis(1000),
            memory_mb: 2048,
            has_gpu: false,
            network_bandwidth_mbps: 100,
        }
    }

    // ── Service journal ────────────────────────────────────────────

    #[test]
    fn service_put_and_list_in_sequence_order() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_service(7, &test_service("svc-b")).unwrap();
        store.put_service(2, &test_service("svc-a")).unwrap();
        store.put_service(11, &test_service("svc-c")).unwrap();

        let listed = store.list_services().unwrap();
        let order: Vec<_> = listed.iter().map(|(seq, s)| (*seq, s.id.as_str())).collect();
        assert_eq!(order, vec![(2, "svc-a"), (7, "svc-b"), (11, "svc-c")]);
    }

    #[test]
    fn service_put_overwrites() {
        let store = StateStore::open_in_memory().unwrap();
        let mut svc = test_service("svc-a");
        store.put_service(1, &svc).unwrap();

        svc.mark_failed(FailureReason::NodeUnavailable);
        store.put_service(1, &svc).unwrap();

        let listed = store.list_services().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.status, ServiceStatus::Failed);
    }

    #[test]
    fn service_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_service(1, &test_service("svc-a")).unwrap();

        assert!(store.delete_service(1).unwrap());
        assert!(!store.delete_service(1).unwrap());
        assert!(store.list_services().unwrap().is_empty());
    }

    #[test]
    fn service_record_round_trips() {
        let store = StateStore::open_in_memory().unwrap();
        let svc = test_service("svc-a");
        store.put_service(1, &svc).unwrap();
        assert_eq!(store.list_services().unwrap()[0].1, svc);
    }

    // ── Nodes ──────────────────────────────────────────────────────

    #[test]
    fn node_put_list_delete() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_node(&test_node("node-9")).unwrap();
        store.put_node(&test_node("node-8")).unwrap();

        let nodes = store.list_nodes().unwrap();
        assert_eq!(nodes.len(), 2);

        assert!(store.delete_node("node-9").unwrap());
        assert!(!store.delete_node("node-9").unwrap());
        assert_eq!(store.list_nodes().unwrap(), vec![test_node("node-8")]);
    }

    // ── On-disk persistence ────────────────────────────────────────

    #[test]
    fn persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sdv.redb");

        {
            let store = StateStore::open(&path).unwrap();
            store.put_service(1, &test_service("svc-a")).unwrap();
            store.put_node(&test_node("node-9")).unwrap();
        }

        let store = StateStore::open(&path).unwrap();
        assert_eq!(store.list_services().unwrap().len(), 1);
        assert_eq!(store.list_nodes().unwrap().len(), 1);
    }
}
