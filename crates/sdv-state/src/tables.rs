//! redb table definitions for the service journal.
//!
//! Values are JSON-serialized domain records.

use redb::TableDefinition;

/// Service instances keyed by their registry sequence number, so a scan
/// replays them in creation order.
pub const SERVICES: TableDefinition<u64, &[u8]> = TableDefinition::new("services");

/// Operator-registered node specs keyed by `{node_id}`.
pub const NODES: TableDefinition<&str, &[u8]> = TableDefinition::new("nodes");
