//! sdv-state: resource accounting and record ownership for the orchestrator.
//!
//! Owns the three leaf components of the fleet model:
//!
//! - **`pool`**: `ResourcePool`, the per-node ledger of total vs. available
//!   CPU and memory plus the node's hardware (GPU, link bandwidth)
//! - **`nodes`**: `NodeRegistry`, the set of vehicle compute nodes, each
//!   wrapping a pool behind its own lock
//! - **`catalog`**: `TemplateCatalog`, the immutable template lookup
//!
//! It also provides the optional redb-backed `StateStore` used to journal
//! service records across restarts. Journal values are JSON-serialized into
//! redb's `&[u8]` columns.

pub mod catalog;
pub mod error;
pub mod nodes;
pub mod pool;
pub mod store;
pub mod tables;
pub mod types;

pub use catalog::TemplateCatalog;
pub use error::{StateError, StateResult};
pub use nodes::{NodeRegistry, Reservation};
pub use pool::{Headroom, Rejection, ResourcePool};
pub use store::StateStore;
pub use types::*;
