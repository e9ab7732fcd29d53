//! sdv-orchestrator: the fleet orchestrator core.
//!
//! Composes the node ledgers and template catalog from `sdv-state` with the
//! placement engine from `sdv-placement`:
//!
//! - **`services`**: `ServiceRegistry`, service lifecycle and journaling
//! - **`stats`**: `FleetStats`, fleet-wide aggregation over a snapshot
//! - **`orchestrator`**: `Orchestrator`, the query and command surface
//!   consumed by the HTTP layer

pub mod error;
pub mod orchestrator;
pub mod services;
pub mod stats;

pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{FleetSnapshot, Orchestrator};
pub use services::ServiceRegistry;
pub use stats::{FleetStats, ResourceStats, ServiceStats};
