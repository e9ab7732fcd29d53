//! Placement engine: picks a node and reserves on it.
//!
//! 1. Snapshot the fleet and drop nodes that cannot admit the requirement
//! 2. Let the strategy order the survivors
//! 3. Attempt `try_reserve` in that order; the first success wins
//!
//! Every attempt is all-or-nothing on its node, so a rejected attempt on
//! one node never leaves a partial debit behind.

use thiserror::Error;
use tracing::{debug, warn};

use sdv_core::{NodeId, ResourceRequirements, StrategyKind};
use sdv_state::{FailureReason, NodeRegistry, Reservation, StateError};

use crate::feasibility::{classify_failure, feasible_nodes};
use crate::strategy::{FirstFit, PlacementStrategy, strategy_for};

/// No node could take the requirement. A scheduling outcome, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no feasible node: {reason}")]
pub struct Infeasible {
    pub reason: FailureReason,
}

/// Chooses and reserves a node for each placement request.
pub struct PlacementEngine {
    strategy: Box<dyn PlacementStrategy>,
}

impl Default for PlacementEngine {
    fn default() -> Self {
        Self::new(Box::new(FirstFit))
    }
}

impl PlacementEngine {
    pub fn new(strategy: Box<dyn PlacementStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_kind(kind: StrategyKind) -> Self {
        Self::new(strategy_for(kind))
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Reserve `req` for `service_id` on one node and return that node's id.
    pub fn place(
        &self,
        nodes: &NodeRegistry,
        service_id: &str,
        req: &ResourceRequirements,
    ) -> Result<NodeId, Infeasible> {
        let snapshot = nodes.list();
        let candidates = self.strategy.rank(feasible_nodes(&snapshot, req), req);

        for candidate in candidates {
            match nodes.try_reserve(&candidate.id, service_id, req) {
                Ok(Reservation::Reserved) => {
                    debug!(
                        service = %service_id,
                        node = %candidate.id,
                        strategy = self.strategy.name(),
                        "placed"
                    );
                    return Ok(candidate.id.clone());
                }
                Ok(Reservation::Rejected(rejection)) => {
                    // Lost a race with a concurrent reservation.
                    debug!(node = %candidate.id, %rejection, "candidate filled up, trying next");
                }
                Err(StateError::NodeNotFound(_)) => {
                    debug!(node = %candidate.id, "candidate removed, trying next");
                }
                Err(e) => {
                    warn!(node = %candidate.id, error = %e, "unexpected reservation error");
                }
            }
        }

        let reason = classify_failure(&snapshot, req);
        warn!(service = %service_id, %reason, "placement infeasible");
        Err(Infeasible { reason })
    }
}
