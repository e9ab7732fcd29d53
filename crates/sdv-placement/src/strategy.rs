//! Placement strategies.
//!
//! A strategy only orders candidate nodes; the engine does the reserving.
//! Alternate policies plug in here without touching the registries.

use std::cmp::Ordering;

use sdv_core::{ResourceRequirements, StrategyKind};
use sdv_state::Node;

/// Orders statically feasible nodes by preference.
pub trait PlacementStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Return `candidates` most-preferred first. Candidates arrive in
    /// registration order.
    fn rank<'a>(&self, candidates: Vec<&'a Node>, req: &ResourceRequirements) -> Vec<&'a Node>;
}

/// First node in registration order that fits. The default policy: no
/// packing analysis, minimal placement latency.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstFit;

impl PlacementStrategy for FirstFit {
    fn name(&self) -> &'static str {
        "first_fit"
    }

    fn rank<'a>(&self, candidates: Vec<&'a Node>, _req: &ResourceRequirements) -> Vec<&'a Node> {
        candidates
    }
}

/// Prefer the node that will have the least slack left, measured as the
/// mean of available/required over CPU and memory. Ties keep registration
/// order.
#[derive(Debug, Clone, Copy, Default)]
pub struct TightestFit;

impl TightestFit {
    /// Lower is tighter. Zero requirement components are left out.
    pub fn fitness(node: &Node, req: &ResourceRequirements) -> f64 {
        let mut terms = Vec::with_capacity(2);
        if !req.cpu_cores.is_zero() {
            terms.push(node.available_cpu.millis() as f64 / req.cpu_cores.millis() as f64);
        }
        if req.memory_mb > 0 {
            terms.push(node.available_memory as f64 / req.memory_mb as f64);
        }
        if terms.is_empty() {
            return 0.0;
        }
        terms.iter().sum::<f64>() / terms.len() as f64
    }
}

impl PlacementStrategy for TightestFit {
    fn name(&self) -> &'static str {
        "tightest_fit"
    }

    fn rank<'a>(&self, mut candidates: Vec<&'a Node>, req: &ResourceRequirements) -> Vec<&'a Node> {
        // sort_by is stable, so equal fitness keeps registration order.
        candidates.sort_by(|a, b| {
            Self::fitness(a, req)
                .partial_cmp(&Self::fitness(b, req))
                .unwrap_or(Ordering::Equal)
        });
        candidates
    }
}

/// Build the strategy named in configuration.
pub fn strategy_for(kind: StrategyKind) -> Box<dyn PlacementStrategy> {
    match kind {
        StrategyKind::FirstFit => Box::new(FirstFit),
        StrategyKind::TightestFit => Box::new(TightestFit),
    }
}
