//! Placement engine for vehicle compute nodes.
//!
//! Selects exactly one node for a service requirement and reserves its
//! resources, or reports why no node can take it. This crate does NOT own
//! service records (that's `sdv-orchestrator`) or node ledgers (that's
//! `sdv-state`); it only decides and reserves.
//!
//! # Components
//!
//! - **`feasibility`**: static checks against node snapshots, failure reasons
//! - **`strategy`**: `PlacementStrategy` trait, first-fit and tightest-fit
//! - **`placer`**: `PlacementEngine`, which reserves in strategy order

pub mod feasibility;
pub mod placer;
pub mod strategy;

pub use feasibility::{classify_failure, feasible_nodes};
pub use placer::{Infeasible, PlacementEngine};
pub use strategy::{FirstFit, PlacementStrategy, TightestFit, strategy_for};
