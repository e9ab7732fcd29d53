//! sdv-metrics: Prometheus text exposition for the fleet.
//!
//! Rendering is a pure function of a node snapshot and the stats derived
//! from it; the caller takes both under one snapshot so the gauges agree.

pub mod prometheus;

pub use prometheus::render_prometheus;
