//! Shared types used across the SDV orchestrator crates.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unique identifier for a vehicle compute node.
pub type NodeId = String;

/// Unique identifier for a deployed service instance.
pub type ServiceId = String;

/// Key of a service template in the catalog.
pub type TemplateKey = String;

// ── Domain ─────────────────────────────────────────────────────────

/// Vehicle domain a node or template belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Domain {
    /// Advanced driver assistance.
    #[serde(rename = "ADAS")]
    Adas,
    Infotainment,
    Telematics,
    #[serde(rename = "Body Control")]
    BodyControl,
    #[default]
    Generic,
}

impl Domain {
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Adas => "ADAS",
            Domain::Infotainment => "Infotainment",
            Domain::Telematics => "Telematics",
            Domain::BodyControl => "Body Control",
            Domain::Generic => "Generic",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── CPU ────────────────────────────────────────────────────────────

/// Rejected CPU quantity.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("cpu cores must be a finite, non-negative number (got {0})")]
pub struct InvalidCpu(pub f64);

/// CPU capacity in thousandths of a core.
///
/// Ledgers account in whole millicores so debit followed by credit restores
/// the exact starting value. Serialized as real-valued cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Millicores(u64);

impl Millicores {
    pub const ZERO: Millicores = Millicores(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Convert real-valued cores, rounding to the nearest millicore.
    pub fn from_cores(cores: f64) -> Result<Self, InvalidCpu> {
        if !cores.is_finite() || cores < 0.0 {
            return Err(InvalidCpu(cores));
        }
        Ok(Self((cores * 1000.0).round() as u64))
    }

    pub const fn millis(self) -> u64 {
        self.0
    }

    pub fn as_cores(self) -> f64 {
        self.0 as f64 / 1000.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_sub(self, rhs: Millicores) -> Option<Millicores> {
        self.0.checked_sub(rhs.0).map(Millicores)
    }

    pub fn saturating_sub(self, rhs: Millicores) -> Millicores {
        Millicores(self.0.saturating_sub(rhs.0))
    }

    pub fn saturating_add(self, rhs: Millicores) -> Millicores {
        Millicores(self.0.saturating_add(rhs.0))
    }
}

impl TryFrom<f64> for Millicores {
    type Error = InvalidCpu;

    fn try_from(cores: f64) -> Result<Self, Self::Error> {
        Self::from_cores(cores)
    }
}

impl From<Millicores> for f64 {
    fn from(value: Millicores) -> Self {
        value.as_cores()
    }
}

impl std::iter::Sum for Millicores {
    fn sum<I: Iterator<Item = Millicores>>(iter: I) -> Self {
        iter.fold(Millicores::ZERO, Millicores::saturating_add)
    }
}

impl fmt::Display for Millicores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cores())
    }
}

// ── Requirements ───────────────────────────────────────────────────

/// Resources a single service instance needs from its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub cpu_cores: Millicores,
    pub memory_mb: u64,
    pub gpu_required: bool,
    /// Link bandwidth the node must offer. Checked, never debited.
    #[serde(default)]
    pub network_bandwidth_mbps: u32,
}

impl ResourceRequirements {
    pub fn new(cpu_cores: Millicores, memory_mb: u64, gpu_required: bool) -> Self {
        Self {
            cpu_cores,
            memory_mb,
            gpu_required,
            network_bandwidth_mbps: 0,
        }
    }

    pub fn with_bandwidth(mut self, mbps: u32) -> Self {
        self.network_bandwidth_mbps = mbps;
        self
    }
}

/// Percentage of `total` that is in use, rounded to one decimal place.
///
/// Takes `u128` so fleet-wide sums of `u64` capacities cannot overflow.
/// Returns 0 for a zero total.
pub fn utilization_percent(used: u128, total: u128) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = used as f64 / total as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}
