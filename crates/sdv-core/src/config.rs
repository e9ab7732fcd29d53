//! fleet.toml configuration parser.
//!
//! A fleet file declares the vehicle compute nodes, the service templates
//! operators may deploy, and the placement policy.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Domain, Millicores, ResourceRequirements};

/// Largest CPU capacity a single node may declare: 1024 cores.
pub const MAX_NODE_CPU: Millicores = Millicores::from_millis(1_024_000);

/// Largest memory a single node may declare: 16 TiB.
pub const MAX_NODE_MEMORY_MB: u64 = 16 * 1024 * 1024;

fn default_node_bandwidth() -> u32 {
    1000
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub templates: Vec<TemplateConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlacementConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
}

/// Which placement policy the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// First node in registration order that fits.
    #[default]
    FirstFit,
    /// Feasible node with the least slack for the requirement.
    TightestFit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: Domain,
    pub cpu_cores: Millicores,
    pub memory_mb: u64,
    #[serde(default)]
    pub has_gpu: bool,
    #[serde(default = "default_node_bandwidth")]
    pub network_bandwidth_mbps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub domain: Domain,
    pub cpu_cores: Millicores,
    pub memory_mb: u64,
    #[serde(default)]
    pub gpu_required: bool,
    #[serde(default)]
    pub network_bandwidth_mbps: u32,
}

impl TemplateConfig {
    pub fn requirements(&self) -> ResourceRequirements {
        ResourceRequirements::new(self.cpu_cores, self.memory_mb, self.gpu_required)
            .with_bandwidth(self.network_bandwidth_mbps)
    }
}

/// Semantic problems in an otherwise well-formed fleet file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("node id must not be empty")]
    EmptyNodeId,

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("node {0} has no cpu or memory capacity")]
    ZeroCapacity(String),

    #[error("node {0} exceeds the per-node capacity limit")]
    CapacityTooLarge(String),

    #[error("template key must not be empty")]
    EmptyTemplateKey,

    #[error("duplicate template key: {0}")]
    DuplicateTemplate(String),
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check identifiers are unique and every node has usable capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut node_ids = HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err(ConfigError::EmptyNodeId);
            }
            if !node_ids.insert(node.id.as_str()) {
                return Err(ConfigError::DuplicateNode(node.id.clone()));
            }
            check_node_capacity(&node.id, node.cpu_cores, node.memory_mb)?;
        }

        let mut keys = HashSet::new();
        for template in &self.templates {
            if template.key.trim().is_empty() {
                return Err(ConfigError::EmptyTemplateKey);
            }
            if !keys.insert(template.key.as_str()) {
                return Err(ConfigError::DuplicateTemplate(template.key.clone()));
            }
        }
        Ok(())
    }
}

/// Reject a node whose capacity is zero or beyond the per-node limits.
pub fn check_node_capacity(id: &str, cpu: Millicores, memory_mb: u64) -> Result<(), ConfigError> {
    if cpu.is_zero() || memory_mb == 0 {
        return Err(ConfigError::ZeroCapacity(id.to_string()));
    }
    if cpu > MAX_NODE_CPU || memory_mb > MAX_NODE_MEMORY_MB {
        return Err(ConfigError::CapacityTooLarge(id.to_string()));
    }
    Ok(())
}
