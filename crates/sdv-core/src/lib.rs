pub mod config;
pub mod defaults;
pub mod types;

pub use config::{
    ConfigError, FleetConfig, MAX_NODE_CPU, MAX_NODE_MEMORY_MB, NodeConfig, PlacementConfig,
    StrategyKind, TemplateConfig, check_node_capacity,
};
pub use defaults::default_fleet;
pub use types::*;
