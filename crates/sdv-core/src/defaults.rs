//! Built-in fleet used when no fleet file is given.
//!
//! Three vehicle ECUs and the location-service templates that ship with
//! the dashboard.

use crate::config::{FleetConfig, NodeConfig, PlacementConfig, TemplateConfig};
use crate::types::{Domain, Millicores};

fn node(
    id: &str,
    name: &str,
    domain: Domain,
    cpu_millis: u64,
    memory_mb: u64,
    has_gpu: bool,
    network_bandwidth_mbps: u32,
) -> NodeConfig {
    NodeConfig {
        id: id.to_string(),
        name: name.to_string(),
        domain,
        cpu_cores: Millicores::from_millis(cpu_millis),
        memory_mb,
        has_gpu,
        network_bandwidth_mbps,
    }
}

#[allow(clippy::too_many_arguments)]
fn template(
    key: &str,
    name: &str,
    service_type: &str,
    domain: Domain,
    cpu_millis: u64,
    memory_mb: u64,
    gpu_required: bool,
    network_bandwidth_mbps: u32,
) -> TemplateConfig {
    TemplateConfig {
        key: key.to_string(),
        name: name.to_string(),
        service_type: service_type.to_string(),
        domain,
        cpu_cores: Millicores::from_millis(cpu_millis),
        memory_mb,
        gpu_required,
        network_bandwidth_mbps,
    }
}

/// The default three-ECU fleet with five location-service templates.
pub fn default_fleet() -> FleetConfig {
    FleetConfig {
        placement: PlacementConfig::default(),
        nodes: vec![
            node("node-1", "ADAS Domain Controller", Domain::Adas, 4000, 8192, true, 1000),
            node("node-2", "Infotainment Unit", Domain::Infotainment, 8000, 16384, true, 1000),
            node("node-3", "Telematics Control Unit", Domain::Telematics, 2000, 4096, false, 500),
        ],
        templates: vec![
            template("gps_positioning", "GPS Positioning Service", "positioning", Domain::Telematics, 500, 512, false, 50),
            template("map_rendering", "Map Rendering Service", "visualization", Domain::Infotainment, 2000, 4096, true, 200),
            template("route_planning", "Route Planning Service", "navigation", Domain::Infotainment, 1500, 2048, false, 100),
            template("poi_search", "POI Search Service", "discovery", Domain::Infotainment, 1000, 1024, false, 150),
            template("traffic_analysis", "Real-time Traffic Analysis", "analytics", Domain::Adas, 2500, 3072, true, 300),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fleet_is_valid() {
        let fleet = default_fleet();
        fleet.validate().unwrap();
        assert_eq!(fleet.nodes.len(), 3);
        assert_eq!(fleet.templates.len(), 5);
    }

    #[test]
    fn only_telematics_unit_lacks_gpu() {
        let fleet = default_fleet();
        let no_gpu: Vec<_> = fleet.nodes.iter().filter(|n| !n.has_gpu).map(|n| n.id.as_str()).collect();
        assert_eq!(no_gpu, vec!["node-3"]);
    }
}
