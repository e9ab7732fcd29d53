//! Fleet-wide statistics.

use serde::{Deserialize, Serialize};

use sdv_core::utilization_percent;
use sdv_state::{Node, ServiceInstance, ServiceStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub nodes: usize,
    pub cpu_utilization: f64,
    pub memory_utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    pub total: usize,
    pub running: usize,
    pub failed: usize,
}

/// Aggregated view returned by `getStats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub resources: ResourceStats,
    pub services: ServiceStats,
}

impl FleetStats {
    /// Summarize a node and service snapshot. Pure; takes no locks.
    ///
    /// Utilization is reserved over total capacity summed across the fleet,
    /// so larger nodes weigh more. An empty fleet reports zero.
    pub fn aggregate(nodes: &[Node], services: &[ServiceInstance]) -> Self {
        // Widened so the sum of per-node u64 capacities cannot overflow.
        let sum = |f: fn(&Node) -> u64| -> u128 { nodes.iter().map(|n| u128::from(f(n))).sum() };
        let total_cpu = sum(|n| n.total_cpu.millis());
        let used_cpu = sum(|n| n.used_cpu().millis());
        let total_memory = sum(|n| n.total_memory);
        let used_memory = sum(|n| n.used_memory());

        let mut tally = ServiceStats {
            total: services.len(),
            ..ServiceStats::default()
        };
        for service in services {
            match service.status {
                ServiceStatus::Running => tally.running += 1,
                ServiceStatus::Failed => tally.failed += 1,
                ServiceStatus::Pending => {}
            }
        }

        Self {
            resources: ResourceStats {
                nodes: nodes.len(),
                cpu_utilization: utilization_percent(used_cpu, total_cpu),
                memory_utilization: utilization_percent(used_memory, total_memory),
            },
            services: tally,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sdv_core::{Domain, Millicores, ResourceRequirements};
    use sdv_state::{FailureReason, ServiceTemplate, Utilization};

    fn node(id: &str, total_cpu: u64, avail_cpu: u64, total_mem: u64, avail_mem: u64) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            domain: Domain::Generic,
            total_cpu: Millicores::from_millis(total_cpu),
            available_cpu: Millicores::from_millis(avail_cpu),
            total_memory: total_mem,
            available_memory: avail_mem,
            has_gpu: false,
            network_bandwidth: 1000,
            utilization: Utilization { cpu: 0.0, memory: 0.0 },
            deployed_services: Vec::new(),
        }
    }

    fn service(id: &str, running: bool) -> ServiceInstance {
        let template = ServiceTemplate {
            key: "t".to_string(),
            name: "T".to_string(),
            service_type: "test".to_string(),
            domain: Domain::Generic,
            requirements: ResourceRequirements::new(Millicores::from_millis(1000), 512, false),
        };
        let mut svc = ServiceInstance::pending(id.to_string(), &template, Utc::now());
        if running {
            svc.mark_running("n1".to_string());
        } else {
            svc.mark_failed(FailureReason::NoGpu);
        }
        svc
    }

    #[test]
    fn empty_fleet_is_all_zero() {
        let stats = FleetStats::aggregate(&[], &[]);
        assert_eq!(stats.resources.nodes, 0);
        assert_eq!(stats.resources.cpu_utilization, 0.0);
        assert_eq!(stats.resources.memory_utilization, 0.0);
        assert_eq!(stats.services, ServiceStats::default());
    }

    #[test]
    fn utilization_is_capacity_weighted() {
        // 3 of 12 cores used, 2048 of 16384 MB used.
        let nodes = [
            node("n1", 4000, 1000, 8192, 6144),
            node("n2", 8000, 8000, 8192, 8192),
        ];
        let stats = FleetStats::aggregate(&nodes, &[]);
        assert_eq!(stats.resources.nodes, 2);
        assert_eq!(stats.resources.cpu_utilization, 25.0);
        assert_eq!(stats.resources.memory_utilization, 12.5);
    }

    #[test]
    fn rounds_to_one_decimal() {
        let nodes = [node("n1", 3000, 2000, 3000, 2000)];
        let stats = FleetStats::aggregate(&nodes, &[]);
        assert_eq!(stats.resources.cpu_utilization, 33.3);
    }

    #[test]
    fn huge_capacities_do_not_overflow() {
        let nodes = [
            node("n1", u64::MAX, u64::MAX, u64::MAX, u64::MAX / 2),
            node("n2", u64::MAX, 0, u64::MAX, u64::MAX),
        ];
        let stats = FleetStats::aggregate(&nodes, &[]);
        assert_eq!(stats.resources.cpu_utilization, 50.0);
        assert_eq!(stats.resources.memory_utilization, 25.0);
    }

    #[test]
    fn counts_services_by_status() {
        let services = [service("a", true), service("b", false), service("c", true)];
        let stats = FleetStats::aggregate(&[], &services);
        assert_eq!(
            stats.services,
            ServiceStats {
                total: 3,
                running: 2,
                failed: 1
            }
        );
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(FleetStats::aggregate(&[], &[])).unwrap();
        assert_eq!(json["resources"]["nodes"], 0);
        assert_eq!(json["resources"]["cpu_utilization"], 0.0);
        assert_eq!(json["services"]["running"], 0);
    }
}
