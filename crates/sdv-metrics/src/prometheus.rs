//! Prometheus text exposition format.

use std::fmt::Write;

use sdv_orchestrator::FleetStats;
use sdv_state::Node;

fn header(out: &mut String, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} gauge");
}

/// Render per-node and fleet-wide gauges.
///
/// Per-node gauges carry a `node` label; service counts carry a `status`
/// label.
pub fn render_prometheus(nodes: &[Node], stats: &FleetStats) -> String {
    let mut out = String::new();

    header(
        &mut out,
        "sdv_node_cpu_utilization_percent",
        "Reserved CPU as a percentage of node capacity.",
    );
    for n in nodes {
        let _ = writeln!(
            out,
            "sdv_node_cpu_utilization_percent{{node=\"{}\"}} {:.1}",
            n.id, n.utilization.cpu
        );
    }

    header(
        &mut out,
        "sdv_node_memory_utilization_percent",
        "Reserved memory as a percentage of node capacity.",
    );
    for n in nodes {
        let _ = writeln!(
            out,
            "sdv_node_memory_utilization_percent{{node=\"{}\"}} {:.1}",
            n.id, n.utilization.memory
        );
    }

    header(
        &mut out,
        "sdv_node_deployed_services",
        "Services holding a reservation on the node.",
    );
    for n in nodes {
        let _ = writeln!(
            out,
            "sdv_node_deployed_services{{node=\"{}\"}} {}",
            n.id,
            n.deployed_services.len()
        );
    }

    header(&mut out, "sdv_fleet_nodes", "Registered vehicle compute nodes.");
    let _ = writeln!(out, "sdv_fleet_nodes {}", stats.resources.nodes);

    header(&mut out, "sdv_services", "Service instances by status.");
    let _ = writeln!(out, "sdv_services{{status=\"running\"}} {}", stats.services.running);
    let _ = writeln!(out, "sdv_services{{status=\"failed\"}} {}", stats.services.failed);

    header(
        &mut out,
        "sdv_fleet_cpu_utilization_percent",
        "Reserved CPU as a percentage of fleet capacity.",
    );
    let _ = writeln!(
        out,
        "sdv_fleet_cpu_utilization_percent {:.1}",
        stats.resources.cpu_utilization
    );

    header(
        &mut out,
        "sdv_fleet_memory_utilization_percent",
        "Reserved memory as a percentage of fleet capacity.",
    );
    let _ = writeln!(
        out,
        "sdv_fleet_memory_utilization_percent {:.1}",
        stats.resources.memory_utilization
    );

    out
}
