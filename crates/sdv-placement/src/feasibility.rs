//! Static feasibility checks over node snapshots.
//!
//! A node that passes here may still reject the reservation if a concurrent
//! deploy got there first; the registry re-checks under the node lock.

use sdv_core::ResourceRequirements;
use sdv_state::{FailureReason, Node};

/// Nodes whose snapshot admits `req`, in the order given.
pub fn feasible_nodes<'a>(nodes: &'a [Node], req: &ResourceRequirements) -> Vec<&'a Node> {
    nodes
        .iter()
        .filter(|node| node.headroom().admit(req).is_ok())
        .collect()
}

/// Explain why no node in `nodes` can host `req`.
///
/// Hardware mismatches are reported before capacity shortfalls: GPU first,
/// then link bandwidth, since freeing capacity cures neither.
pub fn classify_failure(nodes: &[Node], req: &ResourceRequirements) -> FailureReason {
    if nodes.is_empty() {
        return FailureReason::NoNodes;
    }

    let gpu_ok: Vec<&Node> = nodes
        .iter()
        .filter(|n| !req.gpu_required || n.has_gpu)
        .collect();
    if gpu_ok.is_empty() {
        return FailureReason::NoGpu;
    }

    if !gpu_ok
        .iter()
        .any(|n| n.network_bandwidth >= req.network_bandwidth_mbps)
    {
        return FailureReason::InsufficientBandwidth;
    }

    FailureReason::InsufficientCapacity
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdv_core::{Domain, Millicores};
    use sdv_state::Utilization;

    fn make_node(id: &str, avail_cpu: u64, avail_mem: u64, gpu: bool, bw: u32) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_string(),
            domain: Domain::Generic,
            total_cpu: Millicores::from_millis(8000),
            available_cpu: Millicores::from_millis(avail_cpu),
            total_memory: 16384,
            available_memory: avail_mem,
            has_gpu: gpu,
            network_bandwidth: bw,
            utilization: Utilization { cpu: 0.0, memory: 0.0 },
            deployed_services: Vec::new(),
        }
    }

    fn req(cpu: u64, mem: u64, gpu: bool, bw: u32) -> ResourceRequirements {
        ResourceRequirements::new(Millicores::from_millis(cpu), mem, gpu).with_bandwidth(bw)
    }

    #[test]
    fn filters_preserve_order() {
        let nodes = vec![
            make_node("n1", 4000, 8192, false, 1000),
            make_node("n2", 500, 8192, false, 1000),
            make_node("n3", 4000, 8192, false, 1000),
        ];
        let ids: Vec<_> = feasible_nodes(&nodes, &req(1000, 1024, false, 0))
            .into_iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["n1", "n3"]);
    }

    #[test]
    fn empty_fleet_is_no_nodes() {
        assert_eq!(
            classify_failure(&[], &req(1, 1, false, 0)),
            FailureReason::NoNodes
        );
    }

    #[test]
    fn gpu_missing_everywhere() {
        let nodes = vec![make_node("n1", 4000, 8192, false, 1000)];
        assert_eq!(
            classify_failure(&nodes, &req(1000, 1024, true, 0)),
            FailureReason::NoGpu
        );
    }

    #[test]
    fn bandwidth_only_checked_on_gpu_capable_nodes() {
        let nodes = vec![
            make_node("n1", 4000, 8192, false, 1000),
            make_node("n2", 4000, 8192, true, 100),
        ];
        assert_eq!(
            classify_failure(&nodes, &req(1000, 1024, true, 500)),
            FailureReason::InsufficientBandwidth
        );
    }

    #[test]
    fn capacity_when_hardware_matches() {
        let nodes = vec![make_node("n1", 500, 8192, true, 1000)];
        assert_eq!(
            classify_failure(&nodes, &req(1000, 1024, true, 100)),
            FailureReason::InsufficientCapacity
        );
    }
}
