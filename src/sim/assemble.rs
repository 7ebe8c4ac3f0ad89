use std::collections::HashSet;

use tracing::warn;

use super::model::WorldSnapshot;
use super::wire::RefreshPayload;

pub const MIN_DENSITY: f64 = 0.0;
pub const MAX_DENSITY: f64 = 100.0;

/// Builds a snapshot from one refresh, normalizing what the server sent.
///
/// Duplicate node and edge ids keep their first occurrence, densities are
/// clamped into range. Dangling edge endpoints are kept: the renderer skips
/// them element by element.
pub fn assemble_snapshot(sequence: u64, payload: RefreshPayload) -> WorldSnapshot {
    let RefreshPayload { city, traffic } = payload;

    let mut seen_nodes = HashSet::with_capacity(city.nodes.len());
    let mut nodes = Vec::with_capacity(city.nodes.len());
    for node in city.nodes {
        if !node.x.is_finite() || !node.y.is_finite() {
            warn!(node = %node.id, "dropping node with non-finite position");
            continue;
        }
        if seen_nodes.insert(node.id.clone()) {
            nodes.push(node);
        } else {
            warn!(node = %node.id, "dropping duplicate node id");
        }
    }

    let mut seen_edges = HashSet::with_capacity(city.edges.len());
    let mut edges = Vec::with_capacity(city.edges.len());
    for edge in city.edges {
        if seen_edges.insert(edge.id.clone()) {
            edges.push(edge);
        } else {
            warn!(edge = %edge.id, "dropping duplicate edge id");
        }
    }

    let traffic_density = traffic
        .traffic_density
        .into_iter()
        .map(|(edge_id, density)| {
            let density = if density.is_finite() {
                density.clamp(MIN_DENSITY, MAX_DENSITY)
            } else {
                MIN_DENSITY
            };
            (edge_id, density)
        })
        .collect();

    WorldSnapshot::from_parts(
        sequence,
        nodes,
        edges,
        city.traffic_lights,
        traffic.vehicle_positions,
        traffic_density,
        traffic.incidents,
    )
}
