use std::cmp::Ordering;

use eframe::egui::{Pos2, pos2};

use super::viewport::Viewport;
use crate::sim::GraphNode;

/// Visual radius of an intersection in world units, also the pick radius.
pub const NODE_RADIUS: f32 = 10.0;

/// Resolves a canvas-local pointer position to the nearest node within
/// `radius` world units. Equal distances resolve to the lower node id.
pub fn pick_node<'a>(
    nodes: &'a [GraphNode],
    viewport: &Viewport,
    pointer: Pos2,
    radius: f32,
) -> Option<&'a GraphNode> {
    let world = viewport.screen_to_world(pointer);

    nodes
        .iter()
        .map(|node| (node, pos2(node.x, node.y).distance(world)))
        .min_by(|(a, da), (b, db)| match da.total_cmp(db) {
            Ordering::Equal => a.id.cmp(&b.id),
            other => other,
        })
        .filter(|(_, distance)| *distance <= radius)
        .map(|(node, _)| node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use eframe::egui::vec2;

    fn node(id: &str, x: f32, y: f32) -> GraphNode {
        GraphNode {
            id: id.to_owned(),
            x,
            y,
        }
    }

    fn identity() -> Viewport {
        Viewport::new(vec2(0.0, 0.0), 1.0)
    }

    #[test]
    fn nearest_qualifying_node_wins() {
        let nodes = vec![node("far", 7.0, 0.0), node("near", 0.0, 3.0)];

        let hit = pick_node(&nodes, &identity(), pos2(0.0, 0.0), 10.0);
        assert_eq!(hit.map(|n| n.id.as_str()), Some("near"));
    }

    #[test]
    fn equal_distance_prefers_lower_id() {
        let nodes = vec![node("node_b", 5.0, 0.0), node("node_a", -5.0, 0.0)];

        let hit = pick_node(&nodes, &identity(), pos2(0.0, 0.0), 10.0);
        assert_eq!(hit.map(|n| n.id.as_str()), Some("node_a"));
    }

    #[test]
    fn nothing_within_radius_is_a_miss() {
        let nodes = vec![node("a", 30.0, 0.0)];

        assert!(pick_node(&nodes, &identity(), pos2(0.0, 0.0), NODE_RADIUS).is_none());
        assert!(pick_node(&[], &identity(), pos2(0.0, 0.0), NODE_RADIUS).is_none());
    }

    #[test]
    fn pointer_is_inverted_through_the_viewport() {
        let nodes = vec![node("a", 100.0, 100.0)];
        let viewport = Viewport::new(vec2(50.0, 50.0), 2.0);

        // world (100, 100) lands on screen (250, 250)
        let hit = pick_node(&nodes, &viewport, pos2(250.0, 258.0), NODE_RADIUS);
        assert_eq!(hit.map(|n| n.id.as_str()), Some("a"));

        // 30 px away on screen is 15 world units at zoom 2
        let miss = pick_node(&nodes, &viewport, pos2(280.0, 250.0), NODE_RADIUS);
        assert!(miss.is_none());
    }
}
