//! The map scene as a pure function of a snapshot, a viewport and the
//! enabled layers. Output goes to any [`Surface`]; the live canvas uses
//! [`PainterSurface`], tests record into a `DrawList`.

use std::f32::consts::FRAC_PI_6;

use eframe::egui::{Color32, Pos2, Stroke, pos2, vec2};

use crate::engine::hit_test::NODE_RADIUS;
use crate::engine::viewport::Viewport;
use crate::sim::{GraphEdge, GraphNode, WorldSnapshot};

#[cfg(test)]
mod draw_list;
mod painter;
pub mod palette;

#[cfg(test)]
pub use draw_list::{DrawList, Primitive};
pub use painter::PainterSurface;

use palette::{
    MARKER_INK, NODE_FILL, NODE_SELECTED, ROAD_NEUTRAL, density_color, incident_color,
    light_color, vehicle_style,
};

pub const ROAD_WIDTH: f32 = 8.0;
const ARROW_SIZE: f32 = 10.0;
const LIGHT_RADIUS: f32 = 5.0;
const LIGHT_OFFSET: f32 = 15.0;
const MARKER_STROKE: f32 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    Roads,
    Arrows,
    Intersections,
    Lights,
    Vehicles,
    Incidents,
}

impl Layer {
    /// Stacking order, bottom first.
    pub const ORDER: [Layer; 6] = [
        Self::Roads,
        Self::Arrows,
        Self::Intersections,
        Self::Lights,
        Self::Vehicles,
        Self::Incidents,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerFlags {
    pub roads: bool,
    /// Color roads by density. Off draws them gray without arrowheads.
    pub density: bool,
    pub arrows: bool,
    pub intersections: bool,
    pub lights: bool,
    pub vehicles: bool,
    pub incidents: bool,
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self {
            roads: true,
            density: true,
            arrows: true,
            intersections: true,
            lights: true,
            vehicles: true,
            incidents: true,
        }
    }
}

impl LayerFlags {
    pub fn draws(&self, layer: Layer) -> bool {
        match layer {
            Layer::Roads => self.roads,
            Layer::Arrows => self.arrows && self.density,
            Layer::Intersections => self.intersections,
            Layer::Lights => self.lights,
            Layer::Vehicles => self.vehicles,
            Layer::Incidents => self.incidents,
        }
    }
}

/// Canvas-local drawing target. Coordinates are already in screen space.
pub trait Surface {
    fn begin_layer(&mut self, _layer: Layer) {}
    fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke);
    fn circle(&mut self, center: Pos2, radius: f32, fill: Color32, stroke: Stroke);
    fn polygon(&mut self, points: Vec<Pos2>, fill: Color32, stroke: Stroke);
}

/// An element left out of the frame because it names a node that does not
/// exist in the snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MissingReference {
    Road { edge_id: String, node_id: String },
    Light { intersection_id: String },
    Vehicle { vehicle_id: String, node_id: String },
    Incident { incident_id: String, node_id: String },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub roads: usize,
    pub arrows: usize,
    pub intersections: usize,
    pub lights: usize,
    pub vehicles: usize,
    pub incidents: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub drawn: ElementCounts,
    pub skipped: Vec<MissingReference>,
}

type Road<'a> = (&'a GraphEdge, &'a GraphNode, &'a GraphNode);

pub fn draw<S: Surface + ?Sized>(
    surface: &mut S,
    snapshot: &WorldSnapshot,
    viewport: &Viewport,
    layers: LayerFlags,
    selected: Option<&str>,
) -> RenderReport {
    let mut pass = Pass {
        snapshot,
        viewport,
        layers,
        report: RenderReport::default(),
    };

    let roads = if layers.draws(Layer::Roads) || layers.draws(Layer::Arrows) {
        resolve_roads(snapshot, &mut pass.report.skipped)
    } else {
        Vec::new()
    };

    for layer in Layer::ORDER {
        if !layers.draws(layer) {
            continue;
        }
        surface.begin_layer(layer);
        match layer {
            Layer::Roads => pass.roads(surface, &roads),
            Layer::Arrows => pass.arrows(surface, &roads),
            Layer::Intersections => pass.intersections(surface, selected),
            Layer::Lights => pass.lights(surface),
            Layer::Vehicles => pass.vehicles(surface),
            Layer::Incidents => pass.incidents(surface),
        }
    }

    pass.report
}

struct Pass<'a> {
    snapshot: &'a WorldSnapshot,
    viewport: &'a Viewport,
    layers: LayerFlags,
    report: RenderReport,
}

impl Pass<'_> {
    fn screen(&self, x: f32, y: f32) -> Pos2 {
        self.viewport.world_to_screen(pos2(x, y))
    }

    fn roads<S: Surface + ?Sized>(&mut self, surface: &mut S, roads: &[Road<'_>]) {
        let width = self.viewport.scale(ROAD_WIDTH);
        for (edge, source, target) in roads {
            let color = if self.layers.density {
                density_color(self.snapshot.density(&edge.id))
            } else {
                ROAD_NEUTRAL
            };
            surface.line(
                self.screen(source.x, source.y),
                self.screen(target.x, target.y),
                Stroke::new(width, color),
            );
            self.report.drawn.roads += 1;
        }
    }

    fn arrows<S: Surface + ?Sized>(&mut self, surface: &mut S, roads: &[Road<'_>]) {
        for (edge, source, target) in roads {
            let mid = vec2((source.x + target.x) / 2.0, (source.y + target.y) / 2.0);
            let angle = (target.y - source.y).atan2(target.x - source.x);
            let barb = |theta: f32| mid - vec2(ARROW_SIZE * theta.cos(), ARROW_SIZE * theta.sin());
            let left = barb(angle - FRAC_PI_6);
            let right = barb(angle + FRAC_PI_6);

            surface.polygon(
                vec![
                    self.screen(mid.x, mid.y),
                    self.screen(left.x, left.y),
                    self.screen(right.x, right.y),
                ],
                density_color(self.snapshot.density(&edge.id)),
                Stroke::NONE,
            );
            self.report.drawn.arrows += 1;
        }
    }

    fn intersections<S: Surface + ?Sized>(&mut self, surface: &mut S, selected: Option<&str>) {
        let radius = self.viewport.scale(NODE_RADIUS);
        for node in &self.snapshot.nodes {
            let fill = if selected == Some(node.id.as_str()) {
                NODE_SELECTED
            } else {
                NODE_FILL
            };
            surface.circle(self.screen(node.x, node.y), radius, fill, Stroke::NONE);
            self.report.drawn.intersections += 1;
        }
    }

    fn lights<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        let radius = self.viewport.scale(LIGHT_RADIUS);
        for (intersection_id, light) in &self.snapshot.traffic_lights {
            let Some(node) = self.snapshot.node(intersection_id) else {
                self.report.skipped.push(MissingReference::Light {
                    intersection_id: intersection_id.clone(),
                });
                continue;
            };
            surface.circle(
                self.screen(node.x, node.y - LIGHT_OFFSET),
                radius,
                light_color(light.north_south.current_state),
                Stroke::NONE,
            );
            surface.circle(
                self.screen(node.x + LIGHT_OFFSET, node.y),
                radius,
                light_color(light.east_west.current_state),
                Stroke::NONE,
            );
            self.report.drawn.lights += 1;
        }
    }

    fn vehicles<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        for (vehicle_id, vehicle) in &self.snapshot.vehicle_positions {
            let Some(node) = self.snapshot.node(&vehicle.current_position) else {
                self.report.skipped.push(MissingReference::Vehicle {
                    vehicle_id: vehicle_id.clone(),
                    node_id: vehicle.current_position.clone(),
                });
                continue;
            };
            let (color, size) = vehicle_style(vehicle.kind);
            surface.circle(
                self.screen(node.x, node.y),
                self.viewport.scale(size),
                color,
                Stroke::NONE,
            );
            self.report.drawn.vehicles += 1;
        }
    }

    fn incidents<S: Surface + ?Sized>(&mut self, surface: &mut S) {
        let ink = Stroke::new(self.viewport.scale(MARKER_STROKE), MARKER_INK);
        for incident in &self.snapshot.incidents {
            let Some(node) = self.snapshot.node(&incident.location) else {
                self.report.skipped.push(MissingReference::Incident {
                    incident_id: incident.id.clone(),
                    node_id: incident.location.clone(),
                });
                continue;
            };
            let (x, y) = (node.x, node.y);
            surface.polygon(
                vec![
                    self.screen(x, y - 20.0),
                    self.screen(x + 15.0, y + 5.0),
                    self.screen(x - 15.0, y + 5.0),
                ],
                incident_color(incident.kind),
                ink,
            );
            surface.line(self.screen(x, y - 10.0), self.screen(x, y - 2.0), ink);
            surface.circle(
                self.screen(x, y + 1.0),
                self.viewport.scale(1.0),
                MARKER_INK,
                Stroke::NONE,
            );
            self.report.drawn.incidents += 1;
        }
    }
}

fn resolve_roads<'a>(snapshot: &'a WorldSnapshot, skipped: &mut Vec<MissingReference>) -> Vec<Road<'a>> {
    snapshot
        .edges
        .iter()
        .filter_map(|edge| {
            let endpoint = |id: &str| {
                snapshot.node(id).ok_or_else(|| MissingReference::Road {
                    edge_id: edge.id.clone(),
                    node_id: id.to_owned(),
                })
            };
            let resolved = endpoint(&edge.source)
                .and_then(|source| endpoint(&edge.target).map(|target| (source, target)));
            match resolved {
                Ok((source, target)) => Some((edge, source, target)),
                Err(missing) => {
                    skipped.push(missing);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{RefreshPayload, assemble_snapshot};
    use serde_json::json;

    fn snapshot() -> WorldSnapshot {
        let city = serde_json::from_value(json!({
            "nodes": [
                {"id": "intersection_0_0", "x": 0.0, "y": 0.0},
                {"id": "intersection_1_0", "x": 100.0, "y": 0.0},
                {"id": "intersection_1_1", "x": 100.0, "y": 100.0}
            ],
            "edges": [
                {"id": "road_e_0_0", "source": "intersection_0_0", "target": "intersection_1_0"},
                {"id": "road_s_1_0", "source": "intersection_1_0", "target": "intersection_1_1"},
                {"id": "road_ghost", "source": "intersection_1_1", "target": "intersection_9_9"}
            ],
            "trafficLights": {
                "intersection_1_0": {
                    "north_south": {"green_time": 30, "current_state": "green", "time_in_state": 4},
                    "east_west": {"green_time": 30, "current_state": "red", "time_in_state": 4}
                }
            }
        }))
        .expect("city fixture");
        let traffic = serde_json::from_value(json!({
            "vehiclePositions": {
                "vehicle_0": {"type": "bus", "status": "moving",
                              "current_position": "intersection_0_0", "destination": "intersection_1_1"},
                "vehicle_1": {"type": "car", "status": "moving",
                              "current_position": "intersection_7_7", "destination": "intersection_1_1"}
            },
            "trafficDensity": {"road_e_0_0": 80.0, "road_s_1_0": 10.0},
            "incidents": [
                {"id": "incident_1", "location": "intersection_1_1", "type": "weather",
                 "severity": 0.4, "duration": 12}
            ]
        }))
        .expect("traffic fixture");
        assemble_snapshot(1, RefreshPayload { city, traffic })
    }

    fn render(layers: LayerFlags, viewport: &Viewport) -> (DrawList, RenderReport) {
        let mut list = DrawList::new();
        let report = draw(
            &mut list,
            &snapshot(),
            viewport,
            layers,
            Some("intersection_1_0"),
        );
        (list, report)
    }

    #[test]
    fn layers_stack_in_fixed_order() {
        let (list, _) = render(LayerFlags::default(), &Viewport::default());
        assert_eq!(list.layer_sequence(), Layer::ORDER.to_vec());
    }

    #[test]
    fn missing_nodes_skip_only_the_offending_element() {
        let (_, report) = render(LayerFlags::default(), &Viewport::default());

        assert_eq!(
            report.drawn,
            ElementCounts {
                roads: 2,
                arrows: 2,
                intersections: 3,
                lights: 1,
                vehicles: 1,
                incidents: 1,
            }
        );
        assert_eq!(
            report.skipped,
            vec![
                MissingReference::Road {
                    edge_id: "road_ghost".to_owned(),
                    node_id: "intersection_9_9".to_owned(),
                },
                MissingReference::Vehicle {
                    vehicle_id: "vehicle_1".to_owned(),
                    node_id: "intersection_7_7".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn drawing_twice_gives_identical_output() {
        let snapshot = snapshot();
        let viewport = Viewport::new(vec2(12.0, -3.0), 1.4);
        let mut first = DrawList::new();
        let mut second = DrawList::new();

        let a = draw(&mut first, &snapshot, &viewport, LayerFlags::default(), None);
        let b = draw(&mut second, &snapshot, &viewport, LayerFlags::default(), None);
        assert_eq!(first, second);
        assert_eq!(a, b);
    }

    #[test]
    fn disabled_layers_emit_nothing() {
        let layers = LayerFlags {
            lights: false,
            vehicles: false,
            ..LayerFlags::default()
        };
        let (list, report) = render(layers, &Viewport::default());

        assert_eq!(list.in_layer(Layer::Lights).count(), 0);
        assert_eq!(list.in_layer(Layer::Vehicles).count(), 0);
        assert_eq!(report.drawn.vehicles, 0);
        // A vehicle pass that never ran cannot report a missing node.
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn roads_are_colored_by_density_band() {
        let (list, _) = render(LayerFlags::default(), &Viewport::default());
        let colors: Vec<Color32> = list
            .in_layer(Layer::Roads)
            .filter_map(|primitive| match primitive {
                Primitive::Line { stroke, .. } => Some(stroke.color),
                _ => None,
            })
            .collect();
        assert_eq!(colors, vec![density_color(80.0), density_color(10.0)]);
    }

    #[test]
    fn density_off_draws_gray_roads_without_arrows() {
        let layers = LayerFlags {
            density: false,
            ..LayerFlags::default()
        };
        let (list, report) = render(layers, &Viewport::default());

        assert!(list.in_layer(Layer::Roads).all(|primitive| matches!(
            primitive,
            Primitive::Line { stroke, .. } if stroke.color == ROAD_NEUTRAL
        )));
        assert_eq!(list.in_layer(Layer::Arrows).count(), 0);
        assert_eq!(report.drawn.arrows, 0);
    }

    #[test]
    fn geometry_follows_the_viewport() {
        let viewport = Viewport::new(vec2(50.0, 50.0), 2.0);
        let (list, _) = render(LayerFlags::default(), &viewport);

        let nodes: Vec<_> = list.in_layer(Layer::Intersections).collect();
        assert_eq!(
            nodes[2],
            &Primitive::Circle {
                center: pos2(250.0, 250.0),
                radius: 20.0,
                fill: NODE_FILL,
                stroke: Stroke::NONE,
            }
        );
        // The selected intersection is highlighted.
        assert!(matches!(
            nodes[1],
            Primitive::Circle { fill, .. } if *fill == NODE_SELECTED
        ));
    }

    #[test]
    fn arrowhead_points_along_the_road() {
        let (list, _) = render(LayerFlags::default(), &Viewport::new(vec2(0.0, 0.0), 1.0));
        let Some(Primitive::Polygon { points, .. }) = list.in_layer(Layer::Arrows).next() else {
            panic!("expected an arrowhead");
        };

        // Road runs +x from (0,0) to (100,0): tip at the midpoint, barbs behind it.
        assert_eq!(points[0], pos2(50.0, 0.0));
        assert!(points[1].x < 50.0 && points[2].x < 50.0);
        assert!((points[1].y + points[2].y).abs() < 1e-4);
    }
}
