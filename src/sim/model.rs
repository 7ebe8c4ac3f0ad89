use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LightPhase {
    Green,
    Red,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct LightDirection {
    pub green_time: u32,
    pub current_state: LightPhase,
    #[serde(default)]
    pub time_in_state: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TrafficLight {
    pub north_south: LightDirection,
    pub east_west: LightDirection,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleKind {
    Car,
    Bus,
    Truck,
    #[serde(other)]
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Moving,
    Arrived,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct VehicleRecord {
    #[serde(rename = "type")]
    pub kind: VehicleKind,
    pub status: VehicleStatus,
    pub current_position: String,
    #[serde(default)]
    pub destination: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentKind {
    Accident,
    Construction,
    Weather,
    #[serde(other)]
    Unknown,
}

impl IncidentKind {
    pub const ALL: [IncidentKind; 3] = [Self::Accident, Self::Construction, Self::Weather];

    pub fn label(self) -> &'static str {
        match self {
            Self::Accident => "accident",
            Self::Construction => "construction",
            Self::Weather => "weather",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Incident {
    pub id: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    #[serde(default)]
    pub severity: f64,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub road_id: Option<String>,
}

/// One immutable capture of the city graph plus live traffic state.
///
/// Snapshots are shared behind `Arc` and replaced wholesale; nothing
/// mutates one after it has been assembled.
#[derive(Clone, Debug, Default)]
pub struct WorldSnapshot {
    pub sequence: u64,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub traffic_lights: BTreeMap<String, TrafficLight>,
    pub vehicle_positions: BTreeMap<String, VehicleRecord>,
    pub traffic_density: BTreeMap<String, f64>,
    pub incidents: Vec<Incident>,
    node_index: HashMap<String, usize>,
}

impl WorldSnapshot {
    pub(super) fn from_parts(
        sequence: u64,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        traffic_lights: BTreeMap<String, TrafficLight>,
        vehicle_positions: BTreeMap<String, VehicleRecord>,
        traffic_density: BTreeMap<String, f64>,
        incidents: Vec<Incident>,
    ) -> Self {
        let node_index = nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (node.id.clone(), index))
            .collect();

        Self {
            sequence,
            nodes,
            edges,
            traffic_lights,
            vehicle_positions,
            traffic_density,
            incidents,
            node_index,
        }
    }

    pub fn has_data(&self) -> bool {
        self.sequence > 0
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).and_then(|&index| self.nodes.get(index))
    }

    /// Density for a road, treating roads absent from the map as empty.
    pub fn density(&self, edge_id: &str) -> f64 {
        self.traffic_density.get(edge_id).copied().unwrap_or(0.0)
    }

    pub fn vehicles_at<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a VehicleRecord)> + 'a {
        self.vehicle_positions
            .iter()
            .filter(move |(_, vehicle)| vehicle.current_position == node_id)
    }

    pub fn incidents_at<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Incident> + 'a {
        self.incidents
            .iter()
            .filter(move |incident| incident.location == node_id)
    }

    /// Copy of this snapshot with a different light table, same sequence.
    pub fn with_traffic_lights(&self, traffic_lights: BTreeMap<String, TrafficLight>) -> Self {
        Self {
            traffic_lights,
            ..self.clone()
        }
    }
}
