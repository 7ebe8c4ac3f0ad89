use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::model::{GraphEdge, GraphNode, Incident, IncidentKind, TrafficLight, VehicleRecord};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CityMapPayload {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    #[serde(default, rename = "trafficLights")]
    pub traffic_lights: BTreeMap<String, TrafficLight>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TrafficStatePayload {
    #[serde(default, rename = "vehiclePositions")]
    pub vehicle_positions: BTreeMap<String, VehicleRecord>,
    #[serde(default, rename = "trafficDensity")]
    pub traffic_density: BTreeMap<String, f64>,
    #[serde(default)]
    pub incidents: Vec<Incident>,
}

/// Both halves of a refresh, fetched back to back.
#[derive(Clone, Debug, Default)]
pub struct RefreshPayload {
    pub city: CityMapPayload,
    pub traffic: TrafficStatePayload,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct LightTiming {
    pub north_south: u32,
    pub east_west: u32,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct OptimizeResponse {
    #[serde(default, rename = "newTimings")]
    pub new_timings: BTreeMap<String, LightTiming>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RerouteResponse {
    #[serde(default, rename = "newRoutes")]
    pub new_routes: BTreeMap<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RouteResult {
    #[serde(default)]
    pub path: Vec<String>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub traffic_adjusted: bool,
}

impl RouteResult {
    pub fn is_reachable(&self) -> bool {
        !self.path.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct StepBody {
    pub(super) steps: u32,
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct RouteBody<'a> {
    pub(super) start: &'a str,
    pub(super) end: &'a str,
}

#[derive(Clone, Debug, Serialize)]
pub(super) struct IncidentBody<'a> {
    pub(super) location: &'a str,
    #[serde(rename = "type")]
    pub(super) kind: IncidentKind,
    pub(super) duration: u32,
}

/// The route endpoint either answers with the route object directly or
/// wraps it as `{"route": {...}}`, and writes `Infinity` as the length of
/// an unreachable pair, which is not valid JSON.
pub(super) fn parse_route_response(raw: &str) -> Result<RouteResult, serde_json::Error> {
    let sanitized = null_non_finite(raw);
    let parsed: Value = serde_json::from_str(&sanitized)?;
    let route = match parsed {
        Value::Object(mut object) if object.contains_key("route") => object
            .remove("route")
            .unwrap_or(Value::Null),
        other => other,
    };

    if route.is_null() {
        return Ok(RouteResult::default());
    }

    RouteResult::deserialize(route)
}

/// Replaces bare `Infinity`, `-Infinity` and `NaN` values with `null`,
/// leaving string contents alone.
fn null_non_finite(raw: &str) -> String {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];

    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = raw;
    while let Some(ch) = rest.chars().next() {
        if !in_string {
            if let Some(token) = TOKENS.iter().find(|token| rest.starts_with(*token)) {
                out.push_str("null");
                rest = &rest[token.len()..];
                continue;
            }
        }
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}
