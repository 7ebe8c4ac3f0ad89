mod assemble;
mod client;
mod error;
mod model;
mod wire;

pub use assemble::assemble_snapshot;
pub use client::{HttpSimulationApi, SimulationApi};
pub use error::ApiError;
pub use model::{
    GraphEdge, GraphNode, IncidentKind, LightPhase, TrafficLight, VehicleKind, VehicleStatus,
    WorldSnapshot,
};
pub use wire::{LightTiming, RefreshPayload, RouteResult};

#[cfg(test)]
pub use model::{Incident, LightDirection, VehicleRecord};
#[cfg(test)]
pub use wire::{CityMapPayload, OptimizeResponse, RerouteResponse, TrafficStatePayload};
