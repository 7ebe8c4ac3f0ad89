use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::ApiError;
use super::model::IncidentKind;
use super::wire::{
    CityMapPayload, IncidentBody, OptimizeResponse, RefreshPayload, RerouteResponse, RouteBody,
    RouteResult, StepBody, TrafficStatePayload, parse_route_response,
};

/// The remote simulation engine, seen only through its response shapes.
///
/// Every call blocks; callers run them on worker threads.
pub trait SimulationApi: Send + Sync {
    fn fetch_city_map(&self) -> Result<CityMapPayload, ApiError>;
    fn fetch_traffic_state(&self) -> Result<TrafficStatePayload, ApiError>;
    fn optimize_lights(&self) -> Result<OptimizeResponse, ApiError>;
    fn calculate_route(&self, start: &str, end: &str) -> Result<RouteResult, ApiError>;
    fn reroute_vehicles(&self) -> Result<RerouteResponse, ApiError>;
    fn advance(&self, steps: u32) -> Result<(), ApiError>;
    fn reset(&self) -> Result<(), ApiError>;
    fn add_incident(
        &self,
        location: &str,
        kind: IncidentKind,
        duration: u32,
    ) -> Result<(), ApiError>;

    fn fetch_refresh(&self) -> Result<RefreshPayload, ApiError> {
        let city = self.fetch_city_map()?;
        let traffic = self.fetch_traffic_state()?;
        Ok(RefreshPayload { city, traffic })
    }
}

pub struct HttpSimulationApi {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpSimulationApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    fn read_body(
        endpoint: &str,
        response: reqwest::Result<reqwest::blocking::Response>,
    ) -> Result<String, ApiError> {
        let response = response.map_err(|error| network_error(endpoint, &error))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|error| network_error(endpoint, &error))?;

        if status.is_success() {
            debug!(endpoint, status = status.as_u16(), bytes = body.len(), "api call ok");
            Ok(body)
        } else {
            warn!(endpoint, status = status.as_u16(), "api call rejected");
            Err(ApiError::Server {
                endpoint: endpoint.to_owned(),
                status: status.as_u16(),
                body,
            })
        }
    }

    fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        let body = Self::read_body(endpoint, self.client.get(self.url(endpoint)).send())?;
        decode(endpoint, &body)
    }

    fn post_raw<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<String, ApiError> {
        Self::read_body(
            endpoint,
            self.client.post(self.url(endpoint)).json(body).send(),
        )
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let raw = self.post_raw(endpoint, body)?;
        decode(endpoint, &raw)
    }
}

fn network_error(endpoint: &str, error: &reqwest::Error) -> ApiError {
    warn!(endpoint, %error, "api call failed in transport");
    ApiError::Network {
        endpoint: endpoint.to_owned(),
        message: error.to_string(),
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, raw: &str) -> Result<T, ApiError> {
    serde_json::from_str(raw).map_err(|source| ApiError::Decode {
        endpoint: endpoint.to_owned(),
        source,
    })
}

fn empty_body() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl SimulationApi for HttpSimulationApi {
    fn fetch_city_map(&self) -> Result<CityMapPayload, ApiError> {
        self.get_json("/api/city-map")
    }

    fn fetch_traffic_state(&self) -> Result<TrafficStatePayload, ApiError> {
        self.get_json("/api/traffic-data")
    }

    fn optimize_lights(&self) -> Result<OptimizeResponse, ApiError> {
        self.post_json("/api/optimize-lights", &empty_body())
    }

    fn calculate_route(&self, start: &str, end: &str) -> Result<RouteResult, ApiError> {
        const ENDPOINT: &str = "/api/route";
        let raw = self.post_raw(ENDPOINT, &RouteBody { start, end })?;
        parse_route_response(&raw).map_err(|source| ApiError::Decode {
            endpoint: ENDPOINT.to_owned(),
            source,
        })
    }

    fn reroute_vehicles(&self) -> Result<RerouteResponse, ApiError> {
        self.post_json("/api/reroute-vehicles", &empty_body())
    }

    fn advance(&self, steps: u32) -> Result<(), ApiError> {
        self.post_raw("/api/simulate", &StepBody { steps }).map(|_| ())
    }

    fn reset(&self) -> Result<(), ApiError> {
        self.post_raw("/api/reset-simulation", &empty_body())
            .map(|_| ())
    }

    fn add_incident(
        &self,
        location: &str,
        kind: IncidentKind,
        duration: u32,
    ) -> Result<(), ApiError> {
        self.post_raw(
            "/api/add-incident",
            &IncidentBody {
                location,
                kind,
                duration,
            },
        )
        .map(|_| ())
    }
}
