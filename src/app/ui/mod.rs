mod analytics;
mod controls;
mod details;
mod lights;
mod panels;
mod routing;

pub(super) const DEFAULT_INCIDENT_DURATION: u32 = 10;
