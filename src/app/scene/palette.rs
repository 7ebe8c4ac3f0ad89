use eframe::egui::Color32;

use crate::sim::{IncidentKind, LightPhase, VehicleKind};

pub const ROAD_NEUTRAL: Color32 = Color32::from_rgb(0xAA, 0xAA, 0xAA);
pub const NODE_FILL: Color32 = Color32::from_rgb(0x33, 0x33, 0x33);
pub const NODE_SELECTED: Color32 = Color32::from_rgb(0xFF, 0x41, 0x36);
pub const LIGHT_GREEN: Color32 = Color32::from_rgb(0x2E, 0xCC, 0x40);
pub const LIGHT_RED: Color32 = Color32::from_rgb(0xFF, 0x41, 0x36);
pub const MARKER_INK: Color32 = Color32::WHITE;

/// Congestion bucket of a road, lowest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DensityBand {
    Free,
    Moderate,
    Heavy,
    Jammed,
}

impl DensityBand {
    /// Descending thresholds; the first one not above the density wins.
    const THRESHOLDS: [(f64, DensityBand); 4] = [
        (75.0, DensityBand::Jammed),
        (50.0, DensityBand::Heavy),
        (25.0, DensityBand::Moderate),
        (0.0, DensityBand::Free),
    ];

    pub fn of(density: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(threshold, _)| density >= *threshold)
            .map_or(DensityBand::Free, |(_, band)| *band)
    }

    pub fn color(self) -> Color32 {
        match self {
            Self::Free => Color32::from_rgb(0x2E, 0xCC, 0x40),
            Self::Moderate => Color32::from_rgb(0xFF, 0xDC, 0x00),
            Self::Heavy => Color32::from_rgb(0xFF, 0x85, 0x1B),
            Self::Jammed => Color32::from_rgb(0xFF, 0x41, 0x36),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Free => "Free flow",
            Self::Moderate => "Moderate",
            Self::Heavy => "Heavy",
            Self::Jammed => "Congested",
        }
    }
}

pub fn density_color(density: f64) -> Color32 {
    DensityBand::of(density).color()
}

pub fn light_color(phase: LightPhase) -> Color32 {
    match phase {
        LightPhase::Green => LIGHT_GREEN,
        LightPhase::Red | LightPhase::Unknown => LIGHT_RED,
    }
}

/// Fill color and world-space radius. Unrecognized kinds draw as cars.
pub fn vehicle_style(kind: VehicleKind) -> (Color32, f32) {
    match kind {
        VehicleKind::Bus => (Color32::from_rgb(0xFF, 0x85, 0x1B), 8.0),
        VehicleKind::Truck => (Color32::from_rgb(0xB1, 0x0D, 0xC9), 7.0),
        VehicleKind::Car | VehicleKind::Other => (Color32::from_rgb(0x00, 0x74, 0xD9), 6.0),
    }
}

pub fn incident_color(kind: IncidentKind) -> Color32 {
    match kind {
        IncidentKind::Construction => Color32::from_rgb(0xFF, 0x85, 0x1B),
        IncidentKind::Weather => Color32::from_rgb(0x00, 0x74, 0xD9),
        IncidentKind::Accident | IncidentKind::Unknown => Color32::from_rgb(0xFF, 0x41, 0x36),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_buckets_follow_highest_threshold() {
        assert_eq!(DensityBand::of(10.0), DensityBand::Free);
        assert_eq!(DensityBand::of(30.0), DensityBand::Moderate);
        assert_eq!(DensityBand::of(60.0), DensityBand::Heavy);
        assert_eq!(DensityBand::of(85.0), DensityBand::Jammed);
    }

    #[test]
    fn thresholds_are_inclusive() {
        assert_eq!(DensityBand::of(0.0), DensityBand::Free);
        assert_eq!(DensityBand::of(25.0), DensityBand::Moderate);
        assert_eq!(DensityBand::of(50.0), DensityBand::Heavy);
        assert_eq!(DensityBand::of(75.0), DensityBand::Jammed);
        assert_eq!(DensityBand::of(74.999), DensityBand::Heavy);
    }

    #[test]
    fn colors_match_bands() {
        assert_eq!(density_color(10.0), Color32::from_rgb(0x2E, 0xCC, 0x40));
        assert_eq!(density_color(30.0), Color32::from_rgb(0xFF, 0xDC, 0x00));
        assert_eq!(density_color(60.0), Color32::from_rgb(0xFF, 0x85, 0x1B));
        assert_eq!(density_color(85.0), Color32::from_rgb(0xFF, 0x41, 0x36));
        // Below every threshold still reads as free flow.
        assert_eq!(density_color(-3.0), DensityBand::Free.color());
    }
}
