use std::collections::{BTreeMap, VecDeque};
use std::time::SystemTime;

use tracing::debug;

use crate::sim::{IncidentKind, VehicleStatus, WorldSnapshot};

pub const HISTORY_CAPACITY: usize = 60;
pub const HOTSPOT_THRESHOLD: f64 = 70.0;
pub const HOTSPOT_LIMIT: usize = 10;
const TREND_WINDOW: usize = 5;
const TREND_RISE: f64 = 1.1;
const TREND_FALL: f64 = 0.9;

#[derive(Clone, Debug, PartialEq)]
pub struct HistorySample {
    pub sequence: u64,
    pub timestamp: SystemTime,
    pub avg_density: f64,
    pub moving_count: usize,
    pub arrived_count: usize,
    pub incident_count: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trend {
    Increasing,
    Decreasing,
    #[default]
    Stable,
}

impl Trend {
    pub fn label(self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Hotspot {
    pub road_id: String,
    pub density: f64,
}

/// How many of the most recent samples a chart shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryWindow {
    Last15,
    Last30,
    #[default]
    Last60,
}

impl HistoryWindow {
    pub const ALL: [HistoryWindow; 3] = [Self::Last15, Self::Last30, Self::Last60];

    pub fn sample_count(self) -> usize {
        match self {
            Self::Last15 => 15,
            Self::Last30 => 30,
            Self::Last60 => 60,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Last15 => "15",
            Self::Last30 => "30",
            Self::Last60 => "60",
        }
    }
}

/// Aggregate numbers for one snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FleetStats {
    pub total_vehicles: usize,
    pub moving: usize,
    pub arrived: usize,
    pub avg_density: f64,
    pub active_incidents: usize,
    /// Road counts for densities `<=25`, `(25,50]`, `(50,75]`, `>75`.
    pub density_buckets: [usize; 4],
    pub incidents_by_kind: BTreeMap<&'static str, usize>,
}

impl FleetStats {
    pub fn of(snapshot: &WorldSnapshot) -> Self {
        let mut stats = Self {
            total_vehicles: snapshot.vehicle_positions.len(),
            active_incidents: snapshot.incidents.len(),
            avg_density: average_density(snapshot),
            ..Self::default()
        };

        for vehicle in snapshot.vehicle_positions.values() {
            match vehicle.status {
                VehicleStatus::Moving => stats.moving += 1,
                VehicleStatus::Arrived => stats.arrived += 1,
                VehicleStatus::Unknown => {}
            }
        }

        for &density in snapshot.traffic_density.values() {
            let bucket = if density <= 25.0 {
                0
            } else if density <= 50.0 {
                1
            } else if density <= 75.0 {
                2
            } else {
                3
            };
            stats.density_buckets[bucket] += 1;
        }

        for kind in IncidentKind::ALL {
            stats.incidents_by_kind.insert(kind.label(), 0);
        }
        for incident in &snapshot.incidents {
            *stats.incidents_by_kind.entry(incident.kind.label()).or_insert(0) += 1;
        }

        stats
    }
}

/// Rolling history of committed snapshots with congestion trend.
#[derive(Debug, Default)]
pub struct TrendAnalyzer {
    history: VecDeque<HistorySample>,
    trend: Trend,
    hotspots: Vec<Hotspot>,
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample for `snapshot`, then reclassifies the trend over the
    /// history that includes it.
    pub fn record(&mut self, snapshot: &WorldSnapshot, timestamp: SystemTime) -> Trend {
        let stats = FleetStats::of(snapshot);
        self.history.push_back(HistorySample {
            sequence: snapshot.sequence,
            timestamp,
            avg_density: stats.avg_density,
            moving_count: stats.moving,
            arrived_count: stats.arrived,
            incident_count: stats.active_incidents,
        });
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }

        let series = self
            .history
            .iter()
            .map(|sample| sample.avg_density)
            .collect::<Vec<_>>();
        self.trend = classify_trend(&series);
        self.hotspots = hotspots(&snapshot.traffic_density);
        debug!(
            sequence = snapshot.sequence,
            avg_density = stats.avg_density,
            trend = self.trend.label(),
            hotspots = self.hotspots.len(),
            "analytics sample recorded"
        );
        self.trend
    }

    pub fn trend(&self) -> Trend {
        self.trend
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.history.back()
    }

    /// The most recent samples, oldest first, at most `window.sample_count()` of them.
    pub fn window(&self, window: HistoryWindow) -> impl Iterator<Item = &HistorySample> {
        let skip = self.history.len().saturating_sub(window.sample_count());
        self.history.iter().skip(skip)
    }
}

pub fn average_density(snapshot: &WorldSnapshot) -> f64 {
    let values = &snapshot.traffic_density;
    if values.is_empty() {
        0.0
    } else {
        values.values().sum::<f64>() / values.len() as f64
    }
}

/// Compares the mean of the last five values with the five before them.
/// Fewer than ten values is always `Stable`.
pub fn classify_trend(series: &[f64]) -> Trend {
    if series.len() < TREND_WINDOW * 2 {
        return Trend::Stable;
    }

    let recent = &series[series.len() - TREND_WINDOW..];
    let previous = &series[series.len() - TREND_WINDOW * 2..series.len() - TREND_WINDOW];
    let recent_avg = recent.iter().sum::<f64>() / TREND_WINDOW as f64;
    let previous_avg = previous.iter().sum::<f64>() / TREND_WINDOW as f64;

    if recent_avg > previous_avg * TREND_RISE {
        Trend::Increasing
    } else if recent_avg < previous_avg * TREND_FALL {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Roads above the hotspot threshold, densest first, at most ten.
pub fn hotspots(density: &BTreeMap<String, f64>) -> Vec<Hotspot> {
    let mut hot = density
        .iter()
        .filter(|&(_, &value)| value > HOTSPOT_THRESHOLD)
        .map(|(road_id, &density)| Hotspot {
            road_id: road_id.clone(),
            density,
        })
        .collect::<Vec<_>>();
    hot.sort_by(|a, b| b.density.total_cmp(&a.density));
    hot.truncate(HOTSPOT_LIMIT);
    hot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{
        CityMapPayload, Incident, RefreshPayload, TrafficStatePayload, VehicleKind,
        VehicleRecord, assemble_snapshot,
    };

    fn snapshot_with(sequence: u64, densities: &[(&str, f64)]) -> WorldSnapshot {
        let traffic = TrafficStatePayload {
            traffic_density: densities
                .iter()
                .map(|(id, value)| ((*id).to_owned(), *value))
                .collect(),
            ..Default::default()
        };
        assemble_snapshot(
            sequence,
            RefreshPayload {
                city: CityMapPayload::default(),
                traffic,
            },
        )
    }

    #[test]
    fn classifies_reference_series() {
        let rising = [50.0, 50.0, 50.0, 50.0, 50.0, 60.0, 60.0, 60.0, 60.0, 60.0];
        let flat = [50.0; 10];
        let falling = [60.0, 60.0, 60.0, 60.0, 60.0, 50.0, 50.0, 50.0, 50.0, 50.0];

        assert_eq!(classify_trend(&rising), Trend::Increasing);
        assert_eq!(classify_trend(&flat), Trend::Stable);
        assert_eq!(classify_trend(&falling), Trend::Decreasing);
    }

    #[test]
    fn short_history_is_stable() {
        let series = [0.0, 0.0, 0.0, 0.0, 0.0, 90.0, 90.0, 90.0, 90.0];
        assert_eq!(classify_trend(&series), Trend::Stable);
    }

    #[test]
    fn change_within_ten_percent_is_stable() {
        let series = [50.0, 50.0, 50.0, 50.0, 50.0, 54.0, 54.0, 54.0, 54.0, 54.0];
        assert_eq!(classify_trend(&series), Trend::Stable);
    }

    #[test]
    fn trend_uses_the_sample_just_recorded() {
        let mut analyzer = TrendAnalyzer::new();
        let now = SystemTime::now();
        for sequence in 1..=9 {
            analyzer.record(&snapshot_with(sequence, &[("r", 50.0)]), now);
        }
        assert_eq!(analyzer.trend(), Trend::Stable);

        // The tenth sample alone pushes the recent mean past +10 %.
        let trend = analyzer.record(&snapshot_with(10, &[("r", 90.0)]), now);
        assert_eq!(trend, Trend::Increasing);
        assert_eq!(analyzer.latest().map(|s| s.sequence), Some(10));
    }

    #[test]
    fn history_is_capped_and_evicts_oldest() {
        let mut analyzer = TrendAnalyzer::new();
        let now = SystemTime::now();
        for sequence in 1..=75 {
            analyzer.record(&snapshot_with(sequence, &[("r", 10.0)]), now);
        }

        assert_eq!(analyzer.len(), HISTORY_CAPACITY);
        let sequences = analyzer
            .window(HistoryWindow::Last60)
            .map(|s| s.sequence)
            .collect::<Vec<_>>();
        assert_eq!(sequences.first(), Some(&16));
        assert_eq!(sequences.last(), Some(&75));
        assert_eq!(analyzer.window(HistoryWindow::Last15).count(), 15);
        assert_eq!(
            analyzer.window(HistoryWindow::Last15).next().map(|s| s.sequence),
            Some(61)
        );
    }

    #[test]
    fn hotspots_filter_sort_and_truncate() {
        let mut density = BTreeMap::new();
        for index in 0..15 {
            density.insert(format!("road_{index:02}"), 71.0 + index as f64);
        }
        density.insert("calm".to_owned(), 70.0);

        let hot = hotspots(&density);
        assert_eq!(hot.len(), HOTSPOT_LIMIT);
        assert_eq!(hot[0].road_id, "road_14");
        assert_eq!(hot[0].density, 85.0);
        assert!(hot.windows(2).all(|pair| pair[0].density >= pair[1].density));
        assert!(hot.iter().all(|spot| spot.road_id != "calm"));
    }

    #[test]
    fn fleet_stats_count_statuses_and_buckets() {
        let mut snapshot = snapshot_with(
            1,
            &[("a", 25.0), ("b", 26.0), ("c", 50.0), ("d", 75.0), ("e", 76.0)],
        );
        let vehicle = |status| VehicleRecord {
            kind: VehicleKind::Car,
            status,
            current_position: "n".to_owned(),
            destination: "m".to_owned(),
        };
        snapshot
            .vehicle_positions
            .insert("v1".to_owned(), vehicle(VehicleStatus::Moving));
        snapshot
            .vehicle_positions
            .insert("v2".to_owned(), vehicle(VehicleStatus::Arrived));
        snapshot
            .vehicle_positions
            .insert("v3".to_owned(), vehicle(VehicleStatus::Moving));
        snapshot.incidents.push(Incident {
            id: "i".to_owned(),
            location: "n".to_owned(),
            kind: IncidentKind::Weather,
            severity: 0.5,
            duration: 3,
            road_id: None,
        });

        let stats = FleetStats::of(&snapshot);
        assert_eq!(stats.total_vehicles, 3);
        assert_eq!(stats.moving, 2);
        assert_eq!(stats.arrived, 1);
        assert_eq!(stats.density_buckets, [1, 2, 1, 1]);
        assert_eq!(stats.active_incidents, 1);
        assert_eq!(stats.incidents_by_kind["weather"], 1);
        assert_eq!(stats.incidents_by_kind["accident"], 0);
        assert!((stats.avg_density - 50.4).abs() < 1e-9);
    }
}
