use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sim::{ApiError, RefreshPayload, WorldSnapshot, assemble_snapshot};

pub const MIN_GREEN_SECS: u32 = 15;
pub const MAX_GREEN_SECS: u32 = 60;

/// An optimistic light timing change, shown before the server confirms it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEdit {
    pub intersection_id: String,
    pub north_south_green: u32,
    pub east_west_green: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error(
        "{direction} green time {value}s is outside {min}..={max}s",
        min = MIN_GREEN_SECS,
        max = MAX_GREEN_SECS
    )]
    GreenTimeOutOfRange {
        direction: &'static str,
        value: u32,
    },
    #[error("intersection {0} has no traffic light")]
    UnknownIntersection(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeCause {
    Refresh,
    Edit,
}

/// Broadcast to subscribers whenever the merged view changes.
#[derive(Clone, Debug)]
pub struct SnapshotChanged {
    pub sequence: u64,
    pub cause: ChangeCause,
    pub snapshot: Arc<WorldSnapshot>,
}

/// A failed network operation, kept for display until dismissed.
#[derive(Debug)]
pub struct SyncFailure {
    pub operation: &'static str,
    pub error: ApiError,
}

/// Owner of the authoritative world state.
///
/// Readers get `Arc` handles to fully merged snapshots; a refresh or an
/// edit swaps the handle, so nobody sees a half-updated view.
pub struct TrafficStore {
    committed: Arc<WorldSnapshot>,
    merged: Arc<WorldSnapshot>,
    pending: Option<PendingEdit>,
    last_sequence: u64,
    last_fetch: u64,
    failure: Option<SyncFailure>,
    subscribers: Vec<Sender<SnapshotChanged>>,
}

impl Default for TrafficStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TrafficStore {
    pub fn new() -> Self {
        let empty = Arc::new(WorldSnapshot::default());
        Self {
            committed: Arc::clone(&empty),
            merged: empty,
            pending: None,
            last_sequence: 0,
            last_fetch: 0,
            failure: None,
            subscribers: Vec::new(),
        }
    }

    /// The merged read view: committed snapshot with any pending edit on top.
    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.merged)
    }

    pub fn committed(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.committed)
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.pending.as_ref()
    }

    pub fn sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn failure(&self) -> Option<&SyncFailure> {
        self.failure.as_ref()
    }

    pub fn dismiss_failure(&mut self) {
        self.failure = None;
    }

    pub fn subscribe(&mut self) -> Receiver<SnapshotChanged> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Applies the outcome of a refresh. Success replaces the committed
    /// snapshot and drops any pending edit; failure leaves it untouched.
    ///
    /// `ordinal` orders fetches by when they started. A result whose fetch
    /// began before the last committed one is stale and ignored.
    pub fn commit_refresh(
        &mut self,
        ordinal: u64,
        result: Result<RefreshPayload, ApiError>,
    ) -> Option<Arc<WorldSnapshot>> {
        if ordinal <= self.last_fetch {
            debug!(
                ordinal,
                last_fetch = self.last_fetch,
                ok = result.is_ok(),
                "stale refresh dropped"
            );
            return None;
        }
        match result {
            Ok(payload) => {
                let sequence = self.last_sequence + 1;
                let snapshot = Arc::new(assemble_snapshot(sequence, payload));
                self.last_sequence = sequence;
                self.last_fetch = ordinal;
                self.committed = Arc::clone(&snapshot);
                self.merged = Arc::clone(&snapshot);
                if let Some(edit) = self.pending.take() {
                    debug!(
                        intersection = %edit.intersection_id,
                        sequence,
                        "pending edit superseded by refresh"
                    );
                }
                self.failure = None;
                debug!(
                    sequence,
                    nodes = snapshot.nodes.len(),
                    vehicles = snapshot.vehicle_positions.len(),
                    "snapshot committed"
                );
                self.notify(ChangeCause::Refresh);
                Some(snapshot)
            }
            Err(error) => {
                self.raise("refresh", error);
                None
            }
        }
    }

    /// Records a failed network operation without touching world state.
    pub fn raise(&mut self, operation: &'static str, error: ApiError) {
        warn!(operation, endpoint = error.endpoint(), %error, "sync operation failed");
        self.failure = Some(SyncFailure { operation, error });
    }

    /// Validates and overlays a light timing change on the current view.
    /// It replaces any earlier pending edit.
    pub fn commit_edit(&mut self, edit: PendingEdit) -> Result<(), EditError> {
        check_green("north-south", edit.north_south_green)?;
        check_green("east-west", edit.east_west_green)?;
        if !self
            .committed
            .traffic_lights
            .contains_key(&edit.intersection_id)
        {
            return Err(EditError::UnknownIntersection(edit.intersection_id));
        }

        let mut lights = self.committed.traffic_lights.clone();
        if let Some(light) = lights.get_mut(&edit.intersection_id) {
            light.north_south.green_time = edit.north_south_green;
            light.east_west.green_time = edit.east_west_green;
        }

        info!(
            intersection = %edit.intersection_id,
            north_south = edit.north_south_green,
            east_west = edit.east_west_green,
            "light timing edited"
        );
        self.merged = Arc::new(self.committed.with_traffic_lights(lights));
        self.pending = Some(edit);
        self.notify(ChangeCause::Edit);
        Ok(())
    }

    fn notify(&mut self, cause: ChangeCause) {
        let event = SnapshotChanged {
            sequence: self.merged.sequence,
            cause,
            snapshot: Arc::clone(&self.merged),
        };
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}

fn check_green(direction: &'static str, value: u32) -> Result<(), EditError> {
    if (MIN_GREEN_SECS..=MAX_GREEN_SECS).contains(&value) {
        Ok(())
    } else {
        Err(EditError::GreenTimeOutOfRange { direction, value })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::sim::{
        CityMapPayload, GraphNode, LightDirection, LightPhase, TrafficLight, TrafficStatePayload,
    };

    fn light(ns_green: u32, ew_green: u32) -> TrafficLight {
        TrafficLight {
            north_south: LightDirection {
                green_time: ns_green,
                current_state: LightPhase::Green,
                time_in_state: 0.0,
            },
            east_west: LightDirection {
                green_time: ew_green,
                current_state: LightPhase::Red,
                time_in_state: 0.0,
            },
        }
    }

    fn payload(ns_green: u32, density: f64) -> RefreshPayload {
        let mut traffic_lights = BTreeMap::new();
        traffic_lights.insert("x1".to_owned(), light(ns_green, 30));
        RefreshPayload {
            city: CityMapPayload {
                nodes: vec![GraphNode {
                    id: "x1".to_owned(),
                    x: 0.0,
                    y: 0.0,
                }],
                edges: Vec::new(),
                traffic_lights,
            },
            traffic: TrafficStatePayload {
                traffic_density: [("r1".to_owned(), density)].into_iter().collect(),
                ..Default::default()
            },
        }
    }

    fn offline() -> ApiError {
        ApiError::Network {
            endpoint: "/api/traffic-data".to_owned(),
            message: "connection refused".to_owned(),
        }
    }

    fn edit(ns: u32, ew: u32) -> PendingEdit {
        PendingEdit {
            intersection_id: "x1".to_owned(),
            north_south_green: ns,
            east_west_green: ew,
        }
    }

    #[test]
    fn sequence_increases_with_each_refresh() {
        let mut store = TrafficStore::new();
        assert!(!store.snapshot().has_data());

        store.commit_refresh(1, Ok(payload(30, 10.0)));
        store.commit_refresh(2, Ok(payload(30, 20.0)));
        assert_eq!(store.sequence(), 2);
        assert_eq!(store.snapshot().sequence, 2);
        assert_eq!(store.snapshot().density("r1"), 20.0);
    }

    #[test]
    fn failed_refresh_keeps_last_snapshot_and_flags_error() {
        let mut store = TrafficStore::new();
        store.commit_refresh(1, Ok(payload(30, 42.0)));
        let before = store.snapshot();

        assert!(store.commit_refresh(2, Err(offline())).is_none());

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(store.failure().map(|f| f.operation), Some("refresh"));

        store.commit_refresh(3, Ok(payload(30, 43.0)));
        assert!(store.failure().is_none());
    }

    #[test]
    fn edit_is_visible_immediately_and_discarded_on_refresh() {
        let mut store = TrafficStore::new();
        store.commit_refresh(1, Ok(payload(30, 0.0)));

        store.commit_edit(edit(45, 20)).expect("valid edit");
        let merged = store.snapshot();
        assert_eq!(merged.traffic_lights["x1"].north_south.green_time, 45);
        assert_eq!(merged.traffic_lights["x1"].east_west.green_time, 20);
        assert_eq!(store.committed().traffic_lights["x1"].north_south.green_time, 30);
        assert_eq!(merged.sequence, store.committed().sequence);

        // The server disagrees with the edit; its value wins.
        store.commit_refresh(2, Ok(payload(25, 0.0)));
        assert!(store.pending_edit().is_none());
        assert_eq!(store.snapshot().traffic_lights["x1"].north_south.green_time, 25);
        assert_eq!(store.snapshot().traffic_lights["x1"].east_west.green_time, 30);
    }

    #[test]
    fn invalid_edits_leave_state_untouched() {
        let mut store = TrafficStore::new();
        store.commit_refresh(1, Ok(payload(30, 0.0)));
        let before = store.snapshot();

        assert_eq!(
            store.commit_edit(edit(14, 30)),
            Err(EditError::GreenTimeOutOfRange {
                direction: "north-south",
                value: 14
            })
        );
        assert!(store.commit_edit(edit(30, 61)).is_err());
        let mut unknown = edit(30, 30);
        unknown.intersection_id = "nowhere".to_owned();
        assert_eq!(
            store.commit_edit(unknown),
            Err(EditError::UnknownIntersection("nowhere".to_owned()))
        );

        assert!(store.pending_edit().is_none());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn boundary_green_times_are_accepted() {
        let mut store = TrafficStore::new();
        store.commit_refresh(1, Ok(payload(30, 0.0)));
        assert!(store.commit_edit(edit(15, 60)).is_ok());
    }

    #[test]
    fn newer_edit_supersedes_older_one() {
        let mut store = TrafficStore::new();
        store.commit_refresh(1, Ok(payload(30, 0.0)));
        store.commit_edit(edit(40, 40)).expect("first");
        store.commit_edit(edit(50, 20)).expect("second");

        assert_eq!(store.pending_edit(), Some(&edit(50, 20)));
        assert_eq!(store.snapshot().traffic_lights["x1"].north_south.green_time, 50);
    }

    #[test]
    fn subscribers_hear_refreshes_and_edits() {
        let mut store = TrafficStore::new();
        let changes = store.subscribe();

        store.commit_refresh(1, Ok(payload(30, 0.0)));
        store.commit_refresh(2, Err(offline()));
        store.commit_edit(edit(20, 20)).expect("edit");

        let events: Vec<_> = changes.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].cause, ChangeCause::Refresh);
        assert_eq!(events[0].sequence, 1);
        assert_eq!(events[1].cause, ChangeCause::Edit);
        assert_eq!(
            events[1].snapshot.traffic_lights["x1"].north_south.green_time,
            20
        );
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let mut store = TrafficStore::new();
        drop(store.subscribe());
        store.commit_refresh(1, Ok(payload(30, 0.0)));
        assert!(store.subscribers.is_empty());
    }

    #[test]
    fn refresh_fetched_before_the_last_commit_is_dropped() {
        let mut store = TrafficStore::new();
        let changes = store.subscribe();
        store.commit_refresh(2, Ok(payload(30, 50.0)));

        assert!(store.commit_refresh(1, Ok(payload(30, 0.0))).is_none());
        assert!(store.commit_refresh(2, Ok(payload(30, 0.0))).is_none());
        assert!(store.commit_refresh(1, Err(offline())).is_none());

        assert_eq!(store.sequence(), 1);
        assert_eq!(store.snapshot().density("r1"), 50.0);
        assert!(store.failure().is_none());
        assert_eq!(changes.try_iter().count(), 1);

        store.commit_refresh(3, Ok(payload(30, 60.0)));
        assert_eq!(store.sequence(), 2);
        assert_eq!(store.snapshot().density("r1"), 60.0);
    }
}
