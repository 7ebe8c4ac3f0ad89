use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info};

use super::analyzer::TrendAnalyzer;
use super::clock::{ClockError, ManualStep, SimClock, StepRequest, StepSource};
use super::store::{ChangeCause, EditError, PendingEdit, SnapshotChanged, TrafficStore};
use crate::sim::{
    ApiError, IncidentKind, LightTiming, RefreshPayload, RouteResult, SimulationApi, WorldSnapshot,
};

pub type Waker = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Refresh,
    Advance { steps: u32 },
    Reset,
    AddIncident {
        location: String,
        kind: IncidentKind,
        duration: u32,
    },
    OptimizeLights,
    RerouteVehicles,
    Route { start: String, end: String },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Advance { .. } => "advance",
            Self::Reset => "reset",
            Self::AddIncident { .. } => "add incident",
            Self::OptimizeLights => "optimize lights",
            Self::RerouteVehicles => "reroute vehicles",
            Self::Route { .. } => "route",
        }
    }

    fn refreshes_after(&self) -> bool {
        !matches!(self, Self::RerouteVehicles | Self::Route { .. })
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Ack {
    Done,
    Optimized {
        timings: BTreeMap<String, LightTiming>,
    },
    Rerouted { count: usize },
    Route(RouteResult),
}

/// A refresh result tagged with the order in which its fetch started.
#[derive(Debug)]
struct Fetched {
    ordinal: u64,
    result: Result<RefreshPayload, ApiError>,
}

#[derive(Debug)]
struct JobReport {
    command: Command,
    ack: Result<Ack, ApiError>,
    refresh: Option<Fetched>,
}

/// A user-facing confirmation of a finished command.
#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub message: String,
    pub at: SystemTime,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RouteQuery {
    pub start: String,
    pub end: String,
    pub result: RouteResult,
}

struct Job {
    command: Command,
    rx: Receiver<JobReport>,
}

struct StepJob {
    request: StepRequest,
    job: Job,
}

/// Wires the clock, store and analyzer to the remote simulation.
///
/// Network calls run on short-lived worker threads; `pump` collects their
/// results on the caller's thread, so all state changes happen there.
pub struct Session {
    api: Arc<dyn SimulationApi>,
    fetches: Arc<AtomicU64>,
    store: TrafficStore,
    clock: SimClock,
    analyzer: TrendAnalyzer,
    changes: Receiver<SnapshotChanged>,
    step_job: Option<StepJob>,
    jobs: Vec<Job>,
    notice: Option<Notice>,
    route: Option<RouteQuery>,
    waker: Option<Waker>,
}

impl Session {
    pub fn new(api: Arc<dyn SimulationApi>, interval: Duration) -> Result<Self, ClockError> {
        let mut store = TrafficStore::new();
        let changes = store.subscribe();
        Ok(Self {
            api,
            fetches: Arc::new(AtomicU64::new(0)),
            store,
            clock: SimClock::new(interval)?,
            analyzer: TrendAnalyzer::new(),
            changes,
            step_job: None,
            jobs: Vec::new(),
            notice: None,
            route: None,
            waker: None,
        })
    }

    /// Called from worker threads when a result is ready.
    pub fn set_waker(&mut self, waker: Waker) {
        self.waker = Some(waker);
    }

    pub fn snapshot(&self) -> Arc<WorldSnapshot> {
        self.store.snapshot()
    }

    pub fn store(&self) -> &TrafficStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TrafficStore {
        &mut self.store
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn analyzer(&self) -> &TrendAnalyzer {
        &self.analyzer
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn route(&self) -> Option<&RouteQuery> {
        self.route.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.step_job.is_some() || !self.jobs.is_empty()
    }

    pub fn is_running(&self, command: &Command) -> bool {
        self.jobs_running(|running| running == command)
    }

    pub fn jobs_running(&self, mut matches: impl FnMut(&Command) -> bool) -> bool {
        self.jobs.iter().any(|job| matches(&job.command))
    }

    pub fn is_refreshing(&self) -> bool {
        self.is_running(&Command::Refresh)
    }

    pub fn refresh(&mut self) {
        if !self.is_refreshing() {
            self.spawn(Command::Refresh);
        }
    }

    pub fn start(&mut self, interval: Duration, now: Instant) -> Result<(), ClockError> {
        self.clock.start(interval, now)
    }

    pub fn stop(&mut self) {
        self.clock.stop();
    }

    pub fn set_interval(&mut self, interval: Duration) -> Result<(), ClockError> {
        self.clock.set_interval(interval)
    }

    /// Advances by `steps` through the clock's manual path; the refresh
    /// follows once the server acknowledges.
    pub fn step(&mut self, steps: u32) -> Result<ManualStep, ClockError> {
        let outcome = self.clock.request_manual(steps)?;
        if let ManualStep::Dispatched(request) = outcome {
            self.dispatch_step(request);
        }
        Ok(outcome)
    }

    pub fn commit_edit(&mut self, edit: PendingEdit) -> Result<(), EditError> {
        self.store.commit_edit(edit)
    }

    pub fn reset(&mut self) {
        self.spawn(Command::Reset);
    }

    pub fn add_incident(&mut self, location: &str, kind: IncidentKind, duration: u32) {
        self.spawn(Command::AddIncident {
            location: location.to_owned(),
            kind,
            duration,
        });
    }

    pub fn optimize_lights(&mut self) {
        self.spawn(Command::OptimizeLights);
    }

    pub fn reroute_vehicles(&mut self) {
        self.spawn(Command::RerouteVehicles);
    }

    pub fn calculate_route(&mut self, start: &str, end: &str) {
        self.spawn(Command::Route {
            start: start.to_owned(),
            end: end.to_owned(),
        });
    }

    /// Collects finished work, dispatches a due step and feeds the analyzer.
    /// Returns whether anything visible changed.
    pub fn pump(&mut self, now: Instant) -> bool {
        let mut changed = false;

        if let Some(step) = self.step_job.take() {
            match step.job.rx.try_recv() {
                Ok(report) => {
                    self.clock.resolve(step.request.ticket, now);
                    self.apply(report, step.request.source == StepSource::Manual);
                    changed = true;
                }
                Err(TryRecvError::Empty) => self.step_job = Some(step),
                Err(TryRecvError::Disconnected) => {
                    self.clock.resolve(step.request.ticket, now);
                    self.store.raise(step.job.command.name(), worker_lost(&step.job.command));
                    changed = true;
                }
            }
        }

        let mut finished = Vec::new();
        self.jobs.retain(|job| match job.rx.try_recv() {
            Ok(report) => {
                finished.push(Ok(report));
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                finished.push(Err(job.command.clone()));
                false
            }
        });
        for outcome in finished {
            match outcome {
                Ok(report) => self.apply(report, true),
                Err(command) => self.store.raise(command.name(), worker_lost(&command)),
            }
            changed = true;
        }

        if let Some(request) = self.clock.poll(now) {
            self.dispatch_step(request);
        }

        let timestamp = SystemTime::now();
        for change in self.changes.try_iter() {
            debug!(sequence = change.sequence, cause = ?change.cause, "snapshot changed");
            if change.cause == ChangeCause::Refresh {
                self.analyzer.record(&change.snapshot, timestamp);
            }
            changed = true;
        }

        changed
    }

    /// How long the event loop may sleep before `pump` has work again.
    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        self.clock.next_wake(now)
    }

    fn dispatch_step(&mut self, request: StepRequest) {
        let command = Command::Advance {
            steps: request.steps,
        };
        let job = self.spawn_job(command);
        self.step_job = Some(StepJob { request, job });
    }

    fn spawn(&mut self, command: Command) {
        let job = self.spawn_job(command);
        self.jobs.push(job);
    }

    fn spawn_job(&self, command: Command) -> Job {
        let (tx, rx) = mpsc::channel();
        let api = Arc::clone(&self.api);
        let fetches = Arc::clone(&self.fetches);
        let waker = self.waker.clone();
        let worker_command = command.clone();
        debug!(command = command.name(), "dispatching");

        thread::spawn(move || {
            let report = execute(api.as_ref(), &fetches, worker_command);
            let _ = tx.send(report);
            if let Some(waker) = waker {
                waker();
            }
        });

        Job { command, rx }
    }

    fn apply(&mut self, report: JobReport, announce: bool) {
        let JobReport {
            command,
            ack,
            refresh,
        } = report;

        match ack {
            Ok(ack) => {
                if let Some(message) = describe(&command, &ack, &self.store.snapshot()).filter(|_| announce) {
                    info!(command = command.name(), %message, "command acknowledged");
                    self.notice = Some(Notice {
                        message,
                        at: SystemTime::now(),
                    });
                }
                if let (Command::Route { start, end }, Ack::Route(result)) = (&command, ack) {
                    self.route = Some(RouteQuery {
                        start: start.clone(),
                        end: end.clone(),
                        result,
                    });
                }
            }
            Err(error) => self.store.raise(command.name(), error),
        }

        if let Some(Fetched { ordinal, result }) = refresh {
            self.store.commit_refresh(ordinal, result);
        }
    }
}

fn execute(api: &dyn SimulationApi, fetches: &AtomicU64, command: Command) -> JobReport {
    let ack = match &command {
        Command::Refresh => Ok(Ack::Done),
        Command::Advance { steps } => api.advance(*steps).map(|_| Ack::Done),
        Command::Reset => api.reset().map(|_| Ack::Done),
        Command::AddIncident {
            location,
            kind,
            duration,
        } => api
            .add_incident(location, *kind, *duration)
            .map(|_| Ack::Done),
        Command::OptimizeLights => api.optimize_lights().map(|response| Ack::Optimized {
            timings: response.new_timings,
        }),
        Command::RerouteVehicles => api.reroute_vehicles().map(|response| Ack::Rerouted {
            count: response.new_routes.len(),
        }),
        Command::Route { start, end } => api.calculate_route(start, end).map(Ack::Route),
    };

    let refresh = (ack.is_ok() && command.refreshes_after()).then(|| Fetched {
        ordinal: fetches.fetch_add(1, Ordering::SeqCst) + 1,
        result: api.fetch_refresh(),
    });

    JobReport {
        command,
        ack,
        refresh,
    }
}

fn describe(command: &Command, ack: &Ack, current: &WorldSnapshot) -> Option<String> {
    let message = match (command, ack) {
        (Command::Refresh, _) => return None,
        (Command::Advance { steps }, _) => format!(
            "Ran simulation for {steps} step{}.",
            if *steps == 1 { "" } else { "s" }
        ),
        (Command::Reset, _) => "Simulation has been reset to initial state.".to_owned(),
        (
            Command::AddIncident {
                location,
                kind,
                duration,
            },
            _,
        ) => format!(
            "Added {} incident at {location} for {duration} steps.",
            kind.label()
        ),
        (_, Ack::Optimized { timings }) => {
            let changed = timings
                .iter()
                .filter(|(id, timing)| {
                    current.traffic_lights.get(*id).is_none_or(|light| {
                        light.north_south.green_time != timing.north_south
                            || light.east_west.green_time != timing.east_west
                    })
                })
                .count();
            format!(
                "Optimization retimed {changed} of {} traffic lights.",
                timings.len()
            )
        }
        (_, Ack::Rerouted { count }) => format!("Updated routes for {count} vehicles."),
        (Command::Route { start, end }, Ack::Route(result)) => {
            if result.is_reachable() {
                format!("Route {start} → {end}: {} stops.", result.path.len())
            } else {
                format!("No route found between {start} and {end}.")
            }
        }
        _ => return None,
    };
    Some(message)
}

fn worker_lost(command: &Command) -> ApiError {
    error!(command = command.name(), "background worker disconnected");
    ApiError::Network {
        endpoint: command.name().to_owned(),
        message: "background worker disconnected".to_owned(),
    }
}
