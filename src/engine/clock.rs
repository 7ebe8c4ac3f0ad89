use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

pub const MIN_INTERVAL: Duration = Duration::from_millis(500);
pub const MAX_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepSource {
    Automatic,
    Manual,
}

/// One "advance by `steps`" command cleared for dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepRequest {
    pub ticket: u64,
    pub steps: u32,
    pub source: StepSource,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManualStep {
    /// Nothing was in flight; the request goes out now.
    Dispatched(StepRequest),
    /// Waiting behind the in-flight step.
    Deferred,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClockError {
    #[error("interval must be between {min:?} and {max:?}, got {got:?}")]
    InvalidInterval {
        got: Duration,
        min: Duration,
        max: Duration,
    },
    #[error("step count must be at least 1")]
    InvalidStepCount,
    #[error("a manual step of {queued} is already waiting for the simulation")]
    Busy { queued: u32 },
}

/// Drives the remote simulation forward with at most one step in flight.
///
/// The clock owns no thread. Its pending timer is a deadline that the
/// event loop polls; `stop` clears the deadline and never touches a step
/// already dispatched.
#[derive(Debug)]
pub struct SimClock {
    running: bool,
    interval: Duration,
    next_tick: Option<Instant>,
    in_flight: Option<StepRequest>,
    queued_manual: Option<u32>,
    next_ticket: u64,
}

impl SimClock {
    pub fn new(interval: Duration) -> Result<Self, ClockError> {
        validate_interval(interval)?;
        Ok(Self {
            running: false,
            interval,
            next_tick: None,
            in_flight: None,
            queued_manual: None,
            next_ticket: 1,
        })
    }

    pub fn state(&self) -> ClockState {
        if self.running {
            ClockState::Running(self.interval)
        } else {
            ClockState::Stopped
        }
    }

    #[cfg(test)]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn in_flight(&self) -> Option<StepRequest> {
        self.in_flight
    }

    pub fn queued_manual(&self) -> Option<u32> {
        self.queued_manual
    }

    pub fn start(&mut self, interval: Duration, now: Instant) -> Result<(), ClockError> {
        validate_interval(interval)?;
        self.interval = interval;
        if self.running {
            return Ok(());
        }

        self.running = true;
        // An in-flight step reschedules on resolve.
        if self.in_flight.is_none() {
            self.next_tick = Some(now + interval);
        }
        info!(interval_ms = interval.as_millis() as u64, "simulation clock started");
        Ok(())
    }

    pub fn stop(&mut self) {
        if !self.running {
            return;
        }

        self.running = false;
        self.next_tick = None;
        info!(
            in_flight = self.in_flight.is_some(),
            "simulation clock stopped"
        );
    }

    /// Takes effect when the next tick is scheduled; an already scheduled
    /// tick keeps its deadline.
    pub fn set_interval(&mut self, interval: Duration) -> Result<(), ClockError> {
        validate_interval(interval)?;
        self.interval = interval;
        debug!(interval_ms = interval.as_millis() as u64, "clock interval changed");
        Ok(())
    }

    pub fn request_manual(&mut self, steps: u32) -> Result<ManualStep, ClockError> {
        if steps == 0 {
            return Err(ClockError::InvalidStepCount);
        }
        if let Some(queued) = self.queued_manual {
            return Err(ClockError::Busy { queued });
        }

        if self.in_flight.is_some() {
            self.queued_manual = Some(steps);
            debug!(steps, "manual step deferred behind in-flight step");
            return Ok(ManualStep::Deferred);
        }

        Ok(ManualStep::Dispatched(
            self.dispatch(steps, StepSource::Manual),
        ))
    }

    /// Returns the next step to dispatch, if one is due and nothing is in
    /// flight. Deferred manual steps go before automatic ticks.
    pub fn poll(&mut self, now: Instant) -> Option<StepRequest> {
        if self.in_flight.is_some() {
            return None;
        }

        if let Some(steps) = self.queued_manual.take() {
            return Some(self.dispatch(steps, StepSource::Manual));
        }

        match self.next_tick {
            Some(deadline) if self.running && deadline <= now => {
                self.next_tick = None;
                Some(self.dispatch(1, StepSource::Automatic))
            }
            _ => None,
        }
    }

    /// Marks the step with `ticket` as finished, successfully or not, and
    /// schedules the next automatic tick from `now`.
    pub fn resolve(&mut self, ticket: u64, now: Instant) -> bool {
        let Some(request) = self.in_flight else {
            return false;
        };
        if request.ticket != ticket {
            return false;
        }

        self.in_flight = None;
        if self.running && self.next_tick.is_none() {
            self.next_tick = Some(now + self.interval);
        }
        debug!(ticket, source = ?request.source, "step resolved");
        true
    }

    /// Time until `poll` can next produce an automatic tick.
    pub fn next_wake(&self, now: Instant) -> Option<Duration> {
        if self.in_flight.is_some() {
            return None;
        }
        if self.queued_manual.is_some() {
            return Some(Duration::ZERO);
        }
        self.next_tick
            .filter(|_| self.running)
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    fn dispatch(&mut self, steps: u32, source: StepSource) -> StepRequest {
        let request = StepRequest {
            ticket: self.next_ticket,
            steps,
            source,
        };
        self.next_ticket += 1;
        self.in_flight = Some(request);
        debug!(ticket = request.ticket, steps, ?source, "step dispatched");
        request
    }
}

fn validate_interval(interval: Duration) -> Result<(), ClockError> {
    if (MIN_INTERVAL..=MAX_INTERVAL).contains(&interval) {
        Ok(())
    } else {
        Err(ClockError::InvalidInterval {
            got: interval,
            min: MIN_INTERVAL,
            max: MAX_INTERVAL,
        })
    }
}
