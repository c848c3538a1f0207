use std::collections::BTreeMap;
use std::time::Duration;

use crate::{
    ErrorPolicy, FailureRecord, ModelError, Outcome, RunPhase, RunReport, StatusCode, StopReason,
    TaskIndex, TaskResult,
};

/// Mutable aggregate of a single run.
///
/// Owned by the runner; nothing else mutates it. Dispatches are counted in
/// index order, so `started` doubles as the next index to dispatch.
#[derive(Debug, Clone)]
pub struct RunState {
    total: usize,
    limit: usize,
    policy: ErrorPolicy,
    phase: RunPhase,
    started: usize,
    completed: usize,
    peak_in_flight: usize,
    statuses: BTreeMap<StatusCode, usize>,
    failures: Vec<FailureRecord>,
    stopped: Option<StopReason>,
}

impl RunState {
    pub fn new(total: usize, limit: usize, policy: ErrorPolicy) -> Self {
        Self {
            total,
            limit,
            policy,
            phase: RunPhase::Idle,
            started: 0,
            completed: 0,
            peak_in_flight: 0,
            statuses: BTreeMap::new(),
            failures: Vec::new(),
            stopped: None,
        }
    }

    /// `Idle -> Running`.
    pub fn start(&mut self) -> Result<(), ModelError> {
        self.enter(RunPhase::Running)
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn started(&self) -> usize {
        self.started
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn in_flight(&self) -> usize {
        self.started - self.completed
    }

    pub fn stopped(&self) -> Option<&StopReason> {
        self.stopped.as_ref()
    }

    /// Index the next dispatch will use, if another dispatch is allowed now.
    ///
    /// `None` when the run is not running, has stopped, has dispatched every
    /// task, or has no free slot.
    pub fn next_dispatch(&self) -> Option<TaskIndex> {
        let open = self.phase == RunPhase::Running
            && self.stopped.is_none()
            && self.started < self.total
            && self.in_flight() < self.limit;
        open.then_some(self.started)
    }

    /// Returns `true` once no more dispatches will ever happen.
    pub fn dispatch_closed(&self) -> bool {
        self.stopped.is_some() || self.started >= self.total
    }

    /// Count a dispatch of `index`. Indices must arrive in ascending order.
    pub fn record_dispatch(&mut self, index: TaskIndex) {
        debug_assert_eq!(index, self.started, "dispatch out of order");
        self.started += 1;
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight());
        debug_assert!(self.in_flight() <= self.limit, "window exceeded");
    }

    /// Fold one finished task into the aggregate.
    ///
    /// Returns the outcome category. Under [`ErrorPolicy::AbortOnFirstError`]
    /// the first failure also closes dispatching, unless every task was
    /// already dispatched: then nothing is cut short and the failure is only
    /// tallied.
    pub fn record_completion(&mut self, index: TaskIndex, result: &TaskResult) -> Outcome {
        self.completed += 1;
        match result {
            Ok(code) => {
                *self.statuses.entry(*code).or_default() += 1;
            }
            Err(err) => {
                self.failures.push(FailureRecord {
                    index,
                    reason: err.reason().to_string(),
                });
                if self.policy == ErrorPolicy::AbortOnFirstError
                    && self.stopped.is_none()
                    && self.started < self.total
                {
                    self.stopped = Some(StopReason::Aborted {
                        index,
                        reason: err.reason().to_string(),
                    });
                }
            }
        }
        Outcome::of(result)
    }

    /// Stop dispatching. Keeps an earlier stop reason if one exists.
    pub fn cancel(&mut self) {
        if self.stopped.is_none() && self.started < self.total {
            self.stopped = Some(StopReason::Cancelled);
        }
    }

    /// `Running -> Completed`, producing the read-only report.
    pub fn finish(mut self, elapsed: Duration) -> Result<RunReport, ModelError> {
        self.enter(RunPhase::Completed)?;
        Ok(RunReport {
            total: self.total,
            limit: self.limit,
            policy: self.policy,
            started: self.started,
            completed: self.completed,
            peak_in_flight: self.peak_in_flight,
            statuses: self.statuses,
            failures: self.failures,
            stopped: self.stopped,
            elapsed_ms: elapsed.as_millis() as u64,
        })
    }

    fn enter(&mut self, next: RunPhase) -> Result<(), ModelError> {
        if !self.phase.can_enter(next) {
            return Err(ModelError::IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}
